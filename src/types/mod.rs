pub mod analysis;
pub mod error;

pub use analysis::*;
pub use error::{
    ErrorClass, FailedItem, PartialFailureError, Result, ResultExt, ReviewError, ValidationError,
    ValidationErrorKind,
};
