//! Validation subsystem
//!
//! - Stable error codes and per-field validation errors
//! - The `Validator` capability and built-in validators
//! - The symbol registry used by declarations

mod errors;
mod registry;
mod validator;

pub use errors::{ErrorCode, ValidationError};
pub(crate) use errors::make_path;
pub use registry::ValidatorRegistry;
pub use validator::{
    validator_fn, BuiltinDecl, Email, FnValidator, Length, NotBlank, OneOf, Outcome, Password,
    Pattern, Range, Validator,
};
