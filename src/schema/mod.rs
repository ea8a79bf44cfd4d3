//! Class declarations and their resolution
//!
//! - `ClassSpec` / `FieldSpec`: immutable declarations, shared via `Arc`
//! - `ClassResolver`: flattens inheritance into a cached field table
//! - `ClassSpecLoader`: reads declarations from JSON files
//! - `ConfigurationError`: every way a declaration can be unusable
//!
//! Declarations are validated at resolution time, never while binding
//! individual fields.

mod errors;
mod loader;
mod resolver;
mod types;

pub use errors::{ConfigResult, ConfigurationError};
pub use loader::{ClassDecl, ClassSpecLoader, FieldDecl, TypeDecl, ValidatorDecl};
pub use resolver::{ClassResolver, ResolvedClass, ResolvedField};
pub use types::{
    ClassSpec, EnumSpec, FieldSpec, TypeTag, ValidatorRef, BINDER_OPTIONS, KEY_CHOICE, KEY_FORMAT,
    KEY_REQUIRED, KEY_TYPE, OPT_COLLAPSE_BLANK, OPT_FORMAT, OPT_IGNORE_ERRORS,
    OPT_VALIDATE_DEFAULT,
};
