//! fieldbind - Declarative field binding and validation
//!
//! Raw field mappings (JSON bodies, form data) are bound against declared
//! classes. Every field is coerced to its declared type and checked by all
//! of its validators; the caller receives either a populated instance or
//! the complete map of field errors.

pub mod binding;
pub mod cli;
pub mod observability;
pub mod schema;
pub mod validation;
