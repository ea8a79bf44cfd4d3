//! Binding pipeline
//!
//! Turns a raw field mapping into a populated instance or a complete map
//! of field errors.
//!
//! # Design Principles
//!
//! - Every field is bound and validated; no short-circuit across fields
//! - Every validator on a field runs; no short-circuit within a field
//! - Coercion failure skips that field's validators
//! - Field errors are data; only configuration errors are raised
//! - Resolved declarations are immutable and shared

pub mod binder;
mod config;
mod engine;
mod input;
mod session;
mod value;

pub use binder::{BindErrorKind, BindOutcome, Binder, NestedBinder, RawState};
pub(crate) use config::is_valid_format;
pub use config::BindingConfig;
pub use engine::BindingEngine;
pub use input::{InputError, RawInput};
pub use session::{BindingContext, BindingResult, BindingSession, FieldErrors, FieldResult};
pub use value::{BoundObject, FromBound, Value};
