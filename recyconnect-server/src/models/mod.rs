//! Request-side models: validation and lenient field parsing
//!
//! Invalid input becomes a ValidationError, never a panic.

pub mod fields;
pub mod lenient;
pub mod validation;

pub use fields::{bounded_text, email, required_text};
pub use validation::ValidationError;
