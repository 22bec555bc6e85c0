//! Domain models for calweave.
//!
//! Canonical definitions shared by every layer:
//! - `SourceType` / `SourcePriority` / `SourceConfig`: data-source descriptors
//! - `ValidationResult`: per-fetch data validation verdict
//! - `StepId`: the twelve pipeline steps and their upstream inputs
//! - `CalendarError`: the error taxonomy

pub mod error;
pub mod source;
pub mod step;
pub mod validation;

pub use error::{CalendarError, Result};
pub use source::{SourceConfig, SourcePriority, SourceType};
pub use step::StepId;
pub use validation::{is_empty_value, ValidationResult};
