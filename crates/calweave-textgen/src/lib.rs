//! Calweave text generation seam
//!
//! Every data-source fetch and specialist analysis in calweave reaches a
//! remote text-generation service through the [`TextGenerator`] trait defined
//! here. The crate keeps that dependency at arm's length from the
//! orchestration core.
//!
//! ## Key Components
//!
//! - `TextGenerator`: async contract `(request) -> JSON data`
//! - `BoundedGenerator`: semaphore + timeout wrapper bounding in-flight calls
//! - `HttpTextGenerator`: reqwest adapter for a JSON generation endpoint
//! - `fakes`: scripted in-memory generators for tests and offline runs

mod bounded;
mod client;
mod error;
pub mod fakes;
mod http;

pub use bounded::{BoundedGenerator, BoundedGeneratorConfig};
pub use client::{check_schema, GenerationRequest, GenerationResponse, TextGenerator};
pub use error::GenerationError;
pub use http::{HttpGeneratorConfig, HttpTextGenerator};

/// Result type for text-generation operations
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
