//! Request failure handling.
//!
//! Handlers, extractors and the persistence layer report failures as
//! [`FailureInput`]. The [`exception_filter`] middleware hands them to the
//! [`ErrorNormalizer`], which logs them and renders an [`ErrorEnvelope`].

pub mod envelope;
pub mod failure;
pub mod filter;
pub mod normalizer;

pub use envelope::ErrorEnvelope;
pub use failure::{FailureInput, MessageBody};
pub use filter::{exception_filter, handle_panic, route_not_found};
pub use normalizer::{classify, Classification, ErrorNormalizer};
