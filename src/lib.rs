//! Client-side orchestrator for a remote object-detection service.
//!
//! Layout follows a ports-and-adapters split:
//! - `domain`: plain data (selected image, handles, results, session state).
//! - `application`: the wire codec, the handle tracker, the health probe and
//!   the `DetectionSession` state machine, all written against `ports`.
//! - `adapters`: reqwest transport and the handle stores.

pub mod adapters;
pub mod application;
pub mod domain;

pub use application::codec::{DetectionCodec, ResponseProtocol};
pub use application::health::HealthProbe;
pub use application::session::DetectionSession;
pub use domain::errors::{DomainError, DomainResult};
