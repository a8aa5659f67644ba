//! # rotor-core
//!
//! Foundation types shared by every rotor crate:
//!
//! - **Messages**: [`Message`], [`Role`], and the caller-owned [`Session`]
//! - **Errors**: [`RotationError`] via `thiserror`, admission rejection reasons,
//!   and the [`ClassifyError`] naming used by retry patterns
//! - **Retry**: [`RetryConfig`] and backoff delay math
//! - **Logging**: `tracing-subscriber` initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod messages;
pub mod retry;

pub use errors::{AdmissionRejection, ClassifyError, Result, RotationError};
pub use messages::{Message, Role, Session};
pub use retry::{BackoffStrategy, RetryConfig, calculate_delay_ms};
