//! # tempbox-http
//!
//! REST gateway to the Tempbox mail backend.
//!
//! [`HttpGateway`] implements [`tempbox_core::MailGateway`] over the
//! backend's `/api` routes. Provider payloads are normalized here: ids arrive
//! as numbers or strings, timestamps with or without a zone, and message
//! bodies as strings, lists or nothing at all.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempbox_http::{DEFAULT_TIMEOUT, HttpGateway};
//!
//! let gateway = Arc::new(HttpGateway::new("http://localhost:8001", DEFAULT_TIMEOUT)?);
//! let workspace = tempbox_core::Workspace::new(gateway, clock, config, None)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod wire;

pub use client::{DEFAULT_TIMEOUT, HttpGateway};
pub use error::{Error, Result};
