//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the photo sync core:
//! - Logging and tracing infrastructure
//! - Configuration (`PhotosConfig`)
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its validated configuration and the broadcast channel used to report
//! auth and sync progress to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PhotosConfig, PhotosConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
pub use logging::{init_logging, LogFormat, LoggingConfig};
