//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod config;
pub mod error;
pub mod timing;

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{ConversionError, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
