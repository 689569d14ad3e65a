//! Pipeline conversions module
//!
//! Orchestration of the three file operations: decrementing raw pixels into
//! a TIFF, repacking modified pixels into the original container, and
//! verifying the difference between two pixel files.

mod decrement;
mod repack;
mod verify;


pub use decrement::{BatchReport, DecrementPipeline, ProcessedFile, decrement, decrement_sample};
pub use repack::{RepackedFile, Repacker, default_output_path};
pub use verify::Verifier;
