//! # magicfile-core
//!
//! File type, MIME type and character encoding detection on top of libmagic.
//!
//! This crate provides:
//! - An owned libmagic handle that is always closed, including on error paths
//! - Detection for file paths, in-memory buffers and streams
//! - Structured errors instead of sentinel strings
//!
//! ## Architecture
//!
//! - [`detector`]: Input validation, multi-check characterization, streams
//! - [`classifier`]: The [`Classifier`] seam and the libmagic [`Magic`] backend
//! - [`check`]: Detection modes
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use magicfile_core::{Check, Detector};
//!
//! let detector = Detector::new();
//!
//! println!("{}", detector.detect_path(Check::Text, "/etc/hosts")?);
//! println!("{}", detector.detect_buffer(Check::MimeType, b"\x89PNG\r\n\x1a\n")?);
//!
//! for (check, value) in detector.characterize_path(Check::ALL, "/etc/hosts")? {
//!     println!("{check}: {value}");
//! }
//! # Ok::<(), magicfile_core::Error>(())
//! ```
//!
//! Every call opens and closes its own libmagic handle and returns an owned
//! `String`, so detectors can be used from many threads at once.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod check;
pub mod classifier;
mod cookie;
pub mod detector;
pub mod error;
mod ffi;

// Re-export primary types for convenience
pub use check::{Characteristics, Check};
pub use classifier::{Classifier, Magic};
pub use detector::{
    check_encoding, check_encoding_buffer, check_mime, check_mime_buffer, check_text,
    check_text_buffer, Detector, DetectorConfig, Subject, DEFAULT_MAX_STREAM_BYTES,
};
pub use error::{Error, Result};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
