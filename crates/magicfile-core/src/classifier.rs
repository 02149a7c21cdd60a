//! The boundary between input handling and the native library.
//!
//! [`Detector`](crate::Detector) validates inputs and then hands them to a
//! [`Classifier`]. [`Magic`] is the libmagic implementation; other
//! implementations can be plugged in for testing or for a different backend:
//!
//! ```no_run
//! use magicfile_core::{Check, Classifier, Detector, Result};
//! use std::path::Path;
//!
//! struct Fixed;
//!
//! impl Classifier for Fixed {
//!     fn classify_path(&self, _check: Check, _path: &Path) -> Result<String> {
//!         Ok("data".to_string())
//!     }
//!
//!     fn classify_buffer(&self, _check: Check, _data: &[u8]) -> Result<String> {
//!         Ok("data".to_string())
//!     }
//! }
//!
//! let detector = Detector::with_classifier(Fixed);
//! assert_eq!(detector.detect_buffer(Check::Text, b"abc")?, "data");
//! # Ok::<(), magicfile_core::Error>(())
//! ```

use crate::check::Check;
use crate::cookie::Cookie;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Produces classification strings for already validated inputs
pub trait Classifier: Send + Sync {
    /// Classify the file at `path`
    fn classify_path(&self, check: Check, path: &Path) -> Result<String>;

    /// Classify an in-memory buffer. `data` is never empty.
    fn classify_buffer(&self, check: Check, data: &[u8]) -> Result<String>;
}

/// libmagic-backed classifier.
///
/// Each call opens its own handle, loads the database into it, classifies
/// and closes it again, so a `Magic` can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct Magic {
    database: Option<PathBuf>,
}

impl Magic {
    /// Classifier using libmagic's default database
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier using the compiled database at `database`
    pub fn with_database(database: impl Into<PathBuf>) -> Self {
        Self {
            database: Some(database.into()),
        }
    }

    /// The configured database, `None` meaning libmagic's default
    pub fn database(&self) -> Option<&Path> {
        self.database.as_deref()
    }

    fn open(&self, check: Check) -> Result<Cookie> {
        let cookie = Cookie::open(check)?;
        cookie.load(self.database())?;
        Ok(cookie)
    }
}

impl Classifier for Magic {
    fn classify_path(&self, check: Check, path: &Path) -> Result<String> {
        self.open(check)?.file(path)
    }

    fn classify_buffer(&self, check: Check, data: &[u8]) -> Result<String> {
        self.open(check)?.buffer(data)
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify_path(&self, check: Check, path: &Path) -> Result<String> {
        (**self).classify_path(check, path)
    }

    fn classify_buffer(&self, check: Check, data: &[u8]) -> Result<String> {
        (**self).classify_buffer(check, data)
    }
}
