//! Input validation and dispatch to a [`Classifier`].
//!
//! ## Flow
//!
//! 1. Reject inputs libmagic should never see (missing files, empty buffers)
//! 2. Hand the input to the classifier, which opens a handle, loads the
//!    database, classifies and closes the handle again
//! 3. Return the owned classification string
//!
//! Nothing is cached between calls; a [`Detector`] only carries its
//! configuration and can be shared between threads.

use crate::check::{Characteristics, Check};
use crate::classifier::{Classifier, Magic};
use crate::cookie::is_readable;
use crate::error::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes read from a stream before classifying it
pub const DEFAULT_MAX_STREAM_BYTES: usize = 4096;

/// Configuration for the detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Compiled signature database (`None` = libmagic's default)
    pub database: Option<PathBuf>,
    /// Maximum number of bytes read from a stream input
    pub max_stream_bytes: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            database: None,
            max_stream_bytes: DEFAULT_MAX_STREAM_BYTES,
        }
    }
}

impl DetectorConfig {
    /// Creates a new detector config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signature database to load
    pub fn database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the maximum number of bytes read from streams.
    ///
    /// Zero makes every stream read fail with [`Error::InvalidInput`].
    pub fn max_stream_bytes(mut self, max: usize) -> Self {
        self.max_stream_bytes = max;
        self
    }
}

/// Detects file types, MIME types and encodings of files, buffers and streams
#[derive(Debug, Clone)]
pub struct Detector<C = Magic> {
    classifier: C,
    max_stream_bytes: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector {
    /// Creates a libmagic detector using the default database
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Creates a libmagic detector with custom configuration
    pub fn with_config(config: DetectorConfig) -> Self {
        let classifier = match config.database {
            Some(database) => Magic::with_database(database),
            None => Magic::new(),
        };
        Self {
            classifier,
            max_stream_bytes: config.max_stream_bytes,
        }
    }
}

impl<C: Classifier> Detector<C> {
    /// Creates a detector around a custom classifier
    pub fn with_classifier(classifier: C) -> Self {
        Self {
            classifier,
            max_stream_bytes: DEFAULT_MAX_STREAM_BYTES,
        }
    }

    /// Sets the maximum number of bytes read from streams
    pub fn max_stream_bytes(mut self, max: usize) -> Self {
        self.max_stream_bytes = max;
        self
    }

    /// The underlying classifier
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify the file at `path`
    pub fn detect_path(&self, check: Check, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        ensure_readable(path)?;

        debug!("Running {} check on {}", check, path.display());
        self.classifier.classify_path(check, path)
    }

    /// Classify an in-memory buffer
    pub fn detect_buffer(&self, check: Check, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(Error::invalid_input("buffer is empty"));
        }

        debug!("Running {} check on {} byte buffer", check, data.len());
        self.classifier.classify_buffer(check, data)
    }

    /// Classify the first `max_stream_bytes` bytes of a stream
    pub fn detect_reader(&self, check: Check, reader: impl Read) -> Result<String> {
        let data = read_prefix(reader, self.max_stream_bytes)?;
        self.detect_buffer(check, &data)
    }

    /// Run several checks against one file
    pub fn characterize_path(
        &self,
        checks: impl IntoIterator<Item = Check>,
        path: impl AsRef<Path>,
    ) -> Result<Characteristics> {
        let path = path.as_ref();
        let mut results = Characteristics::new();
        for check in checks {
            results.insert(check, self.detect_path(check, path)?);
        }
        Ok(results)
    }

    /// Run several checks against one buffer
    pub fn characterize_buffer(
        &self,
        checks: impl IntoIterator<Item = Check>,
        data: &[u8],
    ) -> Result<Characteristics> {
        let mut results = Characteristics::new();
        for check in checks {
            results.insert(check, self.detect_buffer(check, data)?);
        }
        Ok(results)
    }

    /// Read a stream once and run several checks against what was read
    pub fn characterize_reader(
        &self,
        checks: impl IntoIterator<Item = Check>,
        reader: impl Read,
    ) -> Result<Characteristics> {
        let data = read_prefix(reader, self.max_stream_bytes)?;
        self.characterize_buffer(checks, &data)
    }
}

/// An input captured once and checked any number of times
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// A readable file
    Path(PathBuf),
    /// Bytes taken from a stream or supplied directly
    Bytes(Vec<u8>),
}

impl Subject {
    /// Captures a file path, failing if the file cannot be read now
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_readable(&path)?;
        Ok(Self::Path(path))
    }

    /// Captures up to `limit` bytes from a stream
    pub fn from_reader(reader: impl Read, limit: usize) -> Result<Self> {
        Ok(Self::Bytes(read_prefix(reader, limit)?))
    }

    /// Run one check
    pub fn check<C: Classifier>(&self, detector: &Detector<C>, check: Check) -> Result<String> {
        match self {
            Self::Path(path) => detector.detect_path(check, path),
            Self::Bytes(data) => detector.detect_buffer(check, data),
        }
    }

    /// Free-text description
    pub fn check_text<C: Classifier>(&self, detector: &Detector<C>) -> Result<String> {
        self.check(detector, Check::Text)
    }

    /// MIME type
    pub fn check_mime<C: Classifier>(&self, detector: &Detector<C>) -> Result<String> {
        self.check(detector, Check::MimeType)
    }

    /// Character encoding
    pub fn check_encoding<C: Classifier>(&self, detector: &Detector<C>) -> Result<String> {
        self.check(detector, Check::Encoding)
    }

    /// Run several checks
    pub fn characterize<C: Classifier>(
        &self,
        detector: &Detector<C>,
        checks: impl IntoIterator<Item = Check>,
    ) -> Result<Characteristics> {
        match self {
            Self::Path(path) => detector.characterize_path(checks, path),
            Self::Bytes(data) => detector.characterize_buffer(checks, data),
        }
    }
}

/// Free-text description of the file at `path`
pub fn check_text(path: impl AsRef<Path>) -> Result<String> {
    Detector::new().detect_path(Check::Text, path)
}

/// MIME type of the file at `path`
pub fn check_mime(path: impl AsRef<Path>) -> Result<String> {
    Detector::new().detect_path(Check::MimeType, path)
}

/// Character encoding of the file at `path`
pub fn check_encoding(path: impl AsRef<Path>) -> Result<String> {
    Detector::new().detect_path(Check::Encoding, path)
}

/// Free-text description of `data`
pub fn check_text_buffer(data: &[u8]) -> Result<String> {
    Detector::new().detect_buffer(Check::Text, data)
}

/// MIME type of `data`
pub fn check_mime_buffer(data: &[u8]) -> Result<String> {
    Detector::new().detect_buffer(Check::MimeType, data)
}

/// Character encoding of `data`
pub fn check_encoding_buffer(data: &[u8]) -> Result<String> {
    Detector::new().detect_buffer(Check::Encoding, data)
}

fn ensure_readable(path: &Path) -> Result<()> {
    if !is_readable(path) {
        debug!("Cannot read {}", path.display());
        return Err(Error::file_not_found(path));
    }
    Ok(())
}

fn read_prefix(reader: impl Read, limit: usize) -> Result<Vec<u8>> {
    if limit == 0 {
        return Err(Error::invalid_input("stream read limit must be at least one byte"));
    }

    let mut data = Vec::with_capacity(limit.min(DEFAULT_MAX_STREAM_BYTES));
    reader
        .take(limit as u64)
        .read_to_end(&mut data)
        .map_err(Error::stream_read)?;

    if data.is_empty() {
        return Err(Error::invalid_input("stream is at its end or empty"));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::live_cookies;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    const PNG_1X1: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// Records every input that reaches the classifier
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(Check, usize)>>,
    }

    impl Recording {
        fn calls(&self) -> Vec<(Check, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Classifier for Recording {
        fn classify_path(&self, check: Check, _path: &Path) -> Result<String> {
            self.calls.lock().unwrap().push((check, 0));
            Ok(format!("{check}:path"))
        }

        fn classify_buffer(&self, check: Check, data: &[u8]) -> Result<String> {
            self.calls.lock().unwrap().push((check, data.len()));
            Ok(format!("{check}:{}", data.len()))
        }
    }

    fn text_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_detector_config_builder() {
        let config = DetectorConfig::new()
            .database("/usr/share/misc/magic.mgc")
            .max_stream_bytes(16);

        assert_eq!(config.database, Some(PathBuf::from("/usr/share/misc/magic.mgc")));
        assert_eq!(config.max_stream_bytes, 16);
        assert_eq!(DetectorConfig::default().max_stream_bytes, 4096);
    }

    #[test]
    fn test_empty_buffer_never_reaches_classifier() {
        let detector = Detector::with_classifier(Recording::default());

        for check in Check::ALL {
            let err = detector.detect_buffer(check, &[]).unwrap_err();
            assert!(matches!(err, Error::InvalidInput { .. }));
        }
        assert!(detector.classifier().calls().is_empty());
    }

    #[test]
    fn test_missing_file_never_reaches_classifier() {
        let detector = Detector::with_classifier(Recording::default());

        let err = detector
            .detect_path(Check::Text, "thisFileProbablyDoesNot.exist")
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
        assert!(detector.classifier().calls().is_empty());
    }

    #[test]
    fn test_reader_is_truncated() {
        let detector = Detector::with_classifier(Recording::default()).max_stream_bytes(8);

        let result = detector
            .detect_reader(Check::MimeType, Cursor::new(vec![b'a'; 100]))
            .unwrap();
        assert_eq!(result, "mime-type:8");
    }

    #[test]
    fn test_empty_reader() {
        let detector = Detector::with_classifier(Recording::default());

        let err = detector
            .detect_reader(Check::Text, Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(detector.classifier().calls().is_empty());
    }

    #[test]
    fn test_zero_stream_limit_is_rejected() {
        let detector = Detector::with_classifier(Recording::default()).max_stream_bytes(0);

        let err = detector
            .detect_reader(Check::Text, Cursor::new(b"hello world".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("limit"), "unexpected message: {err}");
        assert!(detector.classifier().calls().is_empty());
    }

    #[test]
    fn test_with_config_uses_configured_database() {
        let detector = Detector::with_config(
            DetectorConfig::new()
                .database("/usr/share/misc/magic.mgc")
                .max_stream_bytes(8),
        );

        assert_eq!(
            detector.classifier().database(),
            Some(Path::new("/usr/share/misc/magic.mgc"))
        );
        assert_eq!(detector.max_stream_bytes, 8);
        assert_eq!(Detector::new().classifier().database(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_does_not_block() {
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let fifo = dir.path().join("pipe");
        crate::cookie::make_fifo(&fifo);

        let (tx, rx) = mpsc::channel();
        let path = fifo.clone();
        std::thread::spawn(move || {
            let _ = tx.send(check_text(&path));
        });

        let text = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("detection on a named pipe did not return")
            .unwrap();
        assert!(text.contains("fifo"), "unexpected description: {text}");
    }

    #[test]
    fn test_characterize_reader_reads_once() {
        let detector = Detector::with_classifier(Recording::default());

        let results = detector
            .characterize_reader(Check::ALL, Cursor::new(b"hello world".to_vec()))
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[&Check::Encoding], "encoding:11");
        assert_eq!(
            detector.classifier().calls(),
            vec![(Check::Text, 11), (Check::MimeType, 11), (Check::Encoding, 11)]
        );
    }

    #[test]
    fn test_subject_from_reader_can_be_checked_repeatedly() {
        let detector = Detector::with_classifier(Recording::default());
        let subject = Subject::from_reader(Cursor::new(b"abc".to_vec()), 4096).unwrap();

        assert_eq!(subject.check_text(&detector).unwrap(), "text:3");
        assert_eq!(subject.check_mime(&detector).unwrap(), "mime-type:3");
        assert_eq!(subject.check_encoding(&detector).unwrap(), "encoding:3");
    }

    #[test]
    fn test_subject_from_missing_path() {
        let err = Subject::from_path("thisFileProbablyDoesNot.exist").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_text_file() {
        let file = text_file("hello world\n");

        let text = check_text(file.path()).unwrap();
        assert!(text.contains("text"), "unexpected description: {text}");
        assert_eq!(check_mime(file.path()).unwrap(), "text/plain");

        let encoding = check_encoding(file.path()).unwrap();
        assert!(
            encoding == "us-ascii" || encoding == "utf-8",
            "unexpected encoding: {encoding}"
        );
    }

    #[test]
    fn test_characterize_text_file() {
        let file = text_file("hello world\n");
        let subject = Subject::from_path(file.path()).unwrap();

        let results = subject.characterize(&Detector::new(), Check::ALL).unwrap();

        assert!(results[&Check::Text].contains("ASCII text"));
        assert_eq!(results[&Check::MimeType], "text/plain");
        assert!(results[&Check::Encoding].contains("ascii"));
    }

    #[test]
    fn test_png_buffer() {
        assert_eq!(check_mime_buffer(PNG_1X1).unwrap(), "image/png");
        assert!(check_text_buffer(PNG_1X1).unwrap().contains("PNG"));
        assert_eq!(check_encoding_buffer(PNG_1X1).unwrap(), "binary");
        assert_eq!(live_cookies(), 0);
    }

    #[test]
    fn test_idempotent() {
        let detector = Detector::new();
        let first = detector.detect_buffer(Check::Text, b"hello world").unwrap();
        let second = detector.detect_buffer(Check::Text, b"hello world").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_database() {
        let detector =
            Detector::with_config(DetectorConfig::new().database("/nonexistent/magicfile.mgc"));

        let err = detector.detect_buffer(Check::MimeType, PNG_1X1).unwrap_err();
        assert!(matches!(err, Error::DatabaseLoad { .. }));
        assert!(!err.is_input_error());
        assert_eq!(live_cookies(), 0);
    }

    #[test]
    fn test_concurrent_calls_keep_their_own_results() {
        let inputs: [(&[u8], &str); 4] = [
            (b"hello world\n", "text/plain"),
            (PNG_1X1, "image/png"),
            (b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n", "application/pdf"),
            (b"GIF89a\x01\x00\x01\x00\x00\x00\x00", "image/gif"),
        ];
        let detector = Detector::new();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let (data, expected) = inputs[i % inputs.len()];
                    let detector = &detector;
                    scope.spawn(move || {
                        for _ in 0..10 {
                            let mime = detector.detect_buffer(Check::MimeType, data).unwrap();
                            assert_eq!(mime, expected);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    }
}
