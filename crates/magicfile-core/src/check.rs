//! Detection modes.

use crate::ffi;
use std::collections::BTreeMap;
use std::fmt;

/// What kind of classification string libmagic should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Check {
    /// Free-text description, e.g. `ASCII text`
    Text,
    /// MIME type, e.g. `text/plain`
    MimeType,
    /// Character encoding, e.g. `us-ascii`
    Encoding,
}

/// Results of several checks run against one input
pub type Characteristics = BTreeMap<Check, String>;

impl Check {
    /// All checks, in the order the command line prints them
    pub const ALL: [Check; 3] = [Check::Text, Check::MimeType, Check::Encoding];

    /// libmagic flags for this check.
    ///
    /// `MAGIC_ERROR` is always set so that unreadable inputs come back as a
    /// null result with a `magic_error` message rather than as a description
    /// such as "cannot open".
    pub fn flags(self) -> libc::c_int {
        let mode = match self {
            Check::Text => ffi::MAGIC_NONE,
            Check::MimeType => ffi::MAGIC_MIME_TYPE,
            Check::Encoding => ffi::MAGIC_MIME_ENCODING,
        };
        mode | ffi::MAGIC_ERROR
    }

    /// Short name used in logs and errors
    pub fn as_str(self) -> &'static str {
        match self {
            Check::Text => "text",
            Check::MimeType => "mime-type",
            Check::Encoding => "encoding",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        assert_eq!(Check::Text.flags(), ffi::MAGIC_ERROR);
        assert_eq!(Check::MimeType.flags(), 0x010 | 0x200);
        assert_eq!(Check::Encoding.flags(), 0x400 | 0x200);
    }

    #[test]
    fn test_ordering_matches_all() {
        let mut sorted = Check::ALL;
        sorted.sort();
        assert_eq!(sorted, Check::ALL);
    }
}
