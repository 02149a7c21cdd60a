//! Owned libmagic handle.
//!
//! A [`Cookie`] wraps one `magic_t`. It is opened for a single [`Check`],
//! used for one classification and closed when dropped, whatever the
//! outcome of the calls made on it.

#![allow(unsafe_code)]

use crate::check::Check;
use crate::error::{Error, Result};
use crate::ffi;
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use tracing::trace;

#[cfg(test)]
thread_local! {
    static LIVE: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Number of cookies opened and not yet closed on the current thread
#[cfg(test)]
pub(crate) fn live_cookies() -> usize {
    LIVE.with(|live| live.get())
}

#[derive(Debug)]
pub(crate) struct Cookie {
    raw: NonNull<ffi::MagicSet>,
    check: Check,
}

impl Cookie {
    pub(crate) fn open(check: Check) -> Result<Self> {
        let raw = unsafe { ffi::magic_open(check.flags()) };
        let Some(raw) = NonNull::new(raw) else {
            return Err(Error::open(
                check,
                std::io::Error::last_os_error().to_string(),
            ));
        };

        #[cfg(test)]
        LIVE.with(|live| live.set(live.get() + 1));

        trace!("Opened libmagic handle for {} check", check);
        Ok(Self { raw, check })
    }

    /// Loads `database`, or libmagic's default database when `None`
    pub(crate) fn load(&self, database: Option<&Path>) -> Result<()> {
        let database_c = database
            .map(path_to_cstring)
            .transpose()?;
        let database_ptr = database_c.as_ref().map_or(ptr::null(), |db| db.as_ptr());

        if unsafe { ffi::magic_load(self.raw.as_ptr(), database_ptr) } != 0 {
            return Err(Error::database_load(
                database.map(Path::to_path_buf),
                self.last_error(),
            ));
        }

        trace!("Loaded signature database for {} check", self.check);
        Ok(())
    }

    pub(crate) fn file(&self, path: &Path) -> Result<String> {
        let path_c = path_to_cstring(path)?;
        let result = unsafe { ffi::magic_file(self.raw.as_ptr(), path_c.as_ptr()) };
        self.copy_result(result)
    }

    pub(crate) fn buffer(&self, data: &[u8]) -> Result<String> {
        let result = unsafe {
            ffi::magic_buffer(self.raw.as_ptr(), data.as_ptr().cast(), data.len())
        };
        self.copy_result(result)
    }

    /// Copies a classification out of libmagic's storage, which the next
    /// call on this handle would overwrite.
    fn copy_result(&self, result: *const libc::c_char) -> Result<String> {
        if result.is_null() {
            return Err(Error::classification(self.check, self.last_error()));
        }

        let text = unsafe { CStr::from_ptr(result) }
            .to_string_lossy()
            .into_owned();
        if text.is_empty() {
            return Err(Error::classification(self.check, "libmagic returned an empty result"));
        }

        Ok(text)
    }

    fn last_error(&self) -> String {
        let message = unsafe { ffi::magic_error(self.raw.as_ptr()) };
        if !message.is_null() {
            return unsafe { CStr::from_ptr(message) }
                .to_string_lossy()
                .into_owned();
        }

        match unsafe { ffi::magic_errno(self.raw.as_ptr()) } {
            0 => "unknown libmagic error".to_string(),
            errno => std::io::Error::from_raw_os_error(errno).to_string(),
        }
    }
}

impl Drop for Cookie {
    fn drop(&mut self) {
        unsafe { ffi::magic_close(self.raw.as_ptr()) };

        #[cfg(test)]
        LIVE.with(|live| live.set(live.get() - 1));

        trace!("Closed libmagic handle for {} check", self.check);
    }
}

/// Whether `path` exists and the current process may read it.
///
/// Never opens the path: opening a FIFO for reading blocks until a writer
/// shows up.
#[cfg(unix)]
pub(crate) fn is_readable(path: &Path) -> bool {
    if std::fs::metadata(path).is_err() {
        return false;
    }
    match path_to_cstring(path) {
        Ok(path_c) => unsafe { libc::access(path_c.as_ptr(), libc::R_OK) == 0 },
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub(crate) fn is_readable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;

    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        Error::invalid_input(format!("path contains a NUL byte: {}", path.display()))
    })
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> Result<CString> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::invalid_input(format!("path is not valid UTF-8: {}", path.display())))?;

    CString::new(path_str).map_err(|_| {
        Error::invalid_input(format!("path contains a NUL byte: {}", path.display()))
    })
}

/// Creates a named pipe at `path`
#[cfg(all(test, unix))]
pub(crate) fn make_fifo(path: &Path) {
    let path_c = path_to_cstring(path).unwrap();
    assert_eq!(unsafe { libc::mkfifo(path_c.as_ptr(), 0o600) }, 0);
}
