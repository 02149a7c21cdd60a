//! Raw declarations for the parts of libmagic this crate uses.
//!
//! See `magic.h` and libmagic(3). Only the flag values needed by
//! [`Check`](crate::Check) are declared.

use libc::{c_char, c_int, c_void, size_t};

/// Opaque `struct magic_set`
#[repr(C)]
pub(crate) struct MagicSet {
    _private: [u8; 0],
}

/// `magic_t`
pub(crate) type MagicT = *mut MagicSet;

pub(crate) const MAGIC_NONE: c_int = 0x0000000;
pub(crate) const MAGIC_MIME_TYPE: c_int = 0x0000010;
pub(crate) const MAGIC_ERROR: c_int = 0x0000200;
pub(crate) const MAGIC_MIME_ENCODING: c_int = 0x0000400;

#[link(name = "magic")]
extern "C" {
    pub(crate) fn magic_open(flags: c_int) -> MagicT;
    pub(crate) fn magic_close(cookie: MagicT);
    pub(crate) fn magic_error(cookie: MagicT) -> *const c_char;
    pub(crate) fn magic_errno(cookie: MagicT) -> c_int;
    pub(crate) fn magic_load(cookie: MagicT, filename: *const c_char) -> c_int;
    pub(crate) fn magic_file(cookie: MagicT, filename: *const c_char) -> *const c_char;
    pub(crate) fn magic_buffer(cookie: MagicT, buffer: *const c_void, length: size_t)
        -> *const c_char;
}
