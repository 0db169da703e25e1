//! Raw C ABI of the native recognition engine (libmagic).
//!
//! Only the handle wrapper and the version query call into this module.
//! Everything here mirrors `<magic.h>` as shipped with libmagic 5.45; the
//! wrapper never exposes a raw `magic_t` to callers.
//!
//! # Error reporting
//! Every entry point that can fail returns `-1` (or a null pointer).  The
//! diagnostic for the most recent failure is read back with [`magic_error`],
//! which must be queried immediately after the failing call and before any
//! other call on the same cookie.
//!
//! # Thread safety
//! A cookie is not reentrant.  It may be moved to another thread, but two
//! threads must never call into the same cookie concurrently.  Distinct
//! cookies are fully independent.

use std::ffi::{c_char, c_int, c_void};

/// Opaque engine state behind a cookie.
#[repr(C)]
pub struct magic_set {
    _private: [u8; 0],
}

#[allow(non_camel_case_types)]
pub type magic_t = *mut magic_set;

/// Return code signalling failure from every `int`-returning entry point.
pub const MAGIC_FAILURE: c_int = -1;

// ── Flag values ─────────────────────────────────────────────────────────────
//
// Native values, some of which are composites of others.  These are NOT the
// bits of a `FlagSet` mask; see `Flag::native`.

pub const MAGIC_NONE:              c_int = 0x000_0000;
pub const MAGIC_DEBUG:             c_int = 0x000_0001;
pub const MAGIC_SYMLINK:           c_int = 0x000_0002;
pub const MAGIC_COMPRESS:          c_int = 0x000_0004;
pub const MAGIC_DEVICES:           c_int = 0x000_0008;
pub const MAGIC_MIME_TYPE:         c_int = 0x000_0010;
pub const MAGIC_CONTINUE:          c_int = 0x000_0020;
pub const MAGIC_CHECK:             c_int = 0x000_0040;
pub const MAGIC_PRESERVE_ATIME:    c_int = 0x000_0080;
pub const MAGIC_RAW:               c_int = 0x000_0100;
pub const MAGIC_ERROR:             c_int = 0x000_0200;
pub const MAGIC_MIME_ENCODING:     c_int = 0x000_0400;
pub const MAGIC_MIME:              c_int = MAGIC_MIME_TYPE | MAGIC_MIME_ENCODING;
pub const MAGIC_APPLE:             c_int = 0x000_0800;
pub const MAGIC_EXTENSION:         c_int = 0x100_0000;
pub const MAGIC_COMPRESS_TRANSP:   c_int = 0x200_0000;
pub const MAGIC_NO_COMPRESS_FORK:  c_int = 0x400_0000;
pub const MAGIC_NODESC:            c_int = MAGIC_EXTENSION | MAGIC_MIME | MAGIC_APPLE;

pub const MAGIC_NO_CHECK_COMPRESS: c_int = 0x000_1000;
pub const MAGIC_NO_CHECK_TAR:      c_int = 0x000_2000;
pub const MAGIC_NO_CHECK_SOFT:     c_int = 0x000_4000;
pub const MAGIC_NO_CHECK_APPTYPE:  c_int = 0x000_8000;
pub const MAGIC_NO_CHECK_ELF:      c_int = 0x001_0000;
pub const MAGIC_NO_CHECK_TEXT:     c_int = 0x002_0000;
pub const MAGIC_NO_CHECK_CDF:      c_int = 0x004_0000;
pub const MAGIC_NO_CHECK_CSV:      c_int = 0x008_0000;
pub const MAGIC_NO_CHECK_TOKENS:   c_int = 0x010_0000;
pub const MAGIC_NO_CHECK_ENCODING: c_int = 0x020_0000;
pub const MAGIC_NO_CHECK_JSON:     c_int = 0x040_0000;
pub const MAGIC_NO_CHECK_SIMH:     c_int = 0x080_0000;
/// Every built-in test except the soft (database) one.
pub const MAGIC_NO_CHECK_BUILTIN:  c_int = MAGIC_NO_CHECK_COMPRESS
    | MAGIC_NO_CHECK_TAR
    | MAGIC_NO_CHECK_APPTYPE
    | MAGIC_NO_CHECK_ELF
    | MAGIC_NO_CHECK_TEXT
    | MAGIC_NO_CHECK_CSV
    | MAGIC_NO_CHECK_CDF
    | MAGIC_NO_CHECK_TOKENS
    | MAGIC_NO_CHECK_ENCODING
    | MAGIC_NO_CHECK_JSON
    | MAGIC_NO_CHECK_SIMH;

// ── Parameter ids ───────────────────────────────────────────────────────────

pub const MAGIC_PARAM_INDIR_MAX:      c_int = 0;
pub const MAGIC_PARAM_NAME_MAX:       c_int = 1;
pub const MAGIC_PARAM_ELF_PHNUM_MAX:  c_int = 2;
pub const MAGIC_PARAM_ELF_SHNUM_MAX:  c_int = 3;
pub const MAGIC_PARAM_ELF_NOTES_MAX:  c_int = 4;
pub const MAGIC_PARAM_REGEX_MAX:      c_int = 5;
pub const MAGIC_PARAM_BYTES_MAX:      c_int = 6;
pub const MAGIC_PARAM_ENCODING_MAX:   c_int = 7;
pub const MAGIC_PARAM_ELF_SHSIZE_MAX: c_int = 8;
pub const MAGIC_PARAM_MAGWARN_MAX:    c_int = 9;

// ── Entry points ────────────────────────────────────────────────────────────

#[link(name = "magic")]
extern "C" {
    /// Allocate a cookie.  Returns null and sets `errno` on failure.
    pub fn magic_open(flags: c_int) -> magic_t;

    /// Release a cookie.  Null is accepted and ignored.
    pub fn magic_close(cookie: magic_t);

    /// Description of `filename`, or null on failure.  The returned string is
    /// owned by the cookie and valid until the next call on it.
    pub fn magic_file(cookie: magic_t, filename: *const c_char) -> *const c_char;

    /// Last error message, or null when no error is recorded.
    pub fn magic_error(cookie: magic_t) -> *const c_char;

    /// Last `errno` recorded by the engine.
    pub fn magic_errno(cookie: magic_t) -> c_int;

    pub fn magic_setflags(cookie: magic_t, flags: c_int) -> c_int;

    /// Linked library version, e.g. `545` for 5.45.
    pub fn magic_version() -> c_int;

    /// Load a colon separated list of databases; null selects the default.
    pub fn magic_load(cookie: magic_t, filename: *const c_char) -> c_int;

    /// Compile each source database into `<basename>.mgc` in the current
    /// working directory.
    pub fn magic_compile(cookie: magic_t, filename: *const c_char) -> c_int;

    /// Validate source databases without loading them.
    pub fn magic_check(cookie: magic_t, filename: *const c_char) -> c_int;

    /// `value` points at a `size_t`.
    pub fn magic_setparam(cookie: magic_t, param: c_int, value: *const c_void) -> c_int;

    /// `value` points at a `size_t` receiving the current value.
    pub fn magic_getparam(cookie: magic_t, param: c_int, value: *mut c_void) -> c_int;
}
