//! The [`Magic`] handle wrapper, the primary embedding surface.
//!
//! ```no_run
//! use filemagic::{Flag, Magic, DEFAULT_DATABASE_FILE};
//!
//! let mut magic = Magic::new();
//! magic.open(Flag::MimeType)?;
//! magic.load_database_file(DEFAULT_DATABASE_FILE)?;
//! println!("{}", magic.identify_file("Cargo.toml")?);
//! # Ok::<(), filemagic::MagicError>(())
//! ```
//!
//! # States
//! A `Magic` is either **closed** (no native cookie) or **open** (exactly one
//! live cookie plus the [`FlagSet`] it was configured with).  An open handle
//! becomes **valid** once a database is loaded; only a valid handle can
//! identify files.  Every operation other than construction, `open`,
//! `close` and the state queries requires an open handle and fails with
//! [`MagicError::HandleNotOpen`] otherwise.
//!
//! # Resource lifetime
//! The cookie lives inside a private owner whose `Drop` releases it, so the
//! cookie is released on `close`, on reopen, when the wrapper is dropped, and
//! on every early return through `?`.
//!
//! # Threads
//! `Magic` is `Send` but not `Sync`: a handle can move between threads but is
//! never used from two at once.  Use one handle per thread for parallelism
//! (see [`crate::parallel`]).

use std::ffi::{c_char, c_void, CStr, CString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{MagicConfig, DEFAULT_DATABASE_FILE, DEFAULT_DATABASE_SOURCE};
use crate::error::{MagicError, Result};
use crate::ffi;
use crate::flags::FlagSet;
use crate::parameter::{Parameter, ParameterMap};
use crate::render::{IdentifyResults, TypesOfFiles};
use crate::tracker::{CompletionGuard, ProgressTracker};

// ── Cookie ────────────────────────────────────────────────────────────────────

/// Sole owner of one native cookie.
struct Cookie(NonNull<ffi::magic_set>);

// Safety: the engine keeps no thread-local state per cookie; moving a cookie
// to another thread is sound as long as it is not used concurrently, which
// the absence of a `Sync` impl guarantees.
unsafe impl Send for Cookie {}

impl Cookie {
    fn open(native_flags: i32) -> io::Result<Self> {
        let raw = unsafe { ffi::magic_open(native_flags) };
        NonNull::new(raw).map(Cookie).ok_or_else(io::Error::last_os_error)
    }

    fn as_ptr(&self) -> ffi::magic_t {
        self.0.as_ptr()
    }

    /// Diagnostic for the call that just failed.  Falls back to the
    /// engine's errno when it recorded no message.
    fn last_error(&self) -> String {
        let message = unsafe { ffi::magic_error(self.as_ptr()) };
        if !message.is_null() {
            return engine_text(unsafe { CStr::from_ptr(message) });
        }
        match unsafe { ffi::magic_errno(self.as_ptr()) } {
            0     => String::new(),
            errno => io::Error::from_raw_os_error(errno).to_string(),
        }
    }
}

impl Drop for Cookie {
    fn drop(&mut self) {
        unsafe { ffi::magic_close(self.as_ptr()) }
    }
}

/// Engine strings are bytes; invalid UTF-8 sequences become U+FFFD.
fn engine_text(text: &CStr) -> String {
    text.to_string_lossy().into_owned()
}

// ── Path checks ─────────────────────────────────────────────────────────────

fn metadata_of(path: &Path) -> Result<fs::Metadata> {
    if path.as_os_str().is_empty() {
        return Err(MagicError::EmptyPath);
    }
    fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => MagicError::PathDoesNotExist { path: path.to_owned() },
        _ => MagicError::Filesystem { path: path.to_owned(), source },
    })
}

fn require_existing(path: &Path) -> Result<()> {
    metadata_of(path).map(|_| ())
}

fn require_regular_file(path: &Path) -> Result<()> {
    if metadata_of(path)?.is_file() {
        Ok(())
    } else {
        Err(MagicError::PathIsNotRegularFile { path: path.to_owned() })
    }
}

fn require_directory(path: &Path) -> Result<()> {
    if metadata_of(path)?.is_dir() {
        Ok(())
    } else {
        Err(MagicError::PathIsNotDirectory { path: path.to_owned() })
    }
}

#[cfg(unix)]
fn to_c_path(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).map_err(|e| nul_in_path(path, e))
}

#[cfg(not(unix))]
fn to_c_path(path: &Path) -> Result<CString> {
    CString::new(path.to_string_lossy().into_owned()).map_err(|e| nul_in_path(path, e))
}

fn nul_in_path(path: &Path, err: std::ffi::NulError) -> MagicError {
    MagicError::Filesystem {
        path: path.to_owned(),
        source: io::Error::new(io::ErrorKind::InvalidInput, err),
    }
}

// ── Magic ───────────────────────────────────────────────────────────────────

/// Owning wrapper around one recognition engine handle.
#[derive(Default)]
pub struct Magic {
    cookie:          Option<Cookie>,
    flags:           FlagSet,
    database_loaded: bool,
}

impl std::fmt::Debug for Magic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Magic")
            .field("open", &self.is_open())
            .field("flags", &self.flags)
            .field("database_loaded", &self.database_loaded)
            .finish()
    }
}

impl Magic {
    // ── Constructors ────────────────────────────────────────────────────────

    /// A closed handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// An open handle without a database.
    pub fn open_with<F: Into<FlagSet>>(flags: F) -> Result<Self> {
        let mut magic = Self::new();
        magic.open(flags)?;
        Ok(magic)
    }

    /// An open handle with `database_file` loaded.
    pub fn with_database<F: Into<FlagSet>, P: AsRef<Path>>(flags: F, database_file: P) -> Result<Self> {
        let mut magic = Self::open_with(flags)?;
        magic.load_database_file(database_file)?;
        Ok(magic)
    }

    /// Open with the configured flags, apply its parameters, then load its
    /// database.
    pub fn from_config(config: &MagicConfig) -> Result<Self> {
        let mut magic = Self::open_with(config.flags.clone())?;
        magic.set_parameters(&config.parameters)?;
        magic.load_database_file(&config.database_file)?;
        Ok(magic)
    }

    /// Version of the linked engine, e.g. `"5.45"`.  Needs no handle.
    pub fn version() -> String {
        crate::render::version()
    }

    /// Move the handle out, leaving `self` closed.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    // ── State ───────────────────────────────────────────────────────────────

    pub fn is_open(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn is_database_loaded(&self) -> bool {
        self.database_loaded
    }

    /// Open and a database is loaded.
    pub fn is_valid(&self) -> bool {
        self.is_open() && self.database_loaded
    }

    fn cookie(&self) -> Result<&Cookie> {
        self.cookie.as_ref().ok_or(MagicError::HandleNotOpen)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Open a fresh cookie with `flags`, closing any current one first.
    /// On failure the handle stays closed.
    pub fn open<F: Into<FlagSet>>(&mut self, flags: F) -> Result<()> {
        let flags = flags.into();
        self.close();
        let cookie = Cookie::open(flags.to_native()).map_err(|e| {
            warn!(%flags, error = %e, "magic_open failed");
            MagicError::OpenFailed { flags: flags.clone(), message: e.to_string() }
        })?;
        debug!(%flags, "magic handle opened");
        self.cookie = Some(cookie);
        self.flags = flags;
        Ok(())
    }

    /// Release the cookie.  No-op when already closed.
    pub fn close(&mut self) {
        if self.cookie.take().is_some() {
            debug!("magic handle closed");
        }
        self.flags = FlagSet::new();
        self.database_loaded = false;
    }

    // ── Database ────────────────────────────────────────────────────────────

    /// Load a compiled or source database.  The path must name a regular
    /// file.  A failed load leaves no database loaded.
    pub fn load_database_file<P: AsRef<Path>>(&mut self, database_file: P) -> Result<()> {
        let path = database_file.as_ref();
        let cookie = self.cookie.as_ref().ok_or(MagicError::HandleNotOpen)?;
        require_regular_file(path)?;
        let c_path = to_c_path(path)?;

        self.database_loaded = false;
        if unsafe { ffi::magic_load(cookie.as_ptr(), c_path.as_ptr()) } == ffi::MAGIC_FAILURE {
            let message = cookie.last_error();
            warn!(path = %path.display(), %message, "magic_load failed");
            return Err(MagicError::LoadDatabaseFailed { path: path.to_owned(), message });
        }
        debug!(path = %path.display(), "magic database loaded");
        self.database_loaded = true;
        Ok(())
    }

    /// Load [`DEFAULT_DATABASE_FILE`].
    pub fn load_default_database(&mut self) -> Result<()> {
        self.load_database_file(DEFAULT_DATABASE_FILE)
    }

    /// Compile a source database into `<basename>.mgc` in the current
    /// working directory.
    pub fn try_compile<P: AsRef<Path>>(&self, database_file: P) -> Result<()> {
        let path = database_file.as_ref();
        self.run_database_tool(path, ffi::magic_compile, |path, message| {
            MagicError::CompileFailed { path, message }
        })
    }

    /// `true` when [`Magic::try_compile`] succeeds.  A closed handle, a bad
    /// path and an invalid database all yield `false`.
    pub fn compile<P: AsRef<Path>>(&self, database_file: P) -> bool {
        self.try_compile(database_file).is_ok()
    }

    /// Validate a source database without loading it.
    pub fn try_check<P: AsRef<Path>>(&self, database_file: P) -> Result<()> {
        let path = database_file.as_ref();
        self.run_database_tool(path, ffi::magic_check, |path, message| {
            MagicError::CheckFailed { path, message }
        })
    }

    /// `true` when [`Magic::try_check`] succeeds.
    pub fn check<P: AsRef<Path>>(&self, database_file: P) -> bool {
        self.try_check(database_file).is_ok()
    }

    /// Compile [`DEFAULT_DATABASE_SOURCE`] into `magic.mgc` in the current
    /// working directory.
    pub fn try_compile_default(&self) -> Result<()> {
        self.try_compile(DEFAULT_DATABASE_SOURCE)
    }

    pub fn compile_default(&self) -> bool {
        self.try_compile_default().is_ok()
    }

    /// Validate [`DEFAULT_DATABASE_SOURCE`].
    pub fn try_check_default(&self) -> Result<()> {
        self.try_check(DEFAULT_DATABASE_SOURCE)
    }

    pub fn check_default(&self) -> bool {
        self.try_check_default().is_ok()
    }

    fn run_database_tool(
        &self,
        path: &Path,
        tool: unsafe extern "C" fn(ffi::magic_t, *const c_char) -> i32,
        failed: impl FnOnce(PathBuf, String) -> MagicError,
    ) -> Result<()> {
        let cookie = self.cookie()?;
        require_existing(path)?;
        let c_path = to_c_path(path)?;
        if unsafe { tool(cookie.as_ptr(), c_path.as_ptr()) } == ffi::MAGIC_FAILURE {
            let message = cookie.last_error();
            warn!(path = %path.display(), %message, "database validation failed");
            return Err(failed(path.to_owned(), message));
        }
        Ok(())
    }

    // ── Flags ───────────────────────────────────────────────────────────────

    /// The flags currently applied, in canonical form (`{none}` when empty).
    pub fn get_flags(&self) -> Result<FlagSet> {
        self.cookie()?;
        Ok(self.flags.normalized())
    }

    /// Replace the whole flag set.
    pub fn set_flags<F: Into<FlagSet>>(&mut self, flags: F) -> Result<()> {
        let flags = flags.into();
        let cookie = self.cookie()?;
        if unsafe { ffi::magic_setflags(cookie.as_ptr(), flags.to_native()) } == ffi::MAGIC_FAILURE {
            let message = cookie.last_error();
            warn!(%flags, %message, "magic_setflags failed");
            return Err(MagicError::SetFlagsFailed { flags, message });
        }
        debug!(%flags, "magic flags replaced");
        self.flags = flags;
        Ok(())
    }

    // ── Parameters ──────────────────────────────────────────────────────────

    pub fn get_parameter(&self, parameter: Parameter) -> Result<usize> {
        let cookie = self.cookie()?;
        let mut value: usize = 0;
        let rc = unsafe {
            ffi::magic_getparam(
                cookie.as_ptr(),
                parameter.native(),
                &mut value as *mut usize as *mut c_void,
            )
        };
        if rc == ffi::MAGIC_FAILURE {
            let message = cookie.last_error();
            return Err(MagicError::GetParameterFailed { parameter, message });
        }
        Ok(value)
    }

    pub fn set_parameter(&mut self, parameter: Parameter, value: usize) -> Result<()> {
        let cookie = self.cookie()?;
        let rc = unsafe {
            ffi::magic_setparam(
                cookie.as_ptr(),
                parameter.native(),
                &value as *const usize as *const c_void,
            )
        };
        if rc == ffi::MAGIC_FAILURE {
            let message = cookie.last_error();
            warn!(%parameter, value, %message, "magic_setparam failed");
            return Err(MagicError::SetParameterFailed { parameter, value, message });
        }
        Ok(())
    }

    /// Apply every entry in order, stopping at the first failure.
    pub fn set_parameters(&mut self, parameters: &ParameterMap) -> Result<()> {
        self.cookie()?;
        for (parameter, value) in parameters.iter() {
            self.set_parameter(parameter, value)?;
        }
        Ok(())
    }

    /// Snapshot of every parameter, queried in declaration order.  Either
    /// every value is read or an error is returned.
    pub fn get_parameters(&self) -> Result<ParameterMap> {
        self.cookie()?;
        Parameter::ALL
            .iter()
            .map(|&parameter| Ok((parameter, self.get_parameter(parameter)?)))
            .collect()
    }

    // ── Identification ──────────────────────────────────────────────────────

    /// Identify one regular file.  The returned text is the engine's output
    /// unchanged, except that invalid UTF-8 (possible with [`Flag::Raw`]) is
    /// replaced with U+FFFD.
    ///
    /// [`Flag::Raw`]: crate::flags::Flag::Raw
    pub fn identify_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        let cookie = self.cookie()?;
        require_regular_file(path)?;
        if !self.database_loaded {
            return Err(MagicError::DatabaseNotLoaded);
        }
        let c_path = to_c_path(path)?;
        let description = unsafe { ffi::magic_file(cookie.as_ptr(), c_path.as_ptr()) };
        if description.is_null() {
            let message = cookie.last_error();
            warn!(path = %path.display(), %message, "magic_file failed");
            return Err(MagicError::IdentifyFailed { path: path.to_owned(), message });
        }
        Ok(engine_text(unsafe { CStr::from_ptr(description) }))
    }

    /// Identify every path, failing on the first error.
    ///
    /// A closed handle fails before `tracker` is touched.  Otherwise the
    /// tracker is reset to the number of paths, advanced per file and marked
    /// complete however the batch ends.
    pub fn identify_files<I, P>(&self, paths: I, tracker: Option<&ProgressTracker>) -> Result<TypesOfFiles>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.cookie()?;
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_owned()).collect();
        self.identify_batch(paths, tracker)
    }

    /// Identify every path, recording each outcome.  A closed handle yields
    /// an empty map.  `tracker` is always marked complete on return.
    pub fn identify_files_each<I, P>(&self, paths: I, tracker: Option<&ProgressTracker>) -> IdentifyResults
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_owned()).collect();
        self.identify_batch_each(paths, Vec::new(), tracker)
    }

    /// Recursively identify every regular file under `directory`, failing on
    /// the first error.
    pub fn identify_directory<P: AsRef<Path>>(
        &self,
        directory: P,
        follow_symlinks: bool,
        tracker: Option<&ProgressTracker>,
    ) -> Result<TypesOfFiles> {
        let directory = directory.as_ref();
        self.cookie()?;
        require_directory(directory)?;
        let paths = walk_files(directory, follow_symlinks).into_iter().collect::<Result<Vec<_>>>()?;
        self.identify_batch(paths, tracker)
    }

    /// Recursively identify every regular file under `directory`, recording
    /// each outcome.  Walk failures are recorded against the offending path;
    /// an unusable `directory` is recorded against itself.
    pub fn identify_directory_each<P: AsRef<Path>>(
        &self,
        directory: P,
        follow_symlinks: bool,
        tracker: Option<&ProgressTracker>,
    ) -> IdentifyResults {
        let directory = directory.as_ref();
        let _guard = CompletionGuard(tracker);
        if !self.is_open() {
            return IdentifyResults::new();
        }
        if let Err(err) = require_directory(directory) {
            return IdentifyResults::from([(directory.to_owned(), Err(err))]);
        }
        let mut paths = Vec::new();
        let mut failures = Vec::new();
        for entry in walk_files(directory, follow_symlinks) {
            match entry {
                Ok(path) => paths.push(path),
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| directory.to_owned());
                    failures.push((path, err));
                }
            }
        }
        self.identify_batch_each(paths, failures, tracker)
    }

    fn identify_batch(&self, paths: Vec<PathBuf>, tracker: Option<&ProgressTracker>) -> Result<TypesOfFiles> {
        if let Some(tracker) = tracker {
            tracker.reset(paths.len() as u64);
        }
        let _guard = CompletionGuard(tracker);
        let mut types = TypesOfFiles::new();
        for path in paths {
            let file_type = self.identify_file(&path)?;
            types.insert(path, file_type);
            if let Some(tracker) = tracker {
                tracker.advance(1);
            }
        }
        Ok(types)
    }

    fn identify_batch_each(
        &self,
        paths: Vec<PathBuf>,
        failures: Vec<(PathBuf, MagicError)>,
        tracker: Option<&ProgressTracker>,
    ) -> IdentifyResults {
        let _guard = CompletionGuard(tracker);
        if !self.is_open() {
            return IdentifyResults::new();
        }
        if let Some(tracker) = tracker {
            tracker.reset(paths.len() as u64);
        }
        let mut results: IdentifyResults = failures.into_iter().map(|(p, e)| (p, Err(e))).collect();
        for path in paths {
            let result = self.identify_file(&path);
            results.insert(path, result);
            if let Some(tracker) = tracker {
                tracker.advance(1);
            }
        }
        results
    }
}

/// Regular files below `root` in file-name order; the root itself and
/// non-file entries are skipped.
fn walk_files(root: &Path, follow_symlinks: bool) -> Vec<Result<PathBuf>> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_owned());
                let message = err.to_string();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
                Some(Err(MagicError::Filesystem { path, source }))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    #[test]
    fn new_handle_is_closed() {
        let magic = Magic::new();
        assert!(!magic.is_open());
        assert!(!magic.is_valid());
        assert!(matches!(magic.get_flags(), Err(MagicError::HandleNotOpen)));
        assert!(matches!(magic.get_parameters(), Err(MagicError::HandleNotOpen)));
    }

    #[test]
    fn closed_handle_checks_state_before_path() {
        let mut magic = Magic::new();
        assert!(matches!(magic.identify_file(""), Err(MagicError::HandleNotOpen)));
        assert!(matches!(magic.load_database_file(""), Err(MagicError::HandleNotOpen)));
        assert!(matches!(magic.try_compile(""), Err(MagicError::HandleNotOpen)));
    }

    #[test]
    fn take_leaves_source_closed() {
        let mut magic = Magic::open_with(Flag::Mime).unwrap();
        let moved = magic.take();
        assert!(moved.is_open());
        assert!(!magic.is_open());
        assert_eq!(moved.get_flags().unwrap(), FlagSet::from(Flag::Mime));
    }

    #[test]
    fn close_resets_state() {
        let mut magic = Magic::open_with(Flag::Debug | Flag::Raw).unwrap();
        magic.close();
        magic.close();
        assert!(!magic.is_open());
        assert!(!magic.is_database_loaded());
        assert!(format!("{magic:?}").contains("open: false"));
    }

    #[test]
    fn path_checks_classify_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(require_regular_file(Path::new("")), Err(MagicError::EmptyPath)));
        assert!(matches!(
            require_regular_file(dir.path()),
            Err(MagicError::PathIsNotRegularFile { .. })
        ));
        assert!(matches!(
            require_directory(&dir.path().join("missing")),
            Err(MagicError::PathDoesNotExist { .. })
        ));
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        assert!(matches!(require_directory(&file), Err(MagicError::PathIsNotDirectory { .. })));
        assert!(require_existing(&file).is_ok());
    }

    #[test]
    fn engine_text_replaces_invalid_utf8() {
        let raw = CStr::from_bytes_with_nul(b"caf\xe9 data\0").unwrap();
        assert_eq!(engine_text(raw), "caf\u{FFFD} data");
        let plain = CStr::from_bytes_with_nul(b"text/plain\0").unwrap();
        assert_eq!(engine_text(plain), "text/plain");
    }

    #[test]
    fn closed_handle_default_database_tools_fail() {
        let magic = Magic::new();
        assert!(!magic.compile_default());
        assert!(!magic.check_default());
        assert!(matches!(magic.try_compile_default(), Err(MagicError::HandleNotOpen)));
    }

    #[test]
    fn walk_skips_directories_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("sub").join("a.txt"), "a").unwrap();
        let files: Vec<PathBuf> = walk_files(dir.path(), true).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(files, vec![dir.path().join("b.txt"), dir.path().join("sub").join("a.txt")]);
    }
}
