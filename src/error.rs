//! Failure taxonomy for every handle operation.
//!
//! Three families, kept distinguishable:
//! - programming errors: [`MagicError::HandleNotOpen`], [`MagicError::DatabaseNotLoaded`];
//! - input errors: the path variants and [`MagicError::Filesystem`];
//! - engine errors: the `*Failed` variants, each carrying the engine's own
//!   diagnostic text.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::flags::FlagSet;
use crate::parameter::Parameter;

pub type Result<T> = std::result::Result<T, MagicError>;

#[derive(Error, Debug)]
pub enum MagicError {
    #[error("magic is closed")]
    HandleNotOpen,

    #[error("magic database is not loaded")]
    DatabaseNotLoaded,

    #[error("path is empty")]
    EmptyPath,

    #[error("'{}' does not exist", .path.display())]
    PathDoesNotExist { path: PathBuf },

    #[error("'{}' is not a regular file", .path.display())]
    PathIsNotRegularFile { path: PathBuf },

    #[error("'{}' is not a directory", .path.display())]
    PathIsNotDirectory { path: PathBuf },

    #[error("filesystem error on '{}': {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("magic_open({flags}) failed{}", detail(.message))]
    OpenFailed { flags: FlagSet, message: String },

    #[error("magic_load({}) failed{}", .path.display(), detail(.message))]
    LoadDatabaseFailed { path: PathBuf, message: String },

    #[error("magic_compile({}) failed{}", .path.display(), detail(.message))]
    CompileFailed { path: PathBuf, message: String },

    #[error("magic_check({}) failed{}", .path.display(), detail(.message))]
    CheckFailed { path: PathBuf, message: String },

    #[error("magic_file({}) failed{}", .path.display(), detail(.message))]
    IdentifyFailed { path: PathBuf, message: String },

    #[error("magic_setflags({flags}) failed{}", detail(.message))]
    SetFlagsFailed { flags: FlagSet, message: String },

    #[error("magic_setparam({parameter}, {value}) failed{}", detail(.message))]
    SetParameterFailed {
        parameter: Parameter,
        value: usize,
        message: String,
    },

    #[error("magic_getparam({parameter}) failed{}", detail(.message))]
    GetParameterFailed { parameter: Parameter, message: String },
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" with {message}")
    }
}

impl MagicError {
    /// The path the failure is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            MagicError::PathDoesNotExist { path }
            | MagicError::PathIsNotRegularFile { path }
            | MagicError::PathIsNotDirectory { path }
            | MagicError::Filesystem { path, .. }
            | MagicError::LoadDatabaseFailed { path, .. }
            | MagicError::CompileFailed { path, .. }
            | MagicError::CheckFailed { path, .. }
            | MagicError::IdentifyFailed { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The engine's diagnostic, for engine failures.
    pub fn native_message(&self) -> Option<&str> {
        match self {
            MagicError::OpenFailed { message, .. }
            | MagicError::LoadDatabaseFailed { message, .. }
            | MagicError::CompileFailed { message, .. }
            | MagicError::CheckFailed { message, .. }
            | MagicError::IdentifyFailed { message, .. }
            | MagicError::SetFlagsFailed { message, .. }
            | MagicError::SetParameterFailed { message, .. }
            | MagicError::GetParameterFailed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// True for misuse of the handle rather than bad input or engine failure.
    pub fn is_state_error(&self) -> bool {
        matches!(self, MagicError::HandleNotOpen | MagicError::DatabaseNotLoaded)
    }

    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            MagicError::EmptyPath
                | MagicError::PathDoesNotExist { .. }
                | MagicError::PathIsNotRegularFile { .. }
                | MagicError::PathIsNotDirectory { .. }
                | MagicError::Filesystem { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    #[test]
    fn messages_name_the_operation() {
        let err = MagicError::LoadDatabaseFailed {
            path: PathBuf::from("/tmp/x.mgc"),
            message: "bad magic".into(),
        };
        assert_eq!(err.to_string(), "magic_load(/tmp/x.mgc) failed with bad magic");
        assert_eq!(err.native_message(), Some("bad magic"));
        assert_eq!(err.path(), Some(Path::new("/tmp/x.mgc")));
    }

    #[test]
    fn empty_native_message_is_omitted() {
        let err = MagicError::SetFlagsFailed {
            flags: Flag::Debug | Flag::Raw,
            message: String::new(),
        };
        assert_eq!(err.to_string(), "magic_setflags(debug, raw) failed");

        let err = MagicError::SetParameterFailed {
            parameter: Parameter::IndirMax,
            value: 70000,
            message: "Value too large for defined data type".into(),
        };
        assert_eq!(
            err.to_string(),
            "magic_setparam(indir_max, 70000) failed with Value too large for defined data type"
        );
    }

    #[test]
    fn families_are_distinguishable() {
        assert!(MagicError::HandleNotOpen.is_state_error());
        assert!(!MagicError::HandleNotOpen.is_path_error());
        assert!(MagicError::EmptyPath.is_path_error());
        let native = MagicError::IdentifyFailed {
            path: PathBuf::from("f"),
            message: "boom".into(),
        };
        assert!(!native.is_state_error() && !native.is_path_error());
        assert_eq!(
            MagicError::PathIsNotDirectory { path: PathBuf::from("a.txt") }.to_string(),
            "'a.txt' is not a directory"
        );
    }
}
