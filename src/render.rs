//! Text rendering of identification results and the engine version.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::MagicError;
use crate::ffi;

/// Path → identified type, ordered by path.
pub type TypesOfFiles = BTreeMap<PathBuf, String>;

/// Path → identified type or the reason identification failed.
pub type IdentifyResults = BTreeMap<PathBuf, Result<String, MagicError>>;

pub const DEFAULT_TYPE_SEPARATOR: &str = " -> ";
pub const DEFAULT_FILE_SEPARATOR: &str = "\n";

/// Render `path<type_separator>type` entries joined by `file_separator`.
pub fn types_to_string(types: &TypesOfFiles, type_separator: &str, file_separator: &str) -> String {
    types
        .iter()
        .map(|(path, file_type)| format!("{}{type_separator}{file_type}", path.display()))
        .collect::<Vec<_>>()
        .join(file_separator)
}

/// Like [`types_to_string`]; failures render their error message in place
/// of the type.
pub fn results_to_string(results: &IdentifyResults, type_separator: &str, file_separator: &str) -> String {
    results
        .iter()
        .map(|(path, result)| match result {
            Ok(file_type) => format!("{}{type_separator}{file_type}", path.display()),
            Err(err)      => format!("{}{type_separator}{err}", path.display()),
        })
        .collect::<Vec<_>>()
        .join(file_separator)
}

/// Version of the linked engine as `major.minor`, e.g. `"5.45"`.
pub fn version() -> String {
    format_version(unsafe { ffi::magic_version() })
}

fn format_version(raw: i32) -> String {
    format!("{}.{:02}", raw / 100, raw % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_keeps_two_digit_minor() {
        assert_eq!(format_version(545), "5.45");
        assert_eq!(format_version(502), "5.02");
    }

    #[test]
    fn types_render_in_path_order() {
        let types = TypesOfFiles::from([
            (PathBuf::from("path2"), "type2".to_string()),
            (PathBuf::from("path1"), "type1".to_string()),
        ]);
        assert_eq!(
            types_to_string(&types, DEFAULT_TYPE_SEPARATOR, DEFAULT_FILE_SEPARATOR),
            "path1 -> type1\npath2 -> type2"
        );
        assert_eq!(types_to_string(&types, ": ", ", "), "path1: type1, path2: type2");
        assert_eq!(types_to_string(&TypesOfFiles::new(), " -> ", "\n"), "");
    }

    #[test]
    fn failures_render_their_message() {
        let results = IdentifyResults::from([
            (PathBuf::from("path1"), Ok("type1".to_string())),
            (PathBuf::from("path2"), Err(MagicError::EmptyPath)),
        ]);
        assert_eq!(
            results_to_string(&results, DEFAULT_TYPE_SEPARATOR, DEFAULT_FILE_SEPARATOR),
            "path1 -> type1\npath2 -> path is empty"
        );
    }
}
