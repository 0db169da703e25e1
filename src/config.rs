//! File-based configuration for opening a handle.
//!
//! ```toml
//! database_file = "/usr/share/misc/magic.mgc"
//! flags = ["mime_type", "symlink"]
//!
//! [parameters]
//! bytes_max = 1048576
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flags::{Flag, FlagSet};
use crate::parameter::ParameterMap;

/// Database used when no explicit path is given.  Set
/// `FILEMAGIC_DEFAULT_DATABASE` at build time to point elsewhere.
pub const DEFAULT_DATABASE_FILE: &str = match option_env!("FILEMAGIC_DEFAULT_DATABASE") {
    Some(path) => path,
    None       => "/usr/share/misc/magic.mgc",
};

/// Source database used by the default compile and check.  Set
/// `FILEMAGIC_DEFAULT_DATABASE_SOURCE` at build time to point elsewhere;
/// otherwise the source database shipped in this package's `data/` is used.
pub const DEFAULT_DATABASE_SOURCE: &str = match option_env!("FILEMAGIC_DEFAULT_DATABASE_SOURCE") {
    Some(path) => path,
    None       => concat!(env!("CARGO_MANIFEST_DIR"), "/data/magic"),
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Everything needed to bring a handle to the valid state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicConfig {
    pub database_file: PathBuf,
    pub flags:         FlagSet,
    /// Applied after opening, before the database is loaded.
    pub parameters:    ParameterMap,
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            flags:         FlagSet::from(Flag::Mime),
            parameters:    ParameterMap::new(),
        }
    }
}

impl MagicConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    #[test]
    fn empty_document_is_default() {
        let config = MagicConfig::from_toml_str("").unwrap();
        assert_eq!(config, MagicConfig::default());
        assert_eq!(config.database_file, Path::new(DEFAULT_DATABASE_FILE));
        assert_eq!(config.flags, FlagSet::from(Flag::Mime));
    }

    #[test]
    fn parses_flags_and_parameters() {
        let config = MagicConfig::from_toml_str(
            r#"
            database_file = "/opt/magic/custom.mgc"
            flags = ["symlink", "mime_type"]

            [parameters]
            bytes_max = 1048576
            indir_max = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.database_file, Path::new("/opt/magic/custom.mgc"));
        assert_eq!(config.flags, Flag::Symlink | Flag::MimeType);
        assert_eq!(config.parameters.get(Parameter::BytesMax), Some(1_048_576));
        assert_eq!(config.parameters.get(Parameter::IndirMax), Some(15));
        assert_eq!(config.parameters.len(), 2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            MagicConfig::from_toml_str(r#"flags = ["telepathy"]"#),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MagicConfig::from_toml_str("[parameters]\ndepth = 3"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = MagicConfig::default();
        config.flags = Flag::Debug | Flag::Compress;
        config.parameters.insert(Parameter::RegexMax, 4096);
        let text = config.to_toml_string().unwrap();
        assert_eq!(MagicConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn default_source_is_shipped() {
        assert!(Path::new(DEFAULT_DATABASE_SOURCE).is_file());
        assert_eq!(Path::new(DEFAULT_DATABASE_SOURCE).file_name().unwrap(), "magic");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = MagicConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
