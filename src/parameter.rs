//! Numeric tuning parameters of the engine and the [`ParameterMap`] snapshot.

use std::collections::BTreeMap;
use std::ffi::c_int;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ffi;

/// One engine tunable.  Declaration order is the fixed query order used by
/// [`crate::Magic::get_parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parameter {
    /// Recursion limit for indirection (engine default 50).
    IndirMax,
    /// Use limit for name/use magic (engine default 50).
    NameMax,
    /// Max ELF program sections processed (engine default 2048).
    ElfPhnumMax,
    /// Max ELF sections processed (engine default 32768).
    ElfShnumMax,
    /// Max ELF notes processed (engine default 256).
    ElfNotesMax,
    /// Length limit for regex searches (engine default 8192).
    RegexMax,
    /// Max bytes to look inside a file (engine default 7340032).
    BytesMax,
    /// Max bytes to scan for encoding detection (engine default 65536).
    EncodingMax,
    /// Max ELF section size (engine default 134217728).
    ElfShsizeMax,
    /// Max warnings tolerated in a database file (engine default 64).
    MagWarnMax,
}

impl Parameter {
    pub const ALL: [Parameter; 10] = [
        Parameter::IndirMax,
        Parameter::NameMax,
        Parameter::ElfPhnumMax,
        Parameter::ElfShnumMax,
        Parameter::ElfNotesMax,
        Parameter::RegexMax,
        Parameter::BytesMax,
        Parameter::EncodingMax,
        Parameter::ElfShsizeMax,
        Parameter::MagWarnMax,
    ];

    /// The engine's parameter id.
    pub fn native(self) -> c_int {
        match self {
            Parameter::IndirMax     => ffi::MAGIC_PARAM_INDIR_MAX,
            Parameter::NameMax      => ffi::MAGIC_PARAM_NAME_MAX,
            Parameter::ElfPhnumMax  => ffi::MAGIC_PARAM_ELF_PHNUM_MAX,
            Parameter::ElfShnumMax  => ffi::MAGIC_PARAM_ELF_SHNUM_MAX,
            Parameter::ElfNotesMax  => ffi::MAGIC_PARAM_ELF_NOTES_MAX,
            Parameter::RegexMax     => ffi::MAGIC_PARAM_REGEX_MAX,
            Parameter::BytesMax     => ffi::MAGIC_PARAM_BYTES_MAX,
            Parameter::EncodingMax  => ffi::MAGIC_PARAM_ENCODING_MAX,
            Parameter::ElfShsizeMax => ffi::MAGIC_PARAM_ELF_SHSIZE_MAX,
            Parameter::MagWarnMax   => ffi::MAGIC_PARAM_MAGWARN_MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::IndirMax     => "indir_max",
            Parameter::NameMax      => "name_max",
            Parameter::ElfPhnumMax  => "elf_phnum_max",
            Parameter::ElfShnumMax  => "elf_shnum_max",
            Parameter::ElfNotesMax  => "elf_notes_max",
            Parameter::RegexMax     => "regex_max",
            Parameter::BytesMax     => "bytes_max",
            Parameter::EncodingMax  => "encoding_max",
            Parameter::ElfShsizeMax => "elf_shsize_max",
            Parameter::MagWarnMax   => "mag_warn_max",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|p| p.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::from_name(s).ok_or_else(|| UnknownParameter(s.trim().to_owned()))
    }
}

impl Serialize for Parameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Parameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

// ── ParameterMap ────────────────────────────────────────────────────────────

/// Parameter → value snapshot.  Keys are unique and iterate in declaration
/// order.  A map read from a handle is a copy; it never tracks later changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap(BTreeMap<Parameter, usize>);

impl ParameterMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace; returns the previous value.
    pub fn insert(&mut self, parameter: Parameter, value: usize) -> Option<usize> {
        self.0.insert(parameter, value)
    }

    pub fn get(&self, parameter: Parameter) -> Option<usize> {
        self.0.get(&parameter).copied()
    }

    pub fn contains(&self, parameter: Parameter) -> bool {
        self.0.contains_key(&parameter)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, usize)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }
}

impl FromIterator<(Parameter, usize)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (Parameter, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(Parameter, usize); N]> for ParameterMap {
    fn from(entries: [(Parameter, usize); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for ParameterMap {
    type Item = (Parameter, usize);
    type IntoIter = std::collections::btree_map::IntoIter<Parameter, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// `name: value` pairs, comma-space separated.
impl fmt::Display for ParameterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .iter()
            .map(|(parameter, value)| format!("{parameter}: {value}"))
            .collect();
        f.write_str(&pairs.join(", "))
    }
}

// Name-keyed so the map survives formats that only allow string keys (TOML).
impl Serialize for ParameterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (parameter, value) in self.iter() {
            map.serialize_entry(parameter.name(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, usize>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, value)| {
                name.parse::<Parameter>()
                    .map(|parameter| (parameter, value))
                    .map_err(de::Error::custom)
            })
            .collect()
    }
}
