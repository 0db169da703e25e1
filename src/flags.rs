//! Behavior flags and the [`FlagSet`] value type.
//!
//! # Mask layout
//! A `FlagSet` mask gives every [`Flag`] exactly one bit: the i-th declared
//! flag after `None` owns bit `i - 1`.  `None` owns no bit and stands for
//! the empty mask.  This layout is independent of the engine's own flag
//! values, several of which are composites (`mime` is `mime_type |
//! mime_encoding` natively).  [`FlagSet::to_native`] performs the
//! translation when a set is handed to the engine.
//!
//! # Ordering
//! Sets iterate and render in ascending bit order, so `None` always comes
//! first when present.

use std::collections::BTreeSet;
use std::ffi::c_int;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ffi;

/// Number of flags that own a bit in the mask (everything except `None`).
pub const FLAG_BIT_COUNT: u32 = 30;

/// Every mask bit that belongs to a known flag.
pub const KNOWN_FLAGS_MASK: u64 = (1u64 << FLAG_BIT_COUNT) - 1;

/// One independent behavior switch of the recognition engine.
///
/// Declaration order is bit order; the derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// No special handling.
    None,
    /// Print debugging messages to stderr.
    Debug,
    /// Follow symlinks.
    Symlink,
    /// Look inside compressed files.
    Compress,
    /// Open block or character devices and look at their contents.
    Devices,
    /// Report a MIME type instead of a textual description.
    MimeType,
    /// Report all matches, not just the first.
    ContinueSearch,
    /// Check the database for consistency and print warnings to stderr.
    CheckDatabase,
    /// Try to preserve the access time of analysed files.
    PreserveAtime,
    /// Don't translate unprintable characters to `\ooo`.
    Raw,
    /// Treat OS errors while opening files as real errors.
    Error,
    /// Report a MIME encoding instead of a textual description.
    MimeEncoding,
    /// Shorthand for `mime_type | mime_encoding`.
    Mime,
    /// Report the Apple creator and type.
    Apple,
    /// Report a slash separated list of extensions.
    Extension,
    /// Report only on the uncompressed data.
    CompressTransp,
    /// Don't allow decompressors that fork.
    NoCompressFork,
    /// Shorthand for `extension | mime | apple`.
    Nodesc,
    NoCheckCompress,
    NoCheckTar,
    /// Don't consult the database.
    NoCheckSoft,
    NoCheckApptype,
    NoCheckElf,
    NoCheckText,
    NoCheckCdf,
    NoCheckCsv,
    NoCheckTokens,
    NoCheckEncoding,
    NoCheckJson,
    NoCheckSimh,
    /// Only consult the database; no built-in tests.
    NoCheckBuiltin,
}

impl Flag {
    /// Every flag, in ascending bit order.
    pub const ALL: [Flag; 31] = [
        Flag::None,
        Flag::Debug,
        Flag::Symlink,
        Flag::Compress,
        Flag::Devices,
        Flag::MimeType,
        Flag::ContinueSearch,
        Flag::CheckDatabase,
        Flag::PreserveAtime,
        Flag::Raw,
        Flag::Error,
        Flag::MimeEncoding,
        Flag::Mime,
        Flag::Apple,
        Flag::Extension,
        Flag::CompressTransp,
        Flag::NoCompressFork,
        Flag::Nodesc,
        Flag::NoCheckCompress,
        Flag::NoCheckTar,
        Flag::NoCheckSoft,
        Flag::NoCheckApptype,
        Flag::NoCheckElf,
        Flag::NoCheckText,
        Flag::NoCheckCdf,
        Flag::NoCheckCsv,
        Flag::NoCheckTokens,
        Flag::NoCheckEncoding,
        Flag::NoCheckJson,
        Flag::NoCheckSimh,
        Flag::NoCheckBuiltin,
    ];

    /// The single mask bit owned by this flag; `0` for `None`.
    #[inline]
    pub fn bit(self) -> u64 {
        match self {
            Flag::None => 0,
            other      => 1u64 << (other as u32 - 1),
        }
    }

    /// The flag owning mask bit `index`, if any.
    pub fn from_bit_index(index: u32) -> Option<Self> {
        if index < FLAG_BIT_COUNT {
            Some(Self::ALL[index as usize + 1])
        } else {
            None
        }
    }

    /// The engine's own value for this flag.
    pub fn native(self) -> c_int {
        match self {
            Flag::None            => ffi::MAGIC_NONE,
            Flag::Debug           => ffi::MAGIC_DEBUG,
            Flag::Symlink         => ffi::MAGIC_SYMLINK,
            Flag::Compress        => ffi::MAGIC_COMPRESS,
            Flag::Devices         => ffi::MAGIC_DEVICES,
            Flag::MimeType        => ffi::MAGIC_MIME_TYPE,
            Flag::ContinueSearch  => ffi::MAGIC_CONTINUE,
            Flag::CheckDatabase   => ffi::MAGIC_CHECK,
            Flag::PreserveAtime   => ffi::MAGIC_PRESERVE_ATIME,
            Flag::Raw             => ffi::MAGIC_RAW,
            Flag::Error           => ffi::MAGIC_ERROR,
            Flag::MimeEncoding    => ffi::MAGIC_MIME_ENCODING,
            Flag::Mime            => ffi::MAGIC_MIME,
            Flag::Apple           => ffi::MAGIC_APPLE,
            Flag::Extension       => ffi::MAGIC_EXTENSION,
            Flag::CompressTransp  => ffi::MAGIC_COMPRESS_TRANSP,
            Flag::NoCompressFork  => ffi::MAGIC_NO_COMPRESS_FORK,
            Flag::Nodesc          => ffi::MAGIC_NODESC,
            Flag::NoCheckCompress => ffi::MAGIC_NO_CHECK_COMPRESS,
            Flag::NoCheckTar      => ffi::MAGIC_NO_CHECK_TAR,
            Flag::NoCheckSoft     => ffi::MAGIC_NO_CHECK_SOFT,
            Flag::NoCheckApptype  => ffi::MAGIC_NO_CHECK_APPTYPE,
            Flag::NoCheckElf      => ffi::MAGIC_NO_CHECK_ELF,
            Flag::NoCheckText     => ffi::MAGIC_NO_CHECK_TEXT,
            Flag::NoCheckCdf      => ffi::MAGIC_NO_CHECK_CDF,
            Flag::NoCheckCsv      => ffi::MAGIC_NO_CHECK_CSV,
            Flag::NoCheckTokens   => ffi::MAGIC_NO_CHECK_TOKENS,
            Flag::NoCheckEncoding => ffi::MAGIC_NO_CHECK_ENCODING,
            Flag::NoCheckJson     => ffi::MAGIC_NO_CHECK_JSON,
            Flag::NoCheckSimh     => ffi::MAGIC_NO_CHECK_SIMH,
            Flag::NoCheckBuiltin  => ffi::MAGIC_NO_CHECK_BUILTIN,
        }
    }

    /// Canonical name, used by `Display`, `FromStr` and serde.
    pub fn name(self) -> &'static str {
        match self {
            Flag::None            => "none",
            Flag::Debug           => "debug",
            Flag::Symlink         => "symlink",
            Flag::Compress        => "compress",
            Flag::Devices         => "devices",
            Flag::MimeType        => "mime_type",
            Flag::ContinueSearch  => "continue_search",
            Flag::CheckDatabase   => "check_database",
            Flag::PreserveAtime   => "preserve_atime",
            Flag::Raw             => "raw",
            Flag::Error           => "error",
            Flag::MimeEncoding    => "mime_encoding",
            Flag::Mime            => "mime",
            Flag::Apple           => "apple",
            Flag::Extension       => "extension",
            Flag::CompressTransp  => "compress_transp",
            Flag::NoCompressFork  => "no_compress_fork",
            Flag::Nodesc          => "nodesc",
            Flag::NoCheckCompress => "no_check_compress",
            Flag::NoCheckTar      => "no_check_tar",
            Flag::NoCheckSoft     => "no_check_soft",
            Flag::NoCheckApptype  => "no_check_apptype",
            Flag::NoCheckElf      => "no_check_elf",
            Flag::NoCheckText     => "no_check_text",
            Flag::NoCheckCdf      => "no_check_cdf",
            Flag::NoCheckCsv      => "no_check_csv",
            Flag::NoCheckTokens   => "no_check_tokens",
            Flag::NoCheckEncoding => "no_check_encoding",
            Flag::NoCheckJson     => "no_check_json",
            Flag::NoCheckSimh     => "no_check_simh",
            Flag::NoCheckBuiltin  => "no_check_builtin",
        }
    }

    /// Parse a canonical name (case-insensitive, surrounding blanks ignored).
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|f| f.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown flag '{0}'")]
pub struct UnknownFlag(pub String);

impl FromStr for Flag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flag::from_name(s).ok_or_else(|| UnknownFlag(s.trim().to_owned()))
    }
}

// ── FlagSet ─────────────────────────────────────────────────────────────────

/// An ordered set of [`Flag`]s.  Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeSet<Flag>);

impl FlagSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Decompose a mask into its flags.  Bits that belong to no flag are
    /// discarded; a mask with no known bit yields `{None}`.
    pub fn from_mask(mask: u64) -> Self {
        let mask = mask & KNOWN_FLAGS_MASK;
        if mask == 0 {
            return Self::from(Flag::None);
        }
        (0..FLAG_BIT_COUNT)
            .filter(|i| mask & (1u64 << i) != 0)
            .filter_map(Flag::from_bit_index)
            .collect()
    }

    /// OR of every member's bit.
    pub fn to_mask(&self) -> u64 {
        self.0.iter().fold(0, |mask, flag| mask | flag.bit())
    }

    /// OR of every member's engine value.
    pub fn to_native(&self) -> c_int {
        self.0.iter().fold(ffi::MAGIC_NONE, |native, flag| native | flag.native())
    }

    /// The canonical form of this set: `from_mask(to_mask())`.
    pub fn normalized(&self) -> Self {
        Self::from_mask(self.to_mask())
    }

    pub fn insert(&mut self, flag: Flag) -> bool {
        self.0.insert(flag)
    }

    pub fn remove(&mut self, flag: Flag) -> bool {
        self.0.remove(&flag)
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }
}

impl From<Flag> for FlagSet {
    fn from(flag: Flag) -> Self {
        Self(BTreeSet::from([flag]))
    }
}

impl<const N: usize> From<[Flag; N]> for FlagSet {
    fn from(flags: [Flag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Flag> for FlagSet {
    fn extend<I: IntoIterator<Item = Flag>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for FlagSet {
    type Item = Flag;
    type IntoIter = std::collections::btree_set::IntoIter<Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlagSet {
    type Item = Flag;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, Flag>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl BitOr for Flag {
    type Output = FlagSet;

    fn bitor(self, rhs: Flag) -> FlagSet {
        FlagSet::from([self, rhs])
    }
}

impl BitOr<Flag> for FlagSet {
    type Output = FlagSet;

    fn bitor(mut self, rhs: Flag) -> FlagSet {
        self.insert(rhs);
        self
    }
}

impl BitOr for FlagSet {
    type Output = FlagSet;

    fn bitor(mut self, rhs: FlagSet) -> FlagSet {
        self.extend(rhs);
        self
    }
}

/// Comma-space separated canonical names, ascending bit order.
impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Flag::name).collect();
        f.write_str(&names.join(", "))
    }
}

/// Inverse of `Display`: comma separated names, blanks ignored.
impl FromStr for FlagSet {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Flag::from_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bits_are_disjoint_and_ascending() {
        let mut seen = 0u64;
        for (i, flag) in Flag::ALL.iter().enumerate().skip(1) {
            assert_eq!(flag.bit(), 1u64 << (i - 1));
            assert_eq!(seen & flag.bit(), 0, "{flag} overlaps another flag");
            seen |= flag.bit();
        }
        assert_eq!(seen, KNOWN_FLAGS_MASK);
        assert_eq!(Flag::None.bit(), 0);
    }

    #[test]
    fn zero_mask_is_none() {
        assert_eq!(FlagSet::from_mask(0), FlagSet::from(Flag::None));
        assert_eq!(FlagSet::from(Flag::None).to_mask(), 0);
    }

    #[test]
    fn unknown_bits_are_discarded() {
        let mask = Flag::Debug.bit() | (1u64 << 43) | (1u64 << 63);
        assert_eq!(FlagSet::from_mask(mask), FlagSet::from(Flag::Debug));
        assert_eq!(FlagSet::from_mask(1u64 << 40), FlagSet::from(Flag::None));
    }

    #[test]
    fn renders_in_bit_order() {
        let set = FlagSet::from([Flag::Mime, Flag::None, Flag::Debug]);
        assert_eq!(set.to_string(), "none, debug, mime");
        assert_eq!(FlagSet::new().to_string(), "");
    }

    #[test]
    fn parses_own_rendering() {
        let set = Flag::MimeType | Flag::Symlink | Flag::NoCheckJson;
        let parsed: FlagSet = set.to_string().parse().unwrap();
        assert_eq!(parsed, set);
        assert_eq!("MIME , raw".parse::<FlagSet>().unwrap(), Flag::Mime | Flag::Raw);
        assert_eq!(
            "mime, bogus".parse::<FlagSet>(),
            Err(UnknownFlag("bogus".to_string()))
        );
    }

    #[test]
    fn composite_flags_translate_to_native_composites() {
        assert_eq!(FlagSet::from(Flag::Mime).to_native(), ffi::MAGIC_MIME);
        assert_eq!(
            (Flag::MimeType | Flag::MimeEncoding).to_native(),
            ffi::MAGIC_MIME_TYPE | ffi::MAGIC_MIME_ENCODING
        );
        assert_eq!(FlagSet::from(Flag::None).to_native(), 0);
        assert_eq!(FlagSet::new().to_native(), 0);
    }

    #[test]
    fn normalized_drops_none_beside_real_flags() {
        let set = Flag::None | Flag::Debug;
        assert_eq!(set.to_mask(), Flag::Debug.bit());
        assert_eq!(set.normalized(), FlagSet::from(Flag::Debug));
    }

    #[test]
    fn every_name_round_trips() {
        for flag in Flag::ALL {
            assert_eq!(Flag::from_name(flag.name()), Some(flag));
            assert_eq!(flag.name().parse::<Flag>().unwrap(), flag);
        }
    }

    proptest! {
        #[test]
        fn mask_round_trip_is_idempotent(mask in any::<u64>()) {
            let once = FlagSet::from_mask(mask);
            prop_assert_eq!(FlagSet::from_mask(once.to_mask()), once.clone());
            prop_assert_eq!(once.to_mask(), mask & KNOWN_FLAGS_MASK);
        }

        #[test]
        fn known_masks_round_trip_exactly(mask in 1u64..=KNOWN_FLAGS_MASK) {
            prop_assert_eq!(FlagSet::from_mask(mask).to_mask(), mask);
        }

        #[test]
        fn rendering_is_ascending(mask in any::<u64>()) {
            let set = FlagSet::from_mask(mask);
            let rendered = set.to_string();
            let parsed: FlagSet = rendered.parse().unwrap();
            let order: Vec<Flag> = parsed.iter().collect();
            let mut sorted = order.clone();
            sorted.sort();
            prop_assert_eq!(order, sorted);
            prop_assert_eq!(parsed, set);
        }
    }
}
