//! Compilation writes `<basename>.mgc` into the working directory.  This
//! binary moves its working directory into a temporary one, so it keeps a
//! single test to avoid racing on the process-wide current directory.

use filemagic::{Flag, Magic, MagicError, DEFAULT_DATABASE_FILE, DEFAULT_DATABASE_SOURCE};
use std::fs;
use tempfile::TempDir;

const CUSTOM_SOURCE: &str = "0\tstring\tFMAGICCUSTOM\tcustom test data\n!:mime\tapplication/x-custom-test\n";

#[test]
fn test_compile_in_working_directory() {
    let dir = TempDir::new().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    // ── Default source ───────────────────────────────────────────────────────
    assert!(!Magic::new().compile_default());
    assert!(matches!(Magic::new().try_compile_default(), Err(MagicError::HandleNotOpen)));

    let magic = Magic::open_with(Flag::Mime).unwrap();
    assert!(magic.compile_default());
    assert!(dir.path().join("magic.mgc").is_file());

    let bundled = Magic::with_database(Flag::MimeType, "magic.mgc").unwrap();
    let marked = dir.path().join("marked.bin");
    fs::write(&marked, "FMAGICTEST and then some").unwrap();
    assert_eq!(bundled.identify_file(&marked).unwrap(), "application/x-filemagic-test");
    let png = dir.path().join("image.png");
    fs::write(&png, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x10\0\0\0\x08\x08\x02\0\0\0").unwrap();
    assert_eq!(bundled.identify_file(&png).unwrap(), "image/png");

    // ── Custom source ────────────────────────────────────────────────────────
    let source = dir.path().join("custom");
    fs::write(&source, CUSTOM_SOURCE).unwrap();
    assert!(magic.check(&source));
    magic.try_compile(&source).unwrap();
    let custom = Magic::with_database(Flag::MimeType, "custom.mgc").unwrap();
    let sample = dir.path().join("sample.bin");
    fs::write(&sample, "FMAGICCUSTOM payload").unwrap();
    assert_eq!(custom.identify_file(&sample).unwrap(), "application/x-custom-test");

    // ── Compiled input is rejected ───────────────────────────────────────────
    let err = magic.try_compile(DEFAULT_DATABASE_FILE).unwrap_err();
    assert!(matches!(err, MagicError::CompileFailed { .. }), "{err:?}");
    assert!(!err.native_message().unwrap().is_empty());
    assert!(!magic.compile(DEFAULT_DATABASE_FILE));

    assert!(std::path::Path::new(DEFAULT_DATABASE_SOURCE).is_absolute());
}
