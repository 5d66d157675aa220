use std::path::PathBuf;

/// Directory holding the input files used by the unit tests
pub(crate) fn test_data_dir() -> PathBuf {
    let crate_root = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(crate_root).join("test-data")
}

/// A fresh, empty scratch directory under the system temporary directory.
///
/// `name` should be unique to the test, since tests run in parallel.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("um-atmos-{name}-{}", std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).expect("Removing an old scratch directory should not fail");
    }
    std::fs::create_dir_all(&dir).expect("Creating a scratch directory should not fail");
    dir
}
