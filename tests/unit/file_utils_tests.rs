/*!
 * Tests for file and folder utilities
 */

use podwright::file_utils::FileManager;

use crate::common;

#[test]
fn test_ensureDir_existingDirectory_shouldSucceed() {
    let dir = common::create_temp_dir().unwrap();
    assert!(FileManager::ensure_dir(dir.path()).is_ok());
    assert!(FileManager::dir_exists(dir.path()));
}

#[test]
fn test_fileExists_shouldDistinguishFilesFromDirs() {
    let dir = common::create_temp_dir().unwrap();
    let file = common::create_test_file(dir.path(), "a.txt", "x").unwrap();
    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::file_exists(dir.path()));
}

#[test]
fn test_latestFileIn_shouldPickNewestRunId() {
    let dir = common::create_temp_dir().unwrap();
    for name in [
        "20260829-101500_narration.mp3",
        "20260830-070000_narration.mp3",
        "20260829-233000_narration.mp3",
    ] {
        common::create_test_file(dir.path(), name, "x").unwrap();
    }

    let latest = FileManager::latest_file_in(dir.path(), "mp3").unwrap();
    assert_eq!(
        latest.file_name().unwrap(),
        "20260830-070000_narration.mp3"
    );
}
