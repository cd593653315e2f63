//! Core distribution packages as zip files on disk.
//!
//! Layout matches what a directory package source expects:
//! `{dir}/{version}.zip`, entries relative to the installation root.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CORRUPT_MARKER: &[u8] = b"corrupt-this-entry";

/// Writes `{dir}/{version}.zip` containing `files` (relative path, bytes).
///
/// # Panics
/// Panics if the archive cannot be written.
pub fn write_package(dir: &Path, version: &str, files: &[(&str, &[u8])]) -> PathBuf {
    fs::create_dir_all(dir)
        .unwrap_or_else(|e| panic!("write_package: failed to create {}: {e}", dir.display()));
    let path = dir.join(format!("{version}.zip"));
    let file = File::create(&path)
        .unwrap_or_else(|e| panic!("write_package: failed to create {}: {e}", path.display()));

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in files {
        zip.start_file(*name, options)
            .unwrap_or_else(|e| panic!("write_package: failed to add {name}: {e}"));
        zip.write_all(bytes).unwrap();
    }
    zip.finish()
        .unwrap_or_else(|e| panic!("write_package: failed to finish archive: {e}"));
    path
}

/// Writes `{dir}/{version}.zip` whose first entry is intact and whose second
/// entry fails its checksum, so extraction fails partway through.
///
/// # Panics
/// Panics if the file cannot be written.
pub fn write_corrupt_package(dir: &Path, version: &str) -> PathBuf {
    let path = write_package(
        dir,
        version,
        &[
            ("web.config", b"<configuration />"),
            ("bin/Rock.dll", CORRUPT_MARKER),
        ],
    );
    let mut bytes = fs::read(&path).unwrap();
    let at = bytes
        .windows(CORRUPT_MARKER.len())
        .position(|w| w == CORRUPT_MARKER)
        .unwrap_or_else(|| panic!("write_corrupt_package: marker not found"));
    bytes[at] ^= 0xff;
    fs::write(&path, bytes).unwrap();
    path
}

/// The two package versions used across core installer tests.
///
/// `1.16.3` and `1.17.0` share `web.config` and `bin/Rock.dll` but differ
/// in their remaining files.
pub fn write_standard_packages(dir: &Path) {
    write_package(
        dir,
        "1.16.3",
        &[
            ("web.config", b"<configuration version=\"1.16.3\" />"),
            ("bin/Rock.dll", b"rock 1.16.3"),
            ("bin/Legacy.dll", b"legacy"),
        ],
    );
    write_package(
        dir,
        "1.17.0",
        &[
            ("web.config", b"<configuration version=\"1.17.0\" />"),
            ("bin/Rock.dll", b"rock 1.17.0"),
            ("bin/Rock.Blocks.dll", b"blocks"),
        ],
    );
}
