// quicksetup/src/setup_manager/archive_utils.rs
use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::{debug, info, warn};
use zip::ZipArchive;

use crate::error::SetupError;

/// Extracts every entry of the zip at `archive_path` into `extract_to_dir`,
/// keeping the paths stored in the archive. Returns the number of files written.
///
/// Entries whose names would escape the destination are skipped.
pub fn extract_zip(archive_path: &Path, extract_to_dir: &Path) -> Result<usize, SetupError> {
    info!("Extracting {} to {}", archive_path.display(), extract_to_dir.display());

    let file = File::open(archive_path)
        .map_err(|e| SetupError::Archive(format!("Failed to open {}: {}", archive_path.display(), e)))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| SetupError::Archive(format!("Invalid zip file {}: {}", archive_path.display(), e)))?;

    fs::create_dir_all(extract_to_dir)?;

    let mut files_written = 0;
    for i in 0..archive.len() {
        let mut file_in_zip = archive
            .by_index(i)
            .map_err(|e| SetupError::Archive(format!("Failed to read entry {}: {}", i, e)))?;
        let outpath = match file_in_zip.enclosed_name() {
            Some(path) => extract_to_dir.join(path),
            None => {
                warn!("Skipping entry with invalid path in zip: {}", file_in_zip.name());
                continue;
            }
        };

        if file_in_zip.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut file_in_zip, &mut outfile)
                .map_err(|e| SetupError::Archive(format!("Failed to extract {}: {}", file_in_zip.name(), e)))?;
            files_written += 1;
            debug!("Extracted {}", outpath.display());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file_in_zip.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
        }
    }

    info!("Finished extracting {} files from {}", files_written, archive_path.display());
    Ok(files_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        let bytes = writer.finish().unwrap().into_inner();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bundle.zip");
        write_zip(
            &archive,
            &[
                ("AutoWSGR-examples-main/", b""),
                ("AutoWSGR-examples-main/README.md", b"# examples"),
                ("AutoWSGR-examples-main/plans/normal.yaml", b"chapter: 2"),
            ],
        );

        let count = extract_zip(&archive, dir.path()).unwrap();
        assert_eq!(count, 2);
        let root = dir.path().join("AutoWSGR-examples-main");
        assert_eq!(fs::read_to_string(root.join("README.md")).unwrap(), "# examples");
        assert_eq!(fs::read_to_string(root.join("plans/normal.yaml")).unwrap(), "chapter: 2");
    }

    #[test]
    fn corrupt_archive_is_an_archive_error() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        assert!(matches!(extract_zip(&archive, dir.path()), Err(SetupError::Archive(_))));
    }

    #[test]
    fn missing_archive_is_an_archive_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            extract_zip(&dir.path().join("nope.zip"), dir.path()),
            Err(SetupError::Archive(_))
        ));
    }
}
