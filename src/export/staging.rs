//! Temp-file-then-rename writes for export outputs.

use crate::error::{MalDumpError, Result};

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Opens a hidden temporary file in the destination's directory, so the final
/// rename never crosses filesystems.
pub fn open(destination: &Path) -> Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tempfile::Builder::new()
        .prefix(".maldump-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| MalDumpError::output_write(destination, e))
}

/// Mode of committed outputs; staged files start out private (0600).
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Flushes the staged file and moves it over `destination`.
///
/// On failure the temporary file is removed and `destination` is untouched.
pub fn commit(mut staged: NamedTempFile, destination: &Path) -> Result<()> {
    let fail = |e: std::io::Error| MalDumpError::output_write(destination, e);

    staged.flush().map_err(fail)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))
            .map_err(fail)?;
    }
    staged.as_file().sync_all().map_err(fail)?;
    staged
        .persist(destination)
        .map_err(|e| MalDumpError::output_write(destination, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_commit_moves_file_into_place() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out.bin");

        let mut staged = open(&destination).unwrap();
        staged.write_all(b"payload").unwrap();
        assert!(!destination.exists());

        commit(staged, &destination).unwrap();
        assert_eq!(fs::read(&destination).unwrap(), b"payload");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".maldump-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_committed_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out.bin");

        let staged = open(&destination).unwrap();
        assert_eq!(staged.as_file().metadata().unwrap().permissions().mode() & 0o777, 0o600);
        commit(staged, &destination).unwrap();

        let mode = fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out.bin");

        let staged = open(&destination).unwrap();
        drop(staged);

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("nope").join("out.bin");
        assert!(matches!(
            open(&destination),
            Err(MalDumpError::OutputWriteFailure { .. })
        ));
    }
}
