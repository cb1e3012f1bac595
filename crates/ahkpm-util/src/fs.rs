use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The file will either have the old contents or the new contents, never a
/// partial write.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = sibling_path(path, "tmp");

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists. Try copy + remove as fallback.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Recursively copy `src` into `dst`, skipping any entry for which `skip`
/// returns true. Skipped directories are not descended into.
///
/// `dst` and any missing parents are created. Existing files are overwritten.
///
/// # Errors
/// Returns an error if walking `src` or writing into `dst` fails.
pub fn copy_dir_filtered<F>(src: &Path, dst: &Path, skip: F) -> io::Result<()>
where
    F: Fn(&Path) -> bool,
{
    fs::create_dir_all(dst)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !skip(entry.path()));

    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Replace the directory at `target` with the directory at `staged`.
///
/// The old directory (if any) is moved aside first and only deleted once the
/// staged directory is in place; if the final rename fails the old directory
/// is moved back. Both paths must be on the same filesystem.
///
/// # Errors
/// Returns an error if either rename fails.
pub fn replace_dir(staged: &Path, target: &Path) -> io::Result<()> {
    let backup = if target.exists() {
        let backup = sibling_path(target, "old");
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(staged, target) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, target);
        }
        return Err(e);
    }

    if let Some(backup) = backup {
        fs::remove_dir_all(backup)?;
    }

    Ok(())
}

/// `.<file name>.<suffix>.<pid>` next to `path`, on the same filesystem.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.{suffix}.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ))
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link_target = fs::read_link(src)?;
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(link_target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    // Fallback: copy whatever the link points at
    if src.is_dir() {
        copy_dir_filtered(src, dst, |_| false)
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}
