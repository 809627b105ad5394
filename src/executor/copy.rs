//! Atomic file copy and symlink pass-through

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Copy buffer size
const BUFFER_SIZE: usize = 128 * 1024;

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Stream into a hidden sibling part file
/// 2. Flush and sync to disk
/// 3. Preserve metadata (permissions, mtime)
/// 4. Rename over the destination
///
/// The part file is removed again if any step fails. Parent directories must
/// already exist.
///
/// # Example
/// ```no_run
/// use mirrorsync::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("source.txt"), Path::new("dest.txt"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    let part_path = part_path_for(dest);

    let result = write_part(src, &part_path).and_then(|bytes| {
        fs::rename(&part_path, dest)?;
        Ok(bytes)
    });

    if result.is_err() {
        let _ = fs::remove_file(&part_path);
    }
    result
}

fn write_part(src: &Path, part_path: &Path) -> io::Result<u64> {
    let mut src_file = File::open(src)?;
    let mut part_file = File::create(part_path)?;

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total_bytes = 0u64;
    loop {
        let bytes_read = src_file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        part_file.write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all()?;
    // Handle must be closed before rename on Windows
    drop(part_file);

    let src_metadata = src_file.metadata()?;
    fs::set_permissions(part_path, src_metadata.permissions())?;
    let mtime = filetime::FileTime::from_last_modification_time(&src_metadata);
    filetime::set_file_mtime(part_path, mtime)?;

    Ok(total_bytes)
}

/// `dir/.name.mirrorsync-part` next to `dest`
fn part_path_for(dest: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".mirrorsync-part");
    dest.with_file_name(name)
}

/// Recreate the link at `src` at `dest` without dereferencing it
///
/// Whatever currently sits at `dest` is removed first.
pub fn copy_symlink(src: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    remove_path_any(dest)?;
    create_symlink(&target, dest)
}

/// Remove any filesystem entry at `path`; a missing entry is fine.
///
/// Directories are removed recursively; files and symlinks are removed as files.
pub(crate) fn remove_path_any(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let result = if metadata.file_type().is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Make sure every ancestor of `relative` under `root` is a real directory
///
/// Files or links sitting where a directory is needed are removed first.
/// Safe to race with another worker creating the same ancestors.
pub(crate) fn ensure_parent_dirs(root: &Path, relative: &str) -> io::Result<()> {
    let mut parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
    parts.pop();

    let mut current = root.to_path_buf();
    for part in parts {
        current.push(part);
        ensure_dir(&current)?;
    }
    Ok(())
}

/// Make `path` a directory, replacing a non-directory entry if present
///
/// Never removes a directory. Concurrent callers may race on the same path:
/// whoever loses a remove or create step succeeds as long as a real
/// directory is there afterwards.
pub(crate) fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_dir() => return Ok(()),
        Ok(_) => match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound && !is_real_dir(path) => return Err(e),
            _ => {}
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    match fs::create_dir(path) {
        Err(_) if is_real_dir(path) => Ok(()),
        other => other,
    }
}

/// A directory itself, not a link to one
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_dir())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    symlink_file(target, link_path).or_else(|file_err| {
        symlink_dir(target, link_path).map_err(|_| file_err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_copy_writes_content_and_leaves_no_part_file() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("dest.txt");
        fs::write(&src, b"Hello, World!").expect("write src");

        let bytes = copy_file_atomic(&src, &dest).expect("copy");

        assert_eq!(bytes, 13);
        assert_eq!(fs::read(&dest).expect("read dest"), b"Hello, World!");
        assert!(!part_path_for(&dest).exists());
    }

    #[test]
    fn test_atomic_copy_overwrites_existing() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("dest.txt");
        fs::write(&src, b"new").expect("write src");
        fs::write(&dest, b"old content that is longer").expect("write dest");

        copy_file_atomic(&src, &dest).expect("copy");
        assert_eq!(fs::read(&dest).expect("read dest"), b"new");
    }

    #[test]
    fn test_atomic_copy_preserves_mtime() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("src.txt");
        let dest = temp.path().join("dest.txt");
        fs::write(&src, b"x").expect("write src");
        let stamp = filetime::FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&src, stamp).expect("set src mtime");

        copy_file_atomic(&src, &dest).expect("copy");

        let dest_meta = fs::metadata(&dest).expect("dest metadata");
        assert_eq!(filetime::FileTime::from_last_modification_time(&dest_meta), stamp);
    }

    #[test]
    fn test_atomic_copy_missing_source_cleans_up() {
        let temp = TempDir::new().expect("create temp dir");
        let dest = temp.path().join("dest.txt");

        let result = copy_file_atomic(&temp.path().join("missing.txt"), &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path_for(&dest).exists());
    }

    #[test]
    fn test_part_path_is_hidden_sibling() {
        assert_eq!(
            part_path_for(Path::new("/d/sub/a.txt")),
            PathBuf::from("/d/sub/.a.txt.mirrorsync-part")
        );
    }

    #[test]
    fn test_ensure_parent_dirs_replaces_blocking_file() {
        let temp = TempDir::new().expect("create temp dir");
        fs::write(temp.path().join("a"), b"in the way").expect("write blocker");

        ensure_parent_dirs(temp.path(), "a/b/c.txt").expect("ensure parents");

        assert!(temp.path().join("a/b").is_dir());
        assert!(!temp.path().join("a/b/c.txt").exists());
    }

    #[test]
    fn test_ensure_parent_dirs_races_on_shared_blocking_file() {
        for round in 0..50 {
            let temp = TempDir::new().expect("create temp dir");
            fs::write(temp.path().join("a"), b"in the way").expect("write blocker");
            let barrier = std::sync::Barrier::new(8);

            std::thread::scope(|scope| {
                for worker in 0..8 {
                    let root = temp.path();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let relative = format!("a/f{worker:02}");
                        barrier.wait();
                        ensure_parent_dirs(root, &relative).expect("parent created");
                        fs::write(root.join(&relative), b"payload").expect("write child");
                    });
                }
            });

            let children = fs::read_dir(temp.path().join("a"))
                .expect("a is a directory")
                .count();
            assert_eq!(children, 8, "round {round} lost a file");
        }
    }

    #[test]
    fn test_ensure_dir_keeps_existing_directory_contents() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("dir");
        fs::create_dir(&dir).expect("create dir");
        fs::write(dir.join("child.txt"), b"child").expect("write child");

        ensure_dir(&dir).expect("already a directory");
        assert!(dir.join("child.txt").exists());
    }

    #[test]
    fn test_remove_path_any_missing_is_ok() {
        let temp = TempDir::new().expect("create temp dir");
        remove_path_any(&temp.path().join("nothing")).expect("missing is fine");
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_symlink_keeps_link_target() {
        let temp = TempDir::new().expect("create temp dir");
        let src = temp.path().join("link");
        let dest = temp.path().join("copied");
        std::os::unix::fs::symlink("target.txt", &src).expect("create symlink");
        fs::write(&dest, b"regular file first").expect("write dest");

        copy_symlink(&src, &dest).expect("copy symlink");

        let metadata = fs::symlink_metadata(&dest).expect("dest metadata");
        assert!(metadata.file_type().is_symlink());
        assert_eq!(fs::read_link(&dest).expect("read link"), PathBuf::from("target.txt"));
    }
}
