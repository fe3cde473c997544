//! OS-level advisory locking on open file descriptors (§4.10, §4.11).
//!
//! This is a second, independent locking mechanism from the in-process
//! [`super::table::LockTable`]: DOWNLOAD takes a non-blocking shared lock
//! here, DELETE a non-blocking exclusive one. Neither ever also holds the
//! table lock, so the two mechanisms cannot deadlock against each other
//! (§5 lock ordering).

use std::fs::File;
use std::io;
use std::path::PathBuf;

use fs2::FileExt;

/// An open file with an advisory lock held on its descriptor, released on
/// drop.
pub struct LockedFile {
    file: File,
}

impl LockedFile {
    /// Opens `path` read-only and takes a non-blocking shared lock.
    ///
    /// Returns `Ok(None)` if the lock is already held exclusively by
    /// someone else; `Err` on any other I/O failure.
    pub fn open_shared(path: &PathBuf) -> io::Result<Option<Self>> {
        let file = File::open(path)?;
        match file.try_lock_shared() {
            Ok(()) => Ok(Some(Self { file })),
            Err(err) if is_lock_contended(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Opens `path` read-write and takes a non-blocking exclusive lock.
    ///
    /// Returns `Ok(None)` if the lock is already held by someone else;
    /// `Err` on any other I/O failure.
    pub fn open_exclusive(path: &PathBuf) -> io::Result<Option<Self>> {
        let file = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(err) if is_lock_contended(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Probes whether an exclusive lock on `path` would currently succeed,
    /// without holding onto it — used by the `LOCKS` operation.
    pub fn probe_exclusive(path: &PathBuf) -> io::Result<bool> {
        let file = File::open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = file.unlock();
                Ok(true)
            }
            Err(err) if is_lock_contended(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Converts into the underlying std file for blocking reads/writes
    /// performed inside `spawn_blocking`.
    pub fn into_std(self) -> File {
        self.file
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_lock_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == Some(libc_eagain())
        || err.raw_os_error() == Some(libc_eacces())
}

#[cfg(unix)]
fn libc_eagain() -> i32 {
    11 // EAGAIN
}
#[cfg(unix)]
fn libc_eacces() -> i32 {
    13 // EACCES
}
#[cfg(not(unix))]
fn libc_eagain() -> i32 {
    0
}
#[cfg(not(unix))]
fn libc_eacces() -> i32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn shared_locks_do_not_exclude_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"data").unwrap();

        let a = LockedFile::open_shared(&path).unwrap();
        let b = LockedFile::open_shared(&path).unwrap();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[test]
    fn exclusive_lock_blocks_second_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"data").unwrap();

        let a = LockedFile::open_exclusive(&path).unwrap();
        assert!(a.is_some());
        let b = LockedFile::open_exclusive(&path).unwrap();
        assert!(b.is_none());
    }

    #[test]
    fn drop_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"data").unwrap();

        {
            let _a = LockedFile::open_exclusive(&path).unwrap();
        }
        let b = LockedFile::open_exclusive(&path).unwrap();
        assert!(b.is_some());
    }

    #[test]
    fn probe_exclusive_reflects_an_active_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"data").unwrap();

        assert!(LockedFile::probe_exclusive(&path).unwrap());
        let _held = LockedFile::open_exclusive(&path).unwrap().unwrap();
        assert!(!LockedFile::probe_exclusive(&path).unwrap());
    }
}
