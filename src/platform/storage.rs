//! Filesystem scratch storage.
//!
//! Every operation that needs a scratch file gets its own name, built from a
//! wall-clock timestamp plus a process-wide sequence number, and the file is
//! created with `create_new` so two operations can never share a path.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use super::ScratchStorage;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

const MAX_ATTEMPTS: usize = 16;

/// Create a new, empty file `<prefix><millis>_<seq><suffix>` in `dir`.
pub fn create_unique_file(dir: &Path, prefix: &str, suffix: &str) -> io::Result<(PathBuf, File)> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    for _ in 0..MAX_ATTEMPTS {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{}{}_{}{}", prefix, millis, seq, suffix));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free scratch file name",
    ))
}

/// Scratch storage rooted at a cache directory, handing out
/// `content://<authority>/cache/<name>` references.
pub struct FsScratchStorage {
    cache_dir: PathBuf,
    authority: String,
}

impl FsScratchStorage {
    pub fn new(cache_dir: impl Into<PathBuf>, authority: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            authority: authority.into(),
        }
    }
}

impl ScratchStorage for FsScratchStorage {
    fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn create_unique_file(&self, prefix: &str, suffix: &str) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.cache_dir)?;
        create_unique_file(&self.cache_dir, prefix, suffix).map(|(path, _)| path)
    }

    fn content_uri_for(&self, file: &Path) -> String {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match Url::parse(&format!("content://{}/", self.authority)) {
            Ok(mut uri) => {
                if let Ok(mut segments) = uri.path_segments_mut() {
                    segments.pop_if_empty().push("cache").push(&name);
                }
                uri.to_string()
            }
            Err(e) => {
                log::warn!("Invalid content authority {:?}: {}", self.authority, e);
                format!("content://{}/cache/{}", self.authority, name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_files_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let (a, _) = create_unique_file(dir.path(), "IMG_", ".jpg").unwrap();
        let (b, _) = create_unique_file(dir.path(), "IMG_", ".jpg").unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        assert_eq!(std::fs::metadata(&a).unwrap().len(), 0);
    }

    #[test]
    fn names_keep_prefix_and_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsScratchStorage::new(dir.path(), "app.fileprovider");
        let path = storage.create_unique_file("VID_", ".mp4").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("VID_"));
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn content_uri_uses_authority_and_file_name() {
        let storage = FsScratchStorage::new("/tmp/cache", "app.fileprovider");
        let uri = storage.content_uri_for(Path::new("/tmp/cache/IMG_1_0.jpg"));
        assert_eq!(uri, "content://app.fileprovider/cache/IMG_1_0.jpg");
    }
}
