//! JSON persistence helpers for the ~/.riverstone/ data directory.

use crate::core::constants::DATA_DIR_NAME;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Get the ~/.riverstone/ directory path, creating it if needed.
pub fn default_data_dir() -> io::Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine home directory",
        )
    })?;
    let dir = home_dir.join(DATA_DIR_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Read a JSON document, creating it with `T::default()` if it does not exist.
///
/// An empty file also reads as the default. The first-run document is only
/// ever linked into place, so it never replaces one another process wrote
/// in the meantime.
pub fn read_json_or_init<T>(path: &Path) -> io::Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    match fs::read_to_string(path) {
        Ok(content) => parse_json_or_default(&content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let value = T::default();
            if create_json_if_absent(path, &value)? {
                Ok(value)
            } else {
                parse_json_or_default(&fs::read_to_string(path)?)
            }
        }
        Err(e) => Err(e),
    }
}

fn parse_json_or_default<T: Default + DeserializeOwned>(content: &str) -> io::Result<T> {
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Returns `false` if `path` already existed.
fn create_json_if_absent<T: Serialize>(path: &Path, data: &T) -> io::Result<bool> {
    let tmp = write_tmp_sibling(path, &to_json(data)?)?;
    let linked = fs::hard_link(&tmp, path);
    let _ = fs::remove_file(&tmp);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Save a value as pretty-printed JSON without ever exposing a partial file.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    write_atomic(path, &to_json(data)?)
}

fn to_json<T: Serialize>(data: &T) -> io::Result<Vec<u8>> {
    serde_json::to_vec_pretty(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write to a temporary sibling, then rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = write_tmp_sibling(path, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Writes `bytes` to a fresh `.<name>.tmp-<pid>-<n>` file next to `path`.
/// Names are unique per process and attempt, so concurrent writers never
/// share one.
fn write_tmp_sibling(path: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("data.json");

    let mut counter = 0u32;
    loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                file.sync_all()?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exclusive OS lock on a `<file>.lock` sibling, held until drop.
///
/// The operating system releases the lock when the holder exits, crashed or
/// not. The lock file itself is left in place.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Wait up to `timeout` for the lock, retrying every `retry`.
    pub fn acquire(target: &Path, timeout: Duration, retry: Duration) -> io::Result<Self> {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        let path = target.with_file_name(name);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("timed out waiting for lock {}", path.display()),
                        ));
                    }
                    thread::sleep(retry);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
