use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

pub const LEASE_TIMEOUT: Duration = Duration::from_secs(10);
const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// Exclusive right to rewrite one store file. Released on drop.
#[derive(Debug)]
pub struct StoreLease {
    lock_path: PathBuf,
    _file: File,
}

impl StoreLease {
    /// Creates `<store>.lock` next to `store`, waiting up to `timeout` for
    /// another writer to let go.
    pub fn acquire(store: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = lock_path_for(store);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let started = Instant::now();
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self {
                        lock_path,
                        _file: file,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&lock_path) {
                        warn!(lock = %lock_path.display(), "removing stale store lock");
                        match fs::remove_file(&lock_path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == ErrorKind::NotFound => continue,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    if started.elapsed() >= timeout {
                        return Err(anyhow!(
                            "timed out waiting for lock {}",
                            lock_path.display()
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for StoreLease {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// A lock is stale when the process that wrote it is gone, or when it carries
/// no readable pid and is older than `STALE_LOCK_AGE`.
fn is_stale(lock_path: &Path) -> bool {
    let Ok(raw) = fs::read_to_string(lock_path) else {
        return false;
    };
    if let Some(alive) = raw.trim().parse::<u32>().ok().and_then(process_alive) {
        return !alive;
    }
    fs::metadata(lock_path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= STALE_LOCK_AGE)
}

/// `None` when liveness cannot be checked on this platform.
fn process_alive(pid: u32) -> Option<bool> {
    if cfg!(target_os = "linux") {
        Some(Path::new("/proc").join(pid.to_string()).exists())
    } else {
        None
    }
}

fn lock_path_for(store: &Path) -> PathBuf {
    let name = store
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("store");
    store.with_file_name(format!(".{name}.lock"))
}

/// Reads a JSON file, or `T::default()` when it does not exist yet.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Pretty-prints `value` to a temp file beside `path`, syncs it, then
/// renames it over `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    fs::create_dir_all(parent)?;
    let tmp = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("file"),
        std::process::id()
    ));
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    debug!(path = %path.display(), bytes = bytes.len(), "wrote store");
    Ok(())
}

pub fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

/// Drops every entry whose id starts with `prefix`, appends `fresh`, and
/// keeps only the first entry for each id.
pub fn replace_prefixed(existing: Vec<Value>, prefix: &str, fresh: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .filter(|entry| !entry_id(entry).is_some_and(|id| id.starts_with(prefix)))
        .chain(fresh)
        .filter(|entry| match entry_id(entry) {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        })
        .collect()
}

/// Lease, read, merge, atomic write. Returns the number of entries written.
pub fn merge_store(path: &Path, prefix: &str, fresh: Vec<Value>) -> Result<usize> {
    let _lease = StoreLease::acquire(path, LEASE_TIMEOUT)?;
    let existing: Vec<Value> = read_json_or_default(path)?;
    let merged = replace_prefixed(existing, prefix, fresh);
    write_json_atomic(path, &merged)?;
    Ok(merged.len())
}
