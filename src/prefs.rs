use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const KEY_PLAYING: &str = "playing";
pub const KEY_MUTED: &str = "muted";
pub const KEY_VOLUME: &str = "volume";

/// Volume used when nothing valid has been stored yet
pub const DEFAULT_VOLUME: f32 = 0.6;

/// Errors raised by a backing key/value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not write preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistent string-keyed storage that survives restarts
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Volatile store, used when no file location is available and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file store. The whole map is rewritten on every change (last write wins).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Default location under the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("celebration-tui").join("prefs.json"))
    }

    /// Open a store at `path`. A missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed preferences file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Typed access to the stored playback intent
pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Raw stored `playing` flag, `"1"` or `"0"` when set
    pub fn playing(&self) -> Option<String> {
        self.store.get(KEY_PLAYING)
    }

    pub fn wants_playing(&self) -> bool {
        self.playing().as_deref() == Some("1")
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.write(KEY_PLAYING, flag(playing));
    }

    pub fn wants_muted(&self) -> bool {
        self.store.get(KEY_MUTED).as_deref() == Some("1")
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.write(KEY_MUTED, flag(muted));
    }

    /// Stored volume clamped to [0, 1], or the default when absent or not a number
    pub fn volume(&self) -> f32 {
        self.store
            .get(KEY_VOLUME)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|v| !v.is_nan())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_VOLUME)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.write(KEY_VOLUME, &volume.to_string());
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "failed to persist preference");
        }
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}
