//! Favorites persistence: a single JSON slot in a key-value store.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::models::MovieSummary;

pub const FAVORITES_KEY: &str = "movieFavorites";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per slot under `dir`.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Ordered favorites, unique by id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavoritesList {
    movies: Vec<MovieSummary>,
}

impl FavoritesList {
    pub fn new(movies: Vec<MovieSummary>) -> Self {
        let mut list = Self::default();
        for movie in movies {
            if !list.contains(movie.id) {
                list.movies.push(movie);
            }
        }
        list
    }

    pub fn contains(&self, id: i64) -> bool {
        self.movies.iter().any(|m| m.id == id)
    }

    /// Appends when absent, removes when present. Returns the new membership.
    pub fn toggle(&mut self, movie: MovieSummary) -> bool {
        if self.contains(movie.id) {
            self.remove(movie.id);
            false
        } else {
            self.movies.push(movie);
            true
        }
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.movies.len();
        self.movies.retain(|m| m.id != id);
        self.movies.len() != before
    }

    pub fn movies(&self) -> &[MovieSummary] {
        &self.movies
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

/// Loads and saves the favorites slot. Cloning shares the underlying store.
#[derive(Clone)]
pub struct FavoritesRepo {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl FavoritesRepo {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    pub fn load(&self) -> Result<FavoritesList> {
        let Some(text) = self.store.get(FAVORITES_KEY)? else {
            return Ok(FavoritesList::default());
        };
        let movies: Vec<MovieSummary> =
            serde_json::from_str(&text).context("Stored favorites are not a list of movies")?;
        Ok(FavoritesList::new(movies))
    }

    pub fn save(&self, list: &FavoritesList) -> Result<()> {
        let text = serde_json::to_string(list.movies()).context("Failed to serialize favorites")?;
        self.store.set(FAVORITES_KEY, &text)?;
        debug!("Saved {} favorites", list.len());
        Ok(())
    }

    /// Flips `movie` in the caller's snapshot and persists the whole snapshot.
    pub fn toggle(&self, list: &mut FavoritesList, movie: MovieSummary) -> Result<bool> {
        let _guard = self.lock()?;
        let title = movie.title.clone();
        let now_favorite = list.toggle(movie);
        self.save(list)?;
        info!(
            "{} '{}' {} favorites",
            if now_favorite { "Added" } else { "Removed" },
            title,
            if now_favorite { "to" } else { "from" }
        );
        Ok(now_favorite)
    }

    /// Removes `id` from the snapshot and persists it.
    pub fn remove(&self, list: &mut FavoritesList, id: i64) -> Result<bool> {
        let _guard = self.lock()?;
        let removed = list.remove(id);
        self.save(list)?;
        Ok(removed)
    }

    /// Reload, flip, save. For callers that hold no snapshot.
    pub fn toggle_stored(&self, movie: MovieSummary) -> Result<bool> {
        let _guard = self.lock()?;
        let mut list = self.load()?;
        let now_favorite = list.toggle(movie);
        self.save(&list)?;
        Ok(now_favorite)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("favorites lock poisoned"))
    }
}
