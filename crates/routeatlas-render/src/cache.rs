//! Bounded tile cache with an optional disk tier

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use routeatlas_core::Result;
use routeatlas_geo::{mercator, TileCoord};
use serde::Serialize;

use crate::tiles::TileBuilder;

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub memory_tiles: usize,
    pub hits: u64,
    pub misses: u64,
}

struct MemoryTier {
    tiles: HashMap<TileCoord, Arc<Vec<u8>>>,
    /// Insertion order, oldest first, for eviction
    order: VecDeque<TileCoord>,
}

/// Bounded in-memory tile cache with an optional disk tier.
///
/// Entries are keyed by tile coordinate. When the memory tier is full the
/// oldest entry is evicted. The disk tier, when configured, keeps every tile
/// built since the last [`clear`](TileCache::clear) under `{z}/{x}/{y}.json`
/// and survives restarts.
pub struct TileCache {
    memory: Mutex<MemoryTier>,
    cache_dir: Option<PathBuf>,
    max_memory_tiles: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileCache {
    pub const DEFAULT_MAX_MEMORY_TILES: usize = 256;

    /// Memory-only cache
    pub fn new() -> Self {
        Self {
            memory: Mutex::new(MemoryTier {
                tiles: HashMap::new(),
                order: VecDeque::new(),
            }),
            cache_dir: None,
            max_memory_tiles: Self::DEFAULT_MAX_MEMORY_TILES,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache with a disk tier rooted at `cache_dir`
    pub fn with_disk_tier(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;

        let mut cache = Self::new();
        cache.cache_dir = Some(cache_dir);
        Ok(cache)
    }

    pub fn with_max_memory_tiles(mut self, max_memory_tiles: usize) -> Self {
        self.max_memory_tiles = max_memory_tiles;
        self
    }

    /// Fetch a tile, building it on miss.
    ///
    /// Returns the tile content and whether it came from cache.
    pub async fn get_or_build(
        &self,
        tile: &TileCoord,
        builder: &TileBuilder,
    ) -> Result<(Arc<Vec<u8>>, bool)> {
        {
            let memory = self.memory.lock().unwrap();
            if let Some(content) = memory.tiles.get(tile) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok((Arc::clone(content), true));
            }
        }

        if let Some(path) = self.tile_path(tile) {
            if path.exists() {
                let content = Arc::new(std::fs::read(&path)?);
                self.insert_memory(*tile, Arc::clone(&content));
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok((content, true));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let content = Arc::new(builder.build(tile).await?);

        if let Some(path) = self.tile_path(tile) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content.as_slice())?;
        }
        self.insert_memory(*tile, Arc::clone(&content));
        Ok((content, false))
    }

    /// Prefetch every tile covering `bbox` at one zoom level, returning how
    /// many tiles the area spans
    pub async fn warm(&self, bbox: [f64; 4], zoom: u8, builder: &TileBuilder) -> Result<usize> {
        let tiles = mercator::tiles_for_bbox(bbox, zoom);
        let count = tiles.len();
        for tile in &tiles {
            self.get_or_build(tile, builder).await?;
        }
        tracing::debug!(zoom = zoom, tiles = count, "warmed tile cache");
        Ok(count)
    }

    /// Drop every cached tile, memory and disk. Ingest calls this so stale
    /// tiles are never served after the feature set changes.
    pub fn clear(&self) -> Result<()> {
        {
            let mut memory = self.memory.lock().unwrap();
            memory.tiles.clear();
            memory.order.clear();
        }
        if let Some(dir) = &self.cache_dir {
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
            }
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let memory = self.memory.lock().unwrap();
        CacheStats {
            memory_tiles: memory.tiles.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn tile_path(&self, tile: &TileCoord) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}/{}/{}.json", tile.z, tile.x, tile.y)))
    }

    fn insert_memory(&self, tile: TileCoord, content: Arc<Vec<u8>>) {
        let mut memory = self.memory.lock().unwrap();
        if memory.tiles.contains_key(&tile) {
            memory.tiles.insert(tile, content);
            return;
        }
        while memory.tiles.len() >= self.max_memory_tiles {
            let Some(oldest) = memory.order.pop_front() else {
                break;
            };
            memory.tiles.remove(&oldest);
        }
        memory.tiles.insert(tile, content);
        memory.order.push_back(tile);
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}
