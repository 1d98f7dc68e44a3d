use std::{collections::HashMap, fmt, sync::Arc};

use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use ts_rs::TS;

use crate::{config::ExtractionConfig, error::Result, graph::Graph, types::RasterImage};

/// Content address of a built graph: SHA-256 over the pixels, the effective
/// extraction config and the canvas identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct GraphKey(String);

impl GraphKey {
    pub fn compute(
        raster: &RasterImage,
        config: &ExtractionConfig,
        canvas: Option<&str>,
    ) -> Result<Self> {
        // Field order of the config structs is fixed, so this JSON is canonical.
        let canonical = serde_json::to_string(config)?;
        let canvas = canvas.unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(raster.width.to_le_bytes());
        hasher.update(raster.height.to_le_bytes());
        hasher.update((raster.data.len() as u64).to_le_bytes());
        hasher.update(&raster.data);
        hasher.update((canonical.len() as u64).to_le_bytes());
        hasher.update(canonical.as_bytes());
        hasher.update((canvas.len() as u64).to_le_bytes());
        hasher.update(canvas.as_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A built graph together with the grayscale page it came from.
#[derive(Debug, Clone)]
pub struct CachedGraph {
    pub key: GraphKey,
    pub graph: Arc<Graph>,
    /// Kept for the pixel-scan fallback of highlight requests
    pub gray: Arc<GrayImage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries overwritten by a build with a different key
    pub replaced: u64,
}

/// Page id -> most recently built graph. Last writer wins.
#[derive(Debug, Default)]
pub struct GraphCache {
    entries: HashMap<String, CachedGraph>,
    hits: u64,
    misses: u64,
    replaced: u64,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `page` if it was built from exactly `key`.
    pub fn lookup(&mut self, page: &str, key: &GraphKey) -> Option<CachedGraph> {
        match self.entries.get(page) {
            Some(entry) if entry.key == *key => {
                self.hits += 1;
                debug!(page, key = %key, "graph cache hit");
                Some(entry.clone())
            }
            _ => {
                self.misses += 1;
                debug!(page, key = %key, "graph cache miss");
                None
            }
        }
    }

    /// Latest entry for `page` regardless of key.
    pub fn get(&self, page: &str) -> Option<&CachedGraph> {
        self.entries.get(page)
    }

    pub fn insert(&mut self, page: impl Into<String>, entry: CachedGraph) -> Option<CachedGraph> {
        let previous = self.entries.insert(page.into(), entry);
        if previous.is_some() {
            self.replaced += 1;
        }
        previous
    }

    pub fn remove(&mut self, page: &str) -> Option<CachedGraph> {
        self.entries.remove(page)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            replaced: self.replaced,
        }
    }
}
