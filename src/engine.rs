//! # Trip Engine
//!
//! Stateful front end over a loaded route document.
//!
//! ## Architecture
//!
//! The engine owns:
//! - The route document (every named collection, in document order)
//! - The active collection name (initially the first collection)
//! - The clustering configuration
//! - An LRU cache of analyses keyed by `(collection name, content hash)`
//!
//! Every analysis is a pure function of a collection and the configuration,
//! so a cached result is reused until the collection content or the
//! configuration changes.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use lru::LruCache;
use serde::Serialize;

use crate::attribution::{attribute_clusters, ClusterAttribution};
use crate::clusters::{build_clusters, ClusterConfig, ClusterSets};
use crate::error::{Result, TripInsightsError};
use crate::loader::{self, LoadReport};
use crate::stats::{
    compute_map_region, compute_route_statistics, summarize_trip, MapRegion, RegionConfig,
    RouteStatistics, TripSummary,
};
use crate::{RouteCollection, RouteDocument};

// ============================================================================
// Collection Analysis
// ============================================================================

/// Attributions for each cluster set, index-aligned with [`ClusterSets`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributionSets {
    pub all: Vec<ClusterAttribution>,
    pub starts: Vec<ClusterAttribution>,
    pub ends: Vec<ClusterAttribution>,
}

/// Everything derived from one route collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionAnalysis {
    pub name: String,
    pub clusters: ClusterSets,
    pub statistics: RouteStatistics,
    pub attributions: AttributionSets,
}

/// Build clusters, statistics and attributions for a collection.
///
/// # Errors
/// `ConfigError` when the configuration is invalid.
pub fn analyze_collection(
    collection: &RouteCollection,
    config: &ClusterConfig,
) -> Result<CollectionAnalysis> {
    #[cfg(feature = "parallel")]
    let (clusters, statistics) = rayon::join(
        || build_clusters(collection, config),
        || compute_route_statistics(collection),
    );
    #[cfg(not(feature = "parallel"))]
    let (clusters, statistics) = (
        build_clusters(collection, config),
        compute_route_statistics(collection),
    );
    let clusters = clusters?;

    let attributions = AttributionSets {
        all: attribute_clusters(&clusters.all, collection),
        starts: attribute_clusters(&clusters.starts, collection),
        ends: attribute_clusters(&clusters.ends, collection),
    };

    Ok(CollectionAnalysis {
        name: collection.name.clone(),
        clusters,
        statistics,
        attributions,
    })
}

// ============================================================================
// Trip Engine
// ============================================================================

type CacheKey = (String, u64);

/// Analyses kept before the least recently used one is evicted.
const ANALYSIS_CACHE_SIZE: usize = 16;

/// Engine holding a route document and cached analyses.
pub struct TripEngine {
    document: RouteDocument,
    active: Option<String>,
    config: ClusterConfig,
    region_config: RegionConfig,
    cache: LruCache<CacheKey, Arc<CollectionAnalysis>>,
    cache_hits: u64,
    cache_misses: u64,
}

impl TripEngine {
    /// Create an empty engine with default configuration.
    pub fn new() -> Self {
        Self {
            document: RouteDocument::default(),
            active: None,
            config: ClusterConfig::default(),
            region_config: RegionConfig::default(),
            cache: LruCache::new(NonZeroUsize::new(ANALYSIS_CACHE_SIZE).unwrap()),
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Create an engine with a custom clustering configuration.
    pub fn with_config(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    // ========================================================================
    // Document Management
    // ========================================================================

    /// Replace the document. The first collection becomes active.
    pub fn set_document(&mut self, document: RouteDocument) {
        self.active = document.first().map(|c| c.name.clone());
        self.document = document;
        self.cache.clear();
        info!(
            "[TripEngine] Loaded {} collections, active: {}",
            self.document.collections.len(),
            self.active.as_deref().unwrap_or("<none>")
        );
    }

    /// Parse a JSON route document and make it current.
    pub fn load_str(&mut self, json: &str) -> Result<LoadReport> {
        let loaded = loader::load_from_str(json)?;
        self.set_document(loaded.document);
        Ok(loaded.report)
    }

    /// Read a JSON route document file and make it current.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let loaded = loader::load_from_path(path)?;
        self.set_document(loaded.document);
        Ok(loaded.report)
    }

    pub fn document(&self) -> &RouteDocument {
        &self.document
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.document.names()
    }

    pub fn collection(&self, name: &str) -> Option<&RouteCollection> {
        self.document.get(name)
    }

    /// Insert or replace a collection, dropping its cached analyses.
    ///
    /// The first collection added to an empty engine becomes active.
    pub fn upsert_collection(&mut self, collection: RouteCollection) {
        let name = collection.name.clone();
        let dropped = self.invalidate_collection(&name);
        if dropped > 0 {
            debug!("[TripEngine] Invalidated {} analyses of '{}'", dropped, name);
        }
        self.document.upsert(collection);
        if self.active.is_none() {
            self.active = Some(name);
        }
    }

    /// Remove a collection. If it was active, the first remaining one becomes active.
    pub fn remove_collection(&mut self, name: &str) -> Option<RouteCollection> {
        let removed = self.document.remove(name)?;
        self.invalidate_collection(name);
        if self.active.as_deref() == Some(name) {
            self.active = self.document.first().map(|c| c.name.clone());
        }
        Some(removed)
    }

    /// Drop every cached analysis of a collection, whatever its content hash.
    fn invalidate_collection(&mut self, name: &str) -> usize {
        let stale: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|((cached, _), _)| cached == name)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.cache.pop(key);
        }
        stale.len()
    }

    // ========================================================================
    // Active Collection
    // ========================================================================

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make the named collection active.
    pub fn select(&mut self, name: &str) -> Result<()> {
        if self.document.get(name).is_none() {
            return Err(TripInsightsError::CollectionNotFound {
                name: name.to_string(),
            });
        }
        if self.active.as_deref() != Some(name) {
            info!("[TripEngine] Selected collection '{}'", name);
            self.active = Some(name.to_string());
        }
        Ok(())
    }

    /// The active collection.
    ///
    /// # Errors
    /// `InvalidInput` when the engine holds no collections.
    pub fn active_collection(&self) -> Result<&RouteCollection> {
        let name = self
            .active
            .as_deref()
            .ok_or_else(|| TripInsightsError::InvalidInput {
                message: "no route collection loaded".to_string(),
            })?;
        self.lookup(name)
    }

    fn lookup(&self, name: &str) -> Result<&RouteCollection> {
        self.document
            .get(name)
            .ok_or_else(|| TripInsightsError::CollectionNotFound {
                name: name.to_string(),
            })
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Analysis of the active collection.
    pub fn analysis(&mut self) -> Result<Arc<CollectionAnalysis>> {
        let name = self.active_collection()?.name.clone();
        self.analysis_for(&name)
    }

    /// Analysis of a named collection, computed on first use and then cached.
    pub fn analysis_for(&mut self, name: &str) -> Result<Arc<CollectionAnalysis>> {
        let collection =
            self.document
                .get(name)
                .ok_or_else(|| TripInsightsError::CollectionNotFound {
                    name: name.to_string(),
                })?;
        let key = (collection.name.clone(), collection.content_hash());

        if let Some(cached) = self.cache.get(&key) {
            self.cache_hits += 1;
            info!("[TripEngine] Cache hit for '{}'", name);
            return Ok(Arc::clone(cached));
        }

        self.cache_misses += 1;
        info!("[TripEngine] Cache miss for '{}', analyzing", name);
        let analysis = Arc::new(analyze_collection(collection, &self.config)?);
        self.cache.put(key, Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Per-trip summaries of the active collection, in trip order.
    pub fn trip_summaries(&self) -> Result<Vec<TripSummary>> {
        Ok(self
            .active_collection()?
            .trips
            .iter()
            .map(summarize_trip)
            .collect())
    }

    /// Map region of the active collection, `None` without coordinates.
    pub fn map_region(&self) -> Result<Option<MapRegion>> {
        Ok(compute_map_region(
            self.active_collection()?,
            &self.region_config,
        ))
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Update the clustering configuration. Drops every cached analysis.
    pub fn set_config(&mut self, config: ClusterConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.cache.clear();
            debug!("[TripEngine] Config changed, cache cleared");
        }
        Ok(())
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn set_region_config(&mut self, config: RegionConfig) {
        self.region_config = config;
    }

    pub fn region_config(&self) -> &RegionConfig {
        &self.region_config
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            collection_count: self.document.collections.len(),
            trip_count: self
                .document
                .collections
                .iter()
                .map(|c| c.trips.len())
                .sum(),
            cached_analysis_count: self.cache.len(),
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
        }
    }
}

impl Default for TripEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub collection_count: usize,
    pub trip_count: usize,
    pub cached_analysis_count: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, Trip};

    fn parked_trip(lat: f64, lng: f64, hour: u32) -> Trip {
        let coords = (0..10)
            .map(|i| {
                Coordinate::parse(
                    lat + i as f64 * 0.00001,
                    lng,
                    &format!("2024-01-01T{:02}:{:02}:00Z", hour, i),
                )
                .unwrap()
            })
            .collect();
        Trip::new(coords)
    }

    fn sample_document() -> RouteDocument {
        RouteDocument::new(vec![
            RouteCollection::new("home", vec![parked_trip(49.28, -123.12, 8)]),
            RouteCollection::new("office", vec![parked_trip(49.30, -123.10, 9)]),
        ])
    }

    #[test]
    fn test_first_collection_is_active() {
        let mut engine = TripEngine::new();
        assert!(engine.active_collection().is_err());

        engine.set_document(sample_document());
        assert_eq!(engine.active_name(), Some("home"));
        assert_eq!(engine.collection_names(), vec!["home", "office"]);
    }

    #[test]
    fn test_select_unknown_collection() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());
        assert!(matches!(
            engine.select("gym"),
            Err(TripInsightsError::CollectionNotFound { .. })
        ));
        assert_eq!(engine.active_name(), Some("home"));

        engine.select("office").unwrap();
        assert_eq!(engine.active_name(), Some("office"));
    }

    #[test]
    fn test_analysis_is_cached() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());

        let first = engine.analysis().unwrap();
        let second = engine.analysis().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.clusters.all.len(), 1);
        assert_eq!(first.attributions.all.len(), 1);
        assert_eq!(first.attributions.all[0].visit_count, 1);

        let stats = engine.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cached_analysis_count, 1);
    }

    #[test]
    fn test_upsert_invalidates() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());
        let before = engine.analysis().unwrap();

        engine.upsert_collection(RouteCollection::new(
            "home",
            vec![
                parked_trip(49.28, -123.12, 8),
                parked_trip(49.28, -123.12, 17),
            ],
        ));
        let after = engine.analysis().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.statistics.total_trips, 2);
        assert_eq!(engine.stats().cache_misses, 2);
    }

    #[test]
    fn test_config_change_clears_cache() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());
        engine.analysis().unwrap();

        let strict = ClusterConfig {
            min_points: 20,
            ..Default::default()
        };
        engine.set_config(strict).unwrap();
        assert_eq!(engine.stats().cached_analysis_count, 0);
        assert!(engine.analysis().unwrap().clusters.all.is_empty());

        let invalid = ClusterConfig {
            epsilon_degrees: 0.0,
            ..Default::default()
        };
        assert!(engine.set_config(invalid).is_err());
        assert_eq!(engine.config().min_points, 20);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut engine = TripEngine::new();
        for i in 0..=ANALYSIS_CACHE_SIZE {
            engine.upsert_collection(RouteCollection::new(
                format!("c{}", i),
                vec![parked_trip(49.28, -123.12, 8)],
            ));
            engine.analysis_for(&format!("c{}", i)).unwrap();
        }
        assert_eq!(engine.stats().cached_analysis_count, ANALYSIS_CACHE_SIZE);

        // c0 was evicted, the newest is still cached
        engine.analysis_for(&format!("c{}", ANALYSIS_CACHE_SIZE)).unwrap();
        assert_eq!(engine.stats().cache_hits, 1);
        engine.analysis_for("c0").unwrap();
        assert_eq!(engine.stats().cache_hits, 1);
    }

    #[test]
    fn test_remove_drops_cached_analyses() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());
        engine.analysis_for("home").unwrap();
        engine.analysis_for("office").unwrap();
        assert_eq!(engine.stats().cached_analysis_count, 2);

        engine.remove_collection("home");
        assert_eq!(engine.stats().cached_analysis_count, 1);
        assert!(matches!(
            engine.analysis_for("home"),
            Err(TripInsightsError::CollectionNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_active_collection() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());
        assert!(engine.remove_collection("home").is_some());
        assert_eq!(engine.active_name(), Some("office"));
        assert!(engine.remove_collection("home").is_none());
    }

    #[test]
    fn test_summaries_and_region() {
        let mut engine = TripEngine::new();
        engine.set_document(sample_document());

        let summaries = engine.trip_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].duration_minutes, 9);

        let region = engine.map_region().unwrap().unwrap();
        assert!((region.center.latitude - 49.280045).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_empty_collection() {
        let analysis =
            analyze_collection(&RouteCollection::default(), &ClusterConfig::default()).unwrap();
        assert_eq!(analysis.clusters.total(), 0);
        assert_eq!(analysis.statistics.total_trips, 0);
        assert!(analysis.attributions.all.is_empty());
    }
}
