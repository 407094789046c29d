//! Viewport-keyed road-network cache.
//!
//! Viewports are snapped outward to a grid of `quantum_deg` degrees, so
//! small pans and re-renders of the same area map to the same
//! [`ViewportKey`] and reuse one fetch. At most `capacity` networks are
//! held; the least recently used one is evicted first.
//!
//! Each key is single-flight: concurrent [`RoadNetworkCache::ensure_network`]
//! calls for the same key await the same fetch and share its outcome,
//! success or failure. A failed or empty outcome is dropped from the cache
//! once the flight lands, so the next render pass tries again.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use hazard_map_geometry::RoadNetwork;
use hazard_map_hazard_models::BoundingBox;
use tokio::sync::OnceCell;

use crate::{RoadNetworkError, RoadNetworkSource};

/// Default grid size for viewport quantization (about 1 km of latitude).
pub const DEFAULT_QUANTUM_DEG: f64 = 0.01;

/// Default number of cached networks.
pub const DEFAULT_CAPACITY: usize = 16;

/// Tuning for [`RoadNetworkCache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// Grid size in degrees that viewport edges are snapped to.
    pub quantum_deg: f64,
    /// Maximum number of networks kept.
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            quantum_deg: DEFAULT_QUANTUM_DEG,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// A viewport snapped outward to the quantization grid, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewportKey {
    south: i64,
    west: i64,
    north: i64,
    east: i64,
}

impl ViewportKey {
    /// Snaps `bounds` outward to multiples of `quantum_deg`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantize(bounds: &BoundingBox, quantum_deg: f64) -> Self {
        Self {
            south: (bounds.south / quantum_deg).floor() as i64,
            west: (bounds.west / quantum_deg).floor() as i64,
            north: (bounds.north / quantum_deg).ceil() as i64,
            east: (bounds.east / quantum_deg).ceil() as i64,
        }
    }

    /// The snapped bounds this key stands for.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self, quantum_deg: f64) -> BoundingBox {
        BoundingBox::new(
            self.west as f64 * quantum_deg,
            self.south as f64 * quantum_deg,
            self.east as f64 * quantum_deg,
            self.north as f64 * quantum_deg,
        )
    }
}

/// Outcome of one fetch; `None` when it failed or came back empty.
type Flight = Arc<OnceCell<Option<Arc<RoadNetwork>>>>;

struct Slot {
    network: Flight,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    entries: BTreeMap<ViewportKey, Slot>,
    tick: u64,
}

/// Caches road networks per quantized viewport.
pub struct RoadNetworkCache {
    source: Arc<dyn RoadNetworkSource>,
    settings: CacheSettings,
    slots: Mutex<Slots>,
}

impl RoadNetworkCache {
    /// Creates an empty cache backed by `source`.
    #[must_use]
    pub fn new(source: Arc<dyn RoadNetworkSource>, settings: CacheSettings) -> Self {
        Self {
            source,
            settings: CacheSettings {
                capacity: settings.capacity.max(1),
                ..settings
            },
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Returns the network covering `viewport`, fetching it if needed.
    ///
    /// Never fails: on a fetch error or an empty response this logs and
    /// returns an empty network, and nothing is cached for the key.
    pub async fn ensure_network(&self, viewport: BoundingBox) -> Arc<RoadNetwork> {
        let key = ViewportKey::quantize(&viewport, self.settings.quantum_deg);
        let cell = self.checkout(key);

        if let Some(Some(network)) = cell.get() {
            log::debug!("Road network cache hit for {key:?}");
            return Arc::clone(network);
        }

        let bounds = key.bounds(self.settings.quantum_deg);
        let outcome = cell
            .get_or_init(|| async {
                match self.fetch(bounds).await {
                    Ok(network) => Some(Arc::new(network)),
                    Err(e) => {
                        log::warn!("Road network unavailable for {bounds:?}: {e}");
                        None
                    }
                }
            })
            .await;

        if let Some(network) = outcome {
            return Arc::clone(network);
        }
        self.discard(key, &cell);
        Arc::new(RoadNetwork::empty())
    }

    async fn fetch(&self, bounds: BoundingBox) -> Result<RoadNetwork, RoadNetworkError> {
        log::info!("Fetching road network for {bounds:?}");
        let network = self.source.fetch(bounds).await?;
        if network.is_empty() {
            return Err(RoadNetworkError::Empty);
        }
        log::info!(
            "Fetched {} road chains ({} segments)",
            network.len(),
            network.segment_count()
        );
        Ok(network)
    }

    /// Number of keys currently held (including in-flight fetches).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached network.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `key` as used and returns its cell, creating it if absent.
    fn checkout(&self, key: ViewportKey) -> Flight {
        let mut slots = self.lock();
        slots.tick += 1;
        let tick = slots.tick;

        let slot = slots.entries.entry(key).or_insert_with(|| Slot {
            network: Arc::new(OnceCell::new()),
            last_used: tick,
        });
        slot.last_used = tick;
        let cell = Arc::clone(&slot.network);

        while slots.entries.len() > self.settings.capacity {
            let victim = slots
                .entries
                .iter()
                .filter(|(k, _)| **k != key)
                .min_by_key(|(_, s)| s.last_used)
                .map(|(k, _)| *k);
            let Some(victim) = victim else {
                break;
            };
            log::debug!("Evicting road network for {victim:?}");
            slots.entries.remove(&victim);
        }

        cell
    }

    /// Removes `key` if it still refers to the failed `cell`.
    fn discard(&self, key: ViewportKey, cell: &Flight) {
        let mut slots = self.lock();
        let stale = slots
            .entries
            .get(&key)
            .is_some_and(|s| Arc::ptr_eq(&s.network, cell));
        if stale {
            slots.entries.remove(&key);
        }
    }
}
