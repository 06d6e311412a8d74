//! Session-scoped customer coordinate cache and background geocoding.
//!
//! A pass seeds the cache from persisted positions synchronously, then
//! geocodes the remaining customers on a background thread in fixed-size
//! parallel batches. Each batch settles before the next one starts.
//! Resolved positions are written back to the customer store by a separate
//! writer thread, so a slow store never holds up the next batch.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock, mpsc};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::geocode::GeocodingService;
use crate::model::{Customer, CustomerId, LatLng};
use crate::traits::{AddressGeocoder, CustomerStore};

/// Customer id -> position, plus the set of customers currently being geocoded.
///
/// Entries are written once and never replaced until [`CoordinateCache::clear`].
#[derive(Debug, Default)]
pub struct CoordinateCache {
    entries: RwLock<HashMap<CustomerId, LatLng>>,
    in_flight: Mutex<HashSet<CustomerId>>,
}

impl CoordinateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CustomerId) -> Option<LatLng> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    pub fn contains(&self, id: CustomerId) -> bool {
        self.get(id).is_some()
    }

    /// Inserts unless already present. Returns whether the entry was new.
    pub fn insert(&self, id: CustomerId, position: LatLng) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, position);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_in_flight(&self, id: CustomerId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Drops every entry. Lookups already in flight still land afterwards.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Marks `id` in flight unless it is already resolved or being resolved.
    fn try_claim(&self, id: CustomerId) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.contains(id) || in_flight.contains(&id) {
            return false;
        }
        in_flight.insert(id)
    }

    fn release(&self, id: CustomerId) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Bounds on provider usage per geocoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocodePolicy {
    /// Customers attempted per pass, in input order.
    pub max_per_pass: usize,
    /// Lookups issued in parallel; also the peak number in flight.
    pub batch_size: usize,
}

impl Default for GeocodePolicy {
    fn default() -> Self {
        Self {
            max_per_pass: 30,
            batch_size: 5,
        }
    }
}

/// Outcome of the background part of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub resolved: Vec<CustomerId>,
    pub failed: Vec<CustomerId>,
}

/// Handle to a geocoding pass. Dropping it leaves the pass running.
#[derive(Debug)]
pub struct GeocodePass {
    /// Customers seeded from persisted positions.
    pub seeded: usize,
    /// Customers claimed for background geocoding, in dispatch order.
    pub queued: Vec<CustomerId>,
    handle: Option<JoinHandle<PassReport>>,
}

impl GeocodePass {
    pub fn is_idle(&self) -> bool {
        self.handle.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Blocks until the background batches settle and their positions have
    /// been handed to the customer store.
    pub fn join(self) -> PassReport {
        match self.handle {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!("geocoding pass panicked");
                PassReport::default()
            }),
            None => PassReport::default(),
        }
    }
}

type RefreshFn = dyn Fn(CustomerId, LatLng) + Send + Sync;

/// Makes sure every plotted customer ends up with a best-effort position.
pub struct GeocodeOrchestrator<G, S> {
    inner: Arc<Inner<G, S>>,
}

impl<G, S> Clone for GeocodeOrchestrator<G, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<G, S> {
    cache: Arc<CoordinateCache>,
    geocoding: Arc<GeocodingService<G>>,
    customers: Arc<S>,
    policy: GeocodePolicy,
    pool: rayon::ThreadPool,
    on_resolved: Option<Box<RefreshFn>>,
}

impl<G, S> GeocodeOrchestrator<G, S>
where
    G: AddressGeocoder + 'static,
    S: CustomerStore + 'static,
{
    pub fn new(
        cache: Arc<CoordinateCache>,
        geocoding: Arc<GeocodingService<G>>,
        customers: Arc<S>,
        policy: GeocodePolicy,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::build(cache, geocoding, customers, policy, None)
    }

    /// Like [`GeocodeOrchestrator::new`], calling `on_resolved` after each new
    /// cache entry so the map can redraw.
    pub fn with_refresh(
        cache: Arc<CoordinateCache>,
        geocoding: Arc<GeocodingService<G>>,
        customers: Arc<S>,
        policy: GeocodePolicy,
        on_resolved: impl Fn(CustomerId, LatLng) + Send + Sync + 'static,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::build(cache, geocoding, customers, policy, Some(Box::new(on_resolved)))
    }

    fn build(
        cache: Arc<CoordinateCache>,
        geocoding: Arc<GeocodingService<G>>,
        customers: Arc<S>,
        policy: GeocodePolicy,
        on_resolved: Option<Box<RefreshFn>>,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(policy.batch_size.max(1))
            .thread_name(|i| format!("geocode-{}", i))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                cache,
                geocoding,
                customers,
                policy,
                pool,
                on_resolved,
            }),
        })
    }

    pub fn cache(&self) -> &Arc<CoordinateCache> {
        &self.inner.cache
    }

    pub fn policy(&self) -> GeocodePolicy {
        self.inner.policy
    }

    /// Seeds and claims synchronously, then geocodes in the background.
    pub fn ensure_coordinates(&self, customers: &[Customer]) -> GeocodePass {
        let inner = &self.inner;
        let mut seeded = 0;
        let mut needs_geocoding = Vec::new();

        for customer in customers {
            if inner.cache.contains(customer.id) {
                continue;
            }
            if let Some(position) = customer.persisted_position() {
                if inner.cache.insert(customer.id, position) {
                    seeded += 1;
                }
                continue;
            }
            needs_geocoding.push(customer);
        }

        if needs_geocoding.len() > inner.policy.max_per_pass {
            debug!(
                missing = needs_geocoding.len(),
                cap = inner.policy.max_per_pass,
                "capping geocoding pass"
            );
        }

        let claimed: Vec<Customer> = needs_geocoding
            .into_iter()
            .take(inner.policy.max_per_pass)
            .filter(|customer| inner.cache.try_claim(customer.id))
            .cloned()
            .collect();

        let queued: Vec<CustomerId> = claimed.iter().map(|customer| customer.id).collect();
        if claimed.is_empty() {
            return GeocodePass {
                seeded,
                queued,
                handle: None,
            };
        }

        info!(count = claimed.len(), "geocoding customers in background");
        let worker = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name("geocode-pass".to_string())
            .spawn(move || worker.run_pass(claimed));

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "could not start geocoding pass");
                for id in &queued {
                    inner.cache.release(*id);
                }
                None
            }
        };

        GeocodePass {
            seeded,
            queued,
            handle,
        }
    }
}

impl<G, S> Inner<G, S>
where
    G: AddressGeocoder,
    S: CustomerStore,
{
    fn run_pass(&self, claimed: Vec<Customer>) -> PassReport {
        let (writes, pending_writes) = mpsc::channel::<(CustomerId, LatLng)>();

        let report = thread::scope(|scope| {
            let writer = thread::Builder::new()
                .name("geocode-writeback".to_string())
                .spawn_scoped(scope, move || {
                    for (id, position) in pending_writes {
                        self.persist(id, position);
                    }
                });
            if let Err(err) = writer {
                warn!(error = %err, "could not start coordinate writer");
            }

            let mut report = PassReport::default();
            for batch in claimed.chunks(self.policy.batch_size.max(1)) {
                let outcomes: Vec<(CustomerId, Resolution)> = self.pool.install(|| {
                    batch
                        .par_iter()
                        .map(|customer| (customer.id, self.resolve(customer)))
                        .collect()
                });

                for (id, outcome) in outcomes {
                    match outcome {
                        Resolution::New(position) => {
                            // Receiver is gone only if the writer never started.
                            let _ = writes.send((id, position));
                            report.resolved.push(id);
                        }
                        Resolution::Known => report.resolved.push(id),
                        Resolution::Failed => report.failed.push(id),
                    }
                }
            }
            drop(writes);
            report
        });

        debug!(
            resolved = report.resolved.len(),
            failed = report.failed.len(),
            "geocoding pass settled"
        );
        report
    }

    fn resolve(&self, customer: &Customer) -> Resolution {
        let outcome = self.geocoding.geocode_address(customer.address());

        let position = match outcome {
            Ok(Some(hit)) => hit.position,
            Ok(None) => {
                debug!(customer = customer.id, "no geocode result");
                self.cache.release(customer.id);
                return Resolution::Failed;
            }
            Err(err) => {
                warn!(customer = customer.id, error = %err, "geocoding customer failed");
                self.cache.release(customer.id);
                return Resolution::Failed;
            }
        };

        let inserted = self.cache.insert(customer.id, position);
        self.cache.release(customer.id);
        if !inserted {
            return Resolution::Known;
        }

        if let Some(on_resolved) = &self.on_resolved {
            on_resolved(customer.id, position);
        }
        Resolution::New(position)
    }

    fn persist(&self, id: CustomerId, (lat, lng): LatLng) {
        if let Err(err) = self.customers.update_coordinates(id, lat, lng) {
            warn!(customer = id, error = %err, "persisting coordinates failed");
        }
    }
}

/// What one lookup did to the cache.
enum Resolution {
    /// Newly cached; still to be written back.
    New(LatLng),
    /// Another pass cached it first.
    Known,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_never_replaces() {
        let cache = CoordinateCache::new();
        assert!(cache.insert(1, (1.0, 2.0)));
        assert!(!cache.insert(1, (3.0, 4.0)));
        assert_eq!(cache.get(1), Some((1.0, 2.0)));
    }

    #[test]
    fn claim_rejects_resolved_and_in_flight() {
        let cache = CoordinateCache::new();
        cache.insert(1, (1.0, 2.0));
        assert!(!cache.try_claim(1));

        assert!(cache.try_claim(2));
        assert!(!cache.try_claim(2));
        assert!(cache.is_in_flight(2));

        cache.release(2);
        assert!(cache.try_claim(2));
    }

    #[test]
    fn clear_empties_entries() {
        let cache = CoordinateCache::new();
        cache.insert(1, (1.0, 2.0));
        cache.clear();
        assert!(cache.is_empty());
    }
}
