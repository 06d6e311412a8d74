//! Test fixtures for fieldroute.
//!
//! Provides:
//! - Real Berlin shop addresses
//! - Mock geocoder, customer store and directions provider that record calls

#![allow(dead_code)]

pub mod berlin_customers;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use fieldroute::coords::{CoordinateCache, GeocodeOrchestrator, GeocodePolicy};
use fieldroute::error::{GeocodeError, RoutingError, StoreError};
use fieldroute::geocode::GeocodingService;
use fieldroute::model::{Customer, CustomerId, LegDuration};
use fieldroute::polyline::Polyline;
use fieldroute::store::MemoryCustomerStore;
use fieldroute::traits::{
    AddressGeocoder, CustomerStore, DirectionsProvider, DirectionsRequest, GeocodeHit, RoutedPath,
};

pub use berlin_customers::*;

/// Geocoder that answers from a table (falling back to a position derived
/// from the query) and tracks how many lookups run at once.
pub struct MockGeocoder {
    known: HashMap<String, (f64, f64)>,
    failing: Vec<String>,
    slow: Vec<(String, Duration)>,
    delay: Duration,
    ready: AtomicBool,
    calls: Mutex<Vec<String>>,
    timings: Mutex<Vec<LookupTiming>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// When one lookup started and finished.
#[derive(Debug, Clone)]
pub struct LookupTiming {
    pub query: String,
    pub started: Instant,
    pub finished: Instant,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self {
            known: HashMap::new(),
            failing: Vec::new(),
            slow: Vec::new(),
            delay: Duration::ZERO,
            ready: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            timings: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_known(mut self, query: &str, position: (f64, f64)) -> Self {
        self.known.insert(query.to_string(), position);
        self
    }

    /// Queries containing `fragment` fail with `NotFound`.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    /// Queries containing `fragment` take `delay` instead of the default.
    pub fn slow_on(mut self, fragment: &str, delay: Duration) -> Self {
        self.slow.push((fragment.to_string(), delay));
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn timings(&self) -> Vec<LookupTiming> {
        self.timings.lock().unwrap().clone()
    }
}

impl AddressGeocoder for MockGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, GeocodeError> {
        let started = Instant::now();
        self.calls.lock().unwrap().push(query.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .slow
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map_or(self.delay, |(_, delay)| *delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.timings.lock().unwrap().push(LookupTiming {
            query: query.to_string(),
            started,
            finished: Instant::now(),
        });

        if self.failing.iter().any(|fragment| query.contains(fragment.as_str())) {
            return Err(GeocodeError::NotFound(query.to_string()));
        }

        let position = self.known.get(query).copied().unwrap_or_else(|| {
            let seed = query.bytes().map(f64::from).sum::<f64>();
            (52.4 + (seed % 100.0) / 1000.0, 13.3 + (seed % 70.0) / 1000.0)
        });
        Ok(GeocodeHit {
            position,
            formatted_address: query.to_string(),
        })
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Customer store whose coordinate writes always fail.
pub struct ReadOnlyCustomerStore {
    pub inner: MemoryCustomerStore,
    pub write_attempts: AtomicUsize,
}

impl ReadOnlyCustomerStore {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self {
            inner: MemoryCustomerStore::new(customers),
            write_attempts: AtomicUsize::new(0),
        }
    }
}

impl CustomerStore for ReadOnlyCustomerStore {
    fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.customers()
    }

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.inner.customer(id)
    }

    fn update_coordinates(&self, _id: CustomerId, _lat: f64, _lng: f64) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("read-only replica".to_string()))
    }
}

/// Customer store whose coordinate writes wait until [`GatedCustomerStore::open`].
pub struct GatedCustomerStore {
    pub inner: MemoryCustomerStore,
    open: Mutex<bool>,
    opened: Condvar,
    pub writes_started: AtomicUsize,
}

impl GatedCustomerStore {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self {
            inner: MemoryCustomerStore::new(customers),
            open: Mutex::new(false),
            opened: Condvar::new(),
            writes_started: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl CustomerStore for GatedCustomerStore {
    fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.customers()
    }

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.inner.customer(id)
    }

    fn update_coordinates(&self, id: CustomerId, lat: f64, lng: f64) -> Result<(), StoreError> {
        self.writes_started.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.update_coordinates(id, lat, lng)
    }
}

/// Directions provider that records requests and answers with fixed legs.
///
/// With no scripted legs it answers 600 s per leg.
#[derive(Clone, Default)]
pub struct RecordingDirections {
    pub requests: Arc<Mutex<Vec<DirectionsRequest>>>,
    pub leg_seconds: Arc<Mutex<Vec<u32>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingDirections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_leg_seconds(&self, seconds: &[u32]) {
        *self.leg_seconds.lock().unwrap() = seconds.to_vec();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<DirectionsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DirectionsProvider for RecordingDirections {
    fn route(&self, request: &DirectionsRequest) -> Result<RoutedPath, RoutingError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(RoutingError::Rejected {
                code: "NoRoute".to_string(),
                message: "scripted failure".to_string(),
            });
        }

        let scripted = self.leg_seconds.lock().unwrap().clone();
        let leg_count = request.waypoints.len() + 1;
        let legs = (0..leg_count)
            .map(|i| LegDuration::from_seconds(scripted.get(i).copied().unwrap_or(600)))
            .collect();

        Ok(RoutedPath {
            legs,
            geometry: Polyline::new(request.points()),
        })
    }
}

pub type Orchestrator<S> = GeocodeOrchestrator<MockGeocoder, S>;

/// Orchestrator over a fresh cache, with the given geocoder and store.
pub fn orchestrator<S: CustomerStore + 'static>(
    geocoder: Arc<MockGeocoder>,
    store: Arc<S>,
    policy: GeocodePolicy,
) -> Orchestrator<S> {
    let geocoding = Arc::new(GeocodingService::new(geocoder, "Germany"));
    GeocodeOrchestrator::new(Arc::new(CoordinateCache::new()), geocoding, store, policy)
        .expect("build geocoding pool")
}

/// `count` customers with distinct addresses and no persisted position.
pub fn unlocated_customers(first_id: i64, count: usize) -> Vec<Customer> {
    (0..count)
        .map(|i| {
            let id = first_id + i as i64;
            Customer::new(id, format!("Customer {}", id)).with_address(
                format!("Teststraße {}", i + 1),
                "10115",
                "Berlin",
            )
        })
        .collect()
}
