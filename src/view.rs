//! Route map view: stop list, customer picker, drag-reorder, start time and
//! the derived arrival schedule, composed over the map state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveTime;
use tracing::{debug, warn};

use crate::config::MapConfig;
use crate::coords::{GeocodeOrchestrator, GeocodePass, PassReport};
use crate::error::StoreError;
use crate::legs::{LegUpdate, RouteLegPlanner};
use crate::model::{
    ArrivalEntry, Customer, CustomerId, LegDuration, MapPin, RouteId, RouteStop, RouteUpdate,
    RouteWithStops, StopId,
};
use crate::polyline::Polyline;
use crate::schedule::{derive_arrival_schedule, parse_start_time};
use crate::traits::{AddressGeocoder, CustomerStore, DirectionsProvider, RouteStore};

/// Holds back a start-time write until input has been quiet for `delay`.
#[derive(Debug, Clone)]
pub struct StartTimeDebounce {
    delay: Duration,
    pending: Option<(Option<NaiveTime>, Instant)>,
}

impl StartTimeDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period.
    pub fn push(&mut self, value: Option<NaiveTime>, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Restarts the quiet period without changing the pending value.
    pub fn touch(&mut self, now: Instant) {
        if let Some((_, since)) = self.pending.as_mut() {
            *since = now;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending value once the quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<Option<NaiveTime>> {
        let (value, since) = self.pending?;
        if now.saturating_duration_since(since) < self.delay {
            return None;
        }
        self.pending = None;
        Some(value)
    }
}

pub struct RouteMapView<G, S, R, D> {
    route_id: RouteId,
    routes: Arc<R>,
    customers: Arc<S>,
    geocoding: GeocodeOrchestrator<G, S>,
    legs: RouteLegPlanner<D>,
    default_visit_minutes: u32,
    loaded: Option<RouteWithStops>,
    all_customers: Vec<Customer>,
    show_route: bool,
    start_time_input: String,
    start_time: Option<NaiveTime>,
    leg_durations: Vec<LegDuration>,
    schedule: Vec<ArrivalEntry>,
    start_time_write: StartTimeDebounce,
    passes: Vec<GeocodePass>,
}

impl<G, S, R, D> RouteMapView<G, S, R, D>
where
    G: AddressGeocoder + 'static,
    S: CustomerStore + 'static,
    R: RouteStore,
    D: DirectionsProvider,
{
    pub fn new(
        route_id: RouteId,
        routes: Arc<R>,
        customers: Arc<S>,
        geocoding: GeocodeOrchestrator<G, S>,
        directions: D,
        config: &MapConfig,
    ) -> Self {
        Self {
            route_id,
            routes,
            customers,
            geocoding,
            legs: RouteLegPlanner::new(directions),
            default_visit_minutes: config.default_visit_minutes,
            loaded: None,
            all_customers: Vec::new(),
            show_route: true,
            start_time_input: String::new(),
            start_time: None,
            leg_durations: Vec::new(),
            schedule: Vec::new(),
            start_time_write: StartTimeDebounce::new(config.start_time_debounce),
            passes: Vec::new(),
        }
    }

    /// Fetches the route, its stops and the candidate customers, then syncs the map.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let route = self.routes.route_with_stops(self.route_id)?;
        let mut customers = self.customers.customers()?;

        for stop in &route.stops {
            if customers.iter().any(|customer| customer.id == stop.customer_id) {
                continue;
            }
            match self.customers.customer(stop.customer_id) {
                Ok(customer) => customers.push(customer),
                Err(err) => {
                    warn!(customer = stop.customer_id, error = %err, "stop customer missing")
                }
            }
        }

        self.start_time = route.route.start_time;
        self.start_time_input = route
            .route
            .start_time
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_default();
        self.all_customers = customers;
        self.loaded = Some(route);
        self.sync_map();
        Ok(())
    }

    /// Starts geocoding for unplotted customers, refreshes the route legs
    /// and recomputes the schedule.
    pub fn sync_map(&mut self) {
        let plotted = self.plotted_customers();
        let pass = self.geocoding.ensure_coordinates(&plotted);
        if !pass.is_idle() {
            self.passes.push(pass);
        }

        let stops = self.stops().to_vec();
        let update = self
            .legs
            .refresh_if_changed(&stops, self.geocoding.cache(), self.show_route);
        if let LegUpdate::Routed(legs) = update {
            self.leg_durations = legs;
        }

        self.recompute_schedule();
    }

    /// Blocks until every outstanding geocoding pass settles, then syncs the
    /// map. The report covers all joined passes.
    pub fn wait_for_geocoding(&mut self) -> PassReport {
        let mut report = PassReport::default();
        for pass in self.passes.drain(..) {
            let settled = pass.join();
            report.resolved.extend(settled.resolved);
            report.failed.extend(settled.failed);
        }
        self.sync_map();
        report
    }

    /// Drag-and-drop: moves the stop at `from` to index `to`.
    pub fn move_stop(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        let mut ordered: Vec<StopId> = self.loaded()?.stops.iter().map(|stop| stop.id).collect();
        if from == to || from >= ordered.len() || to >= ordered.len() {
            debug!(from, to, "ignoring no-op stop move");
            return Ok(());
        }

        let moved = ordered.remove(from);
        ordered.insert(to, moved);
        self.routes.reorder_stops(self.route_id, &ordered)?;
        self.reload_stops()
    }

    pub fn add_stop(&mut self, customer_id: CustomerId) -> Result<RouteStop, StoreError> {
        self.loaded()?;
        let stop = self.routes.add_stop(self.route_id, customer_id)?;
        if !self.all_customers.iter().any(|customer| customer.id == customer_id) {
            let customer = self.customers.customer(customer_id)?;
            self.all_customers.push(customer);
        }
        self.reload_stops()?;
        Ok(stop)
    }

    pub fn remove_stop(&mut self, stop_id: StopId) -> Result<(), StoreError> {
        self.loaded()?;
        self.routes.remove_stop(stop_id)?;
        self.reload_stops()
    }

    pub fn set_show_route(&mut self, show_route: bool) {
        self.show_route = show_route;
        self.sync_map();
    }

    /// Applies a start-time keystroke. The schedule updates at once; the
    /// write to the route waits for [`RouteMapView::flush_start_time`].
    ///
    /// Every keystroke restarts the quiet period. Text that does not parse
    /// is never written; the last valid value stays pending.
    pub fn edit_start_time(&mut self, input: &str, now: Instant) {
        self.start_time_input = input.to_string();
        self.start_time = parse_start_time(input);
        self.recompute_schedule();

        if self.start_time.is_some() || input.trim().is_empty() {
            self.start_time_write.push(self.start_time, now);
        } else {
            self.start_time_write.touch(now);
        }
    }

    /// Writes a debounced start time once input has been quiet long enough.
    /// Returns whether a write happened.
    pub fn flush_start_time(&mut self, now: Instant) -> Result<bool, StoreError> {
        let Some(start_time) = self.start_time_write.take_due(now) else {
            return Ok(false);
        };

        let route = self.routes.update_route(
            self.route_id,
            RouteUpdate {
                start_time: Some(start_time),
                ..RouteUpdate::default()
            },
        )?;
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.route = route;
        }
        Ok(true)
    }

    pub fn set_visit_duration(&mut self, minutes: Option<u32>) -> Result<(), StoreError> {
        let route = self.routes.update_route(
            self.route_id,
            RouteUpdate {
                visit_duration_minutes: Some(minutes),
                ..RouteUpdate::default()
            },
        )?;
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.route = route;
        }
        self.recompute_schedule();
        Ok(())
    }

    pub fn route(&self) -> Option<&RouteWithStops> {
        self.loaded.as_ref()
    }

    pub fn stops(&self) -> &[RouteStop] {
        self.loaded.as_ref().map_or(&[], |route| route.stops.as_slice())
    }

    pub fn show_route(&self) -> bool {
        self.show_route
    }

    pub fn start_time_input(&self) -> &str {
        &self.start_time_input
    }

    pub fn start_time_pending(&self) -> bool {
        self.start_time_write.is_pending()
    }

    pub fn leg_durations(&self) -> &[LegDuration] {
        &self.leg_durations
    }

    /// Arrival entries, index-aligned with [`RouteMapView::stops`].
    pub fn schedule(&self) -> &[ArrivalEntry] {
        &self.schedule
    }

    pub fn geometry(&self) -> Option<&Polyline> {
        self.legs.geometry()
    }

    /// Pins for every plotted customer that has a position.
    pub fn pins(&self) -> Vec<MapPin> {
        let orders: HashMap<CustomerId, u32> = self
            .stops()
            .iter()
            .map(|stop| (stop.customer_id, stop.stop_order))
            .collect();
        let cache = self.geocoding.cache();

        self.plotted_customers()
            .iter()
            .filter_map(|customer| {
                Some(MapPin {
                    customer_id: customer.id,
                    position: cache.get(customer.id)?,
                    colour: customer.pin_colour(),
                    stop_order: orders.get(&customer.id).copied(),
                })
            })
            .collect()
    }

    /// Customers not yet on the route, matching `query` on name or city.
    pub fn picker(&self, query: &str) -> Vec<&Customer> {
        let query = query.trim().to_lowercase();
        let on_route: HashSet<CustomerId> =
            self.stops().iter().map(|stop| stop.customer_id).collect();

        self.all_customers
            .iter()
            .filter(|customer| !on_route.contains(&customer.id))
            .filter(|customer| {
                query.is_empty()
                    || customer.name.to_lowercase().contains(&query)
                    || customer
                        .city
                        .as_deref()
                        .is_some_and(|city| city.to_lowercase().contains(&query))
            })
            .collect()
    }

    fn loaded(&self) -> Result<&RouteWithStops, StoreError> {
        self.loaded
            .as_ref()
            .ok_or(StoreError::RouteNotFound(self.route_id))
    }

    fn reload_stops(&mut self) -> Result<(), StoreError> {
        let route = self.routes.route_with_stops(self.route_id)?;
        self.loaded = Some(route);
        self.sync_map();
        Ok(())
    }

    /// Stop customers in stop order first, then the remaining candidates.
    fn plotted_customers(&self) -> Vec<Customer> {
        let by_id: HashMap<CustomerId, &Customer> = self
            .all_customers
            .iter()
            .map(|customer| (customer.id, customer))
            .collect();

        let mut plotted: Vec<Customer> = self
            .stops()
            .iter()
            .filter_map(|stop| by_id.get(&stop.customer_id).map(|customer| (*customer).clone()))
            .collect();
        let on_route: HashSet<CustomerId> = plotted.iter().map(|customer| customer.id).collect();
        plotted.extend(
            self.all_customers
                .iter()
                .filter(|customer| !on_route.contains(&customer.id))
                .cloned(),
        );
        plotted
    }

    fn recompute_schedule(&mut self) {
        let visit_minutes = self
            .loaded
            .as_ref()
            .and_then(|route| route.route.visit_duration_minutes)
            .unwrap_or(self.default_visit_minutes);

        self.schedule = derive_arrival_schedule(
            self.start_time,
            Some(visit_minutes),
            &self.leg_durations,
            self.stops().len(),
        );
    }
}
