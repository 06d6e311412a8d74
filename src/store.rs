//! In-memory customer and route storage.
//!
//! Used by tests and offline demos; production apps implement
//! [`CustomerStore`] and [`RouteStore`] over their backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StoreError;
use crate::model::{
    Customer, CustomerId, RepId, Route, RouteId, RouteStop, RouteUpdate, RouteWithStops, StopId,
};
use crate::traits::{CustomerStore, RouteStore};

#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: Mutex<Vec<Customer>>,
}

impl MemoryCustomerStore {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self {
            customers: Mutex::new(customers),
        }
    }
}

impl CustomerStore for MemoryCustomerStore {
    fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.customers.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.customers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|customer| customer.id == id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound(id))
    }

    fn update_coordinates(&self, id: CustomerId, lat: f64, lng: f64) -> Result<(), StoreError> {
        let mut customers = self.customers.lock().unwrap_or_else(PoisonError::into_inner);
        let customer = customers
            .iter_mut()
            .find(|customer| customer.id == id)
            .ok_or(StoreError::CustomerNotFound(id))?;
        customer.latitude = Some(lat);
        customer.longitude = Some(lng);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RouteTables {
    routes: HashMap<RouteId, Route>,
    stops: Vec<RouteStop>,
    next_route_id: RouteId,
    next_stop_id: StopId,
}

impl RouteTables {
    fn stops_of(&self, route_id: RouteId) -> Vec<RouteStop> {
        let mut stops: Vec<RouteStop> = self
            .stops
            .iter()
            .filter(|stop| stop.route_id == route_id)
            .cloned()
            .collect();
        stops.sort_by_key(|stop| stop.stop_order);
        stops
    }

    fn renumber(&mut self, route_id: RouteId) {
        let ordered: Vec<StopId> = self.stops_of(route_id).iter().map(|stop| stop.id).collect();
        self.apply_order(&ordered);
    }

    fn apply_order(&mut self, ordered: &[StopId]) {
        for (position, stop_id) in ordered.iter().enumerate() {
            if let Some(stop) = self.stops.iter_mut().find(|stop| stop.id == *stop_id) {
                stop.stop_order = position as u32 + 1;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryRouteStore {
    tables: Mutex<RouteTables>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteStore for MemoryRouteStore {
    fn routes_for_rep(&self, rep_id: RepId) -> Result<Vec<Route>, StoreError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|route| route.rep_id == rep_id)
            .cloned()
            .collect();
        routes.sort_by_key(|route| route.id);
        Ok(routes)
    }

    fn create_route(&self, rep_id: RepId, name: &str) -> Result<Route, StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.next_route_id += 1;
        let route = Route {
            id: tables.next_route_id,
            rep_id,
            name: name.to_string(),
            weekday: None,
            start_time: None,
            visit_duration_minutes: None,
        };
        tables.routes.insert(route.id, route.clone());
        Ok(route)
    }

    fn delete_route(&self, route_id: RouteId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .routes
            .remove(&route_id)
            .ok_or(StoreError::RouteNotFound(route_id))?;
        tables.stops.retain(|stop| stop.route_id != route_id);
        Ok(())
    }

    fn route_with_stops(&self, route_id: RouteId) -> Result<RouteWithStops, StoreError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let route = tables
            .routes
            .get(&route_id)
            .cloned()
            .ok_or(StoreError::RouteNotFound(route_id))?;
        Ok(RouteWithStops {
            stops: tables.stops_of(route_id),
            route,
        })
    }

    fn update_route(&self, route_id: RouteId, update: RouteUpdate) -> Result<Route, StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let route = tables
            .routes
            .get_mut(&route_id)
            .ok_or(StoreError::RouteNotFound(route_id))?;

        if let Some(name) = update.name {
            route.name = name;
        }
        if let Some(weekday) = update.weekday {
            route.weekday = weekday;
        }
        if let Some(start_time) = update.start_time {
            route.start_time = start_time;
        }
        if let Some(minutes) = update.visit_duration_minutes {
            route.visit_duration_minutes = minutes;
        }
        Ok(route.clone())
    }

    fn add_stop(
        &self,
        route_id: RouteId,
        customer_id: CustomerId,
    ) -> Result<RouteStop, StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if !tables.routes.contains_key(&route_id) {
            return Err(StoreError::RouteNotFound(route_id));
        }

        tables.next_stop_id += 1;
        let stop = RouteStop {
            id: tables.next_stop_id,
            route_id,
            customer_id,
            stop_order: tables.stops_of(route_id).len() as u32 + 1,
        };
        tables.stops.push(stop.clone());
        Ok(stop)
    }

    fn remove_stop(&self, stop_id: StopId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let index = tables
            .stops
            .iter()
            .position(|stop| stop.id == stop_id)
            .ok_or(StoreError::StopNotFound(stop_id))?;
        let removed = tables.stops.remove(index);
        tables.renumber(removed.route_id);
        Ok(())
    }

    fn reorder_stops(&self, route_id: RouteId, ordered: &[StopId]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if !tables.routes.contains_key(&route_id) {
            return Err(StoreError::RouteNotFound(route_id));
        }

        let mut current: Vec<StopId> =
            tables.stops_of(route_id).iter().map(|stop| stop.id).collect();
        let mut requested = ordered.to_vec();
        current.sort_unstable();
        requested.sort_unstable();
        if current != requested {
            return Err(StoreError::StopSetMismatch { route_id });
        }

        tables.apply_order(ordered);
        Ok(())
    }
}
