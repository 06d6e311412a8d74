//! Domain records shared by the map, the stores and the schedule.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub type CustomerId = i64;
pub type RouteId = i64;
pub type StopId = i64;
pub type RepId = i64;

/// Geographic position as (latitude, longitude).
pub type LatLng = (f64, f64);

/// ABC classification tag. Only used to colour map pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn pin_colour(self) -> &'static str {
        match self {
            AbcClass::A => "#16a34a",
            AbcClass::B => "#f59e0b",
            AbcClass::C => "#dc2626",
        }
    }
}

/// Pin colour for customers without a classification.
pub const UNCLASSIFIED_PIN_COLOUR: &str = "#6b7280";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub abc_class: Option<AbcClass>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            street: None,
            postal_code: None,
            city: None,
            latitude: None,
            longitude: None,
            abc_class: None,
        }
    }

    pub fn with_address(
        mut self,
        street: impl Into<String>,
        postal_code: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        self.street = Some(street.into());
        self.postal_code = Some(postal_code.into());
        self.city = Some(city.into());
        self
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lng);
        self
    }

    pub fn with_class(mut self, class: AbcClass) -> Self {
        self.abc_class = Some(class);
        self
    }

    /// Persisted position, only when both halves are present.
    pub fn persisted_position(&self) -> Option<LatLng> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn address(&self) -> Address<'_> {
        Address {
            street: self.street.as_deref(),
            postal_code: self.postal_code.as_deref(),
            city: self.city.as_deref(),
        }
    }

    pub fn pin_colour(&self) -> &'static str {
        self.abc_class
            .map(AbcClass::pin_colour)
            .unwrap_or(UNCLASSIFIED_PIN_COLOUR)
    }
}

/// Borrowed postal address used to build a geocoding query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Address<'a> {
    pub street: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub city: Option<&'a str>,
}

impl Address<'_> {
    /// Normalized query text: "street, postal, city, country" with empty
    /// parts omitted. `None` when street, postal code and city are all empty.
    pub fn query(&self, country: &str) -> Option<String> {
        let parts: Vec<&str> = [self.street, self.postal_code, self.city]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            return None;
        }

        let mut query = parts.join(", ");
        let country = country.trim();
        if !country.is_empty() {
            query.push_str(", ");
            query.push_str(country);
        }
        Some(query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub rep_id: RepId,
    pub name: String,
    pub weekday: Option<Weekday>,
    pub start_time: Option<NaiveTime>,
    pub visit_duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    pub id: StopId,
    pub route_id: RouteId,
    pub customer_id: CustomerId,
    /// 1-based, contiguous within a route.
    pub stop_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWithStops {
    pub route: Route,
    /// Sorted by `stop_order`.
    pub stops: Vec<RouteStop>,
}

/// Partial update of a route. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteUpdate {
    pub name: Option<String>,
    pub weekday: Option<Option<Weekday>>,
    pub start_time: Option<Option<NaiveTime>>,
    pub visit_duration_minutes: Option<Option<u32>>,
}

/// Drive time of one leg between consecutive routed stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegDuration {
    pub seconds: u32,
    pub text: String,
}

impl LegDuration {
    pub fn from_seconds(seconds: u32) -> Self {
        Self {
            seconds,
            text: duration_text(seconds),
        }
    }
}

/// Human readable drive time, e.g. "10 min" or "1 h 5 min".
pub fn duration_text(seconds: u32) -> String {
    if seconds == 0 {
        return "0 min".to_string();
    }
    let minutes = (seconds.saturating_add(30) / 60).max(1);
    if minutes < 60 {
        format!("{} min", minutes)
    } else if minutes % 60 == 0 {
        format!("{} h", minutes / 60)
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

/// Predicted arrival at one stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEntry {
    pub arrival: String,
    pub drive: String,
}

/// A customer marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPin {
    pub customer_id: CustomerId,
    pub position: LatLng,
    pub colour: &'static str,
    /// Set when the customer is a stop of the displayed route.
    pub stop_order: Option<u32>,
}
