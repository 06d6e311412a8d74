//! Real Berlin addresses for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. These are routable locations
//! that work with OSRM Berlin data.

use fieldroute::model::{AbcClass, Customer};

/// A named address with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub street: &'static str,
    pub postal_code: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(
        name: &'static str,
        street: &'static str,
        postal_code: &'static str,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self {
            name,
            street,
            postal_code,
            lat,
            lng,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    /// Customer with an address but no persisted position.
    pub fn customer(&self, id: i64) -> Customer {
        Customer::new(id, self.name).with_address(self.street, self.postal_code, "Berlin")
    }

    /// Customer whose position is already persisted.
    pub fn located_customer(&self, id: i64) -> Customer {
        self.customer(id).with_position(self.lat, self.lng)
    }
}

pub const SHOPS: &[Location] = &[
    Location::new("KaDeWe", "Tauentzienstraße 21-24", "10789", 52.5015, 13.3411),
    Location::new("Markthalle Neun", "Eisenbahnstraße 42/43", "10997", 52.5021, 13.4318),
    Location::new("Galeries Lafayette", "Friedrichstraße 76-78", "10117", 52.5135, 13.3891),
    Location::new("Alexa", "Grunerstraße 20", "10179", 52.5197, 13.4149),
    Location::new("Bikini Berlin", "Budapester Straße 38-50", "10787", 52.5055, 13.3374),
    Location::new("Schönhauser Allee Arcaden", "Schönhauser Allee 78", "10439", 52.5492, 13.4139),
];

/// Customers for `SHOPS`, ids starting at `first_id`, classes cycling A, B, C.
pub fn shop_customers(first_id: i64, located: bool) -> Vec<Customer> {
    let classes = [AbcClass::A, AbcClass::B, AbcClass::C];
    SHOPS
        .iter()
        .enumerate()
        .map(|(i, shop)| {
            let id = first_id + i as i64;
            let customer = if located {
                shop.located_customer(id)
            } else {
                shop.customer(id)
            };
            customer.with_class(classes[i % classes.len()])
        })
        .collect()
}
