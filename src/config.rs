//! Runtime configuration for the route map.

use std::str::FromStr;
use std::time::Duration;

use crate::coords::GeocodePolicy;
use crate::error::ConfigError;
use crate::geocode::NominatimConfig;
use crate::osrm::OsrmConfig;
use crate::schedule::DEFAULT_VISIT_MINUTES;

#[derive(Debug, Clone)]
pub struct MapConfig {
    pub geocoder: NominatimConfig,
    pub osrm: OsrmConfig,
    pub geocode_policy: GeocodePolicy,
    /// Appended to every geocoding query.
    pub country: String,
    pub default_visit_minutes: u32,
    /// Quiet period before an edited start time is written back.
    pub start_time_debounce: Duration,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            geocoder: NominatimConfig::default(),
            osrm: OsrmConfig::default(),
            geocode_policy: GeocodePolicy::default(),
            country: "Germany".to_string(),
            default_visit_minutes: DEFAULT_VISIT_MINUTES,
            start_time_debounce: Duration::from_millis(500),
        }
    }
}

impl MapConfig {
    /// Reads `FIELDROUTE_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("FIELDROUTE_GEOCODER_URL") {
            config.geocoder.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(agent) = lookup("FIELDROUTE_GEOCODER_USER_AGENT") {
            config.geocoder.user_agent = agent;
        }
        if let Some(url) = lookup("FIELDROUTE_OSRM_URL") {
            config.osrm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(profile) = lookup("FIELDROUTE_OSRM_PROFILE") {
            config.osrm.profile = profile;
        }
        if let Some(country) = lookup("FIELDROUTE_COUNTRY") {
            config.country = country;
        }

        parse_into(&lookup, "FIELDROUTE_HTTP_TIMEOUT_SECS", |secs: u64| {
            config.geocoder.timeout_secs = secs;
            config.osrm.timeout_secs = secs;
        })?;
        parse_into(&lookup, "FIELDROUTE_GEOCODE_MAX_PER_PASS", |max: usize| {
            config.geocode_policy.max_per_pass = max;
        })?;
        parse_into(&lookup, "FIELDROUTE_GEOCODE_BATCH_SIZE", |size: usize| {
            config.geocode_policy.batch_size = size;
        })?;
        parse_into(&lookup, "FIELDROUTE_VISIT_MINUTES", |minutes: u32| {
            config.default_visit_minutes = minutes;
        })?;
        parse_into(&lookup, "FIELDROUTE_START_TIME_DEBOUNCE_MS", |ms: u64| {
            config.start_time_debounce = Duration::from_millis(ms);
        })?;

        if config.geocode_policy.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "FIELDROUTE_GEOCODE_BATCH_SIZE".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_into<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    apply: impl FnOnce(T),
) -> Result<(), ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    let value = raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.clone(),
    })?;
    apply(value);
    Ok(())
}
