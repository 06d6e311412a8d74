//! Predicted arrival times along a route.

use chrono::{NaiveTime, Timelike};

use crate::model::{ArrivalEntry, LegDuration};

/// Visit duration used when the route does not configure one.
pub const DEFAULT_VISIT_MINUTES: u32 = 20;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses a start time as entered or stored ("HH:MM" or "HH:MM:SS").
pub fn parse_start_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .ok()
}

/// Derives one arrival entry per stop from the start time, the visit
/// duration and the leg drive times.
///
/// Legs are looked up by stop index (`legs[i - 1]` for stop `i`); a missing
/// leg counts as zero drive time so the schedule renders before routing
/// completes. Clock times wrap at midnight.
pub fn derive_arrival_schedule(
    start_time: Option<NaiveTime>,
    visit_minutes: Option<u32>,
    legs: &[LegDuration],
    stop_count: usize,
) -> Vec<ArrivalEntry> {
    let Some(start) = start_time else {
        return Vec::new();
    };

    // Only the time of day matters, so whole days are dropped up front.
    let visit_minutes = visit_minutes.unwrap_or(DEFAULT_VISIT_MINUTES) % MINUTES_PER_DAY;
    let mut clock = start.hour() * 60 + start.minute();
    let mut schedule = Vec::with_capacity(stop_count);

    for index in 0..stop_count {
        let leg = index.checked_sub(1).and_then(|prev| legs.get(prev));
        let drive_minutes = leg.map_or(0, |leg| leg.seconds.div_ceil(60) % MINUTES_PER_DAY);

        clock = (clock + drive_minutes) % MINUTES_PER_DAY;
        schedule.push(ArrivalEntry {
            arrival: format!("{:02}:{:02}", clock / 60, clock % 60),
            drive: leg.map(|leg| leg.text.clone()).unwrap_or_default(),
        });
        clock = (clock + visit_minutes) % MINUTES_PER_DAY;
    }

    schedule
}
