//! Next-day selection - round-robin through the plan by completion recency

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Pick the day the user should train next.
///
/// The earliest day (in `days` order) with no completion wins. When every day
/// has been completed, the day completed longest ago wins, ties going to the
/// lowest day number. Returns `None` for an empty plan.
pub fn select_next_day(days: &[u32], last_completed: &HashMap<u32, DateTime<Utc>>) -> Option<u32> {
    if let Some(never_done) = days.iter().find(|d| !last_completed.contains_key(d)) {
        return Some(*never_done);
    }

    days.iter()
        .filter_map(|d| last_completed.get(d).map(|at| (*at, *d)))
        .min()
        .map(|(_, day)| day)
}
