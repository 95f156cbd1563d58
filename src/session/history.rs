//! Load history series - append-only record of loads for one exercise

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WorkoutError, WorkoutResult};
use crate::exercises::{LoadValue, load_parse_error};

/// One recorded load attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadEntry {
    pub id: String,
    pub exercise_id: String,
    pub exercise_name: String,
    /// Load as typed by the user ("22kg")
    pub load: String,
    /// Parsed numeric value of `load`
    pub value: u32,
    pub sets: u32,
    pub reps: u32,
    pub day_number: Option<u32>,
    pub recorded_at: DateTime<Utc>,
}

/// Request to append a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoadEntry {
    pub exercise_id: String,
    pub exercise_name: String,
    pub load: String,
    pub sets: u32,
    pub reps: u32,
    /// When set, the store also makes `load` the exercise's current load
    pub day_number: Option<u32>,
}

/// Circumstances of an append
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub exercise_name: String,
    pub sets: u32,
    pub reps: u32,
    pub day_number: Option<u32>,
    pub recorded_at: DateTime<Utc>,
}

impl LoadContext {
    pub fn from_request(entry: &NewLoadEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            exercise_name: entry.exercise_name.clone(),
            sets: entry.sets,
            reps: entry.reps,
            day_number: entry.day_number,
            recorded_at,
        }
    }
}

/// Chart point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub recorded_at: DateTime<Utc>,
    pub value: u32,
}

/// Validate a load typed for the history. Only real weights are accepted:
/// unparsable strings and the bodyweight sentinel are rejected.
pub fn parse_history_load(raw: &str) -> WorkoutResult<u32> {
    match LoadValue::parse(raw) {
        Some(LoadValue::Weight(value)) => Ok(value),
        Some(LoadValue::Bodyweight) => Err(WorkoutError::validation(
            "load",
            "bodyweight exercises have no load history",
        )),
        None => Err(WorkoutError::validation("load", load_parse_error(raw))),
    }
}

/// Chronological load series of a single exercise
#[derive(Debug, Clone, Default)]
pub struct LoadHistory {
    exercise_id: String,
    entries: Vec<LoadEntry>,
}

impl LoadHistory {
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self { exercise_id: exercise_id.into(), entries: Vec::new() }
    }

    /// Build from fetched entries; foreign entries are dropped and the rest
    /// ordered by timestamp (stable for equal timestamps)
    pub fn from_entries(exercise_id: impl Into<String>, mut entries: Vec<LoadEntry>) -> Self {
        let exercise_id = exercise_id.into();
        entries.retain(|e| e.exercise_id == exercise_id);
        entries.sort_by_key(|e| e.recorded_at);
        Self { exercise_id, entries }
    }

    pub fn exercise_id(&self) -> &str {
        &self.exercise_id
    }

    /// Append a new attempt. Nothing is recorded when the load is not a real
    /// weight or the timestamp precedes the newest entry.
    pub fn append(&mut self, load: &str, context: LoadContext) -> WorkoutResult<&LoadEntry> {
        let value = parse_history_load(load)?;

        if let Some(last) = self.entries.last()
            && context.recorded_at < last.recorded_at
        {
            return Err(WorkoutError::validation(
                "recorded_at",
                format!("{} precedes the latest entry", context.recorded_at.to_rfc3339()),
            ));
        }

        let index = self.entries.len();
        self.entries.push(LoadEntry {
            id: Uuid::new_v4().to_string(),
            exercise_id: self.exercise_id.clone(),
            exercise_name: context.exercise_name,
            load: load.trim().to_string(),
            value,
            sets: context.sets,
            reps: context.reps,
            day_number: context.day_number,
            recorded_at: context.recorded_at,
        });
        Ok(&self.entries[index])
    }

    /// Value of the entry just before the newest one
    pub fn previous_value(&self) -> Option<u32> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        Some(self.entries[len - 2].value)
    }

    pub fn latest_value(&self) -> Option<u32> {
        self.entries.last().map(|e| e.value)
    }

    pub fn latest(&self) -> Option<&LoadEntry> {
        self.entries.last()
    }

    /// Entries oldest first
    pub fn entries(&self) -> &[LoadEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LoadEntry> {
        self.entries
    }

    pub fn trend(&self) -> Vec<TrendPoint> {
        self.entries
            .iter()
            .map(|e| TrendPoint { recorded_at: e.recorded_at, value: e.value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn context_at(recorded_at: DateTime<Utc>) -> LoadContext {
        LoadContext {
            exercise_name: "Leg press".to_string(),
            sets: 4,
            reps: 8,
            day_number: Some(1),
            recorded_at,
        }
    }

    #[test]
    fn test_first_entry_has_no_previous_value() {
        let mut history = LoadHistory::new("ex-1");
        history.append("22kg", context_at(Utc::now())).unwrap();
        assert_eq!(history.previous_value(), None);
        assert_eq!(history.latest_value(), Some(22));
    }

    #[test]
    fn test_previous_value_is_parsed() {
        let start = Utc::now();
        let mut history = LoadHistory::new("ex-1");
        history.append("22kg", context_at(start)).unwrap();
        history.append("25kg", context_at(start + Duration::days(2))).unwrap();

        assert_eq!(history.previous_value(), Some(22));
        assert_eq!(history.entries()[0].load, "22kg");
    }

    #[test]
    fn test_unparsable_load_is_rejected() {
        let mut history = LoadHistory::new("ex-1");
        let err = history.append("heavy", context_at(Utc::now())).unwrap_err();
        assert!(err.is_validation());
        assert!(history.is_empty());
    }

    #[test]
    fn test_overflowing_load_is_rejected() {
        let mut history = LoadHistory::new("ex-1");
        match history.append("5000000000kg", context_at(Utc::now())) {
            Err(WorkoutError::Validation { reason, .. }) => assert!(reason.contains("too large")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(history.is_empty());
    }

    #[test]
    fn test_bodyweight_is_rejected() {
        let mut history = LoadHistory::new("ex-1");
        assert!(history.append("bodyweight", context_at(Utc::now())).is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn test_out_of_order_timestamp_is_rejected() {
        let now = Utc::now();
        let mut history = LoadHistory::new("ex-1");
        history.append("20", context_at(now)).unwrap();
        assert!(history.append("22", context_at(now - Duration::hours(1))).is_err());
        assert_eq!(history.len(), 1);

        // equal timestamps keep the series non-decreasing
        assert!(history.append("22", context_at(now)).is_ok());
    }

    #[test]
    fn test_from_entries_orders_and_filters() {
        let now = Utc::now();
        let mut a = LoadHistory::new("ex-1");
        a.append("20", context_at(now)).unwrap();
        a.append("25", context_at(now + Duration::days(1))).unwrap();
        let mut entries = a.into_entries();
        entries.reverse();

        let mut foreign = LoadHistory::new("ex-2");
        foreign.append("99", context_at(now)).unwrap();
        entries.extend(foreign.into_entries());

        let history = LoadHistory::from_entries("ex-1", entries);
        let values: Vec<u32> = history.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![20, 25]);
    }

    #[test]
    fn test_trend_is_chronological() {
        let now = Utc::now();
        let mut history = LoadHistory::new("ex-1");
        for (i, load) in ["10", "12", "15"].iter().enumerate() {
            history.append(load, context_at(now + Duration::days(i as i64))).unwrap();
        }
        let trend = history.trend();
        assert_eq!(trend.iter().map(|p| p.value).collect::<Vec<_>>(), vec![10, 12, 15]);
        // restartable
        assert_eq!(history.iter().count(), history.iter().count());
    }
}
