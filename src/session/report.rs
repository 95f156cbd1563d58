//! Volume and report calculation
//!
//! Two phases: an *estimated* report computed locally from the working set
//! for immediate feedback, and the *authoritative* report the store computes
//! from the submitted payload plus its own history. The two are never merged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::overrides::WorkingExercise;
use crate::error::{WorkoutError, WorkoutResult};
use crate::exercises::{LoadValue, MuscleGroup, parse_load};

/// One exercise as performed, frozen at submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSnapshot {
    pub exercise_id: String,
    pub name: String,
    pub original_name: String,
    pub muscle_group: MuscleGroup,
    pub sets: u32,
    pub reps: u32,
    pub load: String,
    pub completed: bool,
    pub was_modified: bool,
}

impl ExerciseSnapshot {
    pub fn volume(&self) -> u64 {
        if !self.completed {
            return 0;
        }
        set_volume(self.sets, self.reps, &self.load)
    }
}

/// Body of a "finish workout" request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub day_number: u32,
    pub day_name: String,
    pub duration_minutes: u32,
    pub exercises: Vec<ExerciseSnapshot>,
}

/// Load delta of one exercise versus its previous recorded load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadChange {
    pub exercise_name: String,
    pub previous_load: String,
    pub current_load: String,
    /// Signed, one decimal; positive means the load went up
    pub change_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    /// Loads differ but the rounded percentage is 0
    Flat,
}

impl LoadChange {
    pub fn direction(&self) -> Direction {
        if self.change_pct > 0.0 {
            Direction::Up
        } else if self.change_pct < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

/// Authoritative session report, as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub total_volume: u64,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub load_changes: Vec<LoadChange>,
}

/// Local preview shown before the store answers. Carries no load changes:
/// only the store has the baseline for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatedReport {
    pub total_volume: u64,
    pub total_exercises: usize,
    pub completed_exercises: usize,
}

/// Stored, immutable record of a finished workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub day_number: u32,
    pub day_name: String,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub exercises: Vec<ExerciseSnapshot>,
    pub report: Report,
}

fn set_volume(sets: u32, reps: u32, load: &str) -> u64 {
    u64::from(sets) * u64::from(reps) * u64::from(parse_load(load))
}

/// Σ sets × reps × load over completed exercises. Time-based (0 reps) and
/// bodyweight exercises contribute nothing.
pub fn estimate_volume(exercises: &[WorkingExercise], completed: &HashSet<String>) -> u64 {
    exercises
        .iter()
        .filter(|w| completed.contains(w.id()))
        .map(|w| set_volume(w.exercise.sets, w.exercise.reps, &w.exercise.current_load))
        .sum()
}

pub fn estimate_report(exercises: &[WorkingExercise], completed: &HashSet<String>) -> EstimatedReport {
    EstimatedReport {
        total_volume: estimate_volume(exercises, completed),
        total_exercises: exercises.len(),
        completed_exercises: exercises.iter().filter(|w| completed.contains(w.id())).count(),
    }
}

/// Parse the user-typed duration; a positive whole number of minutes
pub fn parse_duration(raw: &str) -> WorkoutResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WorkoutError::validation("duration", "workout duration is required"));
    }
    match raw.parse::<u32>() {
        Ok(0) => Err(WorkoutError::validation("duration", "duration must be positive")),
        Ok(minutes) => Ok(minutes),
        Err(_) => Err(WorkoutError::validation(
            "duration",
            format!("'{}' is not a whole number of minutes", raw),
        )),
    }
}

/// Freeze the working set into a submission payload, preserving order and
/// each exercise's modification audit fields
pub fn build_session_payload(
    day_number: u32,
    day_name: &str,
    exercises: &[WorkingExercise],
    completed: &HashSet<String>,
    duration_minutes: u32,
) -> WorkoutResult<SessionPayload> {
    if duration_minutes == 0 {
        return Err(WorkoutError::validation("duration", "duration must be positive"));
    }

    let snapshots = exercises
        .iter()
        .map(|w| ExerciseSnapshot {
            exercise_id: w.exercise.id.clone(),
            name: w.exercise.name.clone(),
            original_name: w.original_name.clone(),
            muscle_group: w.exercise.muscle_group,
            sets: w.exercise.sets,
            reps: w.exercise.reps,
            load: w.exercise.current_load.clone(),
            completed: completed.contains(w.id()),
            was_modified: w.was_modified,
        })
        .collect();

    Ok(SessionPayload {
        day_number,
        day_name: day_name.to_string(),
        duration_minutes,
        exercises: snapshots,
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn load_change(snapshot: &ExerciseSnapshot, previous: &ExerciseSnapshot) -> Option<LoadChange> {
    let current = match LoadValue::parse(&snapshot.load)? {
        LoadValue::Weight(v) => v,
        LoadValue::Bodyweight => return None,
    };
    let before = match LoadValue::parse(&previous.load)? {
        LoadValue::Weight(v) if v > 0 => v,
        _ => return None,
    };
    if current == before {
        return None;
    }

    let pct = (f64::from(current) - f64::from(before)) / f64::from(before) * 100.0;
    Some(LoadChange {
        exercise_name: snapshot.name.clone(),
        previous_load: previous.load.clone(),
        current_load: snapshot.load.clone(),
        change_pct: round_one_decimal(pct),
    })
}

/// Store-side report: volume over completed snapshots, load changes against
/// the same exercise in `previous` (the latest earlier session of the day)
pub fn authoritative_report(payload: &SessionPayload, previous: Option<&WorkoutSession>) -> Report {
    let baseline: HashMap<&str, &ExerciseSnapshot> = previous
        .map(|s| s.exercises.iter().map(|e| (e.exercise_id.as_str(), e)).collect())
        .unwrap_or_default();

    let load_changes = payload
        .exercises
        .iter()
        .filter_map(|ex| {
            let before = baseline.get(ex.exercise_id.as_str())?;
            load_change(ex, before)
        })
        .collect();

    Report {
        total_volume: payload.exercises.iter().map(ExerciseSnapshot::volume).sum(),
        total_exercises: payload.exercises.len(),
        completed_exercises: payload.exercises.iter().filter(|e| e.completed).count(),
        load_changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::{BODYWEIGHT, Exercise};

    fn working(id: &str, sets: u32, reps: u32, load: &str) -> WorkingExercise {
        WorkingExercise::from_store(Exercise {
            id: id.to_string(),
            name: format!("Exercise {}", id),
            muscle_group: MuscleGroup::Chest,
            sets,
            reps,
            current_load: load.to_string(),
            rest_seconds: 60,
            notes: String::new(),
        })
    }

    fn done(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn snapshot(id: &str, load: &str) -> ExerciseSnapshot {
        ExerciseSnapshot {
            exercise_id: id.to_string(),
            name: format!("Exercise {}", id),
            original_name: format!("Exercise {}", id),
            muscle_group: MuscleGroup::Back,
            sets: 4,
            reps: 10,
            load: load.to_string(),
            completed: true,
            was_modified: false,
        }
    }

    fn session_with(exercises: Vec<ExerciseSnapshot>) -> WorkoutSession {
        let payload = SessionPayload {
            day_number: 1,
            day_name: "Day 1".to_string(),
            duration_minutes: 50,
            exercises,
        };
        WorkoutSession {
            id: "s-0".to_string(),
            day_number: 1,
            day_name: payload.day_name.clone(),
            completed_at: Utc::now(),
            duration_minutes: 50,
            report: authoritative_report(&payload, None),
            exercises: payload.exercises,
        }
    }

    #[test]
    fn test_volume_empty_completed_set() {
        let exercises = vec![working("a", 4, 10, "20")];
        assert_eq!(estimate_volume(&exercises, &HashSet::new()), 0);
    }

    #[test]
    fn test_volume_day_one_scenario() {
        let exercises = vec![working("a", 4, 10, "20"), working("b", 3, 12, "bodyweight")];
        assert_eq!(estimate_volume(&exercises, &done(&["a"])), 800);
        assert_eq!(estimate_volume(&exercises, &done(&["a", "b"])), 800);
    }

    #[test]
    fn test_volume_skips_timed_exercise() {
        let exercises = vec![working("a", 4, 10, "20"), working("t", 1, 0, "30")];
        assert_eq!(estimate_volume(&exercises, &done(&["a", "t"])), 800);
    }

    #[test]
    fn test_estimate_report_counts() {
        let exercises = vec![working("a", 4, 10, "20"), working("b", 3, 10, "10")];
        let report = estimate_report(&exercises, &done(&["b"]));
        assert_eq!(report.total_volume, 300);
        assert_eq!(report.total_exercises, 2);
        assert_eq!(report.completed_exercises, 1);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(" 60 ").unwrap(), 60);
        assert!(parse_duration("").unwrap_err().is_validation());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("an hour").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn test_payload_preserves_order_and_audit_fields() {
        let mut edited = working("b", 3, 10, "10");
        edited.exercise.name = "Swapped".to_string();
        edited.was_modified = true;
        let exercises = vec![working("a", 4, 10, "20"), edited];

        let payload = build_session_payload(1, "Day 1", &exercises, &done(&["b"]), 45).unwrap();
        assert_eq!(payload.exercises.len(), 2);
        assert_eq!(payload.exercises[0].exercise_id, "a");
        assert!(!payload.exercises[0].completed);

        let b = &payload.exercises[1];
        assert!(b.completed);
        assert!(b.was_modified);
        assert_eq!(b.name, "Swapped");
        assert_eq!(b.original_name, "Exercise b");
    }

    #[test]
    fn test_payload_requires_positive_duration() {
        let exercises = vec![working("a", 4, 10, "20")];
        let err = build_session_payload(1, "Day 1", &exercises, &done(&["a"]), 0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_report_load_changes() {
        let previous = session_with(vec![snapshot("a", "20"), snapshot("b", "40"), snapshot("c", "15")]);
        let payload = SessionPayload {
            day_number: 1,
            day_name: "Day 1".to_string(),
            duration_minutes: 60,
            exercises: vec![snapshot("a", "22kg"), snapshot("b", "35"), snapshot("c", "15")],
        };

        let report = authoritative_report(&payload, Some(&previous));
        assert_eq!(report.load_changes.len(), 2);

        let up = &report.load_changes[0];
        assert_eq!(up.previous_load, "20");
        assert_eq!(up.current_load, "22kg");
        assert_eq!(up.change_pct, 10.0);
        assert_eq!(up.direction(), Direction::Up);

        let down = &report.load_changes[1];
        assert_eq!(down.change_pct, -12.5);
        assert_eq!(down.direction(), Direction::Down);
    }

    #[test]
    fn test_tiny_change_is_flat() {
        let previous = session_with(vec![snapshot("a", "10000")]);
        let payload = SessionPayload {
            day_number: 1,
            day_name: "Day 1".to_string(),
            duration_minutes: 60,
            exercises: vec![snapshot("a", "10001")],
        };

        let report = authoritative_report(&payload, Some(&previous));
        assert_eq!(report.load_changes.len(), 1);
        assert_eq!(report.load_changes[0].change_pct, 0.0);
        assert_eq!(report.load_changes[0].direction(), Direction::Flat);
    }

    #[test]
    fn test_report_never_changes_bodyweight() {
        let previous = session_with(vec![snapshot("a", "20"), snapshot("b", BODYWEIGHT)]);
        let payload = SessionPayload {
            day_number: 1,
            day_name: "Day 1".to_string(),
            duration_minutes: 60,
            exercises: vec![snapshot("a", BODYWEIGHT), snapshot("b", "10")],
        };
        let report = authoritative_report(&payload, Some(&previous));
        assert!(report.load_changes.is_empty());
    }

    #[test]
    fn test_report_without_previous_session() {
        let payload = SessionPayload {
            day_number: 2,
            day_name: "Day 2".to_string(),
            duration_minutes: 30,
            exercises: vec![snapshot("a", "20"), snapshot("b", "7")],
        };
        let report = authoritative_report(&payload, None);
        assert!(report.load_changes.is_empty());
        assert_eq!(report.total_volume, 4 * 10 * 20 + 4 * 10 * 7);
        assert_eq!(report.completed_exercises, 2);
    }

    #[test]
    fn test_change_pct_rounds_to_one_decimal() {
        let previous = session_with(vec![snapshot("a", "30")]);
        let payload = SessionPayload {
            day_number: 1,
            day_name: "Day 1".to_string(),
            duration_minutes: 60,
            exercises: vec![snapshot("a", "35")],
        };
        let report = authoritative_report(&payload, Some(&previous));
        assert_eq!(report.load_changes[0].change_pct, 16.7);
    }
}
