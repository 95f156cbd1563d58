//! Workout store - request/response contract to the persistent plan store
//!
//! The core never owns durable data. Everything it reads or writes crosses
//! this trait, and every call names the user explicitly.

pub mod memory;

pub use memory::MemoryStore;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::exercises::{Exercise, ExerciseDraft, ExercisePatch, default_plan};
use crate::session::history::{LoadEntry, NewLoadEntry};
use crate::session::next_day::select_next_day;
use crate::session::report::{SessionPayload, WorkoutSession};

/// Upper bound on days per user plan
pub const MAX_DAYS: u32 = 4;

/// Opaque user identifier passed into every store call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One day of the plan with its ordered exercises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDay {
    pub day_number: u32,
    pub name: String,
    pub exercises: Vec<Exercise>,
}

impl WorkoutDay {
    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }
}

/// Latest completion of a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastSession {
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Next-workout recommendation with the inputs it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextWorkout {
    pub next_day: Option<u32>,
    pub last_sessions: BTreeMap<u32, LastSession>,
    pub total_days: usize,
}

impl NextWorkout {
    /// Build from the day numbers of the plan and the stored sessions
    pub fn from_history(days: &[u32], sessions: &[WorkoutSession]) -> Self {
        let mut last_sessions: BTreeMap<u32, LastSession> = BTreeMap::new();
        for session in sessions {
            let newer = last_sessions
                .get(&session.day_number)
                .is_none_or(|seen| seen.completed_at < session.completed_at);
            if newer {
                last_sessions.insert(
                    session.day_number,
                    LastSession {
                        completed_at: session.completed_at,
                        duration_minutes: session.duration_minutes,
                    },
                );
            }
        }

        let last_completed: HashMap<u32, DateTime<Utc>> = last_sessions
            .iter()
            .filter(|(day, _)| days.contains(day))
            .map(|(day, last)| (*day, last.completed_at))
            .collect();

        Self {
            next_day: select_next_day(days, &last_completed),
            last_sessions,
            total_days: days.len(),
        }
    }
}

/// Logical operations of the external plan store.
///
/// Reads are idempotent. `create_day`, `delete_day`, `add_exercise`,
/// `append_load` and `create_session` create or destroy records.
pub trait WorkoutStore {
    fn list_days(&self, user: &UserId) -> StoreResult<Vec<WorkoutDay>>;
    fn get_day(&self, user: &UserId, day_number: u32) -> StoreResult<WorkoutDay>;
    /// New day numbered after the current last day
    fn create_day(&self, user: &UserId, name: Option<&str>) -> StoreResult<WorkoutDay>;
    fn delete_day(&self, user: &UserId, day_number: u32) -> StoreResult<()>;

    fn add_exercise(&self, user: &UserId, day_number: u32, draft: &ExerciseDraft) -> StoreResult<Exercise>;
    fn update_exercise(
        &self,
        user: &UserId,
        day_number: u32,
        exercise_id: &str,
        patch: &ExercisePatch,
    ) -> StoreResult<Exercise>;
    fn delete_exercise(&self, user: &UserId, day_number: u32, exercise_id: &str) -> StoreResult<()>;
    /// Set the current load only; also recorded in the load history
    fn update_load(&self, user: &UserId, day_number: u32, exercise_id: &str, load: &str) -> StoreResult<()>;

    fn load_history(&self, user: &UserId, exercise_id: &str) -> StoreResult<Vec<LoadEntry>>;
    /// Append one entry and return the updated series
    fn append_load(&self, user: &UserId, entry: &NewLoadEntry) -> StoreResult<Vec<LoadEntry>>;

    /// Store a finished session; the response carries the computed report
    fn create_session(&self, user: &UserId, payload: &SessionPayload) -> StoreResult<WorkoutSession>;
    /// Newest first
    fn list_sessions(&self, user: &UserId) -> StoreResult<Vec<WorkoutSession>>;
    fn get_session(&self, user: &UserId, session_id: &str) -> StoreResult<WorkoutSession>;

    fn next_workout(&self, user: &UserId) -> StoreResult<NextWorkout>;
}

pub fn default_day_name(day_number: u32) -> String {
    format!("Day {}", day_number)
}

/// Install the default plan for a user without days. Returns the number of
/// days created.
pub fn seed_default_plan<S: WorkoutStore + ?Sized>(store: &S, user: &UserId) -> StoreResult<usize> {
    if !store.list_days(user)?.is_empty() {
        return Ok(0);
    }

    let plan = default_plan();
    for (name, exercises) in plan.iter() {
        let day = store.create_day(user, Some(name))?;
        for seed in exercises.iter() {
            store.add_exercise(user, day.day_number, &seed.draft())?;
        }
    }
    info!("Seeded {} days for {}", plan.len(), user);
    Ok(plan.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::report::Report;
    use chrono::TimeZone;

    fn session(day_number: u32, day: u32, duration_minutes: u32) -> WorkoutSession {
        WorkoutSession {
            id: format!("s-{}-{}", day_number, day),
            day_number,
            day_name: default_day_name(day_number),
            completed_at: Utc.with_ymd_and_hms(2024, 1, day, 18, 0, 0).unwrap(),
            duration_minutes,
            exercises: vec![],
            report: Report {
                total_volume: 0,
                total_exercises: 0,
                completed_exercises: 0,
                load_changes: vec![],
            },
        }
    }

    #[test]
    fn test_next_workout_keeps_latest_per_day() {
        let sessions = vec![session(1, 1, 40), session(1, 8, 55), session(2, 3, 60)];
        let next = NextWorkout::from_history(&[1, 2, 3], &sessions);

        assert_eq!(next.total_days, 3);
        assert_eq!(next.next_day, Some(3));
        assert_eq!(next.last_sessions[&1].duration_minutes, 55);
        assert_eq!(next.last_sessions[&2].duration_minutes, 60);
    }

    #[test]
    fn test_next_workout_oldest_day() {
        let sessions = vec![session(1, 8, 40), session(2, 3, 60)];
        let next = NextWorkout::from_history(&[1, 2], &sessions);
        assert_eq!(next.next_day, Some(2));
    }

    #[test]
    fn test_seed_only_once() {
        let store = MemoryStore::new();
        let user = UserId::from("andrea");
        assert_eq!(seed_default_plan(&store, &user).unwrap(), 3);
        assert_eq!(seed_default_plan(&store, &user).unwrap(), 0);

        let days = store.list_days(&user).unwrap();
        assert_eq!(days.iter().map(|d| d.day_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(days[0].exercises.len(), 7);
        assert!(days[0].exercises.last().unwrap().is_bodyweight());
    }
}
