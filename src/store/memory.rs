//! In-memory store for tests and dry runs.
//!
//! Behaves like the SQLite store and lets callers inject read/write failures,
//! pin the clock and count write attempts.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{MAX_DAYS, NextWorkout, UserId, WorkoutDay, WorkoutStore, default_day_name};
use crate::error::{StoreError, StoreResult};
use crate::exercises::{Exercise, ExerciseDraft, ExercisePatch};
use crate::session::history::{LoadContext, LoadEntry, LoadHistory, NewLoadEntry};
use crate::session::report::{SessionPayload, WorkoutSession, authoritative_report};

#[derive(Default)]
struct Inner {
    days: HashMap<UserId, BTreeMap<u32, WorkoutDay>>,
    history: HashMap<(UserId, String), LoadHistory>,
    sessions: HashMap<UserId, Vec<WorkoutSession>>,
    /// Ids of sessions whose day was deleted
    retired: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
    now: Cell<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of write requests received, failed ones included
    pub fn write_attempts(&self) -> usize {
        self.writes.get()
    }

    /// Pin the timestamp given to new records
    pub fn set_now(&self, now: DateTime<Utc>) {
        self.now.set(Some(now));
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.get().unwrap_or_else(Utc::now)
    }

    fn read(&self) -> StoreResult<()> {
        if self.fail_reads.get() {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> StoreResult<()> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    fn with_day<T>(
        &self,
        user: &UserId,
        day_number: u32,
        f: impl FnOnce(&mut WorkoutDay) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut inner = self.inner.borrow_mut();
        let day = inner
            .days
            .get_mut(user)
            .and_then(|days| days.get_mut(&day_number))
            .ok_or_else(|| StoreError::NotFound(format!("day {}", day_number)))?;
        f(day)
    }
}

fn exercise_mut<'a>(day: &'a mut WorkoutDay, exercise_id: &str) -> StoreResult<&'a mut Exercise> {
    day.exercises
        .iter_mut()
        .find(|e| e.id == exercise_id)
        .ok_or_else(|| StoreError::NotFound(format!("exercise {}", exercise_id)))
}

impl WorkoutStore for MemoryStore {
    fn list_days(&self, user: &UserId) -> StoreResult<Vec<WorkoutDay>> {
        self.read()?;
        let inner = self.inner.borrow();
        Ok(inner
            .days
            .get(user)
            .map(|days| days.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_day(&self, user: &UserId, day_number: u32) -> StoreResult<WorkoutDay> {
        self.read()?;
        self.inner
            .borrow()
            .days
            .get(user)
            .and_then(|days| days.get(&day_number))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("day {}", day_number)))
    }

    fn create_day(&self, user: &UserId, name: Option<&str>) -> StoreResult<WorkoutDay> {
        self.write()?;
        let mut inner = self.inner.borrow_mut();
        let days = inner.days.entry(user.clone()).or_default();
        if days.len() as u32 >= MAX_DAYS {
            return Err(StoreError::Rejected(format!("Maximum {} days per plan", MAX_DAYS)));
        }

        let day_number = days.keys().next_back().map_or(1, |last| last + 1);
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| default_day_name(day_number), str::to_string);
        let day = WorkoutDay { day_number, name, exercises: Vec::new() };
        days.insert(day_number, day.clone());
        Ok(day)
    }

    fn delete_day(&self, user: &UserId, day_number: u32) -> StoreResult<()> {
        self.write()?;
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        inner
            .days
            .get_mut(user)
            .and_then(|days| days.remove(&day_number))
            .ok_or_else(|| StoreError::NotFound(format!("day {}", day_number)))?;

        // a day created later under the same number starts without completions
        if let Some(sessions) = inner.sessions.get(user) {
            inner.retired.extend(
                sessions
                    .iter()
                    .filter(|s| s.day_number == day_number)
                    .map(|s| s.id.clone()),
            );
        }
        Ok(())
    }

    fn add_exercise(&self, user: &UserId, day_number: u32, draft: &ExerciseDraft) -> StoreResult<Exercise> {
        self.write()?;
        let id = format!("{}-{}", user, Uuid::new_v4());
        self.with_day(user, day_number, |day| {
            let exercise = draft.clone().into_exercise(id);
            day.exercises.push(exercise.clone());
            Ok(exercise)
        })
    }

    fn update_exercise(
        &self,
        user: &UserId,
        day_number: u32,
        exercise_id: &str,
        patch: &ExercisePatch,
    ) -> StoreResult<Exercise> {
        self.write()?;
        self.with_day(user, day_number, |day| {
            let exercise = exercise_mut(day, exercise_id)?;
            patch.apply_to(exercise);
            Ok(exercise.clone())
        })
    }

    fn delete_exercise(&self, user: &UserId, day_number: u32, exercise_id: &str) -> StoreResult<()> {
        self.write()?;
        self.with_day(user, day_number, |day| {
            let before = day.exercises.len();
            day.exercises.retain(|e| e.id != exercise_id);
            if day.exercises.len() == before {
                return Err(StoreError::NotFound(format!("exercise {}", exercise_id)));
            }
            Ok(())
        })
    }

    fn update_load(&self, user: &UserId, day_number: u32, exercise_id: &str, load: &str) -> StoreResult<()> {
        self.write()?;
        let name = self.with_day(user, day_number, |day| Ok(exercise_mut(day, exercise_id)?.name.clone()))?;

        let entry = NewLoadEntry {
            exercise_id: exercise_id.to_string(),
            exercise_name: name,
            load: load.to_string(),
            sets: 0,
            reps: 0,
            day_number: Some(day_number),
        };
        let context = LoadContext::from_request(&entry, self.now());
        self.inner
            .borrow_mut()
            .history
            .entry((user.clone(), exercise_id.to_string()))
            .or_insert_with(|| LoadHistory::new(exercise_id))
            .append(load, context)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;

        self.with_day(user, day_number, |day| {
            exercise_mut(day, exercise_id)?.current_load = load.trim().to_string();
            Ok(())
        })
    }

    fn load_history(&self, user: &UserId, exercise_id: &str) -> StoreResult<Vec<LoadEntry>> {
        self.read()?;
        Ok(self
            .inner
            .borrow()
            .history
            .get(&(user.clone(), exercise_id.to_string()))
            .map(|h| h.entries().to_vec())
            .unwrap_or_default())
    }

    fn append_load(&self, user: &UserId, entry: &NewLoadEntry) -> StoreResult<Vec<LoadEntry>> {
        self.write()?;
        let context = LoadContext::from_request(entry, self.now());
        let series = {
            let mut inner = self.inner.borrow_mut();
            let history = inner
                .history
                .entry((user.clone(), entry.exercise_id.clone()))
                .or_insert_with(|| LoadHistory::new(entry.exercise_id.clone()));
            history
                .append(&entry.load, context)
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
            history.entries().to_vec()
        };

        if let Some(day_number) = entry.day_number {
            // the plan may have dropped the exercise meanwhile; history is kept
            let mirrored = self.with_day(user, day_number, |day| {
                exercise_mut(day, &entry.exercise_id)?.current_load = entry.load.trim().to_string();
                Ok(())
            });
            if let Err(e) = mirrored {
                debug!("Current load of {} not updated: {}", entry.exercise_id, e);
            }
        }
        Ok(series)
    }

    fn create_session(&self, user: &UserId, payload: &SessionPayload) -> StoreResult<WorkoutSession> {
        self.write()?;
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let sessions = inner.sessions.entry(user.clone()).or_default();

        let previous = sessions
            .iter()
            .filter(|s| s.day_number == payload.day_number && !inner.retired.contains(&s.id))
            .max_by_key(|s| s.completed_at);
        let report = authoritative_report(payload, previous);

        let session = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            day_number: payload.day_number,
            day_name: payload.day_name.clone(),
            completed_at: self.now(),
            duration_minutes: payload.duration_minutes,
            exercises: payload.exercises.clone(),
            report,
        };
        sessions.push(session.clone());
        Ok(session)
    }

    fn list_sessions(&self, user: &UserId) -> StoreResult<Vec<WorkoutSession>> {
        self.read()?;
        let mut sessions = self.inner.borrow().sessions.get(user).cloned().unwrap_or_default();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(sessions)
    }

    fn get_session(&self, user: &UserId, session_id: &str) -> StoreResult<WorkoutSession> {
        self.read()?;
        self.inner
            .borrow()
            .sessions
            .get(user)
            .and_then(|sessions| sessions.iter().find(|s| s.id == session_id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session_id)))
    }

    fn next_workout(&self, user: &UserId) -> StoreResult<NextWorkout> {
        let days: Vec<u32> = self.list_days(user)?.iter().map(|d| d.day_number).collect();
        let mut sessions = self.list_sessions(user)?;
        let inner = self.inner.borrow();
        sessions.retain(|s| !inner.retired.contains(&s.id));
        Ok(NextWorkout::from_history(&days, &sessions))
    }
}
