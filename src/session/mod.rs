//! Active workout session - the state machine between a plan day and its
//! stored session record
//!
//! Components:
//! - Load history series (append-only per exercise)
//! - Override reconciler (session-only vs permanent edits)
//! - Progress tracker (completed set, completion ratio)
//! - Volume and report calculator
//! - Next-day selector

pub mod history;
pub mod next_day;
pub mod overrides;
pub mod progress;
pub mod report;

pub use history::{LoadEntry, LoadHistory, NewLoadEntry};
pub use next_day::select_next_day;
pub use overrides::{WorkingExercise, WorkingSet};
pub use progress::SessionProgress;
pub use report::{EstimatedReport, ExerciseSnapshot, LoadChange, Report, SessionPayload, WorkoutSession};

use tracing::{debug, info, warn};

use crate::error::{StoreError, WorkoutError, WorkoutResult};
use crate::exercises::{Exercise, ExerciseDraft, ExercisePatch, LoadValue};
use crate::store::{UserId, WorkoutDay, WorkoutStore};
use history::parse_history_load;
use overrides::{apply_permanent_edit, apply_session_edit};

/// Result of a permanent edit
#[derive(Debug)]
pub enum EditOutcome {
    /// Written to the store; the working copy is the new baseline
    Saved,
    /// Store write failed; the edit was kept for this session only
    SessionOnly(StoreError),
}

/// Fetch-then-append for one exercise's load history. Bodyweight and
/// unparsable loads are rejected before the store is called.
pub fn record_load<S: WorkoutStore + ?Sized>(
    store: &S,
    user: &UserId,
    day_number: Option<u32>,
    exercise: &Exercise,
    load: &str,
) -> WorkoutResult<LoadHistory> {
    if exercise.is_bodyweight() {
        return Err(WorkoutError::validation("load", "bodyweight exercises have no load"));
    }
    parse_history_load(load)?;

    let entry = NewLoadEntry {
        exercise_id: exercise.id.clone(),
        exercise_name: exercise.name.clone(),
        load: load.trim().to_string(),
        sets: exercise.sets,
        reps: exercise.reps,
        day_number,
    };
    let series = store.append_load(user, &entry)?;
    debug!("Recorded load {} for {}", entry.load, exercise.id);
    Ok(LoadHistory::from_entries(exercise.id.clone(), series))
}

/// Set only the current load of a plan exercise
pub fn set_current_load<S: WorkoutStore + ?Sized>(
    store: &S,
    user: &UserId,
    day_number: u32,
    exercise: &Exercise,
    load: &str,
) -> WorkoutResult<()> {
    if exercise.is_bodyweight() {
        return Err(WorkoutError::validation("load", "bodyweight exercises have no load"));
    }
    parse_history_load(load)?;
    store.update_load(user, day_number, &exercise.id, load.trim())?;
    Ok(())
}

/// Working state of one workout in progress.
///
/// Owns the working copy of the day's exercises and the completed set until
/// the session is finished or dropped. Dropping it commits nothing.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    user: UserId,
    day_number: u32,
    day_name: String,
    working: WorkingSet,
    progress: SessionProgress,
}

impl ActiveSession {
    /// Load a day from the store and start a session on it
    pub fn begin<S: WorkoutStore + ?Sized>(store: &S, user: &UserId, day_number: u32) -> WorkoutResult<Self> {
        let day = store.get_day(user, day_number)?;
        info!("Session started: {} day {} ({} exercises)", user, day_number, day.exercises.len());
        Ok(Self::from_day(user.clone(), day))
    }

    pub fn from_day(user: UserId, day: WorkoutDay) -> Self {
        Self {
            user,
            day_number: day.day_number,
            day_name: day.name,
            working: WorkingSet::from_exercises(day.exercises),
            progress: SessionProgress::new(),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn day_number(&self) -> u32 {
        self.day_number
    }

    pub fn day_name(&self) -> &str {
        &self.day_name
    }

    pub fn exercises(&self) -> &[WorkingExercise] {
        self.working.as_slice()
    }

    pub fn exercise(&self, id: &str) -> Option<&WorkingExercise> {
        self.working.get(id)
    }

    fn require(&self, id: &str) -> WorkoutResult<&WorkingExercise> {
        self.working
            .get(id)
            .ok_or_else(|| WorkoutError::UnknownExercise(id.to_string()))
    }

    /// Flip completion. Unknown ids are ignored and yield `None`.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        if !self.working.contains(id) {
            warn!("Ignoring toggle for unknown exercise {}", id);
            return None;
        }
        Some(self.progress.toggle(id))
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.progress.is_completed(id)
    }

    pub fn completed_count(&self) -> usize {
        self.progress.completed_count()
    }

    pub fn total(&self) -> usize {
        self.working.len()
    }

    pub fn completion_ratio(&self) -> f64 {
        self.progress.completion_ratio(self.working.len())
    }

    pub fn is_submittable(&self) -> bool {
        self.progress.is_submittable()
    }

    /// Change an exercise for this workout only
    pub fn edit_for_session(&mut self, id: &str, patch: &ExercisePatch) -> WorkoutResult<&WorkingExercise> {
        patch.validate()?;
        let edited = apply_session_edit(self.require(id)?, patch);
        self.working.replace(edited);
        self.require(id)
    }

    /// Save an edit to the plan. The whole reconciled exercise is written so
    /// that earlier session-only edits are persisted too. If the store
    /// refuses, the edit is kept as session-only.
    pub fn edit_permanently<S: WorkoutStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        patch: &ExercisePatch,
    ) -> WorkoutResult<EditOutcome> {
        patch.validate()?;
        let current = self.require(id)?.clone();
        let saved = apply_permanent_edit(&current, patch);

        match store.update_exercise(&self.user, self.day_number, id, &ExercisePatch::full(&saved.exercise)) {
            Ok(_) => {
                info!("Saved exercise {} permanently", id);
                self.working.replace(saved);
                Ok(EditOutcome::Saved)
            }
            Err(err) => {
                warn!("Permanent save of {} failed, keeping it for this session: {}", id, err);
                self.working.replace(apply_session_edit(&current, patch));
                Ok(EditOutcome::SessionOnly(err))
            }
        }
    }

    /// Create a plan exercise and append it to the working set
    pub fn add_exercise<S: WorkoutStore + ?Sized>(
        &mut self,
        store: &S,
        draft: &ExerciseDraft,
    ) -> WorkoutResult<&WorkingExercise> {
        draft.validate()?;
        let created = store.add_exercise(&self.user, self.day_number, draft)?;
        info!("Added exercise {} to day {}", created.id, self.day_number);
        Ok(self.working.push(created))
    }

    /// Delete a plan exercise; it leaves both the working and completed sets
    pub fn remove_exercise<S: WorkoutStore + ?Sized>(&mut self, store: &S, id: &str) -> WorkoutResult<()> {
        self.require(id)?;
        store.delete_exercise(&self.user, self.day_number, id)?;
        self.working.remove(id);
        self.progress.forget(id);
        info!("Removed exercise {} from day {}", id, self.day_number);
        Ok(())
    }

    /// Record a new load for an exercise and mirror it in the working copy
    pub fn record_load<S: WorkoutStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        load: &str,
    ) -> WorkoutResult<LoadHistory> {
        let exercise = self.require(id)?.exercise.clone();
        let history = record_load(store, &self.user, Some(self.day_number), &exercise, load)?;
        self.working.mirror_load(id, load);
        Ok(history)
    }

    /// Whether the load-update affordance applies to an exercise
    pub fn can_update_load(&self, id: &str) -> bool {
        self.working
            .get(id)
            .is_some_and(|w| !matches!(w.exercise.load_value(), Some(LoadValue::Bodyweight)))
    }

    /// Local preview of the report
    pub fn estimated_report(&self) -> EstimatedReport {
        report::estimate_report(self.working.as_slice(), self.progress.completed())
    }

    pub fn payload(&self, duration_minutes: u32) -> WorkoutResult<SessionPayload> {
        if !self.progress.is_submittable() {
            return Err(WorkoutError::validation("completed", "complete at least one exercise"));
        }
        report::build_session_payload(
            self.day_number,
            &self.day_name,
            self.working.as_slice(),
            self.progress.completed(),
            duration_minutes,
        )
    }

    /// Submit the session. Returns the stored record with the authoritative
    /// report; on failure the session is untouched and can be resubmitted.
    pub fn finish<S: WorkoutStore + ?Sized>(&self, store: &S, duration_minutes: u32) -> WorkoutResult<WorkoutSession> {
        let payload = self.payload(duration_minutes)?;
        let session = store.create_session(&self.user, &payload)?;
        info!(
            "Session {} stored: day {}, {}/{} exercises, volume {}",
            session.id,
            session.day_number,
            session.report.completed_exercises,
            session.report.total_exercises,
            session.report.total_volume
        );
        Ok(session)
    }
}
