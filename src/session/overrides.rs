//! Exercise override reconciler - merges edits into the session working set
//!
//! A session-only edit changes what this workout performs without touching
//! the plan: the copy is flagged `was_modified` and keeps its `original_name`.
//! A permanent edit becomes the new baseline: the flag stays clear and
//! `original_name` follows the new name.

use serde::{Deserialize, Serialize};

use crate::exercises::{Exercise, ExercisePatch};

/// Session copy of a plan exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingExercise {
    #[serde(flatten)]
    pub exercise: Exercise,
    /// Name before any session-only edit
    pub original_name: String,
    /// True when the copy carries an edit that was not written to the store
    pub was_modified: bool,
}

impl WorkingExercise {
    /// Copy taken at session start; identical to the store record
    pub fn from_store(exercise: Exercise) -> Self {
        Self {
            original_name: exercise.name.clone(),
            exercise,
            was_modified: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.exercise.id
    }

    pub fn name(&self) -> &str {
        &self.exercise.name
    }
}

/// Session-only edit. An empty patch changes nothing and sets no flag.
pub fn apply_session_edit(current: &WorkingExercise, patch: &ExercisePatch) -> WorkingExercise {
    if patch.is_empty() {
        return current.clone();
    }
    let mut exercise = current.exercise.clone();
    patch.apply_to(&mut exercise);
    WorkingExercise {
        exercise,
        original_name: current.original_name.clone(),
        was_modified: true,
    }
}

/// Local half of a permanent edit; the caller forwards it to the store
pub fn apply_permanent_edit(current: &WorkingExercise, patch: &ExercisePatch) -> WorkingExercise {
    let mut exercise = current.exercise.clone();
    patch.apply_to(&mut exercise);
    WorkingExercise {
        original_name: exercise.name.clone(),
        exercise,
        was_modified: false,
    }
}

/// Ordered working copy of one day's exercises
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    exercises: Vec<WorkingExercise>,
}

impl WorkingSet {
    pub fn from_exercises(exercises: Vec<Exercise>) -> Self {
        Self {
            exercises: exercises.into_iter().map(WorkingExercise::from_store).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&WorkingExercise> {
        self.exercises.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkingExercise> {
        self.exercises.iter()
    }

    pub fn as_slice(&self) -> &[WorkingExercise] {
        &self.exercises
    }

    /// Swap in a reconciled copy; false if the id is unknown
    pub fn replace(&mut self, updated: WorkingExercise) -> bool {
        match self.exercises.iter_mut().find(|e| e.id() == updated.id()) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    /// Append a freshly created exercise at the end of the day
    pub fn push(&mut self, exercise: Exercise) -> &WorkingExercise {
        self.exercises.push(WorkingExercise::from_store(exercise));
        let last = self.exercises.len() - 1;
        &self.exercises[last]
    }

    pub fn remove(&mut self, id: &str) -> Option<WorkingExercise> {
        let index = self.exercises.iter().position(|e| e.id() == id)?;
        Some(self.exercises.remove(index))
    }

    /// Mirror a load already written to the store; the modification flag is
    /// left as it is
    pub fn mirror_load(&mut self, id: &str, load: &str) -> bool {
        match self.exercises.iter_mut().find(|e| e.id() == id) {
            Some(working) => {
                working.exercise.current_load = load.trim().to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::MuscleGroup;

    fn exercise(id: &str, name: &str) -> Exercise {
        Exercise {
            id: id.to_string(),
            name: name.to_string(),
            muscle_group: MuscleGroup::Chest,
            sets: 4,
            reps: 10,
            current_load: "20".to_string(),
            rest_seconds: 60,
            notes: String::new(),
        }
    }

    fn rename(name: &str) -> ExercisePatch {
        ExercisePatch { name: Some(name.to_string()), ..Default::default() }
    }

    #[test]
    fn test_session_edit_preserves_original_name() {
        let start = WorkingExercise::from_store(exercise("a", "Bench press"));
        let edited = apply_session_edit(&start, &rename("Floor press"));

        assert!(edited.was_modified);
        assert_eq!(edited.name(), "Floor press");
        assert_eq!(edited.original_name, "Bench press");

        // a second session edit never overwrites the original name
        let again = apply_session_edit(&edited, &rename("Pin press"));
        assert_eq!(again.original_name, "Bench press");
    }

    #[test]
    fn test_permanent_edit_moves_baseline() {
        let start = WorkingExercise::from_store(exercise("a", "Bench press"));
        let edited = apply_permanent_edit(&start, &rename("Floor press"));

        assert!(!edited.was_modified);
        assert_eq!(edited.original_name, "Floor press");
    }

    #[test]
    fn test_permanent_edit_clears_session_flag() {
        let start = WorkingExercise::from_store(exercise("a", "Bench press"));
        let session = apply_session_edit(&start, &ExercisePatch { sets: Some(3), ..Default::default() });
        let saved = apply_permanent_edit(&session, &ExercisePatch::full(&session.exercise));

        assert!(!saved.was_modified);
        assert_eq!(saved.exercise.sets, 3);
    }

    #[test]
    fn test_empty_session_patch_is_noop() {
        let start = WorkingExercise::from_store(exercise("a", "Bench press"));
        let same = apply_session_edit(&start, &ExercisePatch::default());
        assert_eq!(same, start);
    }

    #[test]
    fn test_working_set_keeps_order() {
        let mut set = WorkingSet::from_exercises(vec![exercise("a", "A"), exercise("b", "B")]);
        set.push(exercise("c", "C"));
        let ids: Vec<&str> = set.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(!set.get("c").unwrap().was_modified);

        assert!(set.remove("b").is_some());
        assert!(set.remove("b").is_none());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_replace_unknown_id_is_rejected() {
        let mut set = WorkingSet::from_exercises(vec![exercise("a", "A")]);
        let stray = WorkingExercise::from_store(exercise("zzz", "Z"));
        assert!(!set.replace(stray));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_mirror_load_keeps_flag() {
        let mut set = WorkingSet::from_exercises(vec![exercise("a", "A")]);
        assert!(set.mirror_load("a", "25kg"));
        let working = set.get("a").unwrap();
        assert_eq!(working.exercise.current_load, "25kg");
        assert!(!working.was_modified);
        assert!(!set.mirror_load("missing", "25"));
    }
}
