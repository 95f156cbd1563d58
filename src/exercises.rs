//! Exercise definitions - plan entries, load values and edit patches

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WorkoutError, WorkoutResult};

/// Canonical spelling of the bodyweight load sentinel
pub const BODYWEIGHT: &str = "Bodyweight";

/// Localized spellings accepted as the bodyweight sentinel
const BODYWEIGHT_ALIASES: &[&str] = &["bodyweight", "body weight", "bw", "corpo libero"];

/// Muscle groups targeted by plan exercises
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroup {
    Chest,
    Shoulders,
    Triceps,
    Back,
    Biceps,
    Abs,
    Glutes,
    Quads,
    Hamstrings,
    Calves,
}

impl MuscleGroup {
    pub fn label(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Triceps => "Triceps",
            MuscleGroup::Back => "Back",
            MuscleGroup::Biceps => "Biceps",
            MuscleGroup::Abs => "Abs",
            MuscleGroup::Glutes => "Glutes",
            MuscleGroup::Quads => "Quads",
            MuscleGroup::Hamstrings => "Hamstrings",
            MuscleGroup::Calves => "Calves",
        }
    }

    /// All muscle groups for iteration
    pub fn all() -> &'static [MuscleGroup] {
        &[
            MuscleGroup::Chest,
            MuscleGroup::Shoulders,
            MuscleGroup::Triceps,
            MuscleGroup::Back,
            MuscleGroup::Biceps,
            MuscleGroup::Abs,
            MuscleGroup::Glutes,
            MuscleGroup::Quads,
            MuscleGroup::Hamstrings,
            MuscleGroup::Calves,
        ]
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MuscleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MuscleGroup::all()
            .iter()
            .find(|g| g.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown muscle group '{}'", s))
    }
}

/// Parsed form of a load string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadValue {
    Bodyweight,
    Weight(u32),
}

impl LoadValue {
    /// Parse a load string: the bodyweight sentinel, or a string starting
    /// with an integer run ("22kg" -> 22, "55-50" -> 55).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if BODYWEIGHT_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(raw)) {
            return Some(LoadValue::Bodyweight);
        }

        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok().map(LoadValue::Weight)
    }

    /// Numeric value used for volume; bodyweight counts as 0
    pub fn numeric(&self) -> u32 {
        match self {
            LoadValue::Bodyweight => 0,
            LoadValue::Weight(v) => *v,
        }
    }

    pub fn is_bodyweight(&self) -> bool {
        matches!(self, LoadValue::Bodyweight)
    }
}

/// Lenient numeric load: bodyweight and unparsable strings both count as 0.
/// Drafts and patches reject unparsable loads, so only seeded or foreign
/// records reach the fallback.
pub fn parse_load(raw: &str) -> u32 {
    LoadValue::parse(raw).map(|v| v.numeric()).unwrap_or(0)
}

/// Why `raw` failed [`LoadValue::parse`]
pub fn load_parse_error(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        format!("'{}' is too large for a load", raw)
    } else {
        format!("'{}' is neither a number nor bodyweight", raw)
    }
}

fn validate_load(raw: &str) -> WorkoutResult<LoadValue> {
    LoadValue::parse(raw).ok_or_else(|| WorkoutError::validation("load", load_parse_error(raw)))
}

fn validate_name(name: &str) -> WorkoutResult<()> {
    if name.trim().is_empty() {
        return Err(WorkoutError::validation("name", "exercise name is required"));
    }
    Ok(())
}

fn validate_sets(sets: u32) -> WorkoutResult<()> {
    if sets == 0 {
        return Err(WorkoutError::validation("sets", "at least one set is required"));
    }
    Ok(())
}

/// One exercise of a plan day, as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub sets: u32,
    /// 0 = time-based exercise, described by `notes`
    pub reps: u32,
    pub current_load: String,
    pub rest_seconds: u32,
    #[serde(default)]
    pub notes: String,
}

impl Exercise {
    pub fn is_timed(&self) -> bool {
        self.reps == 0
    }

    pub fn load_value(&self) -> Option<LoadValue> {
        LoadValue::parse(&self.current_load)
    }

    /// Bodyweight exercises have no load history and no load-update affordance
    pub fn is_bodyweight(&self) -> bool {
        self.load_value().is_some_and(|v| v.is_bodyweight())
    }

    /// Rest interval as shown on the plan card: 90 -> 1'30''
    pub fn rest_label(&self) -> String {
        let (mins, secs) = (self.rest_seconds / 60, self.rest_seconds % 60);
        match (mins, secs) {
            (0, s) => format!("{}''", s),
            (m, 0) => format!("{}'", m),
            (m, s) => format!("{}'{}''", m, s),
        }
    }

    /// "4x10" or the time-based note
    pub fn scheme(&self) -> String {
        if self.is_timed() {
            self.notes.clone()
        } else {
            format!("{}x{}", self.sets, self.reps)
        }
    }
}

/// Fields for a new exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDraft {
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub sets: u32,
    pub reps: u32,
    pub current_load: String,
    pub rest_seconds: u32,
    #[serde(default)]
    pub notes: String,
}

impl ExerciseDraft {
    pub fn validate(&self) -> WorkoutResult<()> {
        validate_name(&self.name)?;
        validate_sets(self.sets)?;
        validate_load(&self.current_load)?;
        Ok(())
    }

    pub fn into_exercise(self, id: String) -> Exercise {
        Exercise {
            id,
            name: self.name.trim().to_string(),
            muscle_group: self.muscle_group,
            sets: self.sets,
            reps: self.reps,
            current_load: self.current_load.trim().to_string(),
            rest_seconds: self.rest_seconds,
            notes: self.notes,
        }
    }
}

/// Partial update of an exercise; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExercisePatch {
    pub name: Option<String>,
    pub muscle_group: Option<MuscleGroup>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub current_load: Option<String>,
    pub rest_seconds: Option<u32>,
    pub notes: Option<String>,
}

impl ExercisePatch {
    /// Patch that rewrites every editable field to match `exercise`
    pub fn full(exercise: &Exercise) -> Self {
        Self {
            name: Some(exercise.name.clone()),
            muscle_group: Some(exercise.muscle_group),
            sets: Some(exercise.sets),
            reps: Some(exercise.reps),
            current_load: Some(exercise.current_load.clone()),
            rest_seconds: Some(exercise.rest_seconds),
            notes: Some(exercise.notes.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> WorkoutResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(sets) = self.sets {
            validate_sets(sets)?;
        }
        if let Some(load) = &self.current_load {
            validate_load(load)?;
        }
        Ok(())
    }

    /// Merge into `exercise`; patch fields take precedence, the id never changes
    pub fn apply_to(&self, exercise: &mut Exercise) {
        if let Some(name) = &self.name {
            exercise.name = name.trim().to_string();
        }
        if let Some(group) = self.muscle_group {
            exercise.muscle_group = group;
        }
        if let Some(sets) = self.sets {
            exercise.sets = sets;
        }
        if let Some(reps) = self.reps {
            exercise.reps = reps;
        }
        if let Some(load) = &self.current_load {
            exercise.current_load = load.trim().to_string();
        }
        if let Some(rest) = self.rest_seconds {
            exercise.rest_seconds = rest;
        }
        if let Some(notes) = &self.notes {
            exercise.notes = notes.clone();
        }
    }
}

/// Seed entry for the default plan
#[derive(Debug, Clone)]
pub struct SeedExercise {
    pub name: &'static str,
    pub muscle_group: MuscleGroup,
    pub sets: u32,
    pub reps: u32,
    pub load: &'static str,
    pub rest_seconds: u32,
    pub notes: &'static str,
}

impl SeedExercise {
    pub fn draft(&self) -> ExerciseDraft {
        ExerciseDraft {
            name: self.name.to_string(),
            muscle_group: self.muscle_group,
            sets: self.sets,
            reps: self.reps,
            current_load: self.load.to_string(),
            rest_seconds: self.rest_seconds,
            notes: self.notes.to_string(),
        }
    }
}

const fn seed(
    name: &'static str,
    muscle_group: MuscleGroup,
    sets: u32,
    reps: u32,
    load: &'static str,
    rest_seconds: u32,
) -> SeedExercise {
    SeedExercise { name, muscle_group, sets, reps, load, rest_seconds, notes: "" }
}

const ABS_FINISHER: SeedExercise = SeedExercise {
    name: "Abs circuit",
    muscle_group: MuscleGroup::Abs,
    sets: 1,
    reps: 0,
    load: BODYWEIGHT,
    rest_seconds: 600,
    notes: "10 minutes",
};

/// Strength day: low reps, long rest
pub const DAY_ONE: &[SeedExercise] = &[
    seed("Dumbbell bench press", MuscleGroup::Chest, 4, 4, "16", 120),
    seed("Leg press", MuscleGroup::Quads, 4, 4, "90", 120),
    seed("Dumbbell row", MuscleGroup::Back, 4, 4, "14", 120),
    seed("Lateral raise", MuscleGroup::Shoulders, 4, 10, "7", 60),
    seed("Bar push down", MuscleGroup::Triceps, 4, 10, "35", 60),
    seed("Dumbbell curl", MuscleGroup::Biceps, 4, 10, "8", 60),
    ABS_FINISHER,
];

/// Hypertrophy day
pub const DAY_TWO: &[SeedExercise] = &[
    seed("Incline bench 30°", MuscleGroup::Chest, 4, 8, "10", 90),
    seed("Leg extension", MuscleGroup::Quads, 4, 8, "55-50", 90),
    seed("Machine row", MuscleGroup::Back, 4, 8, "30", 90),
    seed("Arnold press", MuscleGroup::Shoulders, 4, 8, "10", 90),
    seed("Face pull", MuscleGroup::Shoulders, 4, 10, "30", 60),
    seed("Rope curl", MuscleGroup::Biceps, 4, 10, "30", 60),
    ABS_FINISHER,
];

/// Endurance day: high reps, short rest
pub const DAY_THREE: &[SeedExercise] = &[
    seed("Dumbbell bench press", MuscleGroup::Chest, 4, 12, "30+", 60),
    seed("Leg curl", MuscleGroup::Hamstrings, 4, 12, "40", 60),
    seed("Lat pulldown", MuscleGroup::Back, 4, 12, "30-35", 60),
    seed("Rear delt raise", MuscleGroup::Shoulders, 4, 15, "10-6", 60),
    seed("Triangle push down", MuscleGroup::Triceps, 4, 15, "25", 60),
    seed("Incline curl 60°", MuscleGroup::Biceps, 4, 15, "6", 60),
];

/// Default three-day plan installed by `seed`
pub fn default_plan() -> [(&'static str, &'static [SeedExercise]); 3] {
    [("Day 1", DAY_ONE), ("Day 2", DAY_TWO), ("Day 3", DAY_THREE)]
}
