//! Database module - SQLite storage for plans, load history and sessions

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::exercises::{Exercise, ExerciseDraft, ExercisePatch, MuscleGroup};
use crate::session::history::{LoadContext, LoadEntry, LoadHistory, NewLoadEntry};
use crate::session::report::{SessionPayload, WorkoutSession, authoritative_report};
use crate::store::{MAX_DAYS, NextWorkout, UserId, WorkoutDay, WorkoutStore, default_day_name};

const EXERCISE_COLUMNS: &str =
    "id, name, muscle_group, sets, reps, current_load, rest_seconds, notes";
const HISTORY_COLUMNS: &str =
    "id, exercise_id, exercise_name, load, value, sets, reps, day_number, recorded_at";
const SESSION_COLUMNS: &str =
    "id, day_number, day_name, completed_at, duration_minutes, exercises, report";

/// Database wrapper
pub struct Database {
    conn: Connection,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    let group: String = row.get(2)?;
    let muscle_group = group
        .parse::<MuscleGroup>()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        muscle_group,
        sets: row.get(3)?,
        reps: row.get(4)?,
        current_load: row.get(5)?,
        rest_seconds: row.get(6)?,
        notes: row.get(7)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LoadEntry> {
    Ok(LoadEntry {
        id: row.get(0)?,
        exercise_id: row.get(1)?,
        exercise_name: row.get(2)?,
        load: row.get(3)?,
        value: row.get(4)?,
        sets: row.get(5)?,
        reps: row.get(6)?,
        day_number: row.get(7)?,
        recorded_at: parse_timestamp(row, 8)?,
    })
}

/// Session row before its JSON columns are decoded
struct SessionRow {
    id: String,
    day_number: u32,
    day_name: String,
    completed_at: DateTime<Utc>,
    duration_minutes: u32,
    exercises: String,
    report: String,
}

impl SessionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            day_number: row.get(1)?,
            day_name: row.get(2)?,
            completed_at: parse_timestamp(row, 3)?,
            duration_minutes: row.get(4)?,
            exercises: row.get(5)?,
            report: row.get(6)?,
        })
    }

    fn decode(self) -> StoreResult<WorkoutSession> {
        Ok(WorkoutSession {
            id: self.id,
            day_number: self.day_number,
            day_name: self.day_name,
            completed_at: self.completed_at,
            duration_minutes: self.duration_minutes,
            exercises: serde_json::from_str(&self.exercises)?,
            report: serde_json::from_str(&self.report)?,
        })
    }
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Private in-memory database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Self { conn: Connection::open_in_memory()? };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS days (
                user_id TEXT NOT NULL,
                day_number INTEGER NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (user_id, day_number)
            );
            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                day_number INTEGER NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                muscle_group TEXT NOT NULL,
                sets INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                current_load TEXT NOT NULL,
                rest_seconds INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS load_history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                load TEXT NOT NULL,
                value INTEGER NOT NULL,
                sets INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                day_number INTEGER,
                recorded_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                day_number INTEGER NOT NULL,
                day_name TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                exercises TEXT NOT NULL,
                report TEXT NOT NULL,
                retired INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_history_exercise
                ON load_history (user_id, exercise_id, recorded_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_user
                ON sessions (user_id, completed_at);",
        )?;
        Ok(())
    }

    /// Timestamps are kept at microsecond precision to survive the text column
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    fn day_name(&self, user: &UserId, day_number: u32) -> StoreResult<String> {
        self.conn
            .query_row(
                "SELECT name FROM days WHERE user_id = ?1 AND day_number = ?2",
                params![user.as_str(), day_number],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("day {}", day_number)))
    }

    fn exercises_of(&self, user: &UserId, day_number: u32) -> StoreResult<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM exercises WHERE user_id = ?1 AND day_number = ?2 ORDER BY position",
            EXERCISE_COLUMNS
        ))?;
        let exercises = stmt
            .query_map(params![user.as_str(), day_number], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    fn exercise(&self, user: &UserId, day_number: u32, exercise_id: &str) -> StoreResult<Exercise> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM exercises WHERE user_id = ?1 AND day_number = ?2 AND id = ?3",
                    EXERCISE_COLUMNS
                ),
                params![user.as_str(), day_number, exercise_id],
                exercise_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("exercise {}", exercise_id)))
    }

    fn write_exercise(&self, user: &UserId, exercise: &Exercise) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE exercises SET name = ?1, muscle_group = ?2, sets = ?3, reps = ?4,
                current_load = ?5, rest_seconds = ?6, notes = ?7
             WHERE user_id = ?8 AND id = ?9",
            params![
                exercise.name,
                exercise.muscle_group.label(),
                exercise.sets,
                exercise.reps,
                exercise.current_load,
                exercise.rest_seconds,
                exercise.notes,
                user.as_str(),
                exercise.id,
            ],
        )?;
        Ok(())
    }

    fn history(&self, user: &UserId, exercise_id: &str) -> StoreResult<LoadHistory> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM load_history WHERE user_id = ?1 AND exercise_id = ?2 ORDER BY recorded_at",
            HISTORY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![user.as_str(), exercise_id], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LoadHistory::from_entries(exercise_id, entries))
    }

    /// Append through the in-memory series so ordering and load rules hold,
    /// then persist the new entry
    fn append_entry(&self, user: &UserId, entry: &NewLoadEntry) -> StoreResult<LoadHistory> {
        let mut history = self.history(user, &entry.exercise_id)?;
        let context = LoadContext::from_request(entry, Self::now());
        let added = history
            .append(&entry.load, context)
            .map_err(|e| StoreError::Rejected(e.to_string()))?
            .clone();

        self.conn.execute(
            "INSERT INTO load_history (id, user_id, exercise_id, exercise_name, load, value, sets, reps, day_number, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                added.id,
                user.as_str(),
                added.exercise_id,
                added.exercise_name,
                added.load,
                added.value,
                added.sets,
                added.reps,
                added.day_number,
                timestamp(&added.recorded_at),
            ],
        )?;
        Ok(history)
    }

    fn set_current_load(&self, user: &UserId, day_number: u32, exercise_id: &str, load: &str) -> StoreResult<usize> {
        Ok(self.conn.execute(
            "UPDATE exercises SET current_load = ?1 WHERE user_id = ?2 AND day_number = ?3 AND id = ?4",
            params![load.trim(), user.as_str(), day_number, exercise_id],
        )?)
    }

    /// Sessions newest first; `active_only` skips those of deleted days
    fn sessions(&self, user: &UserId, active_only: bool) -> StoreResult<Vec<WorkoutSession>> {
        let filter = if active_only { " AND retired = 0" } else { "" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE user_id = ?1{} ORDER BY completed_at DESC",
            SESSION_COLUMNS, filter
        ))?;
        let rows = stmt
            .query_map(params![user.as_str()], SessionRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(SessionRow::decode).collect()
    }

    fn latest_session_of_day(&self, user: &UserId, day_number: u32) -> StoreResult<Option<WorkoutSession>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions WHERE user_id = ?1 AND day_number = ?2 AND retired = 0
                     ORDER BY completed_at DESC LIMIT 1",
                    SESSION_COLUMNS
                ),
                params![user.as_str(), day_number],
                SessionRow::read,
            )
            .optional()?
            .map(SessionRow::decode)
            .transpose()
    }
}

impl WorkoutStore for Database {
    fn list_days(&self, user: &UserId) -> StoreResult<Vec<WorkoutDay>> {
        let mut stmt = self
            .conn
            .prepare("SELECT day_number, name FROM days WHERE user_id = ?1 ORDER BY day_number")?;
        let headers = stmt
            .query_map(params![user.as_str()], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        headers
            .into_iter()
            .map(|(day_number, name)| {
                Ok(WorkoutDay { day_number, name, exercises: self.exercises_of(user, day_number)? })
            })
            .collect()
    }

    fn get_day(&self, user: &UserId, day_number: u32) -> StoreResult<WorkoutDay> {
        let name = self.day_name(user, day_number)?;
        Ok(WorkoutDay { day_number, name, exercises: self.exercises_of(user, day_number)? })
    }

    fn create_day(&self, user: &UserId, name: Option<&str>) -> StoreResult<WorkoutDay> {
        let (count, last): (u32, Option<u32>) = self.conn.query_row(
            "SELECT COUNT(*), MAX(day_number) FROM days WHERE user_id = ?1",
            params![user.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if count >= MAX_DAYS {
            return Err(StoreError::Rejected(format!("Maximum {} days per plan", MAX_DAYS)));
        }

        let day_number = last.map_or(1, |n| n + 1);
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| default_day_name(day_number), str::to_string);
        self.conn.execute(
            "INSERT INTO days (user_id, day_number, name) VALUES (?1, ?2, ?3)",
            params![user.as_str(), day_number, name],
        )?;
        Ok(WorkoutDay { day_number, name, exercises: Vec::new() })
    }

    fn delete_day(&self, user: &UserId, day_number: u32) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM days WHERE user_id = ?1 AND day_number = ?2",
            params![user.as_str(), day_number],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("day {}", day_number)));
        }
        tx.execute(
            "DELETE FROM exercises WHERE user_id = ?1 AND day_number = ?2",
            params![user.as_str(), day_number],
        )?;
        // a day created later under the same number starts without completions
        tx.execute(
            "UPDATE sessions SET retired = 1 WHERE user_id = ?1 AND day_number = ?2",
            params![user.as_str(), day_number],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn add_exercise(&self, user: &UserId, day_number: u32, draft: &ExerciseDraft) -> StoreResult<Exercise> {
        self.day_name(user, day_number)?;
        let position: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM exercises WHERE user_id = ?1 AND day_number = ?2",
            params![user.as_str(), day_number],
            |row| row.get(0),
        )?;

        let exercise = draft.clone().into_exercise(format!("{}-{}", user, Uuid::new_v4()));
        self.conn.execute(
            "INSERT INTO exercises (id, user_id, day_number, position, name, muscle_group, sets, reps, current_load, rest_seconds, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                exercise.id,
                user.as_str(),
                day_number,
                position,
                exercise.name,
                exercise.muscle_group.label(),
                exercise.sets,
                exercise.reps,
                exercise.current_load,
                exercise.rest_seconds,
                exercise.notes,
            ],
        )?;
        Ok(exercise)
    }

    fn update_exercise(
        &self,
        user: &UserId,
        day_number: u32,
        exercise_id: &str,
        patch: &ExercisePatch,
    ) -> StoreResult<Exercise> {
        let mut exercise = self.exercise(user, day_number, exercise_id)?;
        patch.apply_to(&mut exercise);
        self.write_exercise(user, &exercise)?;
        Ok(exercise)
    }

    fn delete_exercise(&self, user: &UserId, day_number: u32, exercise_id: &str) -> StoreResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM exercises WHERE user_id = ?1 AND day_number = ?2 AND id = ?3",
            params![user.as_str(), day_number, exercise_id],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("exercise {}", exercise_id)));
        }
        Ok(())
    }

    fn update_load(&self, user: &UserId, day_number: u32, exercise_id: &str, load: &str) -> StoreResult<()> {
        let exercise = self.exercise(user, day_number, exercise_id)?;
        let entry = NewLoadEntry {
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.clone(),
            load: load.to_string(),
            sets: 0,
            reps: 0,
            day_number: Some(day_number),
        };
        let tx = self.conn.unchecked_transaction()?;
        self.append_entry(user, &entry)?;
        self.set_current_load(user, day_number, exercise_id, load)?;
        tx.commit()?;
        Ok(())
    }

    fn load_history(&self, user: &UserId, exercise_id: &str) -> StoreResult<Vec<LoadEntry>> {
        Ok(self.history(user, exercise_id)?.into_entries())
    }

    fn append_load(&self, user: &UserId, entry: &NewLoadEntry) -> StoreResult<Vec<LoadEntry>> {
        let tx = self.conn.unchecked_transaction()?;
        let history = self.append_entry(user, entry)?;
        if let Some(day_number) = entry.day_number
            && self.set_current_load(user, day_number, &entry.exercise_id, &entry.load)? == 0
        {
            debug!("Current load of {} not updated: not in day {}", entry.exercise_id, day_number);
        }
        tx.commit()?;
        Ok(history.into_entries())
    }

    fn create_session(&self, user: &UserId, payload: &SessionPayload) -> StoreResult<WorkoutSession> {
        let previous = self.latest_session_of_day(user, payload.day_number)?;
        let session = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            day_number: payload.day_number,
            day_name: payload.day_name.clone(),
            completed_at: Self::now(),
            duration_minutes: payload.duration_minutes,
            exercises: payload.exercises.clone(),
            report: authoritative_report(payload, previous.as_ref()),
        };

        self.conn.execute(
            "INSERT INTO sessions (id, user_id, day_number, day_name, completed_at, duration_minutes, exercises, report)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                user.as_str(),
                session.day_number,
                session.day_name,
                timestamp(&session.completed_at),
                session.duration_minutes,
                serde_json::to_string(&session.exercises)?,
                serde_json::to_string(&session.report)?,
            ],
        )?;
        Ok(session)
    }

    fn list_sessions(&self, user: &UserId) -> StoreResult<Vec<WorkoutSession>> {
        self.sessions(user, false)
    }

    fn get_session(&self, user: &UserId, session_id: &str) -> StoreResult<WorkoutSession> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE user_id = ?1 AND id = ?2", SESSION_COLUMNS),
                params![user.as_str(), session_id],
                SessionRow::read,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session_id)))?
            .decode()
    }

    fn next_workout(&self, user: &UserId) -> StoreResult<NextWorkout> {
        let mut stmt = self
            .conn
            .prepare("SELECT day_number FROM days WHERE user_id = ?1 ORDER BY day_number")?;
        let days = stmt
            .query_map(params![user.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<u32>, _>>()?;
        Ok(NextWorkout::from_history(&days, &self.sessions(user, true)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::BODYWEIGHT;
    use crate::session::ActiveSession;
    use crate::store::seed_default_plan;

    fn draft(name: &str, load: &str) -> ExerciseDraft {
        ExerciseDraft {
            name: name.to_string(),
            muscle_group: MuscleGroup::Quads,
            sets: 4,
            reps: 8,
            current_load: load.to_string(),
            rest_seconds: 90,
            notes: String::new(),
        }
    }

    fn db_with_day() -> (Database, UserId) {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("andrea");
        db.create_day(&user, Some("Legs")).unwrap();
        (db, user)
    }

    #[test]
    fn test_days_ordered_and_capped() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("roy");
        for _ in 0..MAX_DAYS {
            db.create_day(&user, None).unwrap();
        }
        assert!(matches!(db.create_day(&user, None), Err(StoreError::Rejected(_))));

        let days = db.list_days(&user).unwrap();
        assert_eq!(days.iter().map(|d| d.day_number).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(days[1].name, "Day 2");
    }

    #[test]
    fn test_delete_day_removes_exercises() {
        let (db, user) = db_with_day();
        db.add_exercise(&user, 1, &draft("Squat", "60")).unwrap();
        db.delete_day(&user, 1).unwrap();

        assert!(matches!(db.get_day(&user, 1), Err(StoreError::NotFound(_))));
        let next = db.create_day(&user, None).unwrap();
        assert_eq!(next.day_number, 1);
        assert!(db.get_day(&user, 1).unwrap().exercises.is_empty());
    }

    #[test]
    fn test_exercise_order_and_update() {
        let (db, user) = db_with_day();
        let squat = db.add_exercise(&user, 1, &draft("Squat", "60")).unwrap();
        let lunge = db.add_exercise(&user, 1, &draft("Lunge", "20")).unwrap();

        let patch = ExercisePatch { name: Some("Front squat".to_string()), sets: Some(5), ..Default::default() };
        let updated = db.update_exercise(&user, 1, &squat.id, &patch).unwrap();
        assert_eq!(updated.name, "Front squat");

        let day = db.get_day(&user, 1).unwrap();
        assert_eq!(day.exercises[0], updated);
        assert_eq!(day.exercises[1].id, lunge.id);

        db.delete_exercise(&user, 1, &lunge.id).unwrap();
        assert!(db.delete_exercise(&user, 1, &lunge.id).is_err());
    }

    #[test]
    fn test_add_exercise_to_missing_day() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("romi");
        assert!(matches!(db.add_exercise(&user, 3, &draft("Squat", "60")), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_load_history_series() {
        let (db, user) = db_with_day();
        let squat = db.add_exercise(&user, 1, &draft("Squat", "60")).unwrap();

        db.update_load(&user, 1, &squat.id, "62").unwrap();
        let entry = NewLoadEntry {
            exercise_id: squat.id.clone(),
            exercise_name: squat.name.clone(),
            load: "65kg".to_string(),
            sets: 4,
            reps: 8,
            day_number: Some(1),
        };
        let series = db.append_load(&user, &entry).unwrap();

        assert_eq!(series.iter().map(|e| e.value).collect::<Vec<_>>(), vec![62, 65]);
        assert_eq!(db.get_day(&user, 1).unwrap().exercises[0].current_load, "65kg");

        let history = LoadHistory::from_entries(squat.id.clone(), db.load_history(&user, &squat.id).unwrap());
        assert_eq!(history.previous_value(), Some(62));
    }

    #[test]
    fn test_bodyweight_load_rejected() {
        let (db, user) = db_with_day();
        let plank = db.add_exercise(&user, 1, &draft("Plank", BODYWEIGHT)).unwrap();
        assert!(matches!(db.update_load(&user, 1, &plank.id, BODYWEIGHT), Err(StoreError::Rejected(_))));
        assert!(db.load_history(&user, &plank.id).unwrap().is_empty());
    }

    #[test]
    fn test_session_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("andrea");
        seed_default_plan(&db, &user).unwrap();

        let mut session = ActiveSession::begin(&db, &user, 2).unwrap();
        let ids: Vec<String> = session.exercises().iter().map(|e| e.id().to_string()).collect();
        session.toggle(&ids[0]);
        session.toggle(&ids[6]);

        let stored = session.finish(&db, 62).unwrap();
        let fetched = db.get_session(&user, &stored.id).unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.exercises.len(), 7);
        assert_eq!(fetched.report.total_volume, 4 * 8 * 10);
        assert_eq!(db.list_sessions(&user).unwrap().len(), 1);
        assert!(db.list_sessions(&UserId::from("roy")).unwrap().is_empty());
    }

    /// Finish a session on `day` with its first exercise done at `load`
    fn finish_with_load(db: &Database, user: &UserId, day: u32, load: &str) -> WorkoutSession {
        let mut session = ActiveSession::begin(db, user, day).unwrap();
        let first = session.exercises()[0].id().to_string();
        let patch = ExercisePatch { current_load: Some(load.to_string()), ..Default::default() };
        session.edit_for_session(&first, &patch).unwrap();
        session.toggle(&first);
        let stored = session.finish(db, 45).unwrap();
        // keep completion timestamps distinct
        std::thread::sleep(std::time::Duration::from_millis(2));
        stored
    }

    #[test]
    fn test_load_change_uses_latest_earlier_session() {
        let (db, user) = db_with_day();
        db.add_exercise(&user, 1, &draft("Squat", "20")).unwrap();

        finish_with_load(&db, &user, 1, "20");
        finish_with_load(&db, &user, 1, "25");
        let third = finish_with_load(&db, &user, 1, "30");

        assert_eq!(third.report.load_changes.len(), 1);
        assert_eq!(third.report.load_changes[0].previous_load, "25");
        assert_eq!(third.report.load_changes[0].change_pct, 20.0);
    }

    #[test]
    fn test_recreated_day_starts_without_completions() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("andrea");
        seed_default_plan(&db, &user).unwrap();
        for day in 1..=3 {
            finish_with_load(&db, &user, day, "20");
        }

        db.delete_day(&user, 3).unwrap();
        let fresh = db.create_day(&user, Some("Fresh")).unwrap();
        assert_eq!(fresh.day_number, 3);

        let next = db.next_workout(&user).unwrap();
        assert_eq!(next.next_day, Some(3));
        assert!(!next.last_sessions.contains_key(&3));
        assert_eq!(db.list_sessions(&user).unwrap().len(), 3);
    }

    #[test]
    fn test_next_workout_after_session() {
        let db = Database::open_in_memory().unwrap();
        let user = UserId::from("andrea");
        seed_default_plan(&db, &user).unwrap();

        let mut session = ActiveSession::begin(&db, &user, 1).unwrap();
        let first = session.exercises()[0].id().to_string();
        session.toggle(&first);
        session.finish(&db, 50).unwrap();

        let next = db.next_workout(&user).unwrap();
        assert_eq!(next.next_day, Some(2));
        assert_eq!(next.total_days, 3);
        assert_eq!(next.last_sessions[&1].duration_minutes, 50);
    }
}
