//! liftday - multi-day resistance training plan tracker

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use liftday::db::Database;
use liftday::exercises::{BODYWEIGHT, ExerciseDraft, ExercisePatch, MuscleGroup};
use liftday::session::report::{Direction, parse_duration};
use liftday::session::{self, ActiveSession, EditOutcome, LoadHistory, WorkoutSession};
use liftday::store::{self as plan_store, UserId, WorkoutDay, WorkoutStore};
use liftday::tui::App;

#[derive(Parser)]
#[command(name = "liftday")]
#[command(author, version, about = "Multi-day resistance training plan tracker")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "LIFTDAY_DB", default_value = "liftday.db")]
    db: String,

    /// Profile whose plan is used
    #[arg(short, long, global = true, env = "LIFTDAY_USER", default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui,

    /// Install the default three-day plan if the profile has none
    Seed,

    /// List plan days and their exercises
    Days,

    /// Show which day to train next
    Next,

    /// Append a day to the plan
    AddDay {
        name: Option<String>,
    },

    /// Delete a day and its exercises
    DeleteDay {
        day: u32,
    },

    /// Add an exercise to a day
    AddExercise {
        day: u32,
        name: String,

        #[arg(short, long, default_value = "4")]
        sets: u32,

        /// 0 for time-based exercises
        #[arg(short, long, default_value = "10")]
        reps: u32,

        /// Load such as "20" or "22kg", or "Bodyweight"
        #[arg(short, long, default_value = BODYWEIGHT)]
        load: String,

        #[arg(short, long, default_value = "chest")]
        muscle: MuscleGroup,

        /// Rest between sets in seconds
        #[arg(long, default_value = "60")]
        rest: u32,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Edit an exercise permanently
    EditExercise {
        day: u32,
        /// Exercise id or 1-based position in the day
        exercise: String,

        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        sets: Option<u32>,
        #[arg(short, long)]
        reps: Option<u32>,
        #[arg(short, long)]
        load: Option<String>,
        #[arg(short, long)]
        muscle: Option<MuscleGroup>,
        #[arg(long)]
        rest: Option<u32>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove an exercise from a day
    RemoveExercise {
        day: u32,
        exercise: String,
    },

    /// Record a new load in the exercise's history
    LogLoad {
        day: u32,
        exercise: String,
        load: String,
    },

    /// Change only the current load of an exercise
    SetLoad {
        day: u32,
        exercise: String,
        load: String,
    },

    /// Show the load history of an exercise
    History {
        day: u32,
        exercise: String,
    },

    /// Run a workout: mark exercises done and store the session
    Finish {
        day: u32,

        /// Completed exercises (ids or positions, comma separated)
        #[arg(short, long, value_delimiter = ',')]
        done: Vec<String>,

        /// Workout duration in minutes
        #[arg(short = 't', long)]
        duration: String,

        /// Session-only load override, EXERCISE=LOAD (repeatable)
        #[arg(long = "session-load")]
        session_loads: Vec<String>,
    },

    /// List stored sessions
    Sessions {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show one stored session
    Session {
        id: String,
    },
}

/// Accept either an exercise id or its 1-based position in the day
fn resolve_exercise(session: &ActiveSession, key: &str) -> Result<String> {
    if let Ok(position) = key.parse::<usize>()
        && let Some(working) = position.checked_sub(1).and_then(|i| session.exercises().get(i))
    {
        return Ok(working.id().to_string());
    }
    if session.exercise(key).is_some() {
        return Ok(key.to_string());
    }
    bail!("day {} has no exercise '{}'", session.day_number(), key)
}

fn print_day(day: &WorkoutDay, next_day: Option<u32>) {
    let marker = if Some(day.day_number) == next_day { "  <- NEXT" } else { "" };
    println!("Day {}: {}{}", day.day_number, day.name, marker);
    for (i, ex) in day.exercises.iter().enumerate() {
        let load = if ex.is_bodyweight() { "--".to_string() } else { ex.current_load.clone() };
        println!(
            "  {:>2}. {:24} {:10} {:>10} {:>8} rest {:6} [{}]",
            i + 1,
            ex.name,
            ex.muscle_group.label(),
            ex.scheme(),
            load,
            ex.rest_label(),
            ex.id
        );
    }
}

fn print_history(history: &LoadHistory) {
    println!("Load history for {}", history.exercise_id());
    println!("{:-<40}", "");
    for entry in history.iter() {
        println!("{} | {:>8} | {}", entry.recorded_at.format("%Y-%m-%d %H:%M"), entry.load, entry.value);
    }
    if let (Some(latest), Some(previous)) = (history.latest_value(), history.previous_value()) {
        println!("Latest {} (previous {})", latest, previous);
    }
}

fn print_session(session: &WorkoutSession) {
    println!(
        "{} | {} | {} | {} min",
        session.completed_at.format("%Y-%m-%d %H:%M"),
        session.day_name,
        session.id,
        session.duration_minutes
    );
    for ex in &session.exercises {
        let mark = if ex.completed { "x" } else { " " };
        let modified = if ex.was_modified { format!(" (MOD, was {})", ex.original_name) } else { String::new() };
        println!("  [{}] {} {}x{} @ {}{}", mark, ex.name, ex.sets, ex.reps, ex.load, modified);
    }

    let report = &session.report;
    println!(
        "Report: {}/{} exercises, volume {}",
        report.completed_exercises, report.total_exercises, report.total_volume
    );
    for change in &report.load_changes {
        let arrow = match change.direction() {
            Direction::Up => "+",
            Direction::Down | Direction::Flat => "",
        };
        println!(
            "  {}: {} -> {} ({}{}%)",
            change.exercise_name, change.previous_load, change.current_load, arrow, change.change_pct
        );
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let user = UserId::new(cli.user);
    let db = Database::open(&cli.db)?;

    match cli.command {
        Some(Commands::Tui) | None => {
            let mut app = App::new(db, user);
            app.run()?;
        }

        Some(Commands::Seed) => {
            let created = plan_store::seed_default_plan(&db, &user)?;
            if created == 0 {
                println!("{} already has a plan", user);
            } else {
                println!("Seeded {} days for {}", created, user);
            }
        }

        Some(Commands::Days) => {
            let next = db.next_workout(&user)?;
            let days = db.list_days(&user)?;
            if days.is_empty() {
                println!("No plan yet - run `liftday seed` or `liftday add-day`");
            }
            for day in &days {
                print_day(day, next.next_day);
                match next.last_sessions.get(&day.day_number) {
                    Some(last) => println!(
                        "  last completed {} ({} min)\n",
                        last.completed_at.format("%Y-%m-%d %H:%M"),
                        last.duration_minutes
                    ),
                    None => println!("  never completed\n"),
                }
            }
        }

        Some(Commands::Next) => {
            let next = db.next_workout(&user)?;
            match next.next_day {
                Some(day) => print_day(&db.get_day(&user, day)?, Some(day)),
                None => println!("No plan yet"),
            }
        }

        Some(Commands::AddDay { name }) => {
            let day = db.create_day(&user, name.as_deref())?;
            println!("Created day {}: {}", day.day_number, day.name);
        }

        Some(Commands::DeleteDay { day }) => {
            db.delete_day(&user, day)?;
            println!("Deleted day {}", day);
        }

        Some(Commands::AddExercise { day, name, sets, reps, load, muscle, rest, notes }) => {
            let draft = ExerciseDraft {
                name,
                muscle_group: muscle,
                sets,
                reps,
                current_load: load,
                rest_seconds: rest,
                notes: notes.unwrap_or_default(),
            };
            let mut session = ActiveSession::begin(&db, &user, day)?;
            let added = session.add_exercise(&db, &draft)?;
            println!("Added {} ({})", added.name(), added.id());
        }

        Some(Commands::EditExercise { day, exercise, name, sets, reps, load, muscle, rest, notes }) => {
            let patch = ExercisePatch {
                name,
                muscle_group: muscle,
                sets,
                reps,
                current_load: load,
                rest_seconds: rest,
                notes,
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            let mut session = ActiveSession::begin(&db, &user, day)?;
            let id = resolve_exercise(&session, &exercise)?;
            match session.edit_permanently(&db, &id, &patch)? {
                EditOutcome::Saved => println!("Saved {}", id),
                EditOutcome::SessionOnly(err) => println!("Not saved to the plan: {}", err),
            }
        }

        Some(Commands::RemoveExercise { day, exercise }) => {
            let mut session = ActiveSession::begin(&db, &user, day)?;
            let id = resolve_exercise(&session, &exercise)?;
            session.remove_exercise(&db, &id)?;
            println!("Removed {}", id);
        }

        Some(Commands::LogLoad { day, exercise, load }) => {
            let mut session = ActiveSession::begin(&db, &user, day)?;
            let id = resolve_exercise(&session, &exercise)?;
            let history = session.record_load(&db, &id, &load)?;
            print_history(&history);
        }

        Some(Commands::SetLoad { day, exercise, load }) => {
            let session = ActiveSession::begin(&db, &user, day)?;
            let id = resolve_exercise(&session, &exercise)?;
            if let Some(working) = session.exercise(&id) {
                session::set_current_load(&db, &user, day, &working.exercise, &load)?;
                println!("{} now at {}", working.name(), load.trim());
            }
        }

        Some(Commands::History { day, exercise }) => {
            let session = ActiveSession::begin(&db, &user, day)?;
            let id = resolve_exercise(&session, &exercise)?;
            let history = LoadHistory::from_entries(id.clone(), db.load_history(&user, &id)?);
            print_history(&history);
        }

        Some(Commands::Finish { day, done, duration, session_loads }) => {
            let duration = parse_duration(&duration)?;
            let mut session = ActiveSession::begin(&db, &user, day)?;

            for entry in &session_loads {
                let Some((key, load)) = entry.split_once('=') else {
                    bail!("expected EXERCISE=LOAD, got '{}'", entry);
                };
                let id = resolve_exercise(&session, key)?;
                let patch = ExercisePatch { current_load: Some(load.to_string()), ..Default::default() };
                session.edit_for_session(&id, &patch)?;
            }
            for key in &done {
                let id = resolve_exercise(&session, key)?;
                if session.is_completed(&id) {
                    continue;
                }
                session.toggle(&id);
            }

            let estimate = session.estimated_report();
            println!(
                "Estimated: {}/{} exercises ({:.0}%), volume {}",
                estimate.completed_exercises,
                estimate.total_exercises,
                session.completion_ratio() * 100.0,
                estimate.total_volume
            );

            let stored = session.finish(&db, duration)?;
            println!();
            print_session(&stored);
        }

        Some(Commands::Sessions { limit }) => {
            let sessions = db.list_sessions(&user)?;
            println!("Recent sessions:");
            println!("{:-<60}", "");
            for s in sessions.iter().take(limit) {
                println!(
                    "{} | {:10} | {}/{} | vol {:>6} | {}",
                    s.completed_at.format("%Y-%m-%d %H:%M"),
                    s.day_name,
                    s.report.completed_exercises,
                    s.report.total_exercises,
                    s.report.total_volume,
                    s.id
                );
            }
        }

        Some(Commands::Session { id }) => {
            print_session(&db.get_session(&user, &id)?);
        }
    }

    Ok(())
}
