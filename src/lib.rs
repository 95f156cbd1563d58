//! liftday - multi-day resistance training plan tracker
//!
//! Runs a plan day as a workout session, reconciles session edits with the
//! plan, reports volume and load changes and picks the next day to train.

pub mod db;
pub mod error;
pub mod exercises;
pub mod session;
pub mod store;
pub mod tui;

pub use db::Database;
pub use error::{StoreError, WorkoutError};
pub use session::ActiveSession;
pub use store::{UserId, WorkoutStore};
