//! Core business logic - framework-agnostic operations over the database.
//!
//! Nothing in here knows about HTTP. Functions take a `DatabaseConnection`
//! (or any `ConnectionTrait` when they must also run inside a transaction)
//! and return `crate::errors::Result`.

pub mod achievement;
pub mod activity;
pub mod challenge;
pub mod community;
pub mod dashboard;
pub mod estimator;
pub mod leaderboard;
pub mod map;
pub mod streak;
pub mod user;
