//! Shared test utilities for `EcoTrack`.
//!
//! Provides an in-memory database, a small factor table with round numbers,
//! and helpers that create users, activities, communities and challenges
//! with sensible defaults.

use crate::{
    config::{AppConfig, EmissionFactors, parse_config},
    core::{
        activity::{self, NewActivity},
        challenge::{self, NewChallenge},
        community,
        estimator::Category,
        user,
    },
    entities,
    errors::Result,
};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::DatabaseConnection;

/// Configuration used across tests. Factors are chosen so footprints are
/// easy to compute by hand.
pub const TEST_CONFIG: &str = r#"
[factors]
version = "test-1"

[factors.transport]
default = 0.15

[factors.transport.factors]
car_petrol = 0.2
bus = 0.1

[factors.energy]
default = 0.4

[factors.energy.factors]
electricity = 0.5

[factors.food]
default = 1.0

[factors.food.factors]
beef = 27.0

[factors.consumption]
default = 0.3
exchange_rate = 0.01

[factors.consumption.factors]
clothing = 0.5

[[achievements]]
code = "first_step"
name = "First Step"
description = "Logged a first activity"
icon = "fas fa-shoe-prints"
criterion = "activities"
threshold = 1

[[achievements]]
code = "three_days"
name = "On a Roll"
description = "Three active days in a row"
icon = "fas fa-fire"
tier = "silver"
criterion = "streak"
threshold = 3

[[achievements]]
code = "challenger"
name = "Challenger"
description = "Completed a community challenge"
icon = "fas fa-flag-checkered"
tier = "gold"
criterion = "challenges"
threshold = 1
"#;

/// Parsed [`TEST_CONFIG`].
///
/// # Panics
/// Panics if the embedded configuration is invalid.
#[allow(clippy::expect_used)]
pub fn test_config() -> AppConfig {
    parse_config(TEST_CONFIG).expect("test config is valid")
}

/// Factor table from [`TEST_CONFIG`].
pub fn test_factors() -> EmissionFactors {
    test_config().factors
}

/// Current UTC date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registers a user with the default budget and no location.
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<entities::user::Model> {
    user::create_user(db, username, "Test", None).await
}

/// Fresh database with one user named `alice`.
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "alice").await?;
    Ok((db, user))
}

/// Logs a food activity at noon UTC on `date` whose footprint equals `kg`.
///
/// The subtype is not in the food table, so the default factor of 1.0
/// applies.
pub async fn create_activity_on(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    kg: f64,
) -> Result<activity::LoggedActivity> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    let new = NewActivity {
        category: Category::Food,
        subtype: "meal".to_string(),
        description: "Test meal".to_string(),
        quantity: kg,
        unit: "kg".to_string(),
        timestamp: Some(date.and_time(noon).and_utc()),
    };
    activity::log_activity(db, &test_factors(), user_id, new).await
}

/// Creates a community founded by `founder_id` with an empty description.
pub async fn create_test_community(
    db: &DatabaseConnection,
    founder_id: i64,
    name: &str,
) -> Result<entities::community::Model> {
    community::create_community(db, founder_id, name, "").await
}

/// Creates a challenge running from a week ago to a week from now.
pub async fn create_test_challenge(
    db: &DatabaseConnection,
    community_id: i64,
    goal: f64,
) -> Result<entities::challenge::Model> {
    let new = NewChallenge {
        title: "Test challenge".to_string(),
        description: "Cut car trips".to_string(),
        goal,
        unit: "km".to_string(),
        start_date: today() - Duration::days(7),
        end_date: today() + Duration::days(7),
    };
    challenge::create_challenge(db, community_id, new).await
}
