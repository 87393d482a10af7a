//! User and profile management.
//!
//! Registration here only records identity and profile data; authentication
//! happens in front of the application.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, Set, prelude::*};
use tracing::info;

/// Budget assigned to new users, in kg CO2e per month.
pub const DEFAULT_CARBON_BUDGET_KG: f64 = 100.0;

/// Profile fields a user may change
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name
    pub first_name: Option<String>,
    /// New `"City, State"` location; an empty string clears it
    pub location: Option<String>,
    /// New monthly budget in kg
    pub carbon_budget_kg: Option<f64>,
}

fn validate_budget(budget: f64) -> Result<f64> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(Error::validation(
            "carbon_budget_kg",
            "budget must be a non-negative number",
        ));
    }
    Ok(budget)
}

fn normalize_location(location: &str) -> Option<String> {
    let trimmed = location.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Registers a new user with the default budget.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    first_name: &str,
    location: Option<&str>,
) -> Result<user::Model> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::validation("username", "username cannot be empty"));
    }

    let taken = || format!("username '{username}' is taken");
    if get_user_by_username(db, username).await?.is_some() {
        return Err(Error::Conflict { message: taken() });
    }

    let user = user::ActiveModel {
        username: Set(username.to_string()),
        first_name: Set(first_name.trim().to_string()),
        location: Set(location.and_then(normalize_location)),
        carbon_budget_kg: Set(DEFAULT_CARBON_BUDGET_KG),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| Error::conflict_or_db(e, taken()))?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Finds a user by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })
}

/// Finds a user by username, `None` if absent.
pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a profile update.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i64,
    update: ProfileUpdate,
) -> Result<user::Model> {
    let budget = update.carbon_budget_kg.map(validate_budget).transpose()?;

    let current = get_user(db, user_id).await?;
    if update.first_name.is_none() && update.location.is_none() && budget.is_none() {
        return Ok(current);
    }

    let mut active: user::ActiveModel = current.into();
    if let Some(first_name) = update.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(location) = update.location {
        active.location = Set(normalize_location(&location));
    }
    if let Some(budget) = budget {
        active.carbon_budget_kg = Set(budget);
    }

    active.update(db).await.map_err(Into::into)
}

/// Total number of registered users.
pub async fn count_users(db: &DatabaseConnection) -> Result<u64> {
    User::find().count(db).await.map_err(Into::into)
}

/// Every stored location, for the user map.
pub async fn all_locations(db: &DatabaseConnection) -> Result<Vec<String>> {
    let users = User::find()
        .filter(user::Column::Location.is_not_null())
        .all(db)
        .await?;
    Ok(users.into_iter().filter_map(|u| u.location).collect())
}
