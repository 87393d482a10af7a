//! User entity - A person logging activities.
//!
//! Users own activities, join communities and take part in challenges.
//! The profile fields (`location`, `carbon_budget_kg`) feed the map and the
//! budget card on the dashboard.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across the system
    #[sea_orm(unique)]
    pub username: String,
    /// Display name used in greetings
    pub first_name: String,
    /// Free-text location in `"City, State"` form
    pub location: Option<String>,
    /// Monthly emission ceiling in kilograms CO2e
    pub carbon_budget_kg: f64,
    /// When the user registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many activities
    #[sea_orm(has_many = "super::activity::Entity")]
    Activities,
    /// One user has many community memberships
    #[sea_orm(has_many = "super::community_member::Entity")]
    Memberships,
    /// One user has many challenge participations
    #[sea_orm(has_many = "super::user_challenge::Entity")]
    Challenges,
    /// One user has many earned achievements
    #[sea_orm(has_many = "super::user_achievement::Entity")]
    Achievements,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
