//! Achievement entity - The static badge catalog.
//!
//! Rows are seeded from the `[[achievements]]` section of `config.toml`.
//! `criterion` and `threshold` describe when the badge is earned.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Achievement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "achievements")]
pub struct Model {
    /// Unique identifier for the achievement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable key used to match config entries on re-seed
    #[sea_orm(unique)]
    pub code: String,
    /// Badge title
    pub name: String,
    /// What the user did to earn it
    pub description: String,
    /// Icon reference rendered by the front end
    pub icon: String,
    /// `"bronze"`, `"silver"` or `"gold"`
    pub tier: String,
    /// `"activities"`, `"streak"` or `"challenges"`
    pub criterion: String,
    /// Minimum value of the criterion
    pub threshold: i64,
}

/// Defines relationships between Achievement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One achievement is earned by many users
    #[sea_orm(has_many = "super::user_achievement::Entity")]
    Awards,
}

impl Related<super::user_achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Awards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
