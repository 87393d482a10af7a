//! Challenge entity - A community goal with a date window.
//!
//! Participants accumulate `progress` towards `goal` (expressed in `unit`)
//! between `start_date` and `end_date`, both inclusive.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Challenge database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "challenges")]
pub struct Model {
    /// Unique identifier for the challenge
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Hosting community
    pub community_id: i64,
    /// Short title shown on the challenge card
    pub title: String,
    /// Longer explanation of what counts as progress
    pub description: String,
    /// Target amount, always positive
    pub goal: f64,
    /// Unit of `goal` and of participant progress
    pub unit: String,
    /// First day of the challenge
    pub start_date: Date,
    /// Last day of the challenge
    pub end_date: Date,
}

/// Defines relationships between Challenge and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each challenge belongs to one community
    #[sea_orm(
        belongs_to = "super::community::Entity",
        from = "Column::CommunityId",
        to = "super::community::Column::Id",
        on_delete = "Cascade"
    )]
    Community,
    /// One challenge has many participation records
    #[sea_orm(has_many = "super::user_challenge::Entity")]
    Participants,
}

impl Related<super::community::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Community.def()
    }
}

impl Related<super::user_challenge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
