//! Activity entity - A single user-logged event.
//!
//! Each activity has a `category` (transport, energy, food, consumption), a
//! `subtype` naming the mode or kind used for the factor lookup, a quantity
//! with its unit, and the `timestamp` at which it happened.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    /// Unique identifier for the activity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner of the activity
    pub user_id: i64,
    /// One of `"transport"`, `"energy"`, `"food"`, `"consumption"`
    pub category: String,
    /// Mode, fuel, food or purchase kind (e.g. `"car_petrol"`, `"beef"`)
    pub subtype: String,
    /// Free-text description entered by the user
    pub description: String,
    /// Logged amount in `unit`
    pub quantity: f64,
    /// Unit of `quantity` (e.g. `"km"`, `"kWh"`, `"INR"`)
    pub unit: String,
    /// When the activity happened
    pub timestamp: DateTimeUtc,
    /// When the record was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Activity and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each activity belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Each activity has exactly one emission
    #[sea_orm(has_one = "super::emission::Entity")]
    Emission,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::emission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Emission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
