//! Emission entity - The computed CO2-equivalent mass of one activity.
//!
//! Emissions are written in the same database transaction as their activity
//! and removed with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Emission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "emissions")]
pub struct Model {
    /// Unique identifier for the emission
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The activity this emission belongs to (one-to-one)
    #[sea_orm(unique)]
    pub activity_id: i64,
    /// Footprint in kilograms CO2e, never negative
    pub co2_equivalent_kg: f64,
    /// When the emission was computed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Emission and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each emission belongs to one activity
    #[sea_orm(
        belongs_to = "super::activity::Entity",
        from = "Column::ActivityId",
        to = "super::activity::Column::Id",
        on_delete = "Cascade"
    )]
    Activity,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
