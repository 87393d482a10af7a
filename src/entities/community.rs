//! Community entity - A named group of users that hosts challenges.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Community database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One community has many members
    #[sea_orm(has_many = "super::community_member::Entity")]
    Members,
    /// One community hosts many challenges
    #[sea_orm(has_many = "super::challenge::Entity")]
    Challenges,
}

impl Related<super::community_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::challenge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Challenges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
