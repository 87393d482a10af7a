//! Community business logic - groups, membership and listings.
//!
//! Leaving a community also withdraws the user from that community's
//! challenges; both changes are committed together.

use crate::{
    entities::{
        Challenge, Community, CommunityMember, UserChallenge, challenge, community,
        community_member, user_challenge,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// A community with its member count and the caller's membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunitySummary {
    /// The community
    pub community: community::Model,
    /// Number of members
    pub member_count: u64,
    /// Whether the requesting user belongs to it
    pub is_member: bool,
}

/// Creates a community with a unique, non-empty name and makes
/// `founder_id` its first member.
///
/// The community and the founding membership are committed together; if
/// either write fails, neither is stored.
#[instrument(skip(db, description))]
pub async fn create_community(
    db: &DatabaseConnection,
    founder_id: i64,
    name: &str,
    description: &str,
) -> Result<community::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "community name cannot be empty"));
    }
    let taken = || format!("community '{name}' already exists");

    let txn = db.begin().await?;
    crate::core::user::get_user(&txn, founder_id).await?;

    let existing = Community::find()
        .filter(community::Column::Name.eq(name))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::Conflict { message: taken() });
    }

    let created = community::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::conflict_or_db(e, taken()))?;

    community_member::ActiveModel {
        user_id: Set(founder_id),
        community_id: Set(created.id),
        joined_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        "User {} founded community {} ({})",
        founder_id, created.name, created.id
    );
    Ok(created)
}

/// Finds a community or reports it missing.
pub async fn get_community<C>(db: &C, community_id: i64) -> Result<community::Model>
where
    C: ConnectionTrait,
{
    Community::find_by_id(community_id)
        .one(db)
        .await?
        .ok_or(Error::CommunityNotFound { id: community_id })
}

/// Whether `user_id` belongs to `community_id`.
pub async fn is_member<C>(db: &C, user_id: i64, community_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(CommunityMember::find_by_id((user_id, community_id))
        .one(db)
        .await?
        .is_some())
}

/// Adds the user to the community; joining twice keeps one membership.
#[instrument(skip(db))]
pub async fn join_community(
    db: &DatabaseConnection,
    user_id: i64,
    community_id: i64,
) -> Result<community_member::Model> {
    let txn = db.begin().await?;
    crate::core::user::get_user(&txn, user_id).await?;
    get_community(&txn, community_id).await?;

    let membership = if let Some(existing) = CommunityMember::find_by_id((user_id, community_id))
        .one(&txn)
        .await?
    {
        existing
    } else {
        community_member::ActiveModel {
            user_id: Set(user_id),
            community_id: Set(community_id),
            joined_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?
    };

    txn.commit().await?;
    Ok(membership)
}

/// Removes the membership and the user's challenge records in the community.
#[instrument(skip(db))]
pub async fn leave_community(db: &DatabaseConnection, user_id: i64, community_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    get_community(&txn, community_id).await?;

    let membership = CommunityMember::find_by_id((user_id, community_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::PermissionDenied {
            message: "you are not a member of this community".to_string(),
        })?;

    let challenge_ids: Vec<i64> = Challenge::find()
        .select_only()
        .column(challenge::Column::Id)
        .filter(challenge::Column::CommunityId.eq(community_id))
        .into_tuple()
        .all(&txn)
        .await?;

    UserChallenge::delete_many()
        .filter(user_challenge::Column::UserId.eq(user_id))
        .filter(user_challenge::Column::ChallengeId.is_in(challenge_ids))
        .exec(&txn)
        .await?;
    membership.delete(&txn).await?;

    txn.commit().await?;
    info!("User {} left community {}", user_id, community_id);
    Ok(())
}

/// Lists all communities alphabetically, annotated for `user_id`.
pub async fn list_communities(
    db: &DatabaseConnection,
    user_id: Option<i64>,
) -> Result<Vec<CommunitySummary>> {
    let communities = Community::find()
        .order_by_asc(community::Column::Name)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(communities.len());
    for community in communities {
        let member_count = CommunityMember::find()
            .filter(community_member::Column::CommunityId.eq(community.id))
            .count(db)
            .await?;
        let is_member = match user_id {
            Some(uid) => is_member(db, uid, community.id).await?,
            None => false,
        };
        summaries.push(CommunitySummary {
            community,
            member_count,
            is_member,
        });
    }
    Ok(summaries)
}
