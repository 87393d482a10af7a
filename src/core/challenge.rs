//! Challenge business logic - community goals and participant progress.
//!
//! Only members of the hosting community may join a challenge or record
//! progress on it. Participation is unique per `(user, challenge)` and is
//! written inside a transaction so concurrent joins cannot create duplicates.

use crate::{
    core::community,
    entities::{Challenge, UserChallenge, challenge, user_challenge},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Input for a new challenge
#[derive(Debug, Clone)]
pub struct NewChallenge {
    /// Card title
    pub title: String,
    /// What counts as progress
    pub description: String,
    /// Target amount, must be positive
    pub goal: f64,
    /// Unit of the goal
    pub unit: String,
    /// First day, inclusive
    pub start_date: NaiveDate,
    /// Last day, inclusive
    pub end_date: NaiveDate,
}

/// A challenge as seen by one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeView {
    /// The challenge
    pub challenge: challenge::Model,
    /// Number of participants
    pub participants: u64,
    /// The caller's participation, if any
    pub participation: Option<user_challenge::Model>,
    /// The caller's progress as 0-100
    pub progress_percentage: f64,
}

/// Progress towards a goal in percent, capped at 100. A non-positive goal
/// yields 0.
#[must_use]
pub fn progress_percentage(progress: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    (progress / goal * 100.0).clamp(0.0, 100.0)
}

/// Creates a challenge in an existing community.
pub async fn create_challenge(
    db: &DatabaseConnection,
    community_id: i64,
    new: NewChallenge,
) -> Result<challenge::Model> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "challenge title cannot be empty"));
    }
    if !new.goal.is_finite() || new.goal <= 0.0 {
        return Err(Error::validation("goal", "goal must be a positive number"));
    }
    if new.start_date > new.end_date {
        return Err(Error::validation("end_date", "end date is before start date"));
    }

    community::get_community(db, community_id).await?;

    let created = challenge::ActiveModel {
        community_id: Set(community_id),
        title: Set(title.to_string()),
        description: Set(new.description.trim().to_string()),
        goal: Set(new.goal),
        unit: Set(new.unit.trim().to_string()),
        start_date: Set(new.start_date),
        end_date: Set(new.end_date),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created challenge {} in community {}", created.id, community_id);
    Ok(created)
}

/// Finds a challenge or reports it missing.
pub async fn get_challenge<C>(db: &C, challenge_id: i64) -> Result<challenge::Model>
where
    C: ConnectionTrait,
{
    Challenge::find_by_id(challenge_id)
        .one(db)
        .await?
        .ok_or(Error::ChallengeNotFound { id: challenge_id })
}

async fn require_membership<C>(db: &C, user_id: i64, challenge: &challenge::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    if community::is_member(db, user_id, challenge.community_id).await? {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            message: "join the community before taking part in its challenges".to_string(),
        })
    }
}

/// Joins a challenge, returning the existing record if already joined.
#[instrument(skip(db))]
pub async fn join_challenge(
    db: &DatabaseConnection,
    user_id: i64,
    challenge_id: i64,
    today: NaiveDate,
) -> Result<user_challenge::Model> {
    let txn = db.begin().await?;

    let challenge = get_challenge(&txn, challenge_id).await?;
    require_membership(&txn, user_id, &challenge).await?;

    let existing = UserChallenge::find_by_id((user_id, challenge_id))
        .one(&txn)
        .await?;
    let participation = match existing {
        Some(record) => record,
        None => {
            if today > challenge.end_date {
                return Err(Error::validation("challenge", "this challenge has ended"));
            }
            user_challenge::ActiveModel {
                user_id: Set(user_id),
                challenge_id: Set(challenge_id),
                progress: Set(0.0),
                completed: Set(false),
                joined_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    Ok(participation)
}

/// Adds `amount` to the user's progress and marks completion at the goal.
#[instrument(skip(db))]
pub async fn record_progress(
    db: &DatabaseConnection,
    user_id: i64,
    challenge_id: i64,
    amount: f64,
) -> Result<user_challenge::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidQuantity { quantity: amount });
    }

    let txn = db.begin().await?;

    let challenge = get_challenge(&txn, challenge_id).await?;
    let record = UserChallenge::find_by_id((user_id, challenge_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::PermissionDenied {
            message: "join the challenge before recording progress".to_string(),
        })?;

    let progress = record.progress + amount;
    let completed = record.completed || progress >= challenge.goal;
    let mut active: user_challenge::ActiveModel = record.into();
    active.progress = Set(progress);
    active.completed = Set(completed);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    if updated.completed {
        info!("User {} completed challenge {}", user_id, challenge_id);
    }
    Ok(updated)
}

/// Number of challenges the user has completed.
pub async fn count_completed<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    UserChallenge::find()
        .filter(user_challenge::Column::UserId.eq(user_id))
        .filter(user_challenge::Column::Completed.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Lists a community's challenges, soonest ending first, from `user_id`'s view.
pub async fn list_challenges(
    db: &DatabaseConnection,
    community_id: i64,
    user_id: Option<i64>,
) -> Result<Vec<ChallengeView>> {
    community::get_community(db, community_id).await?;

    let challenges = Challenge::find()
        .filter(challenge::Column::CommunityId.eq(community_id))
        .order_by_asc(challenge::Column::EndDate)
        .order_by_asc(challenge::Column::Id)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(challenges.len());
    for challenge in challenges {
        let participants = UserChallenge::find()
            .filter(user_challenge::Column::ChallengeId.eq(challenge.id))
            .count(db)
            .await?;
        let participation = match user_id {
            Some(uid) => UserChallenge::find_by_id((uid, challenge.id)).one(db).await?,
            None => None,
        };
        let progress_percentage = participation
            .as_ref()
            .map_or(0.0, |p| progress_percentage(p.progress, challenge.goal));
        views.push(ChallengeView {
            challenge,
            participants,
            participation,
            progress_percentage,
        });
    }
    Ok(views)
}
