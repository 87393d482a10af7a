//! Achievement business logic - catalog seeding, awarding and listings.
//!
//! The catalog lives in config.toml and is copied into the database at
//! start-up. Awards are evaluated after the events that can change a
//! criterion (logging an activity, completing a challenge) and each badge is
//! earned at most once.

use crate::{
    config::{AchievementConfig, achievements::Criterion},
    core::{activity, challenge, streak},
    entities::{Achievement, UserAchievement, achievement, user_achievement},
    errors::Result,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Number of badges shown in the home page "recent" strip.
pub const RECENT_BADGES: u64 = 3;

/// A badge as shown in the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    /// Badge title
    pub name: String,
    /// Short explanation
    pub description: String,
    /// Icon reference
    pub icon: String,
    /// Tier
    pub tier: String,
}

impl From<achievement::Model> for BadgeView {
    fn from(model: achievement::Model) -> Self {
        Self {
            name: model.name,
            description: model.description,
            icon: model.icon,
            tier: model.tier,
        }
    }
}

/// Placeholder shown to users without badges.
#[must_use]
pub fn welcome_badge() -> BadgeView {
    BadgeView {
        name: "Welcome!".to_string(),
        description: "Start logging activities to earn your first badge.".to_string(),
        icon: "fas fa-star".to_string(),
        tier: "bronze".to_string(),
    }
}

/// Inserts or refreshes catalog rows, matched by code.
pub async fn seed_achievements(db: &DatabaseConnection, catalog: &[AchievementConfig]) -> Result<usize> {
    let txn = db.begin().await?;
    let mut inserted = 0;

    for entry in catalog {
        let existing = Achievement::find()
            .filter(achievement::Column::Code.eq(entry.code.as_str()))
            .one(&txn)
            .await?;

        let mut active = existing.map_or_else(
            || achievement::ActiveModel {
                code: Set(entry.code.clone()),
                ..Default::default()
            },
            Into::into,
        );
        let is_new = active.id.is_not_set();
        active.name = Set(entry.name.clone());
        active.description = Set(entry.description.clone());
        active.icon = Set(entry.icon.clone());
        active.tier = Set(entry.tier.clone());
        active.criterion = Set(entry.criterion.as_str().to_string());
        active.threshold = Set(entry.threshold);
        active.save(&txn).await?;

        if is_new {
            inserted += 1;
        }
    }

    txn.commit().await?;
    info!(
        "Achievement catalog seeded: {} entries, {} new",
        catalog.len(),
        inserted
    );
    Ok(inserted)
}

/// Current value of every criterion for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Logged activities
    pub activities: u64,
    /// Max streak in the lookback window
    pub streak: u64,
    /// Completed challenges
    pub challenges: u64,
}

impl Progress {
    /// Value of one criterion.
    #[must_use]
    pub const fn value(&self, criterion: Criterion) -> u64 {
        match criterion {
            Criterion::Activities => self.activities,
            Criterion::Streak => self.streak,
            Criterion::Challenges => self.challenges,
        }
    }

    /// Whether `threshold` is reached for `criterion`.
    #[must_use]
    pub fn meets(&self, criterion: Criterion, threshold: i64) -> bool {
        u64::try_from(threshold).is_ok_and(|t| self.value(criterion) >= t)
    }
}

async fn load_progress(db: &DatabaseConnection, user_id: i64, today: NaiveDate) -> Result<Progress> {
    let summary = streak::user_streak(db, user_id, today).await?;
    Ok(Progress {
        activities: activity::count_activities(db, user_id).await?,
        streak: u64::try_from(summary.max_streak).unwrap_or(u64::MAX),
        challenges: challenge::count_completed(db, user_id).await?,
    })
}

/// Awards every unmet achievement the user now qualifies for.
///
/// Returns the newly earned badges.
pub async fn evaluate_achievements(
    db: &DatabaseConnection,
    user_id: i64,
    today: NaiveDate,
) -> Result<Vec<achievement::Model>> {
    let progress = load_progress(db, user_id, today).await?;

    let earned: HashSet<i64> = UserAchievement::find()
        .select_only()
        .column(user_achievement::Column::AchievementId)
        .filter(user_achievement::Column::UserId.eq(user_id))
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let catalog = Achievement::find()
        .order_by_asc(achievement::Column::Id)
        .all(db)
        .await?;

    let mut awarded = Vec::new();
    let now = Utc::now();
    for badge in catalog {
        if earned.contains(&badge.id) {
            continue;
        }
        let Ok(criterion) = badge.criterion.parse::<Criterion>() else {
            warn!("Skipping achievement {} with unknown criterion", badge.code);
            continue;
        };
        if !progress.meets(criterion, badge.threshold) {
            continue;
        }

        user_achievement::ActiveModel {
            user_id: Set(user_id),
            achievement_id: Set(badge.id),
            earned_at: Set(now),
        }
        .insert(db)
        .await?;
        info!("User {} earned achievement {}", user_id, badge.code);
        awarded.push(badge);
    }

    Ok(awarded)
}

/// The user's badges, oldest first, or the welcome placeholder.
pub async fn earned_badges(db: &DatabaseConnection, user_id: i64) -> Result<Vec<BadgeView>> {
    let rows = UserAchievement::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .order_by_asc(user_achievement::Column::EarnedAt)
        .find_also_related(Achievement)
        .all(db)
        .await?;

    let badges: Vec<BadgeView> = rows
        .into_iter()
        .filter_map(|(_, badge)| badge.map(BadgeView::from))
        .collect();

    if badges.is_empty() {
        return Ok(vec![welcome_badge()]);
    }
    Ok(badges)
}

/// The most recently earned badges across all users.
pub async fn recent_badges(db: &DatabaseConnection) -> Result<Vec<BadgeView>> {
    let rows = UserAchievement::find()
        .order_by_desc(user_achievement::Column::EarnedAt)
        .limit(RECENT_BADGES)
        .find_also_related(Achievement)
        .all(db)
        .await?;

    let badges: Vec<BadgeView> = rows
        .into_iter()
        .filter_map(|(_, badge)| badge.map(BadgeView::from))
        .collect();

    if badges.is_empty() {
        return Ok(vec![welcome_badge()]);
    }
    Ok(badges)
}
