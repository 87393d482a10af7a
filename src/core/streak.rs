//! Streak calculation over a bounded lookback window.
//!
//! A streak is a run of consecutive calendar days with at least one activity.
//! The calculator only looks at the [`STREAK_WINDOW_DAYS`] days ending today,
//! so `max_streak` is the longest run *inside that window*. Runs that started
//! more than a year ago are truncated at the window edge; accounts older than
//! a year can therefore show a shorter maximum than their all-time record.
//! This bound is part of the contract.

use crate::{
    entities::{Activity, activity},
    errors::Result,
};
use chrono::{Duration, NaiveDate};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeSet;

/// Number of days, ending today, that the calculator inspects.
pub const STREAK_WINDOW_DAYS: i64 = 365;

/// Active-day statistics for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct StreakSummary {
    /// Distinct days with at least one activity, over the whole history
    pub total_active_days: usize,
    /// Longest consecutive-day run within the window
    pub max_streak: usize,
}

/// Computes the streak summary for a set of active dates.
///
/// Walks backward from `today` one day at a time. Scanning stops early once
/// more than twice `total_active_days` days have been inspected while no run
/// is in progress, since no older activity can be expected.
#[must_use]
pub fn calculate_streak(active_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakSummary {
    let total_active_days = active_days.len();
    let mut max_streak = 0;
    let mut current_streak = 0;

    for offset in 0..STREAK_WINDOW_DAYS {
        let day = today - Duration::days(offset);
        if active_days.contains(&day) {
            current_streak += 1;
            continue;
        }

        max_streak = max_streak.max(current_streak);
        let scanned = usize::try_from(offset).unwrap_or(usize::MAX);
        if scanned > total_active_days * 2 && current_streak == 0 {
            break;
        }
        current_streak = 0;
    }

    // The run may still be open at the far edge of the window
    max_streak = max_streak.max(current_streak);

    StreakSummary {
        total_active_days,
        max_streak,
    }
}

/// Loads the distinct UTC calendar dates on which the user logged activities.
pub async fn active_days<C>(db: &C, user_id: i64) -> Result<BTreeSet<NaiveDate>>
where
    C: ConnectionTrait,
{
    let timestamps: Vec<DateTimeUtc> = Activity::find()
        .select_only()
        .column(activity::Column::Timestamp)
        .filter(activity::Column::UserId.eq(user_id))
        .order_by_desc(activity::Column::Timestamp)
        .into_tuple()
        .all(db)
        .await?;

    Ok(timestamps.into_iter().map(|ts| ts.date_naive()).collect())
}

/// Loads the user's active dates and summarises them.
pub async fn user_streak<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<StreakSummary>
where
    C: ConnectionTrait,
{
    let days = active_days(db, user_id).await?;
    Ok(calculate_streak(&days, today))
}

/// Active dates formatted for the calendar chart, oldest first.
#[must_use]
pub fn format_active_days(active_days: &BTreeSet<NaiveDate>) -> Vec<String> {
    active_days
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}
