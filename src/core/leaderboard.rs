//! Leaderboard ranking by trailing 30-day emissions.
//!
//! Lower emissions rank better. A total of exactly zero almost always means
//! the user logged nothing, so zero totals are ranked after every positive
//! total. Equal totals are ordered by user id, which keeps the ranking stable
//! between requests.
//!
//! The per-user sums are computed by the database (`SUM ... GROUP BY`), so a
//! page view costs two queries regardless of how many activities exist.

use crate::{
    entities::{Activity, Emission, User, activity, emission, user},
    errors::Result,
};
use chrono::{Duration, NaiveDate, NaiveTime};
use sea_orm::{FromQueryResult, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Length of the trailing window in days.
pub const LEADERBOARD_WINDOW_DAYS: i64 = 30;

/// Number of entries shown on the leaderboard card.
pub const LEADERBOARD_SIZE: usize = 5;

/// One user's total before ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// User identity, also the tie-breaker
    pub user_id: i64,
    /// Display name
    pub username: String,
    /// Sum of emissions in the window, in kg
    pub emission_kg: f64,
}

/// Decoration shown next to a leaderboard position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBadge {
    /// Rank 1
    Gold,
    /// Rank 2
    Silver,
    /// Rank 3
    Bronze,
    /// Rank 4 and below
    Numeric(usize),
}

impl RankBadge {
    /// Badge for a 1-based rank.
    #[must_use]
    pub const fn for_rank(rank: usize) -> Self {
        match rank {
            1 => Self::Gold,
            2 => Self::Silver,
            3 => Self::Bronze,
            n => Self::Numeric(n),
        }
    }

    /// Icon text rendered on the card.
    #[must_use]
    pub fn icon(self) -> String {
        match self {
            Self::Gold => "🥇".to_string(),
            Self::Silver => "🥈".to_string(),
            Self::Bronze => "🥉".to_string(),
            Self::Numeric(n) => n.to_string(),
        }
    }
}

impl Serialize for RankBadge {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.icon())
    }
}

/// A leaderboard row ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position
    pub rank: usize,
    /// Medal or number
    pub rank_icon: RankBadge,
    /// Display name
    pub user: String,
    /// Raw total in kg
    pub emission_kg: f64,
    /// Total formatted as `"1.5 kg"`
    pub emission: String,
}

/// Everything the leaderboard card and rank badges need
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    /// The best [`LEADERBOARD_SIZE`] entries
    pub top: Vec<RankedEntry>,
    /// Rank of the requesting user, `None` if anonymous or unknown
    pub user_rank: Option<usize>,
    /// Number of ranked users
    pub participants: usize,
}

fn ranking_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    let a_zero = a.emission_kg == 0.0;
    let b_zero = b.emission_kg == 0.0;
    a_zero
        .cmp(&b_zero)
        .then_with(|| a.emission_kg.total_cmp(&b.emission_kg))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Sorts entries into ranking order: positive totals ascending, then zero
/// totals, ties broken by user id.
pub fn rank_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(ranking_order);
}

/// Formats a kilogram total for the leaderboard.
#[must_use]
pub fn format_emission(kg: f64) -> String {
    format!("{kg:.1} kg")
}

/// Builds the leaderboard from unsorted per-user totals.
#[must_use]
pub fn build_leaderboard(mut entries: Vec<LeaderboardEntry>, current_user: Option<i64>) -> Leaderboard {
    rank_entries(&mut entries);

    let user_rank = current_user.and_then(|id| {
        entries
            .iter()
            .position(|entry| entry.user_id == id)
            .map(|index| index + 1)
    });

    let top = entries
        .iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            rank: index + 1,
            rank_icon: RankBadge::for_rank(index + 1),
            user: entry.username.clone(),
            emission_kg: entry.emission_kg,
            emission: format_emission(entry.emission_kg),
        })
        .collect();

    Leaderboard {
        top,
        user_rank,
        participants: entries.len(),
    }
}

#[derive(Debug, FromQueryResult)]
struct UserTotal {
    user_id: i64,
    total: Option<f64>,
}

/// Start of the trailing window: midnight UTC, `LEADERBOARD_WINDOW_DAYS` before `today`.
#[must_use]
pub fn window_start(today: NaiveDate) -> DateTimeUtc {
    (today - Duration::days(LEADERBOARD_WINDOW_DAYS))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Sums every user's emissions since `since`, grouped in the database.
pub async fn emission_totals_since<C>(db: &C, since: DateTimeUtc) -> Result<HashMap<i64, f64>>
where
    C: ConnectionTrait,
{
    let totals = Emission::find()
        .select_only()
        .column_as(activity::Column::UserId, "user_id")
        .column_as(emission::Column::Co2EquivalentKg.sum(), "total")
        .inner_join(Activity)
        .filter(activity::Column::Timestamp.gte(since))
        .group_by(activity::Column::UserId)
        .into_model::<UserTotal>()
        .all(db)
        .await?;

    Ok(totals
        .into_iter()
        .map(|row| (row.user_id, row.total.unwrap_or(0.0)))
        .collect())
}

/// Loads every user with their 30-day total (0 when they logged nothing).
pub async fn load_entries<C>(db: &C, today: NaiveDate) -> Result<Vec<LeaderboardEntry>>
where
    C: ConnectionTrait,
{
    let totals = emission_totals_since(db, window_start(today)).await?;
    let users = User::find().order_by_asc(user::Column::Id).all(db).await?;

    Ok(users
        .into_iter()
        .map(|u| LeaderboardEntry {
            emission_kg: totals.get(&u.id).copied().unwrap_or(0.0),
            user_id: u.id,
            username: u.username,
        })
        .collect())
}

/// Loads and ranks the leaderboard for `current_user`.
pub async fn get_leaderboard<C>(
    db: &C,
    current_user: Option<i64>,
    today: NaiveDate,
) -> Result<Leaderboard>
where
    C: ConnectionTrait,
{
    let entries = load_entries(db, today).await?;
    Ok(build_leaderboard(entries, current_user))
}
