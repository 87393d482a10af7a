//! Dashboard aggregation.
//!
//! This module provides the per-user numbers shown on the profile page:
//! monthly totals, a category breakdown, six-month trends, budget usage and a
//! month-over-month summary. Sums are computed by the database; this module
//! only shapes them for display.

use crate::{
    core::{
        estimator::Category,
        leaderboard,
        streak::{self, StreakSummary},
    },
    entities::{Activity, Emission, activity, emission, user},
    errors::{Error, Result},
};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime};
use sea_orm::{FromQueryResult, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;

/// Number of months shown on the trend chart, current month included.
pub const TREND_MONTHS: u32 = 6;

/// Chart series: parallel label and value lists
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ChartSeries {
    /// X-axis labels
    pub labels: Vec<String>,
    /// Values in kg CO2e
    pub data: Vec<f64>,
}

/// Budget card values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarbonBudget {
    /// Configured monthly ceiling in kg
    pub limit: f64,
    /// Emissions so far this month in kg, rounded to 2 decimals
    pub used: f64,
    /// Share of the budget used, 0-100
    pub percentage: f64,
}

/// Month-over-month comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Emissions this month in kg
    pub this_month: f64,
    /// Emissions last month in kg
    pub last_month: f64,
    /// Reduction relative to last month, in percent (negative = increase)
    pub improvement: f64,
}

/// A tip shown under the charts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    /// Advice text
    pub text: String,
    /// Icon reference
    pub icon: String,
}

/// Everything the profile dashboard renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Sum of this month's emissions, rounded to 2 decimals
    pub total_footprint_this_month: f64,
    /// Leaderboard position
    pub rank: Option<usize>,
    /// This month's emissions per category
    pub category_data: ChartSeries,
    /// Monthly totals, oldest first
    pub trends_data: ChartSeries,
    /// Streak statistics
    pub streak: StreakSummary,
    /// Every active date as `YYYY-MM-DD`
    pub active_days: Vec<String>,
    /// Budget usage
    pub carbon_budget: CarbonBudget,
    /// Month-over-month comparison
    pub summary: MonthlySummary,
    /// Suggestions based on the largest category
    pub actionable_insights: Vec<Insight>,
}

/// Rounds to two decimal places for display.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of the budget used: `used / limit × 100`, rounded, capped at
/// 100. A non-positive limit counts as fully used.
#[must_use]
pub fn budget_percentage(used: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 100.0;
    }
    ((used / limit) * 100.0).round().min(100.0)
}

/// Builds the budget card from this month's total.
#[must_use]
pub fn carbon_budget(used: f64, limit: f64) -> CarbonBudget {
    CarbonBudget {
        limit,
        used: round2(used),
        percentage: budget_percentage(used, limit),
    }
}

/// Reduction from `last_month` to `this_month` in percent; 0 without a baseline.
#[must_use]
pub fn improvement_percentage(this_month: f64, last_month: f64) -> f64 {
    if last_month <= 0.0 {
        return 0.0;
    }
    round2((last_month - this_month) / last_month * 100.0)
}

/// First day of the month containing `date`.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn shift_months(first: NaiveDate, delta: i32) -> Result<NaiveDate> {
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta.unsigned_abs()))
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.ok_or_else(|| Error::validation("date", format!("{first} is out of range")))
}

fn midnight(date: NaiveDate) -> DateTimeUtc {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Sums a user's emissions with timestamps in `[start, end)`; `end = None`
/// leaves the range open.
pub async fn sum_emissions<C>(
    db: &C,
    user_id: i64,
    start: DateTimeUtc,
    end: Option<DateTimeUtc>,
) -> Result<f64>
where
    C: ConnectionTrait,
{
    let mut query = Emission::find()
        .select_only()
        .column_as(emission::Column::Co2EquivalentKg.sum(), "total")
        .inner_join(Activity)
        .filter(activity::Column::UserId.eq(user_id))
        .filter(activity::Column::Timestamp.gte(start));
    if let Some(end) = end {
        query = query.filter(activity::Column::Timestamp.lt(end));
    }

    let total: Option<Option<f64>> = query.into_tuple().one(db).await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// Emissions since the first day of `today`'s month.
pub async fn monthly_total<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<f64>
where
    C: ConnectionTrait,
{
    sum_emissions(db, user_id, midnight(month_start(today)), None).await
}

#[derive(Debug, FromQueryResult)]
struct CategoryTotal {
    category: String,
    total: Option<f64>,
}

fn category_label(raw: &str) -> String {
    raw.parse::<Category>().map_or_else(
        |_| {
            let mut chars = raw.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        },
        |category| category.label().to_string(),
    )
}

/// Emissions per category from `start` onward, labels capitalized.
pub async fn category_breakdown<C>(db: &C, user_id: i64, start: DateTimeUtc) -> Result<ChartSeries>
where
    C: ConnectionTrait,
{
    let rows = Emission::find()
        .select_only()
        .column_as(activity::Column::Category, "category")
        .column_as(emission::Column::Co2EquivalentKg.sum(), "total")
        .inner_join(Activity)
        .filter(activity::Column::UserId.eq(user_id))
        .filter(activity::Column::Timestamp.gte(start))
        .group_by(activity::Column::Category)
        .order_by_asc(activity::Column::Category)
        .into_model::<CategoryTotal>()
        .all(db)
        .await?;

    Ok(rows.into_iter().fold(ChartSeries::default(), |mut series, row| {
        series.labels.push(category_label(&row.category));
        series.data.push(round2(row.total.unwrap_or(0.0)));
        series
    }))
}

/// Monthly totals for the [`TREND_MONTHS`] calendar months ending with
/// `today`'s month, oldest first, labelled like `"Mar 2024"`.
pub async fn trends<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<ChartSeries>
where
    C: ConnectionTrait,
{
    let current = month_start(today);
    let mut series = ChartSeries::default();

    for back in (0..TREND_MONTHS).rev() {
        let start = shift_months(current, -i32::try_from(back).unwrap_or(0))?;
        let end = shift_months(start, 1)?;
        let total = sum_emissions(db, user_id, midnight(start), Some(midnight(end))).await?;
        series.labels.push(start.format("%b %Y").to_string());
        series.data.push(round2(total));
    }

    Ok(series)
}

/// This month versus last month.
pub async fn monthly_summary<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<MonthlySummary>
where
    C: ConnectionTrait,
{
    let current = month_start(today);
    let previous = shift_months(current, -1)?;

    let this_month = sum_emissions(db, user_id, midnight(current), None).await?;
    let last_month =
        sum_emissions(db, user_id, midnight(previous), Some(midnight(current))).await?;

    Ok(MonthlySummary {
        this_month: round2(this_month),
        last_month: round2(last_month),
        improvement: improvement_percentage(this_month, last_month),
    })
}

/// Picks tips for the category with the largest share of emissions.
#[must_use]
pub fn insights_for(categories: &ChartSeries) -> Vec<Insight> {
    let top = categories
        .labels
        .iter()
        .zip(&categories.data)
        .filter(|(_, kg)| **kg > 0.0)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .and_then(|(label, _)| label.parse::<Category>().ok());

    let (text, icon) = match top {
        Some(Category::Transport) | None => (
            "Switching one car trip to public transit could save ~15kg CO₂e.",
            "fas fa-bus",
        ),
        Some(Category::Energy) => (
            "Lowering the thermostat by one degree trims heating emissions by ~5%.",
            "fas fa-bolt",
        ),
        Some(Category::Food) => (
            "Replacing one beef meal a week with legumes saves ~3kg CO₂e.",
            "fas fa-carrot",
        ),
        Some(Category::Consumption) => (
            "Repairing instead of replacing keeps purchase emissions down.",
            "fas fa-tools",
        ),
    };

    vec![Insight {
        text: text.to_string(),
        icon: icon.to_string(),
    }]
}

/// Assembles the full profile dashboard for `user`.
pub async fn build_dashboard<C>(db: &C, user: &user::Model, today: NaiveDate) -> Result<Dashboard>
where
    C: ConnectionTrait,
{
    let month_begin = midnight(month_start(today));
    let total = monthly_total(db, user.id, today).await?;
    let board = leaderboard::get_leaderboard(db, Some(user.id), today).await?;
    let category_data = category_breakdown(db, user.id, month_begin).await?;
    let trends_data = trends(db, user.id, today).await?;
    let days = streak::active_days(db, user.id).await?;
    let summary = monthly_summary(db, user.id, today).await?;

    Ok(Dashboard {
        total_footprint_this_month: round2(total),
        rank: board.user_rank,
        actionable_insights: insights_for(&category_data),
        category_data,
        trends_data,
        streak: streak::calculate_streak(&days, today),
        active_days: streak::format_active_days(&days),
        carbon_budget: carbon_budget(total, user.carbon_budget_kg),
        summary,
    })
}
