//! Activity business logic - Handles logging, editing and removing activities.
//!
//! Every activity is stored together with exactly one emission record. All
//! functions that touch both tables run inside a database transaction, so a
//! reader never sees an activity without its emission or the reverse. The
//! footprint is estimated before the transaction opens; a bad quantity never
//! reaches the database.

use crate::{
    config::EmissionFactors,
    core::estimator::{self, Category, Estimate},
    entities::{Activity, Emission, User, activity, emission},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Input for a new activity
#[derive(Debug, Clone)]
pub struct NewActivity {
    /// Category used for the factor table
    pub category: Category,
    /// Mode, fuel, food or purchase kind
    pub subtype: String,
    /// Free-text description
    pub description: String,
    /// Logged amount
    pub quantity: f64,
    /// Unit of `quantity`
    pub unit: String,
    /// When it happened; defaults to now
    pub timestamp: Option<DateTimeUtc>,
}

/// Editable fields of an existing activity
#[derive(Debug, Clone, Default)]
pub struct ActivityUpdate {
    /// Replacement description
    pub description: Option<String>,
    /// Replacement footprint in kg CO2e
    pub co2_kg: Option<f64>,
}

/// An activity and its emission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityWithEmission {
    /// The stored activity
    pub activity: activity::Model,
    /// Its footprint in kg CO2e
    pub co2_equivalent_kg: f64,
}

/// Result of logging an activity
#[derive(Debug, Clone, Serialize)]
pub struct LoggedActivity {
    /// The stored activity
    pub activity: activity::Model,
    /// The stored emission
    pub emission: emission::Model,
    /// How the footprint was computed
    pub estimate: Estimate,
}

/// Parses a user-supplied date or timestamp.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (read as midnight
/// UTC).
///
/// # Errors
/// Returns a validation error for anything else.
pub fn parse_timestamp(raw: &str) -> Result<DateTimeUtc> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| Error::validation("timestamp", format!("'{trimmed}' is not a valid date")))
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Estimates and stores a new activity with its emission.
///
/// The user must exist. The activity and emission are inserted in one
/// transaction.
#[instrument(skip(db, factors, new), fields(category = %new.category))]
pub async fn log_activity(
    db: &DatabaseConnection,
    factors: &EmissionFactors,
    user_id: i64,
    new: NewActivity,
) -> Result<LoggedActivity> {
    let description = require_text("description", &new.description)?;
    let unit = require_text("unit", &new.unit)?;
    let estimate = estimator::estimate(factors, new.category, &new.subtype, new.quantity)?;

    let now = Utc::now();
    let timestamp = new.timestamp.unwrap_or(now);

    let txn = db.begin().await?;

    User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    let activity = activity::ActiveModel {
        user_id: Set(user_id),
        category: Set(new.category.as_str().to_string()),
        subtype: Set(estimate.subtype.clone()),
        description: Set(description),
        quantity: Set(new.quantity),
        unit: Set(unit),
        timestamp: Set(timestamp),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let emission = emission::ActiveModel {
        activity_id: Set(activity.id),
        co2_equivalent_kg: Set(estimate.co2_kg),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        activity_id = activity.id,
        co2_kg = estimate.co2_kg,
        factors_version = %factors.version,
        "Logged activity"
    );

    Ok(LoggedActivity {
        activity,
        emission,
        estimate,
    })
}

/// Finds an activity owned by `user_id`.
///
/// Activities belonging to someone else are reported as not found.
pub async fn get_owned_activity<C>(db: &C, user_id: i64, activity_id: i64) -> Result<activity::Model>
where
    C: ConnectionTrait,
{
    Activity::find_by_id(activity_id)
        .filter(activity::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::ActivityNotFound { id: activity_id })
}

/// Edits the description and/or footprint of an owned activity.
#[instrument(skip(db, update))]
pub async fn update_activity(
    db: &DatabaseConnection,
    user_id: i64,
    activity_id: i64,
    update: ActivityUpdate,
) -> Result<ActivityWithEmission> {
    let description = update
        .description
        .as_deref()
        .map(|d| require_text("description", d))
        .transpose()?;

    if let Some(kg) = update.co2_kg {
        if !kg.is_finite() || kg < 0.0 {
            return Err(Error::InvalidQuantity { quantity: kg });
        }
    }

    let txn = db.begin().await?;

    let mut activity = get_owned_activity(&txn, user_id, activity_id).await?;
    if let Some(description) = description {
        let mut active: activity::ActiveModel = activity.into();
        active.description = Set(description);
        activity = active.update(&txn).await?;
    }

    let existing = Emission::find()
        .filter(emission::Column::ActivityId.eq(activity_id))
        .one(&txn)
        .await?;

    let emission = match (existing, update.co2_kg) {
        (Some(current), Some(kg)) => {
            let mut active: emission::ActiveModel = current.into();
            active.co2_equivalent_kg = Set(kg);
            active.update(&txn).await?
        }
        (Some(current), None) => current,
        (None, kg) => {
            // Restore the one-to-one pairing for records written before it held
            emission::ActiveModel {
                activity_id: Set(activity_id),
                co2_equivalent_kg: Set(kg.unwrap_or(0.0)),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    debug!("Updated activity {}", activity_id);

    Ok(ActivityWithEmission {
        activity,
        co2_equivalent_kg: emission.co2_equivalent_kg,
    })
}

/// Deletes an owned activity together with its emission.
#[instrument(skip(db))]
pub async fn delete_activity(db: &DatabaseConnection, user_id: i64, activity_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let activity = get_owned_activity(&txn, user_id, activity_id).await?;

    Emission::delete_many()
        .filter(emission::Column::ActivityId.eq(activity_id))
        .exec(&txn)
        .await?;
    activity.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted activity {} and its emission", activity_id);
    Ok(())
}

/// Lists a user's activities with their footprints, newest first.
pub async fn list_activities(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<ActivityWithEmission>> {
    let rows = Activity::find()
        .filter(activity::Column::UserId.eq(user_id))
        .order_by_desc(activity::Column::Timestamp)
        .order_by_desc(activity::Column::Id)
        .find_also_related(Emission)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(activity, emission)| ActivityWithEmission {
            co2_equivalent_kg: emission.map_or(0.0, |e| e.co2_equivalent_kg),
            activity,
        })
        .collect())
}

/// Number of activities a user has logged.
pub async fn count_activities<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Activity::find()
        .filter(activity::Column::UserId.eq(user_id))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn car_trip(km: f64) -> NewActivity {
        NewActivity {
            category: Category::Transport,
            subtype: "car_petrol".to_string(),
            description: "Drive to work".to_string(),
            quantity: km,
            unit: "km".to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_log_activity_validation_never_touches_database() {
        // No query results are queued: any database access would fail the test
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let factors = test_factors();

        let result = log_activity(&db, &factors, 1, car_trip(-5.0)).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));

        let result = log_activity(&db, &factors, 1, car_trip(f64::NAN)).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));

        let mut blank = car_trip(1.0);
        blank.description = "   ".to_string();
        let result = log_activity(&db, &factors, 1, blank).await;
        assert!(matches!(result, Err(Error::Validation { field, .. }) if field == "description"));
    }

    #[tokio::test]
    async fn test_log_activity_creates_pair() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let factors = test_factors();

        let logged = log_activity(&db, &factors, user.id, car_trip(10.0)).await?;
        assert_eq!(logged.activity.user_id, user.id);
        assert_eq!(logged.activity.category, "transport");
        assert_eq!(logged.emission.activity_id, logged.activity.id);
        assert_eq!(logged.emission.co2_equivalent_kg, 2.0);

        let emissions = Emission::find().all(&db).await?;
        assert_eq!(emissions.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_log_activity_unknown_user_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let result = log_activity(&db, &test_factors(), 404, car_trip(3.0)).await;
        assert!(matches!(result, Err(Error::UserNotFound { id: 404 })));
        assert_eq!(Activity::find().count(&db).await?, 0);
        assert_eq!(Emission::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_activity_removes_emission() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let logged = log_activity(&db, &test_factors(), user.id, car_trip(4.0)).await?;

        delete_activity(&db, user.id, logged.activity.id).await?;

        assert!(Activity::find_by_id(logged.activity.id).one(&db).await?.is_none());
        let orphans = Emission::find()
            .filter(emission::Column::ActivityId.eq(logged.activity.id))
            .all(&db)
            .await?;
        assert!(orphans.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_touch_someone_elses_activity() -> Result<()> {
        let (db, owner) = setup_with_user().await?;
        let other = create_test_user(&db, "mallory").await?;
        let logged = log_activity(&db, &test_factors(), owner.id, car_trip(4.0)).await?;

        let result = delete_activity(&db, other.id, logged.activity.id).await;
        assert!(matches!(result, Err(Error::ActivityNotFound { .. })));

        let update = ActivityUpdate {
            description: Some("mine now".to_string()),
            co2_kg: None,
        };
        let result = update_activity(&db, other.id, logged.activity.id, update).await;
        assert!(matches!(result, Err(Error::ActivityNotFound { .. })));

        assert_eq!(count_activities(&db, owner.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_description_and_footprint() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let logged = log_activity(&db, &test_factors(), user.id, car_trip(4.0)).await?;

        let update = ActivityUpdate {
            description: Some("Carpool".to_string()),
            co2_kg: Some(0.4),
        };
        let updated = update_activity(&db, user.id, logged.activity.id, update).await?;
        assert_eq!(updated.activity.description, "Carpool");
        assert_eq!(updated.co2_equivalent_kg, 0.4);

        let listed = list_activities(&db, user.id).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].co2_equivalent_kg, 0.4);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_rejects_negative_footprint() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let logged = log_activity(&db, &test_factors(), user.id, car_trip(4.0)).await?;
        let update = ActivityUpdate {
            description: None,
            co2_kg: Some(-1.0),
        };
        let result = update_activity(&db, user.id, logged.activity.id, update).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_activities_newest_first() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let today = Utc::now().date_naive();
        create_activity_on(&db, user.id, today - chrono::Duration::days(2), 1.0).await?;
        create_activity_on(&db, user.id, today, 3.0).await?;

        let listed = list_activities(&db, user.id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].co2_equivalent_kg, 3.0);
        assert_eq!(listed[1].co2_equivalent_kg, 1.0);
        Ok(())
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let ts = parse_timestamp("2024-03-01T10:30:00+05:30").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T05:00:00+00:00");

        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(Error::Validation { field, .. }) if field == "timestamp"
        ));
    }
}
