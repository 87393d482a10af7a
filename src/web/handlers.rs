//! Request handlers.
//!
//! GET handlers return the context a page needs; POST handlers mutate and
//! return the stored records.

use crate::{
    core::{
        achievement::{self, BadgeView},
        activity::{self, ActivityUpdate, LoggedActivity, NewActivity},
        challenge::{self, NewChallenge},
        community,
        dashboard::{self, Dashboard, MonthlySummary},
        estimator::{self, Category},
        leaderboard::{self, Leaderboard},
        map,
        streak::{self, StreakSummary},
        user::{self, ProfileUpdate},
    },
    entities,
    errors::Result,
    web::{
        AppState,
        extract::{AppJson, AppPath, CurrentUser},
        response::{created, ok},
    },
};
use axum::{
    extract::State,
    response::{Html, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Evaluates achievements after a state change. Failures are logged, never
/// returned.
async fn award_achievements(state: &AppState, user_id: i64) -> Vec<BadgeView> {
    match achievement::evaluate_achievements(state.db(), user_id, today()).await {
        Ok(awarded) => awarded.into_iter().map(BadgeView::from).collect(),
        Err(e) => {
            warn!("Achievement evaluation failed for user {}: {}", user_id, e);
            Vec::new()
        }
    }
}

/// Payload of `GET /`
#[derive(Debug, Serialize)]
pub struct HomeContext {
    total_users: u64,
    leaderboard: Leaderboard,
    recent_badges: Vec<BadgeView>,
    streak: StreakSummary,
    summary: Option<MonthlySummary>,
}

/// `GET /`
pub async fn home(State(state): State<AppState>, current: Option<CurrentUser>) -> Result<Response> {
    let today = today();
    let user_id = current.as_ref().map(CurrentUser::id);

    let (streak, summary) = match user_id {
        Some(id) => (
            streak::user_streak(state.db(), id, today).await?,
            Some(dashboard::monthly_summary(state.db(), id, today).await?),
        ),
        None => (StreakSummary::default(), None),
    };

    let context = HomeContext {
        total_users: user::count_users(state.db()).await?,
        leaderboard: leaderboard::get_leaderboard(state.db(), user_id, today).await?,
        recent_badges: achievement::recent_badges(state.db()).await?,
        streak,
        summary,
    };
    Ok(ok("Home", context))
}

/// `GET /health`
pub async fn health() -> Response {
    ok("healthy", ())
}

/// Body of `POST /users`
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    location: Option<String>,
}

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> Result<Response> {
    let created_user = user::create_user(
        state.db(),
        &body.username,
        &body.first_name,
        body.location.as_deref(),
    )
    .await?;
    Ok(created("User created", created_user))
}

/// Payload of `GET /profile`
#[derive(Debug, Serialize)]
pub struct ProfileContext {
    user: entities::user::Model,
    #[serde(flatten)]
    dashboard: Dashboard,
    achievements: Vec<BadgeView>,
}

/// `GET /profile`
pub async fn profile(State(state): State<AppState>, CurrentUser(me): CurrentUser) -> Result<Response> {
    let dashboard = dashboard::build_dashboard(state.db(), &me, today()).await?;
    let achievements = achievement::earned_badges(state.db(), me.id).await?;
    Ok(ok(
        "Profile",
        ProfileContext {
            user: me,
            dashboard,
            achievements,
        },
    ))
}

/// Body of `POST /profile`; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    first_name: Option<String>,
    location: Option<String>,
    carbon_budget_kg: Option<f64>,
}

/// `POST /profile`
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<ProfileRequest>,
) -> Result<Response> {
    let update = ProfileUpdate {
        first_name: body.first_name,
        location: body.location,
        carbon_budget_kg: body.carbon_budget_kg,
    };
    let updated = user::update_profile(state.db(), current.id(), update).await?;
    Ok(ok("Profile updated", updated))
}

/// Payload of `GET /streak`
#[derive(Debug, Serialize)]
pub struct StreakContext {
    #[serde(flatten)]
    streak: StreakSummary,
    active_days: Vec<String>,
    achievements: Vec<BadgeView>,
}

/// `GET /streak`
pub async fn streak(State(state): State<AppState>, current: Option<CurrentUser>) -> Result<Response> {
    let context = match current {
        Some(me) => {
            let days = streak::active_days(state.db(), me.id()).await?;
            StreakContext {
                streak: streak::calculate_streak(&days, today()),
                active_days: streak::format_active_days(&days),
                achievements: achievement::earned_badges(state.db(), me.id()).await?,
            }
        }
        None => StreakContext {
            streak: StreakSummary::default(),
            active_days: Vec::new(),
            achievements: vec![achievement::welcome_badge()],
        },
    };
    Ok(ok("Streak", context))
}

/// `GET /activities`
pub async fn list_activities(State(state): State<AppState>, current: CurrentUser) -> Result<Response> {
    let activities = activity::list_activities(state.db(), current.id()).await?;
    Ok(ok(format!("{} activities", activities.len()), activities))
}

/// A quantity submitted either as a JSON number or as text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    /// Already numeric
    Number(f64),
    /// Form-style text
    Text(String),
}

impl QuantityInput {
    fn resolve(&self) -> Result<f64> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(raw) => estimator::parse_quantity(raw),
        }
    }
}

/// Body of `POST /activities`
#[derive(Debug, Deserialize)]
pub struct LogActivityRequest {
    category: String,
    #[serde(default)]
    subtype: String,
    description: String,
    quantity: QuantityInput,
    unit: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Payload of `POST /activities`
#[derive(Debug, Serialize)]
pub struct LoggedContext {
    #[serde(flatten)]
    logged: LoggedActivity,
    new_achievements: Vec<BadgeView>,
}

/// `POST /activities`
pub async fn log_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<LogActivityRequest>,
) -> Result<Response> {
    let new = NewActivity {
        category: body.category.parse::<Category>()?,
        subtype: body.subtype,
        description: body.description,
        quantity: body.quantity.resolve()?,
        unit: body.unit,
        timestamp: body
            .timestamp
            .as_deref()
            .map(activity::parse_timestamp)
            .transpose()?,
    };

    let logged = activity::log_activity(state.db(), &state.config.factors, current.id(), new).await?;
    let new_achievements = award_achievements(&state, current.id()).await;
    let message = format!(
        "Logged {:.2} kg CO2e",
        logged.emission.co2_equivalent_kg
    );
    Ok(created(
        message,
        LoggedContext {
            logged,
            new_achievements,
        },
    ))
}

/// Body of `POST /activities/:id`
#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    description: Option<String>,
    co2_kg: Option<f64>,
}

/// `POST /activities/:id`
pub async fn update_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(activity_id): AppPath<i64>,
    AppJson(body): AppJson<UpdateActivityRequest>,
) -> Result<Response> {
    let update = ActivityUpdate {
        description: body.description,
        co2_kg: body.co2_kg,
    };
    let updated = activity::update_activity(state.db(), current.id(), activity_id, update).await?;
    Ok(ok("Activity updated", updated))
}

/// `POST /activities/:id/delete`
pub async fn delete_activity(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(activity_id): AppPath<i64>,
) -> Result<Response> {
    activity::delete_activity(state.db(), current.id(), activity_id).await?;
    Ok(ok("Activity deleted", activity_id))
}

/// `GET /communities`
pub async fn list_communities(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
) -> Result<Response> {
    let user_id = current.as_ref().map(CurrentUser::id);
    let communities = community::list_communities(state.db(), user_id).await?;
    Ok(ok("Communities", communities))
}

/// Body of `POST /communities`
#[derive(Debug, Deserialize)]
pub struct CreateCommunityRequest {
    name: String,
    #[serde(default)]
    description: String,
}

/// `POST /communities`; the creator becomes the first member.
pub async fn create_community(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<CreateCommunityRequest>,
) -> Result<Response> {
    let created_community =
        community::create_community(state.db(), current.id(), &body.name, &body.description)
            .await?;
    Ok(created("Community created", created_community))
}

/// `POST /communities/:id/join`
pub async fn join_community(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(community_id): AppPath<i64>,
) -> Result<Response> {
    let membership = community::join_community(state.db(), current.id(), community_id).await?;
    Ok(ok("Joined community", membership))
}

/// `POST /communities/:id/leave`
pub async fn leave_community(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(community_id): AppPath<i64>,
) -> Result<Response> {
    community::leave_community(state.db(), current.id(), community_id).await?;
    Ok(ok("Left community", community_id))
}

/// `GET /communities/:id/challenges`
pub async fn list_challenges(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    AppPath(community_id): AppPath<i64>,
) -> Result<Response> {
    let user_id = current.as_ref().map(CurrentUser::id);
    let challenges = challenge::list_challenges(state.db(), community_id, user_id).await?;
    Ok(ok("Challenges", challenges))
}

/// Body of `POST /communities/:id/challenges`
#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    title: String,
    #[serde(default)]
    description: String,
    goal: f64,
    unit: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

/// `POST /communities/:id/challenges`; members only.
pub async fn create_challenge(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(community_id): AppPath<i64>,
    AppJson(body): AppJson<CreateChallengeRequest>,
) -> Result<Response> {
    if !community::is_member(state.db(), current.id(), community_id).await? {
        community::get_community(state.db(), community_id).await?;
        return Err(crate::errors::Error::PermissionDenied {
            message: "only members can create challenges".to_string(),
        });
    }
    let new = NewChallenge {
        title: body.title,
        description: body.description,
        goal: body.goal,
        unit: body.unit,
        start_date: body.start_date,
        end_date: body.end_date,
    };
    let created_challenge = challenge::create_challenge(state.db(), community_id, new).await?;
    Ok(created("Challenge created", created_challenge))
}

/// `POST /challenges/:id/join`
pub async fn join_challenge(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(challenge_id): AppPath<i64>,
) -> Result<Response> {
    let participation =
        challenge::join_challenge(state.db(), current.id(), challenge_id, today()).await?;
    Ok(ok("Joined challenge", participation))
}

/// Body of `POST /challenges/:id/progress`
#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    amount: f64,
}

/// Payload of `POST /challenges/:id/progress`
#[derive(Debug, Serialize)]
pub struct ProgressContext {
    participation: entities::user_challenge::Model,
    new_achievements: Vec<BadgeView>,
}

/// `POST /challenges/:id/progress`
pub async fn record_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(challenge_id): AppPath<i64>,
    AppJson(body): AppJson<ProgressRequest>,
) -> Result<Response> {
    let participation =
        challenge::record_progress(state.db(), current.id(), challenge_id, body.amount).await?;
    let new_achievements = if participation.completed {
        award_achievements(&state, current.id()).await
    } else {
        Vec::new()
    };
    Ok(ok(
        "Progress recorded",
        ProgressContext {
            participation,
            new_achievements,
        },
    ))
}

/// `GET /map`
pub async fn user_map(State(state): State<AppState>) -> Html<String> {
    Html(map::render_user_map(state.db(), state.map_renderer.as_ref()).await)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::{
        core::map::ChoroplethRenderer,
        test_utils::*,
        web::{AppState, router},
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use sea_orm::DatabaseConnection;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<DatabaseConnection>) {
        let db = Arc::new(setup_test_db().await.unwrap());
        let config = test_config();
        crate::core::achievement::seed_achievements(&db, &config.achievements)
            .await
            .unwrap();
        let state = AppState::new(
            Arc::clone(&db),
            Arc::new(config),
            Arc::new(ChoroplethRenderer::load("missing/states.geojson")),
        );
        (router(state), db)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str, user_id: Option<i64>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = user_id {
            builder = builder.header("x-user-id", id.to_string());
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post(uri: &str, user_id: Option<i64>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(id) = user_id {
            builder = builder.header("x-user-id", id.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _db) = app().await;
        let (status, body) = send(&app, get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn test_state_clones_share_one_connection() {
        let db = Arc::new(setup_test_db().await.unwrap());
        let state = AppState::new(
            Arc::clone(&db),
            Arc::new(test_config()),
            Arc::new(ChoroplethRenderer::load("missing/states.geojson")),
        );
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&cloned.db, &db));

        create_test_user(&db, "asha").await.unwrap();
        assert_eq!(crate::core::user::count_users(cloned.db()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_home_has_placeholder_badge() {
        let (app, _db) = app().await;
        let (status, body) = send(&app, get("/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_users"], 0);
        assert_eq!(body["data"]["recent_badges"][0]["name"], "Welcome!");
        assert!(body["data"]["leaderboard"]["user_rank"].is_null());
    }

    #[tokio::test]
    async fn test_profile_requires_identity() {
        let (app, _db) = app().await;
        let (status, body) = send(&app, get("/profile", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");

        let (status, _) = send(&app, get("/profile", Some(42))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_log_activity_flow() {
        let (app, db) = app().await;
        let user = create_test_user(&db, "asha").await.unwrap();

        let request = post(
            "/activities",
            Some(user.id),
            &json!({
                "category": "transport",
                "subtype": "car_petrol",
                "description": "Commute",
                "quantity": "10",
                "unit": "km"
            }),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["emission"]["co2_equivalent_kg"], 2.0);
        assert_eq!(body["data"]["new_achievements"][0]["name"], "First Step");

        let (status, body) = send(&app, get("/activities", Some(user.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, get("/", Some(user.id))).await;
        assert_eq!(body["data"]["leaderboard"]["user_rank"], 1);
        assert_eq!(body["data"]["leaderboard"]["top"][0]["emission"], "2.0 kg");
    }

    #[tokio::test]
    async fn test_invalid_quantity_writes_nothing() {
        let (app, db) = app().await;
        let user = create_test_user(&db, "asha").await.unwrap();

        for quantity in [json!("ten"), json!(-3.0), json!("")] {
            let request = post(
                "/activities",
                Some(user.id),
                &json!({
                    "category": "food",
                    "description": "Lunch",
                    "quantity": quantity,
                    "unit": "kg"
                }),
            );
            let (status, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status"], "error");
        }

        let (_, body) = send(&app, get("/activities", Some(user.id))).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let (app, db) = app().await;
        let user = create_test_user(&db, "asha").await.unwrap();
        let (status, body) = send(&app, post("/activities", Some(user.id), &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_foreign_activity_is_not_found() {
        let (app, db) = app().await;
        let owner = create_test_user(&db, "owner").await.unwrap();
        let other = create_test_user(&db, "other").await.unwrap();
        let logged = create_activity_on(&db, owner.id, today(), 1.0).await.unwrap();

        let uri = format!("/activities/{}/delete", logged.activity.id);
        let (status, _) = send(&app, post(&uri, Some(other.id), &json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, post(&uri, Some(owner.id), &json!({}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_community_and_challenge_flow() {
        let (app, db) = app().await;
        let founder = create_test_user(&db, "founder").await.unwrap();
        let outsider = create_test_user(&db, "outsider").await.unwrap();

        let (status, body) = send(
            &app,
            post("/communities", Some(founder.id), &json!({"name": "Green Pune"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let community_id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = send(&app, get("/communities", Some(founder.id))).await;
        assert_eq!(body["data"][0]["member_count"], 1);
        assert_eq!(body["data"][0]["is_member"], true);

        let start = today().format("%Y-%m-%d").to_string();
        let end = (today() + chrono::Duration::days(10))
            .format("%Y-%m-%d")
            .to_string();
        let uri = format!("/communities/{community_id}/challenges");
        let challenge_body = json!({
            "title": "Walk more",
            "goal": 5.0,
            "unit": "km",
            "start_date": start,
            "end_date": end
        });
        let (status, _) = send(&app, post(&uri, Some(outsider.id), &challenge_body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, post(&uri, Some(founder.id), &challenge_body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let challenge_id = body["data"]["id"].as_i64().unwrap();

        let join = format!("/challenges/{challenge_id}/join");
        let (status, _) = send(&app, post(&join, Some(outsider.id), &json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, post(&join, Some(founder.id), &json!({}))).await;
        assert_eq!(status, StatusCode::OK);

        let progress = format!("/challenges/{challenge_id}/progress");
        let (status, body) = send(
            &app,
            post(&progress, Some(founder.id), &json!({"amount": 5.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["participation"]["completed"], true);
        assert_eq!(body["data"]["new_achievements"][0]["name"], "Challenger");

        let (_, body) = send(&app, get(&uri, Some(founder.id))).await;
        assert_eq!(body["data"][0]["progress_percentage"], 100.0);
    }

    #[tokio::test]
    async fn test_map_reports_missing_asset_inline() {
        let (app, _db) = app().await;
        let response = app.oneshot(get("/map", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.starts_with("<p style='color:red; text-align:center;'>Error: "));
    }
}
