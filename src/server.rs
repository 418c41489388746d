use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::distance::{Distance, DistanceLookup, DistanceService, parse_targets};
use crate::entity::{Id, Key};
use crate::error::MefmError;
use crate::filter::Filter;
use crate::query::{Direction, Query as StoreQuery};
use crate::schema::{Comment, CommentStatus, Practitioner, Question, QuestionChoice, QuestionGroup, User};
use crate::store::Database;

/// Everything a request handler needs; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub distances: Arc<dyn DistanceService>,
    /// Country appended to practitioner postal codes that carry none.
    pub country: Arc<str>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

pub enum ApiError {
    Core(MefmError),
    Join,
}

impl From<MefmError> for ApiError {
    fn from(e: MefmError) -> Self {
        ApiError::Core(e)
    }
}

/// The status code a core error is reported with.
pub fn status_for(e: &MefmError) -> StatusCode {
    match e {
        MefmError::Parse { .. } => StatusCode::BAD_REQUEST,
        MefmError::NotFound { .. } => StatusCode::NOT_FOUND,
        MefmError::DanglingReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MefmError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        MefmError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        MefmError::Batch { source, .. } => status_for(source),
        MefmError::Config(_) | MefmError::DataCorruption { .. } | MefmError::Lock(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Core(e) => (status_for(&e), format!("{e}")),
            ApiError::Join => (StatusCode::INTERNAL_SERVER_ERROR, "Join error".to_string()),
        };
        warn!(%msg, code = %status.as_u16(), "request error");
        let body = ErrorResponse {
            status: "error".into(),
            error: msg,
        };
        (status, Json(body)).into_response()
    }
}

// The core is synchronous, so it runs on the blocking pool.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let database = Arc::clone(&state.database);
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || work(&database))
        .await
        .map_err(|e| {
            warn!(error = %e, "Join error");
            ApiError::Join
        })?;
    debug!(ms = started.elapsed().as_secs_f64() * 1000.0, ok = result.is_ok(), "core call");
    result.map_err(ApiError::from)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);
    Router::new()
        .route(
            "/comments",
            post(create_comment).put(update_comment).get(comments_by_status),
        )
        .route("/comments/resolve", post(resolve_comments))
        .route("/comments/:practitioner_id", get(comments_by_practitioner))
        .route(
            "/comments/:practitioner_id/:user_id",
            get(comments_by_practitioner_and_user),
        )
        .route(
            "/practitioners",
            post(create_practitioner).put(update_practitioner).get(all_practitioners),
        )
        .route("/practitioners/search", get(search_practitioners))
        .route("/practitioners/:id", get(practitioner))
        .route("/users", post(create_user).get(all_users))
        .route("/users/:id", get(user))
        .route("/questions", get(questions).post(create_question))
        .route("/questions/groups", get(question_groups).post(create_question_group))
        .route("/questions/choices", get(question_choices).post(create_question_choice))
        .route("/maps", get(find_distances))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ------------- Comments -------------
#[derive(Deserialize)]
struct StatusParams {
    status: Option<CommentStatus>,
}

async fn create_comment(
    State(state): State<AppState>,
    Json(mut comment): Json<Comment>,
) -> Result<(StatusCode, Json<Id>), ApiError> {
    let id = blocking(&state, move |db| db.put(&mut comment)).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

async fn update_comment(
    State(state): State<AppState>,
    Json(mut comment): Json<Comment>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| db.put(&mut comment)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_comments(
    State(state): State<AppState>,
    Json(mut comments): Json<Vec<Comment>>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| db.put_batch(&mut comments)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn comments_by_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = blocking(&state, move |db| match params.status {
        Some(status) => {
            // filter on exactly the form the status is stored in
            let status = serde_json::to_value(status).map_err(|e| MefmError::parse(e.to_string()))?;
            db.query_by_filters(&[Filter::parse("status", status)?])
        }
        None => db.all(),
    })
    .await?;
    Ok(Json(comments))
}

async fn comments_by_practitioner(
    State(state): State<AppState>,
    Path(practitioner_id): Path<Id>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = blocking(&state, move |db| {
        db.query_by_filters(&[Filter::parse("practitionerId ==", practitioner_id)?])
    })
    .await?;
    Ok(Json(comments))
}

async fn comments_by_practitioner_and_user(
    State(state): State<AppState>,
    Path((practitioner_id, user_id)): Path<(Id, Id)>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = blocking(&state, move |db| {
        db.query_by_filters(&[
            Filter::parse("practitionerId ==", practitioner_id)?,
            Filter::parse("userId ==", user_id)?,
        ])
    })
    .await?;
    Ok(Json(comments))
}

// ------------- Practitioners -------------
#[derive(Deserialize)]
struct CreatedBy {
    #[serde(rename = "userId")]
    user_id: Option<Id>,
}

async fn create_practitioner(
    State(state): State<AppState>,
    Query(created_by): Query<CreatedBy>,
    Json(mut practitioner): Json<Practitioner>,
) -> Result<(StatusCode, Json<Id>), ApiError> {
    if let Some(user_id) = created_by.user_id {
        practitioner.created_by = Some(Key::new(user_id));
    }
    let id = blocking(&state, move |db| db.put(&mut practitioner)).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

async fn update_practitioner(
    State(state): State<AppState>,
    Json(mut practitioner): Json<Practitioner>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| db.put(&mut practitioner)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn all_practitioners(
    State(state): State<AppState>,
) -> Result<Json<Vec<Practitioner>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.all()).await?))
}

// Query values arrive as text; numeric attributes get a number or a parse error.
fn search_filter(token: &str, raw: &str) -> crate::Result<Filter> {
    let filter = Filter::parse(token, raw)?;
    if !Practitioner::NUMERIC_PROPERTIES.contains(&filter.property()) {
        return Ok(filter);
    }
    let number: i64 = raw.trim().parse().map_err(|_| {
        MefmError::parse(format!("`{}` is numeric, `{raw}` is not a number", filter.property()))
    })?;
    Filter::new(filter.property(), filter.operator(), number)
}

// Each query parameter is one filter, e.g. `?city=Victoria&specialty=GP`.
async fn search_practitioners(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Practitioner>>, ApiError> {
    let practitioners = blocking(&state, move |db| {
        let filters = params
            .iter()
            .map(|(token, value)| search_filter(token, value))
            .collect::<crate::Result<Vec<_>>>()?;
        db.query_by_filters(&filters)
    })
    .await?;
    Ok(Json(practitioners))
}

async fn practitioner(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<Json<Practitioner>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.get(id)).await?))
}

// ------------- Users -------------
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameTaken {
    pub name_already_taken: bool,
    pub email_already_taken: bool,
}

async fn create_user(
    State(state): State<AppState>,
    Json(mut user): Json<User>,
) -> Result<Response, ApiError> {
    let created = blocking(&state, move |db| {
        let taken = NameTaken {
            name_already_taken: !db
                .query_by_filters::<User>(&[Filter::parse("username", user.username.as_str())?])?
                .is_empty(),
            email_already_taken: !db
                .query_by_filters::<User>(&[Filter::parse("email", user.email.as_str())?])?
                .is_empty(),
        };
        if taken.name_already_taken || taken.email_already_taken {
            return Ok(Err(taken));
        }
        user.created.get_or_insert_with(Utc::now);
        Ok(Ok(db.put(&mut user)?))
    })
    .await?;
    Ok(match created {
        Ok(id) => (StatusCode::CREATED, Json(id)).into_response(),
        Err(taken) => (StatusCode::CONFLICT, Json(taken)).into_response(),
    })
}

async fn all_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = blocking(&state, |db| db.all::<User>()).await?;
    Ok(Json(users.into_iter().map(User::without_password).collect()))
}

async fn user(State(state): State<AppState>, Path(id): Path<Id>) -> Result<Json<User>, ApiError> {
    let user = blocking(&state, move |db| db.get::<User>(id)).await?;
    Ok(Json(user.without_password()))
}

// ------------- Questionnaire -------------
fn by_sort_order() -> StoreQuery {
    StoreQuery::new().order_by("sortOrder", Direction::Ascending)
}

async fn questions(State(state): State<AppState>) -> Result<Json<Vec<Question>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.query(&by_sort_order())).await?))
}

async fn question_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionGroup>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.query(&by_sort_order())).await?))
}

async fn question_choices(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionChoice>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.query(&by_sort_order())).await?))
}

async fn create_question(
    State(state): State<AppState>,
    Json(mut question): Json<Question>,
) -> Result<(StatusCode, Json<Id>), ApiError> {
    let id = blocking(&state, move |db| db.put(&mut question)).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

async fn create_question_group(
    State(state): State<AppState>,
    Json(mut group): Json<QuestionGroup>,
) -> Result<(StatusCode, Json<Id>), ApiError> {
    let id = blocking(&state, move |db| db.put(&mut group)).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

async fn create_question_choice(
    State(state): State<AppState>,
    Json(mut choice): Json<QuestionChoice>,
) -> Result<(StatusCode, Json<Id>), ApiError> {
    let id = blocking(&state, move |db| db.put(&mut choice)).await?;
    Ok((StatusCode::CREATED, Json(id)))
}

// ------------- Maps -------------
#[derive(Deserialize)]
struct DistanceParams {
    from: String,
    to: String,
}

async fn find_distances(
    State(state): State<AppState>,
    Query(params): Query<DistanceParams>,
) -> Result<Json<Vec<Distance>>, ApiError> {
    let service = Arc::clone(&state.distances);
    let country = Arc::clone(&state.country);
    let distances = blocking(&state, move |db| {
        let practitioners = parse_targets(&params.to)?;
        DistanceLookup::new(db, service.as_ref(), &country).find(&params.from, &practitioners)
    })
    .await?;
    Ok(Json(distances))
}
