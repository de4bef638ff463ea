use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use bodyledger_core::chart::RollingChart;
use bodyledger_core::error::InvalidInput;
use bodyledger_core::models::{
    FoodCatalogEntry, PersonalProfile, ProfileForm, ProfileView, validate_catalog_food,
    validate_user_id,
};
use bodyledger_core::service::{AddFoodReport, HealthService, LoginView};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB
const MAX_QUANTITY: u32 = 100;

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<HealthService>>,
    api_key: Option<String>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, HealthService> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateFoodRequest {
    name: String,
    calories: f64,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
struct AddIntakeRequest {
    food: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<InvalidInput>() {
            Some(invalid) => Self::BadRequest(invalid.to_string()),
            None => Self::Internal(err),
        }
    }
}

impl From<InvalidInput> for ApiError {
    fn from(err: InvalidInput) -> Self {
        Self::BadRequest(err.to_string())
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            warn!(path = %request.uri().path(), "rejected request without valid API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_foods(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let foods = state.service().list_foods().context("database error")?;
    Ok(Json(foods))
}

async fn create_food(
    State(state): State<AppState>,
    Json(req): Json<CreateFoodRequest>,
) -> Result<(StatusCode, Json<FoodCatalogEntry>), ApiError> {
    validate_catalog_food(&req.name, req.calories)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let food = state
        .service()
        .add_catalog_food(&req.name, req.calories)
        .context("failed to save food")?;
    Ok((StatusCode::CREATED, Json(food)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<LoginView>, ApiError> {
    let view = state.service().login(&user)?;
    Ok(Json(view))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let user = validate_user_id(&user)?;
    let profile = state
        .service()
        .latest_profile(&user)
        .context("database error")?;
    profile
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No profile saved for '{user}'")))
}

async fn save_profile(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(form): Json<ProfileForm>,
) -> Result<(StatusCode, Json<PersonalProfile>), ApiError> {
    let profile = state.service().save_info(&user, &form)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn add_intake(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<AddIntakeRequest>,
) -> Result<Json<AddFoodReport>, ApiError> {
    if req.quantity == 0 || req.quantity > MAX_QUANTITY {
        return Err(ApiError::BadRequest(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }
    let report = state.service().add_food(&user, &req.food, req.quantity)?;
    Ok(Json(report))
}

async fn get_chart(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<RollingChart>, ApiError> {
    let user = validate_user_id(&user)?;
    let chart = state
        .service()
        .build_rolling_chart(&user)
        .context("database error")?;
    Ok(Json(chart))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/foods", get(list_foods).post(create_food))
        .route("/api/users/{user}", get(get_user))
        .route(
            "/api/users/{user}/profile",
            get(get_profile).post(save_profile),
        )
        .route("/api/users/{user}/intake", post(add_intake))
        .route("/api/users/{user}/chart", get(get_chart))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key, or `****` when the key is too
/// short to show any of it.
fn key_preview(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    service: HealthService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        if new_api_key {
            eprintln!("Generated new API key: {key}");
            eprintln!("Include in requests: Authorization: Bearer {key}");
        } else {
            eprintln!(
                "API key: {} (see api_key file in data directory)",
                key_preview(key)
            );
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(%bind, port, "server listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            service: Arc::new(Mutex::new(HealthService::new_in_memory().unwrap())),
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn valid_form() -> serde_json::Value {
        serde_json::json!({
            "sex": "female",
            "birth_date": "1990-04-12",
            "height": 165,
            "weight": 60,
            "activity_level": "moderate"
        })
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app.oneshot(get_req("/api/foods")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/foods")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/foods")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);

        let response = app.oneshot(get_req("/api/foods")).await.unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn create_food_then_list() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/foods",
                &serde_json::json!({ "name": "Oatmeal", "calories": 150 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["food_name"], "Oatmeal");

        let response = app.oneshot(get_req("/api/foods")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!(["Oatmeal"]));
    }

    #[tokio::test]
    async fn create_food_negative_calories_returns_400() {
        let app = test_app(None);

        let response = app
            .oneshot(post_json(
                "/api/foods",
                &serde_json::json!({ "name": "Void", "calories": -5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_missing_returns_404() {
        let app = test_app(None);

        let response = app.oneshot(get_req("/api/users/ann/profile")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_profile_then_fetch() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(post_json("/api/users/ann/profile", &valid_form()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved = body_json(response).await;
        assert_eq!(saved["bmi"], 22.04);
        assert_eq!(saved["activity_level"], "moderate");

        let response = app.oneshot(get_req("/api/users/ann/profile")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["height"], 165.0);
        assert_eq!(view["profile"]["user_id"], "ann");
    }

    #[tokio::test]
    async fn save_profile_invalid_sex_returns_400() {
        let app = test_app(None);
        let mut form = valid_form();
        form["sex"] = serde_json::json!("robot");

        let response = app
            .clone()
            .oneshot(post_json("/api/users/ann/profile", &form))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("robot"));

        let response = app.oneshot(get_req("/api/users/ann/profile")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_view_for_unknown_user_has_defaults() {
        let app = test_app(None);

        let response = app.oneshot(get_req("/api/users/newbie")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["profile"].is_null());
        assert_eq!(json["form"]["sex"], "male");
        assert_eq!(json["form"]["activity_level"], "sedentary");
        assert_eq!(json["chart"]["days"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn add_intake_known_and_unknown_food() {
        let app = test_app(None);
        app.clone()
            .oneshot(post_json(
                "/api/foods",
                &serde_json::json!({ "name": "Apple", "calories": 95 }),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users/ann/intake",
                &serde_json::json!({ "food": "Apple", "quantity": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users/ann/intake",
                &serde_json::json!({ "food": "Dragonfruit" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["outcomes"][0]["message"], "Food 'Dragonfruit' not found!");

        let response = app.oneshot(get_req("/api/users/ann/chart")).await.unwrap();
        let chart = body_json(response).await;
        assert_eq!(chart["days"][6]["intake"], 190.0);
        assert_eq!(chart["days"][6]["status"], "met");
    }

    #[tokio::test]
    async fn add_intake_quantity_out_of_range_returns_400() {
        let app = test_app(None);

        for quantity in [0, 101] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/users/ann/intake",
                    &serde_json::json!({ "food": "Apple", "quantity": quantity }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn chart_for_empty_user_has_seven_days() {
        let app = test_app(None);

        let response = app.oneshot(get_req("/api/users/ann/chart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#""intake":0.0"#));
        assert!(!text.contains("-0.0"));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let days = json["days"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert!(days.iter().all(|d| d["intake"] == 0.0));
        assert!(days.iter().all(|d| d["tdee"] == 0.0 && d["status"] == "met"));
    }

    #[tokio::test]
    async fn chart_trims_padded_user_name() {
        let state = test_state(None);
        state.service().add_catalog_food("Egg", 78.0).unwrap();
        state.service().add_food("ann", "Egg", 2).unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(get_req("/api/users/%20ann%20/chart"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["user"], "ann");
        assert_eq!(json["days"][6]["intake"], 156.0);
    }

    #[test]
    fn key_preview_shows_ends_of_long_keys() {
        assert_eq!(key_preview("0123456789abcdef"), "0123...cdef");
        assert_eq!(key_preview("abcdefgh"), "abcd...efgh");
    }

    #[test]
    fn key_preview_masks_short_keys() {
        assert_eq!(key_preview(""), "****");
        assert_eq!(key_preview("abc"), "****");
        assert_eq!(key_preview("abcdefg"), "****");
    }

    #[test]
    fn key_preview_handles_multibyte_keys() {
        assert_eq!(key_preview("ключ-секрет"), "ключ...крет");
        assert_eq!(key_preview("é1234567"), "é123...4567");
    }
}
