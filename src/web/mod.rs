use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::reminders::sweep::ReminderSweep;
use crate::web::{middleware::auth, routes::rental_routes};

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub sweep: Arc<ReminderSweep>,
    pub jwt_secret: String,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

/// Builds the HTTP surface. With `allowed_origin` set, CORS is restricted to
/// that origin and credentials are allowed; otherwise any origin may call.
pub fn create_router(app_state: Arc<AppState>, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = CorsLayer::new().allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS]);
    let cors = match allowed_origin {
        Some(origin) => cors
            .allow_origin(origin)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => cors.allow_origin(Any).allow_headers(Any),
    };

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(
            "/api/admin/rentals",
            rental_routes::create_rental_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::require_admin)),
        )
        .with_state(app_state)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::models::fixtures::contract;
    use crate::db::services::InMemoryContractStore;
    use crate::reminders::sweep::test_support::RecordingSender;
    use crate::web::models::Claims;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "route-test-secret";

    struct Harness {
        router: Router,
        sender: Arc<RecordingSender>,
        contract_id: Uuid,
    }

    async fn harness() -> Harness {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 7, 0, 0).unwrap();
        let store = Arc::new(InMemoryContractStore::new());
        let due = contract(6, now, 85);
        let contract_id = due.id;
        store.insert(due).await.unwrap();

        let sender = Arc::new(RecordingSender::default());
        let sweep = Arc::new(ReminderSweep::new(
            store,
            sender.clone(),
            Arc::new(FixedClock::new(now)),
            "ops@billboards.test",
            Duration::from_secs(5),
        ));
        let state = Arc::new(AppState {
            sweep,
            jwt_secret: SECRET.to_string(),
        });
        Harness {
            router: create_router(state, None),
            sender,
            contract_id,
        }
    }

    fn token(secret: &str) -> String {
        let claims = Claims {
            sub: "admin".to_string(),
            exp: (Utc::now().timestamp() + 3600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let h = harness().await;
        let response = h
            .router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_reject_missing_or_forged_tokens() {
        let h = harness().await;
        let missing = h
            .router
            .clone()
            .oneshot(
                Request::post("/api/admin/rentals/check-reminders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let forged = h
            .router
            .oneshot(
                Request::post("/api/admin/rentals/check-reminders")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token("wrong-secret")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(forged).await["error"], "Invalid credentials");
        assert!(h.sender.subjects().is_empty());
    }

    #[tokio::test]
    async fn check_reminders_runs_a_sweep() {
        let h = harness().await;
        let response = h
            .router
            .oneshot(
                Request::post("/api/admin/rentals/check-reminders")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["totalSent"], 1);
        assert_eq!(body["totalErrors"], 0);
        assert_eq!(body["results"]["sent"][0]["reminderType"], "3_months");
        assert_eq!(h.sender.subjects().len(), 1);
    }

    #[tokio::test]
    async fn token_cookie_is_accepted() {
        let h = harness().await;
        let response = h
            .router
            .oneshot(
                Request::post("/api/admin/rentals/check-reminders")
                    .header(header::COOKIE, format!("token={}", token(SECRET)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pending_reminders_previews_without_sending() {
        let h = harness().await;
        let response = h
            .router
            .clone()
            .oneshot(
                Request::get(format!("/api/admin/rentals/{}/pending-reminders", h.contract_id))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["pending"][0]["type"], "3_months");
        assert_eq!(body["supportedTier"], true);
        assert!(h.sender.subjects().is_empty());

        let unknown = h
            .router
            .oneshot(
                Request::get(format!("/api/admin/rentals/{}/pending-reminders", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
