//! BRACU Loop API Gateway
//!
//! The single HTTP entry point for the student app and the admin panel.
//! Handles:
//! - Sign-in gating and admin sessions
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{HeaderName, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use bracu_loop_common::{
    auth::{admin::hash_password, JwtManager},
    config::{AppConfig, AuthConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics,
    notify::{mailer_from_config, Mailer},
    storage::{LocalObjectStore, ObjectStore},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use middleware::rate_limit::RateLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Headroom over the largest upload for multipart framing and text fields
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// How often expired admin sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub mailer: Arc<dyn Mailer>,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Repository over the shared pool
    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting BRACU Loop API Gateway v{}", bracu_loop_common::VERSION);

    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install()?;
        info!(%addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let repo = Repository::new(db.clone());
    bootstrap_admin(&repo, &config.auth).await?;
    spawn_session_sweeper(repo);

    let jwt_secret = match config.auth.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        _ => {
            warn!("No JWT secret configured; student sessions will not survive a restart");
            hex::encode(rand::random::<[u8; 32]>())
        }
    };

    let mailer = mailer_from_config(&config.mail)?;
    info!(mailer = mailer.name(), "Mail delivery configured");

    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        &config.storage.root,
        &config.storage.public_base_url,
    ));

    let limiter = config.rate_limit.enabled.then(|| {
        RateLimit::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )
    });

    let config = Arc::new(config);
    let state = AppState {
        jwt: Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs)),
        config: config.clone(),
        db,
        mailer,
        store,
    };

    let app = create_router(state, limiter);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the configured admin account if it does not exist yet
async fn bootstrap_admin(repo: &Repository, auth: &AuthConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (
        auth.bootstrap_admin_username.as_deref(),
        auth.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if repo.ensure_admin_user(username, hash_password(password)?).await? {
        info!(username, "Bootstrap admin account created");
    }
    Ok(())
}

fn spawn_session_sweeper(repo: Repository) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match repo.purge_expired_admin_sessions().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Expired admin sessions removed"),
                Err(e) => warn!(error = %e, "Admin session sweep failed"),
            }
        }
    });
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the main application router
fn create_router(state: AppState, limiter: Option<RateLimit>) -> Router {
    let config = state.config.clone();

    let request_id_header = HeaderName::from_bytes(config.auth.request_id_header.as_bytes())
        .unwrap_or_else(|_| HeaderName::from_static("x-request-id"));

    let body_limit = config
        .storage
        .max_note_bytes
        .max(config.storage.max_question_bytes)
        + MULTIPART_OVERHEAD_BYTES;

    let mut api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Sign-in
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/ban-status", get(handlers::auth::ban_status))

        // Faculty and reviews
        .route("/faculties", get(handlers::faculties::list_faculties))
        .route("/faculties/{initial}", get(handlers::faculties::get_faculty))
        .route("/faculties/{initial}/reviews", post(handlers::reviews::create_review))
        .route("/courses", get(handlers::faculties::list_courses))
        .route(
            "/reviews/{id}",
            put(handlers::reviews::update_review).delete(handlers::reviews::delete_review),
        )
        .route("/reviews/{id}/replies", post(handlers::reviews::create_reply))
        .route("/reviews/{id}/vote", post(handlers::reviews::vote))

        // Suggestions
        .route(
            "/suggestions",
            get(handlers::suggestions::list_posts).post(handlers::suggestions::create_post),
        )
        .route(
            "/suggestions/{id}",
            get(handlers::suggestions::get_post).delete(handlers::suggestions::delete_post),
        )
        .route("/suggestions/{id}/comments", post(handlers::suggestions::add_comment))
        .route("/suggestions/{id}/like", post(handlers::suggestions::toggle_like))
        .route("/comments/{id}", delete(handlers::suggestions::delete_comment))

        // Notes
        .route(
            "/notes",
            get(handlers::notes::list_notes).post(handlers::notes::upload_note),
        )
        .route("/notes/links", post(handlers::notes::create_link_note))
        .route("/notes/mine", get(handlers::notes::my_notes))
        .route("/notes/{id}", delete(handlers::notes::delete_note))
        .route("/notes/{id}/access", post(handlers::notes::access_note))

        // Question papers
        .route(
            "/questions",
            get(handlers::questions::list_questions).post(handlers::questions::upload_question),
        )
        .route("/questions/mine", get(handlers::questions::my_questions))
        .route("/questions/{id}", delete(handlers::questions::delete_question))
        .route("/questions/{id}/download", post(handlers::questions::download_question))

        // Stored objects
        .route("/objects/{bucket}/{*path}", get(handlers::objects::get_object))

        // Rooms
        .route("/rooms", get(handlers::rooms::list_rooms))
        .route("/rooms/free", get(handlers::rooms::free_rooms))
        .route("/rooms/{id}/schedule", get(handlers::rooms::room_schedule))

        // Contact and reports
        .route("/contact", post(handlers::contact::submit))
        .route("/reports", post(handlers::reports::create_report))

        // Admin
        .route("/admin/login", post(handlers::admin::login))
        .route("/admin/logout", post(handlers::admin::logout))
        .route("/admin/session", get(handlers::admin::session))
        .route("/admin/stats", get(handlers::admin::stats))
        .route("/admin/reports", get(handlers::admin::list_reports))
        .route("/admin/reports/{id}", delete(handlers::admin::delete_report))
        .route("/admin/reports/{id}/resolve", post(handlers::admin::resolve_report))
        .route(
            "/admin/content/{content_type}/{content_id}",
            get(handlers::admin::view_content),
        )
        .route(
            "/admin/bans",
            get(handlers::admin::list_bans).post(handlers::admin::create_ban),
        )
        .route("/admin/bans/{id}/unban", post(handlers::admin::unban))
        .route("/admin/contacts", get(handlers::admin::list_contacts))
        .route("/admin/contacts/{id}", delete(handlers::admin::delete_contact))
        .route("/admin/contacts/{id}/read", post(handlers::admin::mark_contact_read))
        .route("/admin/contacts/{id}/reply", post(handlers::admin::reply_contact))
        .route("/admin/contacts/{id}/resolve", post(handlers::admin::resolve_contact))
        .route("/admin/faculties", post(handlers::admin::create_faculty))
        .route(
            "/admin/faculties/{initial}",
            put(handlers::admin::update_faculty).delete(handlers::admin::delete_faculty),
        )
        .route("/admin/faculties/{initial}/courses", put(handlers::admin::assign_courses))
        .route("/admin/courses", post(handlers::admin::create_course))
        .route(
            "/admin/courses/{code}",
            put(handlers::admin::update_course).delete(handlers::admin::delete_course),
        );

    if let Some(limiter) = limiter {
        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit,
        ));
    }

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/v1", api_routes)
        .route_layer(from_fn(middleware::metrics::track_requests))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use bracu_loop_common::notify::LogMailer;
    use sea_orm::DatabaseConnection;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let root = std::env::temp_dir().join(format!("bracu-loop-gw-{}", uuid::Uuid::new_v4()));
        AppState {
            config: Arc::new(AppConfig::default()),
            db: DbPool::from_connection(DatabaseConnection::Disconnected),
            jwt: Arc::new(JwtManager::new("test-secret", 3600)),
            mailer: Arc::new(LogMailer),
            store: Arc::new(LocalObjectStore::new(root, "/v1/objects")),
        }
    }

    fn app() -> Router {
        create_router(test_state(), None)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_database_down() {
        let response = app()
            .oneshot(Request::get("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["database"]["status"], "down");
    }

    #[tokio::test]
    async fn test_review_requires_sign_in() {
        let request = json_request(
            "POST",
            "/v1/faculties/ABC/reviews",
            json!({ "rating": 5, "comment": "Great" }),
        );
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_garbage_bearer_token_rejected() {
        let request = Request::post("/v1/suggestions/00000000-0000-0000-0000-000000000000/like")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_require_session_header() {
        let response = app()
            .oneshot(Request::get("/v1/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_moderation_views_require_session_header() {
        for (method, uri) in [
            ("GET", "/v1/admin/content/student_note/00000000-0000-0000-0000-000000000000"),
            ("POST", "/v1/admin/contacts/00000000-0000-0000-0000-000000000000/read"),
        ] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_own_uploads_require_sign_in() {
        for uri in ["/v1/notes/mine", "/v1/questions/mine"] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_sign_in_rejects_other_domains() {
        let credential = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &json!({ "email": "someone@gmail.com", "name": "Someone" }),
            &jsonwebtoken::EncodingKey::from_secret(b"provider"),
        )
        .unwrap();

        let request = json_request("POST", "/v1/auth/sign-in", json!({ "credential": credential }));
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_echoes_session() {
        let state = test_state();
        let token = state
            .jwt
            .issue(&bracu_loop_common::auth::Identity {
                email: "student@g.bracu.ac.bd".into(),
                name: "Student".into(),
                picture: None,
            })
            .unwrap();

        let request = Request::get("/v1/auth/me")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = create_router(state, None).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "student@g.bracu.ac.bd");
    }

    #[tokio::test]
    async fn test_free_rooms_rejects_inverted_window() {
        let response = app()
            .oneshot(
                Request::get("/v1/rooms/free?weekday=1&start=10:00&end=09:00")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contact_rejects_invalid_email() {
        let request = json_request(
            "POST",
            "/v1/contact",
            json!({
                "student_name": "Student",
                "student_email": "not-an-email",
                "subject": "Hello",
                "message": "Hi there",
            }),
        );
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_bucket_not_found() {
        let response = app()
            .oneshot(
                Request::get("/v1/objects/unknown-bucket/a.pdf")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_excess_requests() {
        let limiter = RateLimit::new(1, 1);
        let app = create_router(test_state(), Some(limiter));

        let first = app
            .clone()
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
