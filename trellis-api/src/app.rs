/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use trellis_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = trellis_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use trellis_shared::{
    auth::{
        middleware::create_session_middleware,
        session::{AuthConfig, SessionAuthority},
    },
    services::{
        analysis::{AnalysisService, HttpSummarizer, Summarizer},
        notifications::NotificationDispatcher,
        projects::ProjectService,
        tasks::TaskService,
    },
};

/// `iss` claim of every session token this server issues
pub const TOKEN_ISSUER: &str = "trellis";

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every
/// field is a pool handle or an `Arc`, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    pub sessions: SessionAuthority,
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub notifications: NotificationDispatcher,
    pub analysis: AnalysisService,
}

impl AppState {
    /// Creates application state, wiring the HTTP summarizer when
    /// `SUMMARIZER_URL` is configured
    ///
    /// # Errors
    ///
    /// Fails if the summarizer HTTP client cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let summarizer: Option<Arc<dyn Summarizer>> = match config.summarizer.url {
            Some(ref url) => {
                let client = HttpSummarizer::new(
                    url.clone(),
                    config.summarizer.api_key.clone(),
                    Duration::from_secs(config.summarizer.timeout_seconds),
                )?;
                tracing::info!(endpoint = client.endpoint(), "Project analysis enabled");
                Some(Arc::new(client))
            }
            None => {
                tracing::info!("No summarizer configured; project analysis disabled");
                None
            }
        };

        Ok(Self::with_summarizer(db, config, summarizer))
    }

    /// Creates application state with an explicit summarizer
    pub fn with_summarizer(
        db: PgPool,
        config: Config,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        let auth_config = AuthConfig {
            secret: config.jwt.secret.clone(),
            token_ttl: chrono::Duration::minutes(config.jwt.ttl_minutes),
            issuer: TOKEN_ISSUER.to_string(),
        };

        Self {
            sessions: SessionAuthority::new(db.clone(), auth_config),
            projects: ProjectService::new(db.clone()),
            tasks: TaskService::new(db.clone()),
            notifications: NotificationDispatcher::new(db.clone()),
            analysis: AnalysisService::new(db.clone(), summarizer),
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// └── /v1/
///     ├── /auth/                           # Public
///     │   ├── POST /register
///     │   └── POST /login
///     ├── /users/me                        # GET, PUT
///     ├── /projects                        # GET, POST
///     │   └── /:id                         # GET, PUT, DELETE
///     │       ├── /members                 # GET, POST
///     │       │   └── /:member_id          # PUT, DELETE
///     │       ├── /tasks                   # GET, POST
///     │       └── /analyze                 # POST
///     ├── /tasks/assigned                  # GET
///     ├── /tasks/:id                       # GET, PATCH, DELETE
///     └── /notifications                   # GET
///         ├── /unread-count                # GET
///         ├── /read-all                    # POST
///         └── /:id/read                    # POST
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session authentication (everything under `/v1` except `/v1/auth`)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    // Everything else requires a session
    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(routes::users::get_me).put(routes::users::update_me),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:id/members",
            get(routes::members::list_members).post(routes::members::invite_member),
        )
        .route(
            "/projects/:id/members/:member_id",
            axum::routing::put(routes::members::update_member_role)
                .delete(routes::members::remove_member),
        )
        .route(
            "/projects/:id/tasks",
            get(routes::tasks::list_project_tasks).post(routes::tasks::create_task),
        )
        .route("/projects/:id/analyze", post(routes::analysis::analyze_project))
        .route("/tasks/assigned", get(routes::tasks::list_assigned))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route(
            "/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/notifications/:id/read",
            post(routes::notifications::mark_read),
        )
        .route_layer(axum::middleware::from_fn(create_session_middleware(
            state.sessions.clone(),
        )));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
