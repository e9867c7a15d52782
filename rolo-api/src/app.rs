/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware.
///
/// # Example
///
/// ```no_run
/// use rolo_api::{app::AppState, config::Config};
/// use rolo_core::notify::NoopNotifier;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(NoopNotifier));
/// let app = rolo_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use rolo_core::{
    access::AccessController,
    audit::AuditSink,
    auth::{jwt, middleware::AuthContext},
    events::EventBus,
    invites::InviteManager,
    notify::Notifier,
    seats::SeatLimitEnforcer,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; every field is an Arc
/// or an Arc-backed handle, so the clone is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Access-control service
    pub access: AccessController,

    /// Invite lifecycle service
    pub invites: InviteManager,

    /// Read-only seat capacity checks
    pub seats: SeatLimitEnforcer,
}

impl AppState {
    /// Creates new application state, wiring the core services together
    pub fn new(db: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let audit = AuditSink::new(db.clone());
        let events = EventBus::default();
        let invites = InviteManager::new(db.clone(), audit.clone(), events.clone(), notifier);
        let access = AccessController::new(db.clone(), audit, events, invites.clone());
        let seats = SeatLimitEnforcer::new(db.clone());

        Self {
            db,
            config: Arc::new(config),
            access,
            invites,
            seats,
        }
    }

    /// Gets the secret used to verify bearer credentials
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                        # Health check (public)
/// └── /v1/                                           # API v1 (authenticated)
///     ├── POST /communities                          # Create community + owner
///     ├── POST /communities/join                     # Request to join by handle
///     ├── GET  /communities/:id                      # Fetch a community
///     ├── GET  /communities/:id/collaborators        # List collaborators
///     ├── POST /communities/:id/collaborators        # Direct add
///     ├── POST /communities/:id/collaborators/:user_id/approve  # Approve join request
///     ├── POST /communities/:id/collaborators/:user_id/reject   # Reject join request
///     ├── PUT  /communities/:id/collaborators/:user_id/role     # Change role
///     ├── GET  /communities/:id/seats                # Seat capacity per class
///     ├── GET  /communities/:id/invites              # List invites
///     ├── POST /communities/:id/invites              # Issue invite
///     ├── POST /communities/:id/subscription         # Change plan
///     ├── POST /invites/accept                       # Redeem invite token
///     └── GET  /me/access                            # Any approved membership?
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (everything under /v1)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Everything under /v1 requires a verified credential; per-community
    // authorization happens inside the handlers.
    let v1_routes = Router::new()
        .route("/communities", post(routes::communities::create_community))
        .route("/communities/join", post(routes::communities::request_join))
        .route(
            "/communities/:community_id",
            get(routes::communities::get_community),
        )
        .route(
            "/communities/:community_id/collaborators",
            get(routes::collaborators::list_collaborators)
                .post(routes::collaborators::add_collaborator),
        )
        .route(
            "/communities/:community_id/collaborators/:user_id/approve",
            post(routes::collaborators::approve_request),
        )
        .route(
            "/communities/:community_id/collaborators/:user_id/reject",
            post(routes::collaborators::reject_request),
        )
        .route(
            "/communities/:community_id/collaborators/:user_id/role",
            put(routes::collaborators::change_role),
        )
        .route(
            "/communities/:community_id/seats",
            get(routes::communities::seat_usage),
        )
        .route(
            "/communities/:community_id/invites",
            get(routes::invites::list_invites).post(routes::invites::send_invite),
        )
        .route(
            "/communities/:community_id/subscription",
            post(routes::communities::update_subscription),
        )
        .route("/invites/accept", post(routes::invites::accept_invite))
        .route("/me/access", get(routes::communities::check_access))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
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
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
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
        .with_state(state)
}

/// Credential verification middleware
///
/// Verifies the bearer credential once per request and injects an
/// [`AuthContext`] into request extensions; the subject id is trusted only
/// for this request.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token = rolo_core::auth::middleware::bearer_token(req.headers())?;
    let user_id = jwt::verify_credential(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext::new(user_id));

    Ok(next.run(req).await)
}
