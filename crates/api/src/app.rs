use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::services::{
    AccountService, CarveOutService, ImportService, MeetingService, MemberService,
    PodcastService, SessionService,
};
use domain::store::ClubStore;
use shared::session::{SessionError, SessionSigner};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, security_headers_middleware,
    trace_id, RateLimiterState,
};
use crate::routes::{auth, carve_outs, codes, health, imports, meetings, members, podcasts};
use crate::services::{cookies::CookieHelper, email::EmailService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClubStore>,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub cookies: CookieHelper,
    pub email: EmailService,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    /// Only present when backed by PostgreSQL
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ClubStore>,
        pool: Option<PgPool>,
    ) -> Result<Self, SessionError> {
        let signer = SessionSigner::new(&config.auth.session_secret, config.auth.session_ttl())?;

        // rate_limit_per_minute = 0 disables limiting
        let rate_limiter = if config.security.rate_limit_per_minute > 0 {
            Some(Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
            )))
        } else {
            None
        };

        Ok(Self {
            sessions: Arc::new(SessionService::new(store.clone(), signer)),
            cookies: CookieHelper::new(config.secure_cookies()),
            email: EmailService::new(config.email.clone()),
            config: Arc::new(config),
            store,
            rate_limiter,
            pool,
        })
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone())
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.store.clone())
    }

    pub fn podcasts(&self) -> PodcastService {
        PodcastService::new(self.store.clone())
    }

    pub fn meetings(&self) -> MeetingService {
        MeetingService::new(self.store.clone())
    }

    pub fn carve_outs(&self) -> CarveOutService {
        CarveOutService::new(self.store.clone())
    }

    pub fn imports(&self) -> ImportService {
        ImportService::new(self.store.clone())
    }
}

pub fn create_app(
    config: Config,
    store: Arc<dyn ClubStore>,
    pool: Option<PgPool>,
) -> Result<Router, SessionError> {
    let state = AppState::new(config, store, pool)?;
    Ok(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        // Cookies need credentials, which rules out wildcard headers.
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    // Credential endpoints, limited per client IP
    let credential_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/claim-account", post(auth::claim_account))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/emergency-recover", post(auth::emergency_recover))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let session_routes = Router::new()
        .route("/api/auth/setup-status", get(auth::setup_status))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/auth/preview",
            post(auth::start_preview).delete(auth::stop_preview),
        );

    let code_routes = Router::new()
        .route(
            "/api/join-codes",
            get(codes::count_join_codes).post(codes::generate_join_code),
        )
        .route("/api/account-claim-codes", post(codes::issue_claim_code))
        .route("/api/password-reset-codes", post(codes::issue_reset_code));

    let club_routes = Router::new()
        .route(
            "/api/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/api/members/:id",
            patch(members::update_member).delete(members::delete_member),
        )
        .route(
            "/api/podcasts",
            get(podcasts::list_podcasts).post(podcasts::submit_podcast),
        )
        .route("/api/podcasts/discuss-queue", get(podcasts::discuss_queue))
        .route(
            "/api/podcasts/:id",
            axum::routing::delete(podcasts::delete_podcast),
        )
        .route("/api/podcasts/:id/vote", post(podcasts::vote))
        .route(
            "/api/meetings",
            get(meetings::list_meetings).post(meetings::create_meeting),
        )
        .route(
            "/api/meetings/:id",
            patch(meetings::update_meeting).delete(meetings::delete_meeting),
        )
        .route("/api/meetings/:id/complete", post(meetings::complete_meeting))
        .route(
            "/api/carveouts",
            get(carve_outs::list_carve_outs).post(carve_outs::create_carve_out),
        )
        .route(
            "/api/carveouts/:id",
            patch(carve_outs::update_carve_out).delete(carve_outs::delete_carve_out),
        )
        .route(
            "/api/imports/:source",
            get(imports::list_batches)
                .post(imports::run_import)
                .delete(imports::rollback_batch),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(credential_routes)
        .merge(session_routes)
        .merge(code_routes)
        .merge(club_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
