use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig,
    database,
    error::{AppError, Result},
    routes,
    services::demo_data::DemoStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Option<PgPool>,
    demo: Option<Arc<DemoStore>>,
}

impl AppState {
    pub fn with_pool(pool: PgPool, config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            db: Some(pool),
            demo: None,
        }
    }

    pub fn demo(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            db: None,
            demo: Some(Arc::new(DemoStore::seeded())),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.demo.is_some()
    }

    /// The in-memory store, present only in demo mode.
    pub fn demo_store(&self) -> Option<&DemoStore> {
        self.demo.as_deref()
    }

    pub fn db(&self) -> Result<&PgPool> {
        self.db.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("No disponible en modo demostración".to_string())
        })
    }
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let state = if config.features.demo_mode {
        tracing::warn!("Demo mode enabled, serving in-memory sample data");
        AppState::demo(config.clone())
    } else {
        let pool = database::create_pool(&config.database).await?;
        AppState::with_pool(pool, config.clone())
    };

    router(state)
}

pub fn router(state: AppState) -> Result<Router> {
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::ConfigError(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let max_body_size = state.config.server.max_body_size;

    let app = routes::create_router(&state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
