use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, Method},
    routing::post,
    Json, Router,
};
use color_eyre::Result;
use serde_json::Value;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::ServerConfig,
    error::ServiceError,
    generator::OpenAiGenerator,
    service::{ingredients_from_payload, RecipeResponse, RecipeService},
};

pub struct AppState {
    pub service: RecipeService,
}

pub fn init_tracing(production: bool) {
    let default_level = if production { "info" } else { "debug" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).init();
}

pub fn router(service: RecipeService, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/api/recipe", post(recipe_handler))
        .layer(cors)
        .with_state(Arc::new(AppState { service }));

    if config.production {
        app
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

async fn recipe_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RecipeResponse>, ServiceError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(%rejection, "Rejected recipe request body");
        ServiceError::InvalidInput
    })?;
    let ingredients = ingredients_from_payload(&payload)?;
    state.service.generate_recipe(&ingredients).await.map(Json)
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    info!(
        production = config.production,
        "Running in {} mode",
        if config.production { "production" } else { "development" }
    );

    let generator = Arc::new(OpenAiGenerator::from_config(&config));
    let app = router(RecipeService::new(generator), &config);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
