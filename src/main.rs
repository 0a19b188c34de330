pub mod api;
mod config;
mod models;
mod providers;
mod services;
mod settings;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api::AppState;
use config::Config;
use providers::kv::KvStore;
use providers::via::ViaClient;
use services::cache::ResponseCache;
use services::feed::FeedService;
use settings::SettingsStore;
use sync::RefreshManager;

#[derive(OpenApi)]
#[openapi(
    info(title = "VIA Rail Live Train API", version = "0.1.0"),
    paths(
        api::trains::get_trains,
        api::stations::get_stations,
        api::board::get_board,
        api::board::get_board_stations,
        api::board::get_station_detail,
        api::settings::get_settings,
        api::settings::put_settings,
    ),
    components(schemas(
        api::ErrorResponse,
        api::stations::StationListResponse,
        api::board::BoardResponse,
        api::board::StationBoardResponse,
        api::board::StationDetailResponse,
        api::board::StationStopEvent,
        models::Train,
        models::StopTime,
        models::StopEventTimes,
        models::Station,
        models::TrainStatus,
        services::board::TrainBoard,
        settings::UserSettings,
        settings::Theme,
    )),
    tags(
        (name = "trains", description = "Upstream feed proxy"),
        (name = "stations", description = "Static station metadata"),
        (name = "board", description = "Derived train board"),
        (name = "settings", description = "Persisted user settings")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(upstream = %config.upstream_url, network = %config.rail_network, "Loaded configuration");

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // KV database
    let pool = SqlitePool::connect(&config.database_url)
        .await
        .expect("Failed to connect to SQLite database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let kv = KvStore::new(pool.clone());
    if let Some(seed) = &config.stations_seed {
        kv.seed_from_file(&config.rail_network, seed)
            .await
            .expect("Failed to seed station list");
        tracing::info!(path = %seed, "Seeded station list into KV");
    }

    // Settings blob: loaded once, saved on every change
    let settings_store = Arc::new(SettingsStore::new(&config.settings_path));
    let settings = Arc::new(RwLock::new(settings_store.load()));

    // Feed proxy: upstream client behind the shared response cache
    let ttl = Duration::from_secs(config.cache_ttl_seconds);
    let via = ViaClient::new(config.upstream_url.clone()).expect("Failed to build feed client");
    let feed = Arc::new(FeedService::new(
        via,
        Arc::new(ResponseCache::new(ttl)),
        ttl,
    ));

    // Board refresh loop in the background
    let refresh = Arc::new(RefreshManager::new(
        feed.clone(),
        kv.clone(),
        config.rail_network.clone(),
        settings.clone(),
        format!("http://{}", config.bind_addr),
    ));
    let board = refresh.board_store();
    let refresh_clone = refresh.clone();
    tokio::spawn(async move {
        refresh_clone.start().await;
    });

    // Build the app
    let state = AppState {
        feed,
        kv,
        rail_network: config.rail_network.clone(),
        board,
        settings,
        settings_store,
    };

    let mut app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    if let Some(static_dir) = &config.static_dir {
        tracing::info!(dir = %static_dir, "Serving frontend assets");
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(addr = %config.bind_addr, "Server running");
    tracing::info!("Swagger UI: /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "VIA Rail Live Train API"
}
