use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use placement_portal::data::Database;
use placement_portal::utils::config::PortalConfig;
use placement_portal::utils::error::hide_internal_details;
use placement_portal::utils::routes::misc::route_not_found;
use placement_portal::{configure, AppState};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("placement_portal=info,actix_web=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

fn cors(config: &PortalConfig) -> Cors {
    if config.allows_any_origin() {
        return Cors::permissive();
    }
    config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    hide_internal_details(config.is_production());
    if !config.is_production() && std::env::var("JWT_SECRET").is_err() {
        warn!("JWT_SECRET not set, using the development secret");
    }

    let db = match Database::open(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database_path, e);
            std::process::exit(1);
        }
    };

    let state = web::Data::new(AppState::new(db, config.clone()));
    if let Err(e) = state.seed_admin() {
        error!("Failed to seed administrator: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting placement portal on {}:{} ({})",
        config.host, config.port, config.environment
    );

    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors(&server_config))
            .configure(configure)
            .default_service(web::route().to(route_not_found))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
