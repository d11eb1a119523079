use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use steel_api::auth::{AppState, AppStateInner};
use steel_api::middleware::require_auth;
use steel_api::{campaigns, characters, encounters, projects, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steel=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("STEEL_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let admin_email =
        std::env::var("STEEL_ADMIN_EMAIL").unwrap_or_else(|_| "admin@forgesteel.local".into());
    let db_path = std::env::var("STEEL_DB_PATH").unwrap_or_else(|_| "steel.db".into());
    let host = std::env::var("STEEL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("STEEL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = steel_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        admin_email,
    });

    // Routes
    let public_routes = Router::new().route("/healthz", get(healthz));

    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/characters", get(characters::list_characters))
        .route("/characters", post(characters::create_character))
        .route("/characters/{id}", get(characters::get_character))
        .route("/characters/{id}", put(characters::update_character))
        .route("/characters/{id}", delete(characters::delete_character))
        .route("/characters/{id}/share", put(characters::share_character))
        .route("/characters/{id}/campaign", put(characters::assign_character_campaign))
        .route("/campaigns", get(campaigns::list_campaigns))
        .route("/campaigns", post(campaigns::create_campaign))
        .route("/campaigns/{id}", get(campaigns::get_campaign))
        .route("/campaigns/{id}", put(campaigns::update_campaign))
        .route("/campaigns/{id}", delete(campaigns::delete_campaign))
        .route("/campaigns/{id}/members", get(campaigns::list_members))
        .route("/campaigns/{id}/members", post(campaigns::add_campaign_member))
        .route("/campaigns/{id}/members/{user_id}", put(campaigns::set_campaign_member_role))
        .route("/campaigns/{id}/members/{user_id}", delete(campaigns::remove_campaign_member))
        .route("/campaigns/{id}/characters", get(campaigns::list_campaign_characters))
        .route("/campaigns/{campaign_id}/encounters", get(encounters::list_encounters))
        .route("/campaigns/{campaign_id}/encounters", post(encounters::create_encounter))
        .route("/campaigns/{campaign_id}/encounters/{id}", get(encounters::get_encounter))
        .route("/campaigns/{campaign_id}/encounters/{id}", put(encounters::update_encounter))
        .route("/campaigns/{campaign_id}/encounters/{id}", delete(encounters::delete_encounter))
        .route("/campaigns/{campaign_id}/projects", get(projects::list_projects))
        .route("/campaigns/{campaign_id}/projects", post(projects::create_project))
        .route("/campaigns/{campaign_id}/projects/{id}", get(projects::get_project))
        .route("/campaigns/{campaign_id}/projects/{id}", put(projects::update_project))
        .route("/campaigns/{campaign_id}/projects/{id}", delete(projects::delete_project))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Forge Steel server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}
