use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use arena_api::auth::{self, AppState, AppStateInner};
use arena_api::middleware::require_auth;
use arena_api::{invitations, matches, scores};
use arena_db::SqliteStore;
use arena_engine::SessionRegistry;
use arena_gateway::Gateway;
use arena_gateway::connection;
use arena_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    gateway: Gateway,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arena=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("ARENA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("ARENA_DB_PATH").unwrap_or_else(|_| "arena.db".into());
    let host = std::env::var("ARENA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ARENA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and engine
    let db = Arc::new(arena_db::Database::open(&PathBuf::from(&db_path))?);
    let store = Arc::new(SqliteStore::new(db.clone()));
    let registry = Arc::new(SessionRegistry::new(store));

    // Shared state
    let dispatcher = Dispatcher::new();
    let gateway = Gateway::new(dispatcher.clone(), registry.clone());
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        registry,
        dispatcher,
        jwt_secret: jwt_secret.clone(),
    });

    let state = ServerState { gateway, jwt_secret };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}", get(matches::get_match))
        .route("/matches/{match_id}/moves", get(matches::get_moves))
        .route("/invitations", post(invitations::send_invitation))
        .route("/invitations/received", get(invitations::received_invitations))
        .route("/invitations/sent", get(invitations::sent_invitations))
        .route("/invitations/{invitation_id}/accept", post(invitations::accept_invitation))
        .route("/invitations/{invitation_id}/reject", post(invitations::reject_invitation))
        .route("/ranking", get(scores::get_ranking))
        .route("/players/{player_id}/history", get(scores::get_score_history))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Arena server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.gateway, state.jwt_secret)
    })
}
