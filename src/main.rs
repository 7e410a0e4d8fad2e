use axum::{Json, Router, debug_handler, response::IntoResponse, routing::get};
use murmur::{AppState, auth, chat, db, rooms};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("murmur=debug,info")),
        )
        .init();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(
            dotenv::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://murmur.db?mode=rwc".to_owned())
                .as_str(),
        )
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    let app_state = AppState::new(db_pool);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(hello))
        .merge(auth::router())
        .nest("/message", rooms::router().merge(chat::router()))
        .with_state(app_state)
        .layer(cors);

    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_owned());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app).await.unwrap();
}

#[debug_handler]
async fn hello() -> impl IntoResponse {
    Json(serde_json::json!({ "Hello": "World" }))
}
