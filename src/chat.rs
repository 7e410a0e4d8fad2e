pub mod actions;
pub mod events;
pub mod registry;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub use registry::{ConnHandle, Registry};

pub fn router() -> Router<AppState> {
    Router::new().route("/online", get(ws::online))
}
