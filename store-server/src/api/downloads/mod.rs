//! Digital Download API 模块

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/downloads", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/access", get(handler::list_access))
        .route("/access/{id}", get(handler::get_access).put(handler::update_access))
        .route("/access/{id}/revoke", post(handler::revoke_access))
        .route("/grant/{order_item_id}", post(handler::grant))
        .route("/link/{access_id}", get(handler::link))
        .route("/file/{token}", get(handler::download))
        .route("/validate/{token}", get(handler::validate))
        .route("/expired", get(handler::list_expired))
        .route("/cleanup", post(handler::cleanup))
}
