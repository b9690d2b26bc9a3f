//! Order API 模块

mod handler;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/from-cart/{cart_id}", post(handler::create_from_cart))
        .route("/{id}", get(handler::get_by_id))
        .route("/number/{order_number}", get(handler::get_by_number))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
}
