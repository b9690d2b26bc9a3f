//! Payment API 模块
//!
//! webhook 路由必须对网关公开；其余路由属于店面/后台。

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/checkout", post(handler::start_checkout))
        .route("/offline", post(handler::submit_offline))
        .route("/{id}/approve", post(handler::approve_offline))
        .route("/{id}", get(handler::get_by_id))
        .route("/order/{order_id}", get(handler::list_by_order))
        .route("/verify/{reference}", get(handler::verify))
        .route("/webhook", post(handler::webhook))
}
