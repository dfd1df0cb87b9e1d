//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Checkout:
///   - GET  /api/v1/checkout - Current checkout view
///   - PUT  /api/v1/checkout/cart - Replace the cart
///   - GET  /api/v1/checkout/payment-methods - Methods and selection
///   - POST /api/v1/checkout/payment-methods/{method_id}/select - Select a method
///   - POST /api/v1/checkout/pay - Start a payment (202)
///   - POST /api/v1/checkout/reset - Return a finished checkout to idle
///   - POST /api/v1/checkout/back - Leave the checkout (423 while paying)
///
/// - Products:
///   - GET  /api/v1/products - List active products
///   - GET  /api/v1/products/{product_id} - Get product by ID
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/", get(handlers::get_checkout))
        .route("/cart", put(handlers::update_cart))
        .route("/payment-methods", get(handlers::list_payment_methods))
        .route(
            "/payment-methods/{method_id}/select",
            post(handlers::select_payment_method),
        )
        .route("/pay", post(handlers::pay))
        .route("/reset", post(handlers::reset_checkout))
        .route("/back", post(handlers::request_back));

    let product_routes = Router::new()
        .route("/", get(handlers::list_products))
        .route("/{product_id}", get(handlers::get_product));

    let api_routes = Router::new()
        .nest("/checkout", checkout_routes)
        .nest("/products", product_routes);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
