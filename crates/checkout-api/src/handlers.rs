//! # Request Handlers
//!
//! Axum request handlers for the checkout API. Every checkout handler
//! answers with the session's current `CheckoutView` so clients never
//! assemble state themselves.

use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use checkout_core::{CartItem, CheckoutError, CheckoutView};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Replace-cart request
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    /// Items in the cart
    #[serde(default)]
    pub items: Vec<CartItemRequest>,
}

/// Item in a cart request
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    /// Product ID
    pub product_id: String,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Largest quantity accepted for a single cart line
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Accepted-payment response
#[derive(Debug, Serialize)]
pub struct PayResponse {
    /// Submission ID (also the processor idempotency key)
    pub submission_id: String,
    /// Session view right after the submission started
    pub checkout: CheckoutView,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_key: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            message_key: None,
        }
    }

    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, response: ErrorResponse) -> ApiError {
    (status, Json(response))
}

fn checkout_error_to_response(err: CheckoutError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code).with_message_key(err.message_key());
    error_response(
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        response,
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "checkout-session",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Current checkout view
pub async fn get_checkout(State(state): State<AppState>) -> Json<CheckoutView> {
    Json(state.session.view())
}

/// Replace the cart snapshot, resolving products against the catalog
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn update_cart(
    State(state): State<AppState>,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CheckoutView>, ApiError> {
    let mut items = Vec::with_capacity(request.items.len());

    for item in &request.items {
        let product = state.catalog.get(&item.product_id).ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                ErrorResponse::new(format!("Product not found: {}", item.product_id), 404),
            )
        })?;

        if !product.active {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("Product is not available: {}", item.product_id), 400),
            ));
        }

        if item.quantity == 0 {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("Quantity must be at least 1: {}", item.product_id), 400),
            ));
        }

        if item.quantity > MAX_LINE_QUANTITY {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    format!(
                        "Quantity must be at most {}: {}",
                        MAX_LINE_QUANTITY, item.product_id
                    ),
                    400,
                ),
            ));
        }

        items.push(CartItem::new(product.clone(), item.quantity));
    }

    let summary = state.session.set_cart(items);
    info!(
        "Cart updated: {} units, subtotal={}",
        summary.item_count,
        summary.subtotal.display()
    );

    Ok(Json(state.session.view()))
}

/// Payment methods and the current selection
pub async fn list_payment_methods(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.session.view();
    Json(serde_json::json!({
        "payment_methods": view.payment_methods,
        "selected_method_id": view.selected_method_id,
        "count": view.payment_methods.len()
    }))
}

/// Select a payment method
#[instrument(skip(state))]
pub async fn select_payment_method(
    State(state): State<AppState>,
    Path(method_id): Path<String>,
) -> Result<Json<CheckoutView>, ApiError> {
    state
        .session
        .select_method(&method_id)
        .map_err(checkout_error_to_response)?;

    Ok(Json(state.session.view()))
}

/// Start a payment for the current cart and selection
#[instrument(skip(state))]
pub async fn pay(State(state): State<AppState>) -> Result<(StatusCode, Json<PayResponse>), ApiError> {
    let handle = state.session.pay().map_err(|e| {
        warn!("Payment not started: {}", e);
        checkout_error_to_response(e)
    })?;

    info!("Payment accepted: submission={}", handle.submission_id());

    Ok((
        StatusCode::ACCEPTED,
        Json(PayResponse {
            submission_id: handle.submission_id().to_string(),
            checkout: state.session.view(),
        }),
    ))
}

/// Return a finished checkout to idle
pub async fn reset_checkout(State(state): State<AppState>) -> Result<Json<CheckoutView>, ApiError> {
    state.session.reset().map_err(checkout_error_to_response)?;
    Ok(Json(state.session.view()))
}

/// Leave the checkout; locked while a payment is in flight
pub async fn request_back(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    match state.session.request_back() {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(CheckoutError::AlreadyInProgress) => Err(error_response(
            StatusCode::LOCKED,
            ErrorResponse::new(CheckoutError::AlreadyInProgress.to_string(), 423)
                .with_message_key(CheckoutError::AlreadyInProgress.message_key()),
        )),
        Err(e) => Err(checkout_error_to_response(e)),
    }
}

/// Get products list
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<_> = state.catalog.active_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.get(&product_id).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            ErrorResponse::new(format!("Product not found: {}", product_id), 404),
        )
    })?;

    Ok(Json(product.clone()))
}
