//! # checkout-api
//!
//! HTTP front end for a checkout session.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints that render the checkout view and drive the payment
//! - Product catalog lookups for resolving carts
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/checkout` | Checkout view |
//! | PUT | `/api/v1/checkout/cart` | Replace the cart |
//! | GET | `/api/v1/checkout/payment-methods` | Payment methods |
//! | POST | `/api/v1/checkout/payment-methods/{method_id}/select` | Select a method |
//! | POST | `/api/v1/checkout/pay` | Start a payment |
//! | POST | `/api/v1/checkout/reset` | Reset a finished checkout |
//! | POST | `/api/v1/checkout/back` | Leave the checkout |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{id}` | Get product |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
