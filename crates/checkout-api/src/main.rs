//! # Checkout Session Server
//!
//! Serves one checkout session over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Optional: charge through Stripe instead of the simulated backend
//! export STRIPE_SECRET_KEY=sk_test_...
//!
//! # Run the server
//! checkout-session
//! ```

use checkout_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Session: {}", state.session.id());
    info!("Products loaded: {}", state.catalog.products.len());
    info!(
        "Shipping fee: {}",
        state.session.config().shipping_fee().display()
    );

    let app = routes::create_router(state);

    info!("Checkout session listening on http://{}", addr);

    if !is_prod {
        info!("Checkout view: GET http://{}/api/v1/checkout", addr);
        info!("Pay: POST http://{}/api/v1/checkout/pay", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Checkout Session
  ━━━━━━━━━━━━━━━━
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
