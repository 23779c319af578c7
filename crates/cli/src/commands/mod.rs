//! Subcommand implementations.

pub mod role;
pub mod schema;
pub mod seed;

use thiserror::Error;

use shopwave_storefront::config::{ConfigError, GatewayConfig};
use shopwave_storefront::gateway::{GatewayError, SupabaseGateway};

/// Reasons a service-role gateway client cannot be built.
#[derive(Debug, Error)]
pub enum GatewaySetupError {
    #[error("failed to load gateway configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("SHOPWAVE_GATEWAY_SERVICE_KEY not set")]
    MissingServiceKey,
    #[error("failed to build gateway client: {0}")]
    Client(#[from] GatewayError),
}

/// Gateway client that can run table operations under the service-role key.
///
/// # Errors
///
/// Returns an error if configuration is missing or the service key is unset.
pub fn service_gateway() -> Result<SupabaseGateway, GatewaySetupError> {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env()?;
    if config.service_key.is_none() {
        return Err(GatewaySetupError::MissingServiceKey);
    }

    tracing::info!(gateway = %config.url, "using service-role credential");
    Ok(SupabaseGateway::new(&config)?)
}
