//! Account role management.
//!
//! The storefront never changes roles itself; promotion to admin happens
//! here, with the service-role key.

use tracing::info;

use shopwave_core::{Role, UserId};
use shopwave_storefront::gateway::{Credential, Gateway, GatewayError, Table, to_row};
use shopwave_storefront::models::Profile;

/// Set `user_id`'s role, creating the profile row if it does not exist.
///
/// # Errors
///
/// Returns an error if the gateway rejects the upsert.
pub async fn set(gateway: &dyn Gateway, user_id: &UserId, role: Role) -> Result<(), GatewayError> {
    let row = to_row(&Profile {
        id: user_id.clone(),
        role,
    })?;

    gateway
        .upsert(Credential::Service, Table::Profiles, row, &["id"])
        .await?;

    info!(user_id = %user_id, role = %role, "role updated");
    Ok(())
}
