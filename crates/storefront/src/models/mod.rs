//! Domain models for the storefront.
//!
//! Rows arrive from the gateway as JSON objects and deserialize into these
//! types; drafts and new-row types serialize back into rows.

pub mod cart;
pub mod item;
pub mod profile;
pub mod session;

pub use cart::{CartItem, NewCartItem};
pub use item::{ShopItem, ShopItemDraft};
pub use profile::Profile;
pub use session::{GatewaySession, keys as session_keys};
