//! Newtype IDs for type-safe entity references.
//!
//! Gateway identities are opaque strings (UUIDs in practice, but nothing here
//! relies on that). Use the `define_id!` macro to create wrappers that prevent
//! accidentally passing a shop item ID where a user ID is expected.

/// Macro to define a type-safe ID wrapper around an opaque string.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, and `From<String>` / `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use shopwave_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new("w-1");
/// assert_eq!(widget.as_str(), "w-1");
///
/// // These are different types, so this won't compile:
/// // let _: GadgetId = widget;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Gateway identity of an authenticated user (also the profile row's key).
define_id!(UserId);
define_id!(ShopItemId);
define_id!(CartItemId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_raw_identifier() {
        let id = ShopItemId::new("5d0c6a9e-1f7b-4d1e-9d6c-3f1f0b7a2c11");
        assert_eq!(id.to_string(), "5d0c6a9e-1f7b-4d1e-9d6c-3f1f0b7a2c11");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = UserId::new("user-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"user-1\"");

        let back: UserId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_conversions() {
        let id: CartItemId = "row-9".into();
        let raw: String = id.clone().into();
        assert_eq!(raw, "row-9");
        assert_eq!(id.into_inner(), "row-9");
    }
}
