//! One-shot notices carried on redirects.
//!
//! Handlers redirect with `?error=<code>` or `?success=<code>`; the next page
//! turns the code into text. Unknown error codes get a generic message and
//! unknown success codes are ignored.

use serde::Deserialize;

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    #[must_use]
    pub fn error_text(&self) -> Option<&'static str> {
        self.error.as_deref().map(error_text)
    }

    #[must_use]
    pub fn success_text(&self) -> Option<&'static str> {
        self.success.as_deref().and_then(success_text)
    }
}

#[must_use]
pub fn error_text(code: &str) -> &'static str {
    match code {
        "invalid_email" => "Please enter a valid email address.",
        "credentials" => "Invalid login credentials.",
        "exists" => "An account with this email already exists.",
        "weak_password" => "Password should be at least 6 characters.",
        "rate_limited" => "Too many attempts. Please wait a moment and try again.",
        "unavailable" => "The sign-in service is unavailable. Please try again.",
        "session" => "Could not save your session. Please try again.",
        "session_expired" => "Your session has expired. Please sign in again.",
        "forbidden" => "You do not have permission to do that.",
        "not_found" => "That item no longer exists.",
        "invalid_item" => "That is not a valid item.",
        "malformed" => "The store returned data that could not be read.",
        _ => "Something went wrong. Please try again.",
    }
}

#[must_use]
pub fn success_text(code: &str) -> Option<&'static str> {
    let text = match code {
        "registered" => "Registration successful! Please check your email to confirm your account.",
        "signed_out" => "You have been signed out.",
        "created" => "Item added.",
        "updated" => "Item updated.",
        "deleted" => "Item deleted.",
        "added" => "Added to cart.",
        "removed" => "Removed from cart.",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        let query = MessageQuery {
            error: Some("credentials".to_owned()),
            success: Some("bogus".to_owned()),
        };
        assert_eq!(query.error_text(), Some("Invalid login credentials."));
        assert_eq!(query.success_text(), None);

        assert_eq!(
            error_text("<script>"),
            "Something went wrong. Please try again."
        );
        assert_eq!(success_text("deleted"), Some("Item deleted."));
    }
}
