//! Admin item form.
//!
//! The form is `Closed`, `Creating` a new item, or `Editing` an existing one.
//! Field values are kept as the raw strings the browser sends so a rejected
//! submission can be shown again exactly as typed.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use shopwave_core::{Price, PriceError, Rating, RatingError, ShopItemId};

use crate::models::{ShopItem, ShopItemDraft};

/// Validation failures on submit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("name is required")]
    EmptyName,
    #[error(transparent)]
    InvalidPrice(#[from] PriceError),
    #[error(transparent)]
    InvalidRating(#[from] RatingError),
    #[error("the form is not open")]
    NotOpen,
}

/// Raw form field values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemFormFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    /// Empty means "no rating".
    #[serde(default)]
    pub user_rating: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub in_stock: bool,
}

/// HTML checkboxes are sent only when checked.
fn checkbox<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.is_some_and(|v| !matches!(v.as_str(), "" | "off" | "false")))
}

impl Default for ItemFormFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            price: "0".to_owned(),
            user_rating: String::new(),
            in_stock: true,
        }
    }
}

impl ItemFormFields {
    /// Fields seeded from a stored item.
    #[must_use]
    pub fn from_item(item: &ShopItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price.to_input_value(),
            user_rating: item
                .user_rating
                .map(|rating| rating.to_input_value())
                .unwrap_or_default(),
            in_stock: item.in_stock,
        }
    }

    /// Check every field and build a draft.
    ///
    /// # Errors
    ///
    /// Returns the first `FormError` found, in field order.
    pub fn validate(&self) -> Result<ShopItemDraft, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyName);
        }

        let price: Price = self.price.parse()?;
        let rating = self.user_rating.trim();
        let user_rating = if rating.is_empty() {
            None
        } else {
            Some(rating.parse::<Rating>()?)
        };

        Ok(ShopItemDraft {
            name: name.to_owned(),
            price,
            user_rating,
            in_stock: self.in_stock,
        })
    }
}

/// A validated submission, ready for the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormSubmission {
    Create(ShopItemDraft),
    Update(ShopItemId, ShopItemDraft),
}

/// Admin item form state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemForm {
    #[default]
    Closed,
    Creating(ItemFormFields),
    Editing {
        id: ShopItemId,
        fields: ItemFormFields,
    },
}

impl ItemForm {
    /// Blank form for a new item.
    #[must_use]
    pub fn open_for_create() -> Self {
        Self::Creating(ItemFormFields::default())
    }

    /// Form pre-populated from `item`.
    #[must_use]
    pub fn open_for_edit(item: &ShopItem) -> Self {
        Self::Editing {
            id: item.id.clone(),
            fields: ItemFormFields::from_item(item),
        }
    }

    /// Replace the field values, keeping the mode. No effect on a closed form.
    #[must_use]
    pub fn with_fields(self, fields: ItemFormFields) -> Self {
        match self {
            Self::Closed => Self::Closed,
            Self::Creating(_) => Self::Creating(fields),
            Self::Editing { id, .. } => Self::Editing { id, fields },
        }
    }

    /// Validate and close the form.
    ///
    /// On error the form stays open with its fields untouched.
    ///
    /// # Errors
    ///
    /// Returns `FormError::NotOpen` for a closed form, otherwise the
    /// validation error.
    pub fn submit(&mut self) -> Result<FormSubmission, FormError> {
        let submission = match self {
            Self::Closed => return Err(FormError::NotOpen),
            Self::Creating(fields) => FormSubmission::Create(fields.validate()?),
            Self::Editing { id, fields } => FormSubmission::Update(id.clone(), fields.validate()?),
        };
        *self = Self::Closed;
        Ok(submission)
    }

    /// Close without submitting.
    pub fn cancel(&mut self) {
        *self = Self::Closed;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    #[must_use]
    pub const fn fields(&self) -> Option<&ItemFormFields> {
        match self {
            Self::Closed => None,
            Self::Creating(fields) | Self::Editing { fields, .. } => Some(fields),
        }
    }

    /// Modal heading.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Editing { .. } => "Edit Item",
            Self::Creating(_) | Self::Closed => "Add New Item",
        }
    }

    /// URL the form posts to.
    #[must_use]
    pub fn action(&self) -> String {
        match self {
            Self::Editing { id, .. } => format!("/admin/items/{id}"),
            Self::Creating(_) | Self::Closed => "/admin/items".to_owned(),
        }
    }
}
