//! On-hand inventory item models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::{Metadata, Quantity, SiteRef};

/// Metadata keys an item keeps; everything else is dropped on write
pub const ITEM_METADATA_KEYS: [&str; 3] = ["parent", "description", "image"];

/// Canonical identity of an item record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub company: String,
    pub site: String,
    pub item_id: String,
}

impl ItemKey {
    pub fn new(company: impl Into<String>, site: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            site: site.into(),
            item_id: item_id.into(),
        }
    }

    pub fn at(site: &SiteRef, item_id: impl Into<String>) -> Self {
        Self::new(site.company.clone(), site.site.clone(), item_id)
    }

    pub fn site_ref(&self) -> SiteRef {
        SiteRef::new(self.company.clone(), self.site.clone())
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.company, self.site, self.item_id)
    }
}

/// Quantity of one product-as-tracked-unit held at one site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub company: String,
    pub site: String,
    pub item_id: String,
    pub product: String,
    pub quantity: Quantity,
    pub metadata: Metadata,
    /// Delivery currently carrying this item, if in transit
    pub delivery: Option<String>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

impl Item {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.company.clone(), self.site.clone(), self.item_id.clone())
    }

    pub fn site_ref(&self) -> SiteRef {
        SiteRef::new(self.company.clone(), self.site.clone())
    }
}

/// Keep only the metadata keys items are allowed to carry
pub fn retain_item_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| ITEM_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Input for creating an item directly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateItemInput {
    /// Owning company; defaults to the caller's company
    #[validate(length(min = 1, message = "company is missing"))]
    pub company: Option<String>,
    #[validate(length(min = 1, message = "site is missing"))]
    pub site: String,
    #[validate(length(min = 1, message = "item id is missing"))]
    pub item_id: String,
    #[validate(length(min = 1, message = "product is missing"))]
    pub product: String,
    pub quantity: Quantity,
    #[serde(default)]
    pub metadata: Metadata,
    pub version: Option<String>,
    pub parent_action: Option<String>,
    pub parent_action_id: Option<String>,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Partial update of an item; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EditItemInput {
    /// Absolute new quantity
    pub quantity: Option<Quantity>,
    /// Relative quantity change
    pub delta: Option<Quantity>,
    #[validate(length(min = 1, message = "product cannot be empty"))]
    pub product: Option<String>,
    pub metadata: Option<Metadata>,
    /// In-transit delivery marker; an empty string clears it
    pub delivery: Option<String>,
    pub version: Option<String>,
    pub parent_action: Option<String>,
    pub parent_action_id: Option<String>,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl EditItemInput {
    /// True if the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.delta.is_none()
            && self.product.is_none()
            && self.metadata.is_none()
            && self.delivery.is_none()
            && self.version.is_none()
    }
}

/// Metadata of a direct item removal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteItemInput {
    pub parent_action: Option<String>,
    pub parent_action_id: Option<String>,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Secondary lookups over the item ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    pub company: Option<String>,
    pub site: Option<String>,
    pub product: Option<String>,
    pub delivery: Option<String>,
    pub created_by: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        self.company.as_ref().map_or(true, |c| *c == item.company)
            && self.site.as_ref().map_or(true, |s| *s == item.site)
            && self.product.as_ref().map_or(true, |p| *p == item.product)
            && self
                .delivery
                .as_ref()
                .map_or(true, |d| item.delivery.as_deref() == Some(d.as_str()))
            && self.created_by.as_ref().map_or(true, |u| *u == item.created_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_item_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("parent".to_string(), "lot-1".to_string());
        metadata.insert("colour".to_string(), "red".to_string());
        metadata.insert("image".to_string(), "img.png".to_string());

        let kept = retain_item_metadata(&metadata);
        assert_eq!(kept.len(), 2);
        assert!(kept.contains_key("parent"));
        assert!(!kept.contains_key("colour"));
    }

    #[test]
    fn test_item_key_orders_by_company_then_site() {
        let a = ItemKey::new("acme", "S1", "z");
        let b = ItemKey::new("acme", "S2", "a");
        assert!(a < b);
    }

    #[test]
    fn test_empty_patch() {
        assert!(EditItemInput::default().is_empty());
        let patch = EditItemInput {
            delivery: Some(String::new()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
