//! Delivery models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{CargoMap, EntityKind, Movable};
use crate::types::SiteRef;

/// Delivery lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Loading,
    Shipped,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Loading => "loading",
            DeliveryStatus::Shipped => "shipped",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Whether a status edit from `self` to `next` is allowed.
    /// Cancellation is not an edit; it goes through cancel.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Loading, DeliveryStatus::Loading)
                | (DeliveryStatus::Loading, DeliveryStatus::Shipped)
                | (DeliveryStatus::Loading, DeliveryStatus::Delivered)
                | (DeliveryStatus::Shipped, DeliveryStatus::Shipped)
                | (DeliveryStatus::Shipped, DeliveryStatus::Delivered)
        )
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a new delivery is recorded by the sender or the receiver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDirection {
    Send,
    Receive,
}

/// Identity of a delivery route variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeliveryKey {
    pub delivery_id: String,
    #[serde(default)]
    pub route: String,
}

impl DeliveryKey {
    pub fn new(delivery_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            route: route.into(),
        }
    }
}

impl std::fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.route.is_empty() {
            write!(f, "{}", self.delivery_id)
        } else {
            write!(f, "{}/{}", self.delivery_id, self.route)
        }
    }
}

/// A cargo manifest moving from one company site to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub delivery_id: String,
    pub route: String,
    pub from_company: String,
    pub to_company: String,
    pub from_site: String,
    pub to_site: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub shipper: Option<String>,
    pub driver: Option<String>,
    pub status: DeliveryStatus,
    pub cargo: CargoMap,
    pub description: Option<String>,
    pub version: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn key(&self) -> DeliveryKey {
        DeliveryKey::new(self.delivery_id.clone(), self.route.clone())
    }

    pub fn from_site_ref(&self) -> SiteRef {
        SiteRef::new(self.from_company.clone(), self.from_site.clone())
    }

    pub fn to_site_ref(&self) -> SiteRef {
        SiteRef::new(self.to_company.clone(), self.to_site.clone())
    }

    /// True if `company` is on either end of the delivery
    pub fn involves(&self, company: &str) -> bool {
        self.from_company == company || self.to_company == company
    }
}

impl Movable for Delivery {
    fn kind(&self) -> EntityKind {
        EntityKind::Delivery
    }

    fn id(&self) -> String {
        self.key().to_string()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn site_for_refund(&self) -> SiteRef {
        self.from_site_ref()
    }

    fn site_for_credit(&self) -> SiteRef {
        self.to_site_ref()
    }
}

/// Direction of a new delivery as seen from the creating company
pub fn delivery_direction(actor_company: &str, from_company: &str, to_company: &str) -> DeliveryDirection {
    if actor_company == to_company && actor_company != from_company {
        DeliveryDirection::Receive
    } else {
        DeliveryDirection::Send
    }
}

/// Input for creating a delivery
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDeliveryInput {
    #[validate(length(min = 1, message = "delivery id is missing"))]
    pub delivery_id: String,
    #[serde(default)]
    pub route: String,
    #[validate(length(min = 1, message = "sending company is missing"))]
    pub from_company: String,
    #[validate(length(min = 1, message = "receiving company is missing"))]
    pub to_company: String,
    #[validate(length(min = 1, message = "from site is missing"))]
    pub from_site: String,
    #[validate(length(min = 1, message = "to site is missing"))]
    pub to_site: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub shipper: Option<String>,
    pub driver: Option<String>,
    pub status: Option<DeliveryStatus>,
    #[serde(default)]
    pub cargo: CargoMap,
    pub description: Option<String>,
    pub version: Option<String>,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Partial update of a delivery; cargo lines carry the new quantity per item
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EditDeliveryInput {
    #[validate(length(min = 1, message = "to site cannot be empty"))]
    pub to_site: Option<String>,
    #[validate(length(min = 1, message = "receiving company cannot be empty"))]
    pub to_company: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub shipper: Option<String>,
    pub driver: Option<String>,
    pub status: Option<DeliveryStatus>,
    pub description: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub cargo_deltas: CargoMap,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Request metadata for cancel and delete
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveDeliveryInput {
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Delivery listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryFilter {
    pub company: Option<String>,
    pub from_site: Option<String>,
    pub to_site: Option<String>,
    pub status: Option<DeliveryStatus>,
}

impl DeliveryFilter {
    pub fn matches(&self, delivery: &Delivery) -> bool {
        self.company.as_ref().map_or(true, |c| delivery.involves(c))
            && self.from_site.as_ref().map_or(true, |s| *s == delivery.from_site)
            && self.to_site.as_ref().map_or(true, |s| *s == delivery.to_site)
            && self.status.map_or(true, |s| s == delivery.status)
    }
}
