//! Cargo lines and the inventory delta rules shared by deliveries and processes
//!
//! A cargo map is the item -> (product, quantity, metadata) manifest carried
//! by a delivery or consumed/produced by a process. The functions here decide,
//! without touching any ledger, which signed inventory change each line causes
//! and at which site.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Metadata, Quantity, SiteRef};

/// One line of a cargo, input or output map
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductQuantity {
    #[serde(default)]
    pub product: String,
    pub quantity: Quantity,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ProductQuantity {
    pub fn new(product: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            product: product.into(),
            quantity,
            metadata: Metadata::new(),
        }
    }
}

/// Item id -> cargo line
pub type CargoMap = BTreeMap<String, ProductQuantity>;

/// The two kinds of entity that move inventory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Delivery,
    Process,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Delivery => write!(f, "delivery"),
            EntityKind::Process => write!(f, "process"),
        }
    }
}

/// What is happening to a cargo map when it is processed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Delivery leaves the source site
    Send,
    /// Delivery arrives at the destination site
    Receive,
    /// Delivery or process is cancelled and the source is refunded
    Cancel,
    /// Process consumes its inputs
    Start,
    /// Process produces its outputs
    Finish,
    /// In-flight cargo or input edit, settled against the refund site
    Edit,
    /// Process output edit while still processing; cargo bookkeeping only
    EditOutputs,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Activity::Send => "send",
            Activity::Receive => "receive",
            Activity::Cancel => "cancel",
            Activity::Start => "start",
            Activity::Finish => "finish",
            Activity::Edit => "edit",
            Activity::EditOutputs => "edit_outputs",
        };
        write!(f, "{}", name)
    }
}

/// An entity whose cargo moves inventory between or within sites
pub trait Movable {
    fn kind(&self) -> EntityKind;

    /// Identifier recorded as the parent action id in the inventory log
    fn id(&self) -> String;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Site that is charged on send/start and refunded on edit/cancel
    fn site_for_refund(&self) -> SiteRef;

    /// Site that is credited when the entity completes
    fn site_for_credit(&self) -> SiteRef;
}

/// Errors raised while planning cargo deltas
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CargoError {
    #[error("quantity must be zero or positive for item {item}, got {quantity}")]
    NegativeQuantity { item: String, quantity: Quantity },

    #[error("activity {activity} is not valid for a {kind} in {mode} mode")]
    InvalidActivity {
        kind: EntityKind,
        activity: Activity,
        mode: &'static str,
    },

    #[error("product is missing for item {item}")]
    MissingProduct { item: String },
}

/// A single signed change to one item at one site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedDelta {
    pub item: String,
    pub product: String,
    pub site: SiteRef,
    pub delta: Quantity,
    pub metadata: Metadata,
}

/// Result of planning: the ledger deltas plus the cargo map after the change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CargoPlan {
    pub deltas: Vec<PlannedDelta>,
    pub cargo: CargoMap,
}

/// Signed delta and target site for a full-cargo line
pub fn full_cargo_delta<M: Movable + ?Sized>(
    entity: &M,
    line: &ProductQuantity,
    activity: Activity,
) -> Result<(Quantity, SiteRef), CargoError> {
    match (entity.kind(), activity) {
        (EntityKind::Delivery, Activity::Send) => Ok((-line.quantity, entity.site_for_refund())),
        (EntityKind::Delivery, Activity::Receive) => Ok((line.quantity, entity.site_for_credit())),
        (EntityKind::Delivery, Activity::Cancel) => Ok((line.quantity, entity.site_for_refund())),
        (EntityKind::Process, Activity::Start) => Ok((-line.quantity, entity.site_for_refund())),
        (EntityKind::Process, Activity::Finish) => Ok((line.quantity, entity.site_for_credit())),
        (EntityKind::Process, Activity::Cancel) => Ok((line.quantity, entity.site_for_refund())),
        (kind, activity) => Err(CargoError::InvalidActivity {
            kind,
            activity,
            mode: "full-cargo",
        }),
    }
}

/// Plan the inventory deltas for a cargo map.
///
/// With an empty `deltas` map every line of `current` is settled according to
/// `activity` (full-cargo mode). Otherwise each delta line carries the new
/// quantity for its item and the difference against `current` is settled
/// against the refund site (delta mode), with `Activity::EditOutputs` leaving
/// inventory untouched.
///
/// Zero deltas are dropped from the plan.
pub fn plan_cargo<M: Movable + ?Sized>(
    entity: &M,
    current: &CargoMap,
    deltas: &CargoMap,
    activity: Activity,
) -> Result<CargoPlan, CargoError> {
    if deltas.is_empty() {
        plan_full_cargo(entity, current, activity)
    } else {
        plan_cargo_edit(entity, current, deltas, activity)
    }
}

fn plan_full_cargo<M: Movable + ?Sized>(
    entity: &M,
    current: &CargoMap,
    activity: Activity,
) -> Result<CargoPlan, CargoError> {
    let mut planned = Vec::with_capacity(current.len());

    for (item, line) in current {
        if line.quantity < Decimal::ZERO {
            return Err(CargoError::NegativeQuantity {
                item: item.clone(),
                quantity: line.quantity,
            });
        }

        let (delta, site) = full_cargo_delta(entity, line, activity)?;
        if delta.is_zero() {
            continue;
        }

        planned.push(PlannedDelta {
            item: item.clone(),
            product: line.product.clone(),
            site,
            delta,
            metadata: line.metadata.clone(),
        });
    }

    Ok(CargoPlan {
        deltas: planned,
        cargo: current.clone(),
    })
}

fn plan_cargo_edit<M: Movable + ?Sized>(
    entity: &M,
    current: &CargoMap,
    deltas: &CargoMap,
    activity: Activity,
) -> Result<CargoPlan, CargoError> {
    let settle = match activity {
        Activity::Edit => true,
        Activity::EditOutputs => false,
        other => {
            return Err(CargoError::InvalidActivity {
                kind: entity.kind(),
                activity: other,
                mode: "delta",
            })
        }
    };

    let refund_site = entity.site_for_refund();
    let mut cargo = current.clone();
    let mut planned = Vec::new();

    for (item, line) in deltas {
        if line.quantity < Decimal::ZERO {
            return Err(CargoError::NegativeQuantity {
                item: item.clone(),
                quantity: line.quantity,
            });
        }

        let existing = current.get(item);
        let old_quantity = existing.map(|l| l.quantity).unwrap_or(Decimal::ZERO);
        // Shrinking cargo refunds the site, growing it charges the site
        let delta = old_quantity - line.quantity;

        let product = if line.product.is_empty() {
            existing.map(|l| l.product.clone()).unwrap_or_default()
        } else {
            line.product.clone()
        };
        if product.is_empty() {
            return Err(CargoError::MissingProduct { item: item.clone() });
        }

        if line.quantity.is_zero() {
            cargo.remove(item);
        } else {
            cargo.insert(
                item.clone(),
                ProductQuantity {
                    product: product.clone(),
                    quantity: line.quantity,
                    metadata: line.metadata.clone(),
                },
            );
        }

        if settle && !delta.is_zero() {
            planned.push(PlannedDelta {
                item: item.clone(),
                product,
                site: refund_site.clone(),
                delta,
                metadata: line.metadata.clone(),
            });
        }
    }

    Ok(CargoPlan {
        deltas: planned,
        cargo,
    })
}

/// Drop zero-quantity lines; a zero line is equivalent to no line
pub fn normalize_cargo(cargo: CargoMap) -> CargoMap {
    cargo
        .into_iter()
        .filter(|(_, line)| !line.quantity.is_zero())
        .collect()
}
