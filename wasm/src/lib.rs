//! WebAssembly module for the Inventory Ledger
//!
//! Provides client-side computation for:
//! - Previewing the inventory deltas a cargo edit would produce
//! - Offline cargo validation before submitting a delivery or process

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("inventory-ledger-wasm loaded"));
}

/// Minimal view of a delivery or process, enough to plan its cargo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewEntity {
    pub kind: EntityKind,
    pub id: String,
    /// Source site of a delivery, or the site of a process
    pub from: SiteRef,
    /// Destination site of a delivery; ignored for processes
    pub to: Option<SiteRef>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Movable for PreviewEntity {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn site_for_refund(&self) -> SiteRef {
        self.from.clone()
    }

    fn site_for_credit(&self) -> SiteRef {
        match self.kind {
            EntityKind::Delivery => self.to.clone().unwrap_or_else(|| self.from.clone()),
            EntityKind::Process => self.from.clone(),
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

/// Plan a cargo change and return the resulting `CargoPlan` as JSON
pub fn preview_cargo(
    entity_json: &str,
    current_json: &str,
    deltas_json: &str,
    activity: &str,
) -> Result<String, String> {
    let entity: PreviewEntity = parse("entity", entity_json)?;
    let current: CargoMap = parse("cargo", current_json)?;
    let deltas: CargoMap = if deltas_json.trim().is_empty() {
        CargoMap::new()
    } else {
        parse("deltas", deltas_json)?
    };
    let activity: Activity = serde_json::from_value(serde_json::Value::String(activity.into()))
        .map_err(|_| format!("Unknown activity: {}", activity))?;

    let plan = plan_cargo(&entity, &current, &deltas, activity).map_err(|e| e.to_string())?;
    serde_json::to_string(&plan).map_err(|e| e.to_string())
}

/// Preview which inventory deltas a cargo change would produce, and where
#[wasm_bindgen]
pub fn preview_cargo_edit(
    entity_json: &str,
    current_json: &str,
    deltas_json: &str,
    activity: &str,
) -> Result<String, JsValue> {
    preview_cargo(entity_json, current_json, deltas_json, activity).map_err(|e| {
        web_sys::console::warn_1(&JsValue::from_str(&e));
        JsValue::from_str(&e)
    })
}

/// Same as [`preview_cargo_edit`], returned as a plain JavaScript object
#[wasm_bindgen]
pub fn preview_cargo_object(
    entity_json: &str,
    current_json: &str,
    deltas_json: &str,
    activity: &str,
) -> Result<JsValue, JsValue> {
    let json = preview_cargo_edit(entity_json, current_json, deltas_json, activity)?;
    js_sys::JSON::parse(&json)
}

/// Validate a cargo map; returns an empty string when valid, otherwise the reason
#[wasm_bindgen]
pub fn validate_cargo_json(cargo_json: &str, require_products: bool) -> String {
    let cargo: CargoMap = match parse("cargo", cargo_json) {
        Ok(cargo) => cargo,
        Err(e) => return e,
    };

    let result = if require_products {
        validate_new_cargo(&cargo)
    } else {
        validate_cargo(&cargo)
    };
    match result {
        Ok(()) => String::new(),
        Err((item, reason)) => format!("{}: {}", item, reason),
    }
}

/// Validate an item, delivery or process identifier
#[wasm_bindgen]
pub fn is_valid_identifier(value: &str) -> bool {
    validate_identifier(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIVERY: &str = r#"{
        "kind": "delivery",
        "id": "D1/R1",
        "from": { "company": "acme", "site": "S1" },
        "to": { "company": "beta", "site": "S2" }
    }"#;

    const CARGO: &str = r#"{ "widget-1": { "product": "widget", "quantity": "10" } }"#;

    #[test]
    fn test_preview_send_debits_source() {
        let plan: CargoPlan =
            serde_json::from_str(&preview_cargo(DELIVERY, CARGO, "", "send").unwrap()).unwrap();

        assert_eq!(plan.deltas.len(), 1);
        assert_eq!(plan.deltas[0].site, SiteRef::new("acme", "S1"));
        assert_eq!(plan.deltas[0].delta, rust_decimal::Decimal::from(-10));
    }

    #[test]
    fn test_preview_edit_refunds_reduction() {
        let deltas = r#"{ "widget-1": { "product": "widget", "quantity": "4" } }"#;
        let plan: CargoPlan =
            serde_json::from_str(&preview_cargo(DELIVERY, CARGO, deltas, "edit").unwrap()).unwrap();

        assert_eq!(plan.deltas[0].delta, rust_decimal::Decimal::from(6));
        assert_eq!(plan.cargo["widget-1"].quantity, rust_decimal::Decimal::from(4));
    }

    #[test]
    fn test_preview_rejects_unknown_activity() {
        assert!(preview_cargo(DELIVERY, CARGO, "", "teleport").is_err());
        assert!(preview_cargo(DELIVERY, CARGO, "", "start").is_err());
    }

    #[test]
    fn test_validate_cargo_json() {
        assert_eq!(validate_cargo_json(CARGO, true), "");
        let negative = r#"{ "a": { "product": "x", "quantity": "-1" } }"#;
        assert!(!validate_cargo_json(negative, false).is_empty());
        let unnamed = r#"{ "a": { "quantity": "1" } }"#;
        assert_eq!(validate_cargo_json(unnamed, false), "");
        assert!(!validate_cargo_json(unnamed, true).is_empty());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("widget-1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a/b"));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    const DELIVERY: &str = r#"{
        "kind": "delivery",
        "id": "D1",
        "from": { "company": "acme", "site": "S1" },
        "to": { "company": "acme", "site": "S2" }
    }"#;

    const CARGO: &str = r#"{ "widget-1": { "product": "widget", "quantity": "3" } }"#;

    #[wasm_bindgen_test]
    fn preview_object_lists_deltas() {
        let plan = preview_cargo_object(DELIVERY, CARGO, "", "receive").unwrap();
        let deltas = js_sys::Reflect::get(&plan, &JsValue::from_str("deltas")).unwrap();
        assert_eq!(js_sys::Array::from(&deltas).length(), 1);
    }

    #[wasm_bindgen_test]
    fn preview_rejects_malformed_entity() {
        assert!(preview_cargo_edit("{", CARGO, "", "send").is_err());
        assert!(preview_cargo_object(DELIVERY, "[]", "", "send").is_err());
    }
}
