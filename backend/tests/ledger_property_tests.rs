//! Ledger property tests
//!
//! Tests for ledger invariants including:
//! - Non-negativity of every on-hand quantity
//! - Audit completeness (one consistent entry per applied change)
//! - Delta-edit equivalence for in-flight cargo
//! - Conservation under full transfer

use chrono::Utc;
use inventory_ledger::ledger::{Actor, Ledger, OperationContext, SiteScope};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    CargoMap, CreateDeliveryInput, CreateItemInput, DeliveryKey, DeliveryStatus,
    EditDeliveryInput, EditItemInput, ItemKey, ProductQuantity, SiteRef,
};

const SITES: [&str; 2] = ["S1", "S2"];
const ITEMS: [&str; 3] = ["a", "b", "c"];

fn ctx() -> OperationContext {
    OperationContext::new(Actor::member("alice", "acme"), Utc::now())
}

fn scope() -> SiteScope {
    SiteScope::new()
        .with(SiteRef::new("acme", "S1"), true)
        .with(SiteRef::new("acme", "S2"), true)
}

fn stock(ledger: &mut Ledger, site: &str, item: &str, quantity: Decimal) {
    ledger
        .create_item(
            &ctx(),
            &scope(),
            CreateItemInput {
                company: None,
                site: site.into(),
                item_id: item.into(),
                product: "widget".into(),
                quantity,
                metadata: Default::default(),
                version: None,
                parent_action: None,
                parent_action_id: None,
                request_id: None,
                timestamp: None,
            },
        )
        .unwrap();
}

fn send(ledger: &mut Ledger, quantity: Decimal) -> Result<(), String> {
    let mut cargo = CargoMap::new();
    cargo.insert("a".into(), ProductQuantity::new("widget", quantity));
    ledger
        .create_delivery(
            &ctx(),
            &scope(),
            CreateDeliveryInput {
                delivery_id: "D1".into(),
                route: String::new(),
                from_company: "acme".into(),
                to_company: "acme".into(),
                from_site: "S1".into(),
                to_site: "S2".into(),
                start_time: None,
                end_time: None,
                shipper: None,
                driver: None,
                status: None,
                cargo,
                description: None,
                version: None,
                request_id: None,
                timestamp: None,
            },
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn edit_delivery(ledger: &mut Ledger, patch: EditDeliveryInput) {
    ledger
        .edit_delivery(&ctx(), &scope(), &DeliveryKey::new("D1", ""), patch)
        .unwrap();
}

fn deliver(ledger: &mut Ledger) {
    edit_delivery(
        ledger,
        EditDeliveryInput {
            status: Some(DeliveryStatus::Delivered),
            ..Default::default()
        },
    );
}

/// Snapshot of every on-hand quantity
fn quantities(ledger: &Ledger) -> Vec<(ItemKey, Decimal)> {
    ledger
        .items()
        .iter()
        .map(|item| (item.key(), item.quantity))
        .collect()
}

/// Apply a signed change to one item, creating it when it does not exist
fn adjust(ledger: &mut Ledger, site: &str, item: &str, delta: Decimal) -> bool {
    let key = ItemKey::new("acme", site, item);
    if ledger.get_item(&key).is_some() {
        let patch = EditItemInput {
            delta: Some(delta),
            ..Default::default()
        };
        ledger.edit_item(&ctx(), &key, patch).is_ok()
    } else if delta > Decimal::ZERO {
        stock(ledger, site, item, delta);
        true
    } else {
        false
    }
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=50).prop_map(Decimal::from)
}

fn change_strategy() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (
        0..SITES.len(),
        0..ITEMS.len(),
        (-20i64..=20).prop_map(Decimal::from),
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every quantity stays non-negative and failed changes have no effect
    #[test]
    fn prop_quantities_never_negative(
        changes in prop::collection::vec(change_strategy(), 1..40)
    ) {
        let mut ledger = Ledger::new();

        for (site, item, delta) in changes {
            let before = quantities(&ledger);
            let logged = ledger.audit().len();

            if !adjust(&mut ledger, SITES[site], ITEMS[item], delta) {
                prop_assert_eq!(quantities(&ledger), before);
                prop_assert_eq!(ledger.audit().len(), logged);
            }

            for item in ledger.items().iter() {
                prop_assert!(item.quantity > Decimal::ZERO);
            }
        }
    }

    /// The log replays to the current state, one consistent entry per change
    #[test]
    fn prop_audit_log_is_complete(
        changes in prop::collection::vec(change_strategy(), 1..40)
    ) {
        let mut ledger = Ledger::new();
        for (site, item, delta) in changes {
            adjust(&mut ledger, SITES[site], ITEMS[item], delta);
        }

        for entry in ledger.audit().entries() {
            prop_assert!(entry.is_consistent());
            prop_assert_ne!(entry.delta, Decimal::ZERO);
        }

        for site in SITES {
            for item in ITEMS {
                let replayed: Decimal = ledger
                    .audit()
                    .entries()
                    .iter()
                    .filter(|e| e.site == site && e.item == item)
                    .map(|e| e.delta)
                    .sum();
                let key = ItemKey::new("acme", site, item);
                prop_assert_eq!(replayed, ledger.quantity(&key));
            }
        }
    }

    /// Editing in-flight cargo ends where creating it that way would have
    #[test]
    fn prop_cargo_edit_matches_direct_creation(
        on_hand in 50i64..=100,
        original in quantity_strategy(),
        edited in quantity_strategy(),
    ) {
        let mut edited_ledger = Ledger::new();
        stock(&mut edited_ledger, "S1", "a", Decimal::from(on_hand));
        send(&mut edited_ledger, original).unwrap();
        let mut deltas = CargoMap::new();
        deltas.insert("a".into(), ProductQuantity::new("widget", edited));
        edit_delivery(
            &mut edited_ledger,
            EditDeliveryInput {
                cargo_deltas: deltas,
                ..Default::default()
            },
        );

        let mut direct_ledger = Ledger::new();
        stock(&mut direct_ledger, "S1", "a", Decimal::from(on_hand));
        send(&mut direct_ledger, edited).unwrap();

        prop_assert_eq!(quantities(&edited_ledger), quantities(&direct_ledger));

        deliver(&mut edited_ledger);
        deliver(&mut direct_ledger);
        prop_assert_eq!(quantities(&edited_ledger), quantities(&direct_ledger));
    }

    /// A delivered transfer moves exactly its cargo from source to destination
    #[test]
    fn prop_full_transfer_conserves_quantity(
        on_hand in quantity_strategy(),
        shipped in quantity_strategy(),
    ) {
        let mut ledger = Ledger::new();
        stock(&mut ledger, "S1", "a", on_hand);
        let source = ItemKey::new("acme", "S1", "a");
        let destination = ItemKey::new("acme", "S2", "a");

        match send(&mut ledger, shipped) {
            Ok(()) => {
                prop_assert!(shipped <= on_hand);
                deliver(&mut ledger);
                prop_assert_eq!(ledger.quantity(&source), on_hand - shipped);
                prop_assert_eq!(ledger.quantity(&destination), shipped);
            }
            Err(_) => {
                prop_assert!(shipped > on_hand);
                prop_assert_eq!(ledger.quantity(&source), on_hand);
                prop_assert!(ledger.get_delivery(&DeliveryKey::new("D1", "")).is_none());
            }
        }
    }
}
