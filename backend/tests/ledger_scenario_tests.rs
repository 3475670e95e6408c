//! Ledger scenario tests
//!
//! End-to-end flows through the engine:
//! - Send then deliver moves a whole item between sites
//! - Atomic processes debit inputs and credit outputs in one operation
//! - Rejected charges leave no state change and no log entry
//! - Terminal transitions fire their inventory effect exactly once

use chrono::Utc;
use inventory_ledger::ledger::{
    Actor, ErrorKind, Ledger, LedgerError, OperationContext, SiteScope,
};
use rust_decimal::Decimal;
use shared::{
    CargoMap, CreateDeliveryInput, CreateItemInput, CreateProcessInput, DeliveryKey,
    DeliveryStatus, EditDeliveryInput, EditItemInput, EditProcessInput, InventoryLogFilter,
    ItemKey, LogAction, ProcessKey, ProcessStatus, ProcessType, ProductQuantity, SiteRef,
};

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn ctx(company: &str) -> OperationContext {
    OperationContext::new(Actor::member("alice", company), Utc::now())
}

fn scope() -> SiteScope {
    SiteScope::new()
        .with(SiteRef::new("acme", "S1"), true)
        .with(SiteRef::new("acme", "S2"), true)
        .with(SiteRef::new("beta", "S3"), true)
        .with(SiteRef::new("beta", "YARD"), false)
}

fn cargo(lines: &[(&str, &str, i64)]) -> CargoMap {
    lines
        .iter()
        .map(|(item, product, qty)| (item.to_string(), ProductQuantity::new(*product, dec(*qty))))
        .collect()
}

fn create_item(ledger: &mut Ledger, site: &str, item_id: &str, quantity: i64) {
    ledger
        .create_item(
            &ctx("acme"),
            &scope(),
            CreateItemInput {
                company: None,
                site: site.into(),
                item_id: item_id.into(),
                product: "widget".into(),
                quantity: dec(quantity),
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

fn delivery(to_company: &str, to_site: &str, lines: CargoMap) -> CreateDeliveryInput {
    CreateDeliveryInput {
        delivery_id: "D1".into(),
        route: "R1".into(),
        from_company: "acme".into(),
        to_company: to_company.into(),
        from_site: "S1".into(),
        to_site: to_site.into(),
        start_time: None,
        end_time: None,
        shipper: Some("fastfreight".into()),
        driver: None,
        status: None,
        cargo: lines,
        description: None,
        version: None,
        request_id: None,
        timestamp: None,
    }
}

fn key(site: &str, item: &str) -> ItemKey {
    ItemKey::new("acme", site, item)
}

// ============================================================================
// Deliveries
// ============================================================================

#[test]
fn test_send_then_deliver_moves_item() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 5);

    let created = ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 5)])))
        .unwrap();
    assert_eq!(created.status, DeliveryStatus::Loading);
    // Source item reaches zero and is removed
    assert!(ledger.get_item(&key("S1", "widget-1")).is_none());

    let patch = EditDeliveryInput {
        status: Some(DeliveryStatus::Delivered),
        ..Default::default()
    };
    let delivered = ledger
        .edit_delivery(&ctx("acme"), &scope(), &DeliveryKey::new("D1", "R1"), patch)
        .unwrap();

    assert_eq!(delivered.status, DeliveryStatus::Delivered);
    assert!(delivered.end_time.is_some());
    assert_eq!(ledger.quantity(&key("S2", "widget-1")), dec(5));
}

#[test]
fn test_redelivery_is_rejected_without_effect() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 5);
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 5)])))
        .unwrap();

    let deliver = || EditDeliveryInput {
        status: Some(DeliveryStatus::Delivered),
        ..Default::default()
    };
    let key_d1 = DeliveryKey::new("D1", "R1");
    ledger.edit_delivery(&ctx("acme"), &scope(), &key_d1, deliver()).unwrap();
    let entries = ledger.audit().len();

    let err = ledger
        .edit_delivery(&ctx("acme"), &scope(), &key_d1, deliver())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    assert_eq!(ledger.quantity(&key("S2", "widget-1")), dec(5));
    assert_eq!(ledger.audit().len(), entries);
}

#[test]
fn test_cross_company_delivery_credits_receiver() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 8);
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("beta", "S3", cargo(&[("widget-1", "widget", 3)])))
        .unwrap();

    // Receiver marks it delivered
    let patch = EditDeliveryInput {
        status: Some(DeliveryStatus::Delivered),
        ..Default::default()
    };
    ledger
        .edit_delivery(&ctx("beta"), &scope(), &DeliveryKey::new("D1", "R1"), patch)
        .unwrap();

    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(5));
    assert_eq!(ledger.quantity(&ItemKey::new("beta", "S3", "widget-1")), dec(3));
}

#[test]
fn test_receive_from_untracked_supplier_only_credits() {
    let mut ledger = Ledger::new();
    let input = CreateDeliveryInput {
        from_company: "beta".into(),
        from_site: "YARD".into(),
        to_company: "acme".into(),
        to_site: "S1".into(),
        ..delivery("acme", "S1", cargo(&[("crate-9", "crate", 12)]))
    };

    let created = ledger.create_delivery(&ctx("acme"), &scope(), input).unwrap();

    assert_eq!(created.status, DeliveryStatus::Delivered);
    assert_eq!(ledger.quantity(&key("S1", "crate-9")), dec(12));
    assert_eq!(ledger.audit().len(), 1);
}

#[test]
fn test_cancel_refunds_edited_cargo() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 10);
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 10)])))
        .unwrap();

    let key_d1 = DeliveryKey::new("D1", "R1");
    let patch = EditDeliveryInput {
        cargo_deltas: cargo(&[("widget-1", "widget", 4)]),
        ..Default::default()
    };
    ledger.edit_delivery(&ctx("acme"), &scope(), &key_d1, patch).unwrap();
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(6));

    let cancelled = ledger.cancel_delivery(&ctx("acme"), &scope(), &key_d1).unwrap();
    assert_eq!(cancelled.status, DeliveryStatus::Cancelled);
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(10));

    let err = ledger.cancel_delivery(&ctx("acme"), &scope(), &key_d1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
}

#[test]
fn test_shipped_cargo_edit_settles_at_source() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 10);
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 4)])))
        .unwrap();

    let key_d1 = DeliveryKey::new("D1", "R1");
    let ship = EditDeliveryInput {
        status: Some(DeliveryStatus::Shipped),
        ..Default::default()
    };
    ledger.edit_delivery(&ctx("acme"), &scope(), &key_d1, ship).unwrap();
    let before = ledger.audit().len();

    // Two more units loaded after departure
    let patch = EditDeliveryInput {
        cargo_deltas: cargo(&[("widget-1", "widget", 6)]),
        ..Default::default()
    };
    let edited = ledger.edit_delivery(&ctx("acme"), &scope(), &key_d1, patch).unwrap();

    assert_eq!(edited.status, DeliveryStatus::Shipped);
    assert_eq!(edited.cargo["widget-1"].quantity, dec(6));
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(4));
    assert_eq!(ledger.quantity(&key("S2", "widget-1")), Decimal::ZERO);
    assert_eq!(ledger.audit().len(), before + 1);

    let deliver = EditDeliveryInput {
        status: Some(DeliveryStatus::Delivered),
        ..Default::default()
    };
    ledger.edit_delivery(&ctx("acme"), &scope(), &key_d1, deliver).unwrap();
    assert_eq!(ledger.quantity(&key("S2", "widget-1")), dec(6));
}

#[test]
fn test_duplicate_delivery_conflicts() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 10);
    let input = delivery("acme", "S2", cargo(&[("widget-1", "widget", 2)]));
    ledger.create_delivery(&ctx("acme"), &scope(), input.clone()).unwrap();

    let err = ledger.create_delivery(&ctx("acme"), &scope(), input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(8));
}

#[test]
fn test_unknown_destination_is_not_found() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 10);

    let err = ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "NOWHERE", cargo(&[("widget-1", "widget", 2)])))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(10));
}

// ============================================================================
// Processes
// ============================================================================

#[test]
fn test_split_process_is_one_operation() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "raw", 10);
    let before = ledger.audit().len();

    let process = ledger
        .create_process(
            &ctx("acme"),
            &scope(),
            CreateProcessInput {
                company: None,
                process_id: "P1".into(),
                process_type: ProcessType::Split,
                site: "S1".into(),
                machine: None,
                start_time: None,
                end_time: None,
                status: None,
                inputs: cargo(&[("raw", "widget", 10)]),
                outputs: cargo(&[("partA", "half", 4), ("partB", "half", 6)]),
                description: None,
                version: None,
                request_id: None,
                timestamp: None,
            },
        )
        .unwrap();

    assert_eq!(process.status, ProcessStatus::Processed);
    assert!(ledger.get_item(&key("S1", "raw")).is_none());
    assert_eq!(ledger.quantity(&key("S1", "partA")), dec(4));
    assert_eq!(ledger.quantity(&key("S1", "partB")), dec(6));
    assert_eq!(ledger.audit().len(), before + 3);
}

#[test]
fn test_processed_process_rejects_whole_patch() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "raw", 10);
    ledger
        .create_process(
            &ctx("acme"),
            &scope(),
            CreateProcessInput {
                company: None,
                process_id: "P1".into(),
                process_type: ProcessType::Split,
                site: "S1".into(),
                machine: None,
                start_time: None,
                end_time: None,
                status: None,
                inputs: cargo(&[("raw", "widget", 6)]),
                outputs: cargo(&[("partA", "half", 6)]),
                description: None,
                version: None,
                request_id: None,
                timestamp: None,
            },
        )
        .unwrap();
    let before = ledger.audit().len();

    let patch = EditProcessInput {
        machine: Some("press-2".into()),
        description: Some("rerun".into()),
        status: Some(ProcessStatus::Processed),
        input_deltas: cargo(&[("raw", "widget", 8)]),
        output_deltas: cargo(&[("partA", "half", 8)]),
        ..Default::default()
    };
    let err = ledger
        .edit_process(&ctx("acme"), &scope(), &ProcessKey::new("acme", "P1"), patch)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    assert_eq!(ledger.quantity(&key("S1", "raw")), dec(4));
    assert_eq!(ledger.quantity(&key("S1", "partA")), dec(6));
    assert_eq!(ledger.audit().len(), before);

    let process = ledger.get_process(&ProcessKey::new("acme", "P1")).unwrap();
    assert_eq!(process.status, ProcessStatus::Processed);
    assert!(process.machine.is_none());
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_overdraw_has_no_effect() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 3);
    let before = ledger.audit().len();

    let err = ledger
        .edit_item(
            &ctx("acme"),
            &key("S1", "widget-1"),
            EditItemInput {
                delta: Some(dec(-5)),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientInventory { .. }));
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(3));
    assert_eq!(ledger.audit().len(), before);
}

#[test]
fn test_credit_past_quantity_limit_has_no_effect() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 5);
    ledger
        .create_item(
            &ctx("acme"),
            &scope(),
            CreateItemInput {
                company: None,
                site: "S2".into(),
                item_id: "widget-1".into(),
                product: "widget".into(),
                quantity: Decimal::MAX,
                metadata: Default::default(),
                version: None,
                parent_action: None,
                parent_action_id: None,
                request_id: None,
                timestamp: None,
            },
        )
        .unwrap();
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 5)])))
        .unwrap();
    let before = ledger.audit().len();

    let key_d1 = DeliveryKey::new("D1", "R1");
    let patch = EditDeliveryInput {
        status: Some(DeliveryStatus::Delivered),
        ..Default::default()
    };
    let err = ledger
        .edit_delivery(&ctx("acme"), &scope(), &key_d1, patch)
        .unwrap_err();

    assert!(matches!(err, LedgerError::QuantityOverflow { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(ledger.quantity(&key("S2", "widget-1")), Decimal::MAX);
    assert_eq!(ledger.get_delivery(&key_d1).unwrap().status, DeliveryStatus::Loading);
    assert_eq!(ledger.audit().len(), before);
}

#[test]
fn test_delta_past_quantity_limit_has_no_effect() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 3);
    let before = ledger.audit().len();

    let err = ledger
        .edit_item(
            &ctx("acme"),
            &key("S1", "widget-1"),
            EditItemInput {
                delta: Some(Decimal::MAX),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(ledger.quantity(&key("S1", "widget-1")), dec(3));
    assert_eq!(ledger.audit().len(), before);
}

#[test]
fn test_partial_cargo_failure_rolls_back_every_line() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "a", 5);
    create_item(&mut ledger, "S1", "b", 1);
    let before = ledger.audit().len();

    let err = ledger
        .create_delivery(
            &ctx("acme"),
            &scope(),
            delivery("acme", "S2", cargo(&[("a", "widget", 5), ("b", "widget", 2)])),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientInventory);
    assert_eq!(ledger.quantity(&key("S1", "a")), dec(5));
    assert_eq!(ledger.quantity(&key("S1", "b")), dec(1));
    assert_eq!(ledger.audit().len(), before);
    assert!(ledger.get_delivery(&DeliveryKey::new("D1", "R1")).is_none());
}

// ============================================================================
// Audit log
// ============================================================================

#[test]
fn test_log_links_entries_to_delivery() {
    let mut ledger = Ledger::new();
    create_item(&mut ledger, "S1", "widget-1", 5);
    ledger
        .create_delivery(&ctx("acme"), &scope(), delivery("acme", "S2", cargo(&[("widget-1", "widget", 2)])))
        .unwrap();

    let filter = InventoryLogFilter {
        parent_action_id: Some("D1/R1".into()),
        ..Default::default()
    };
    let entries = ledger.audit().query(&filter);

    assert_eq!(entries.len(), 1);
    let entry = entries[0];
    assert_eq!(entry.action, LogAction::EditItem);
    assert_eq!(entry.parent_action, "newdelivery");
    assert_eq!(entry.old_quantity, dec(5));
    assert_eq!(entry.new_quantity, dec(3));
    assert!(entry.is_consistent());

    let sequences: Vec<u64> = ledger.audit().entries().iter().map(|e| e.sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}
