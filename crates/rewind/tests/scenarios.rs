//! End-to-end scenarios: product histories turned into change events and
//! replayed onto live entities.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rewind::prelude::*;
use uuid::Uuid;

// -- test entity types ------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Supplier {
    name: String,
    lead_days: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Product {
    id: Uuid,
    name: String,
    available: i32,
    in_stock: i32,
    price: f64,
    supplier: Option<Supplier>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct ProductPriceChange {
    id: String,
    price: f64,
    change_date: DateTime<Utc>,
}

impl Reflect for Supplier {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("name", |s| &s.name, |s| &mut s.name)
            .field("lead_days", |s| &s.lead_days, |s| &mut s.lead_days);
    }
}

impl Reflect for Product {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("id", |p| &p.id, |p| &mut p.id)
            .field("name", |p| &p.name, |p| &mut p.name)
            .field("available", |p| &p.available, |p| &mut p.available)
            .field("in_stock", |p| &p.in_stock, |p| &mut p.in_stock)
            .field("price", |p| &p.price, |p| &mut p.price)
            .optional("supplier", |p| p.supplier.as_ref(), |p| p.supplier.as_mut());
    }
}

// -- fixtures ---------------------------------------------------------------

fn product(tag: &str) -> Product {
    let (available, in_stock) = match tag {
        "0" => (10, 10),
        "1" => (12, 12),
        _ => (10, 10),
    };
    Product {
        id: Uuid::new_v4(),
        name: format!("product-{tag}"),
        available,
        in_stock,
        price: 1.0,
        supplier: None,
    }
}

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 1, 1, 9, 0, 0)
        .single()
        .map(|start| start + Duration::days(n))
        .expect("valid base date")
}

/// Price history for `id`, newest first (as read from a descending index).
fn price_changes(id: &str) -> Vec<ProductPriceChange> {
    [(4, 1.35), (3, 1.2), (2, 0.95), (1, 1.0)]
        .into_iter()
        .map(|(d, price)| ProductPriceChange {
            id: id.to_owned(),
            price,
            change_date: day(d),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn unordered_history_yields_one_change_per_item() {
    let mut target = product("0");
    assert_eq!(target.available, 10);

    let changes = vec![product("1"), product("2")];

    let field = resolve_by_name::<Product, i32>(&Product::schema(), "available").unwrap();
    let actual: Vec<_> =
        to_change_events(&field, 15, changes.iter(), |p| p.id, |p| p.in_stock).collect();

    assert_eq!(actual.len(), changes.len());
    let first = &actual[0];
    let last = &actual[actual.len() - 1];
    assert_eq!(*first.key(), changes[0].id);

    first.revert(&mut target).unwrap();
    assert_eq!(target.available, 15);

    last.apply(&mut target).unwrap();
    assert_eq!(target.available, 10);
}

#[test]
fn ordered_history_recovers_chronological_timeline() {
    let mut target = product("0");
    assert!((target.price - 1.0).abs() < 1e-6);

    let changes = price_changes("P1");
    let actual: Vec<_> = to_ordered_change_events(
        &selector!(Product, price),
        0.8,
        changes.clone(),
        |c| c.id.clone(),
        |c| c.price,
        |c| c.change_date,
    )
    .collect();

    assert_eq!(actual.len(), changes.len());
    let first = &actual[0];
    let last = &actual[actual.len() - 1];
    assert_eq!(*first.timestamp(), day(1));
    assert_eq!(*last.timestamp(), day(4));

    first.revert(&mut target).unwrap();
    assert!((target.price - 0.8).abs() < 1e-6);

    // The chronologically last price, not the first one in arrival order.
    let newest = changes
        .iter()
        .max_by_key(|c| c.change_date)
        .map(|c| c.price)
        .unwrap();
    last.apply(&mut target).unwrap();
    assert!((target.price - newest).abs() < 1e-6);
}

#[test]
fn arrival_order_variant_keeps_reverse_chronology() {
    // Fed the same newest-first history, the arrival-order factory chains in
    // that order: its last record ends on the *oldest* price.
    let changes = price_changes("P1");
    let actual: Vec<_> = to_change_events(
        &selector!(Product, price),
        0.8,
        changes,
        |c| c.id.clone(),
        |c| c.price,
    )
    .collect();
    assert_eq!(*actual[0].new_value(), 1.35);
    assert_eq!(*actual[3].new_value(), 1.0);
}

#[test]
fn persisted_entries_replay_by_field_name() -> anyhow::Result<()> {
    let schema = Product::schema();
    let factory = ChangeFactory::<Product, f64>::by_selector("x => x.price")?;
    let timeline: Vec<_> = factory
        .ordered_changes(
            1.0,
            price_changes("P1"),
            |c| c.id.clone(),
            |c| c.price,
            |c| c.change_date,
        )
        .collect();

    let entries = timeline
        .iter()
        .map(|c| c.to_entry())
        .collect::<Result<Vec<_>, _>>()?;
    let stored = serde_json::to_string(&entries)?;
    let loaded: Vec<ChangeEntry> = serde_json::from_str(&stored)?;
    assert_eq!(loaded, entries);
    assert_eq!(
        loaded[0].timestamp,
        Some(serde_json::to_value(day(1))?)
    );

    let mut target = product("0");
    for entry in &loaded {
        entry.apply_with(&schema, &mut target)?;
    }
    assert!((target.price - 1.35).abs() < 1e-6);
    for entry in loaded.iter().rev() {
        entry.revert_with(&schema, &mut target)?;
    }
    assert!((target.price - 1.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn nested_field_changes_require_present_intermediate() -> anyhow::Result<()> {
    let factory = ChangeFactory::<Product, u32>::by_selector("p => p.supplier.lead_days")?;
    let log: ChangeLog<_> = factory
        .changes(5, vec![7u32, 3], |_| "P1", |d| *d)
        .collect();

    let mut without = product("0");
    let err = log.replay(&mut without).unwrap_err();
    assert!(matches!(err, ReflectError::NullIntermediate { .. }));
    assert!(without.supplier.is_none());

    let mut with = product("0");
    with.supplier = Some(Supplier {
        name: "acme".to_owned(),
        lead_days: 5,
    });
    assert_eq!(log.replay(&mut with)?, 2);
    assert_eq!(with.supplier.as_ref().map(|s| s.lead_days), Some(3));
    log.rewind(&mut with)?;
    assert_eq!(with.supplier.as_ref().map(|s| s.lead_days), Some(5));
    Ok(())
}

#[test]
fn changes_for_one_key_leave_other_entities_alone() {
    let mut a = product("0");
    let mut b = product("0");
    let (ka, kb) = (a.id, b.id);

    let history = vec![(ka, 3), (kb, 4), (ka, 6)];
    let log: ChangeLog<_> = to_change_events(
        &selector!(Product, available),
        10,
        history,
        |o| o.0,
        |o| o.1,
    )
    .collect();

    assert_eq!(log.replay_for(&ka, &mut a).unwrap(), 2);
    assert_eq!(log.replay_for(&kb, &mut b).unwrap(), 1);
    assert_eq!(a.available, 6);
    assert_eq!(b.available, 4);
}

#[test]
fn comparison_selector_never_yields_an_accessor() {
    let err = ChangeFactory::<Product, bool>::by_selector("x => x.available == 2").unwrap_err();
    assert!(matches!(err, ReflectError::InvalidPath { .. }));
    assert!(err.to_string().contains("comparison"));
}

#[test]
fn mismatched_value_type_is_not_coerced() {
    let err = ChangeFactory::<Product, i64>::by_name("available").unwrap_err();
    assert!(matches!(err, ReflectError::TypeMismatch { .. }));
}
