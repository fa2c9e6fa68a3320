//! Price history demo -- rebuild a product's price timeline from a change feed,
//! step through it, and persist it as JSON.
//!
//! Run with:
//!   cargo run --example price_history -p rewind
//!
//! Set `RUST_LOG=debug` to see factory and resolution events.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rewind::prelude::*;
use tracing::info;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Stock {
    on_hand: i32,
    reserved: i32,
}

#[derive(Debug, Clone)]
struct Product {
    id: Uuid,
    name: String,
    price: f64,
    stock: Stock,
}

impl Reflect for Stock {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("on_hand", |s| &s.on_hand, |s| &mut s.on_hand)
            .field("reserved", |s| &s.reserved, |s| &mut s.reserved);
    }
}

impl Reflect for Product {
    fn describe(fields: &mut SchemaBuilder<Self>) {
        fields
            .field("id", |p| &p.id, |p| &mut p.id)
            .field("name", |p| &p.name, |p| &mut p.name)
            .field("price", |p| &p.price, |p| &mut p.price)
            .nested("stock", |p| &p.stock, |p| &mut p.stock);
    }
}

/// One row of an upstream price feed.
#[derive(Debug, Clone)]
struct PriceQuote {
    product: Uuid,
    price: f64,
    quoted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

fn feed(product: Uuid) -> anyhow::Result<Vec<PriceQuote>> {
    let start = Utc
        .with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid feed start"))?;
    // Quotes arrive out of order, as they would from several upstream sources.
    Ok([(3, 12.5), (0, 9.99), (5, 11.0), (1, 10.49), (2, 12.0)]
        .into_iter()
        .map(|(days, price)| PriceQuote {
            product,
            price,
            quoted_at: start + Duration::days(days),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut product = Product {
        id: Uuid::new_v4(),
        name: "espresso beans".to_owned(),
        price: 9.5,
        stock: Stock {
            on_hand: 40,
            reserved: 0,
        },
    };

    // Time-ordered price timeline starting from the catalogue price.
    let prices = ChangeFactory::<Product, f64>::by_name("price")?;
    let timeline: ChangeLog<_> = prices
        .ordered_changes(
            product.price,
            feed(product.id)?,
            |q| q.product,
            |q| q.price,
            |q| q.quoted_at,
        )
        .collect();

    for change in &timeline {
        change.apply(&mut product)?;
        println!(
            "{}  {:>6.2} -> {:>6.2}  ({})",
            change.timestamp().format("%Y-%m-%d"),
            change.old_value(),
            change.new_value(),
            product.name,
        );
    }
    info!(changes = timeline.len(), price = product.price, "timeline replayed");

    let restored = timeline.rewind(&mut product)?;
    println!("rewound {restored} changes, price back to {:.2}", product.price);

    // Stock movements addressed through a nested selector, skipping no-ops.
    let on_hand = ChangeFactory::<Product, i32>::by_selector("p => p.stock.on_hand")?
        .with_config(FactoryConfig {
            skip_unchanged: true,
        });
    let movements: ChangeLog<_> = on_hand
        .changes(product.stock.on_hand, [40, 35, 35, 52], |_| product.id, |n| *n)
        .collect();
    movements.replay(&mut product)?;
    println!(
        "{} stock movements recorded, on hand now {}",
        movements.len(),
        product.stock.on_hand
    );

    // Persist the price timeline and replay it by field name.
    let entries = timeline
        .iter()
        .map(|c| c.to_entry())
        .collect::<Result<Vec<_>, _>>()?;
    let json = serde_json::to_string_pretty(&entries)?;
    println!("{json}");

    let schema = Product::schema();
    let stored: Vec<ChangeEntry> = serde_json::from_str(&json)?;
    for entry in &stored {
        entry.apply_with(&schema, &mut product)?;
    }
    println!(
        "replayed {} stored entries, price now {}",
        stored.len(),
        schema.get_json(&product, "price")?
    );

    Ok(())
}
