//! # Seed Data Generator
//!
//! Populates the database with products, stock batches and doctors for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p pharmos-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p pharmos-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p pharmos-db --bin seed -- --db ./data/pharmos.db
//! ```
//!
//! ## Generated Data
//! - Products: `{name} {strength}` across common formulary items
//! - 1 to 3 batches per product, each with its own lot, price and expiry
//! - A handful of prescribing doctors

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use pharmos_db::{Database, DbConfig, NewBatch};
use std::env;

/// Formulary items with their manufacturer.
const PRODUCTS: &[(&str, &str)] = &[
    ("Paracetamol", "Cipla"),
    ("Ibuprofen", "Abbott"),
    ("Amoxicillin", "Sun Pharma"),
    ("Azithromycin", "Pfizer"),
    ("Cetirizine", "Dr. Reddy's"),
    ("Metformin", "Lupin"),
    ("Amlodipine", "Torrent"),
    ("Atorvastatin", "Ranbaxy"),
    ("Omeprazole", "Zydus"),
    ("Pantoprazole", "Alkem"),
    ("Losartan", "Glenmark"),
    ("Montelukast", "Cipla"),
    ("Salbutamol", "GSK"),
    ("Levothyroxine", "Abbott"),
    ("Ciprofloxacin", "Bayer"),
    ("Doxycycline", "Mankind"),
    ("Diclofenac", "Novartis"),
    ("Ranitidine", "Intas"),
    ("Vitamin D3", "Mankind"),
    ("Folic Acid", "Sun Pharma"),
];

/// Strength variants with a price add-on in cents.
const STRENGTHS: &[(&str, i64)] = &[
    ("50mg", 0),
    ("100mg", 150),
    ("250mg", 300),
    ("500mg", 550),
    ("5ml Syrup", 400),
    ("10ml Syrup", 700),
];

const DOCTORS: &[(&str, &str)] = &[
    ("Dr. Meera Iyer", "Pediatrics"),
    ("Dr. Farah Khan", "General Medicine"),
    ("Dr. Arjun Nair", "Cardiology"),
    ("Dr. Sana Qureshi", "Dermatology"),
    ("Dr. Vikram Rao", "ENT"),
];

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./pharmos_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharmos Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./pharmos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Pharmos Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Adding doctors...");
    for (name, specialization) in DOCTORS {
        let doctor = db.doctors().insert(name, Some(specialization), None).await?;
        println!("  {} ({})  id={}", doctor.name, specialization, doctor.id);
    }

    println!();
    println!("Generating products and batches...");

    let start = std::time::Instant::now();
    let ledger = db.ledger();
    let today = Utc::now().date_naive();
    let mut products = 0;
    let mut batches = 0;

    'outer: for (product_idx, (name, manufacturer)) in PRODUCTS.iter().enumerate() {
        for (strength_idx, (strength, price_addon)) in STRENGTHS.iter().enumerate() {
            if products >= count {
                break 'outer;
            }

            let seed = product_idx * 100 + strength_idx;
            let product = db
                .products()
                .insert(&format!("{} {}", name, strength), Some(manufacturer))
                .await?;
            products += 1;

            // 1 to 3 lots per product
            for lot in 0..(1 + seed % 3) {
                let price_cents = 199 + ((seed * 37) % 1800) as i64 + price_addon;
                let cost_pct = 55 + (seed % 25) as i64;

                let new_batch = NewBatch {
                    product_id: product.id.clone(),
                    lot_number: format!(
                        "{}{:04}-{}",
                        &name[..3].to_uppercase(),
                        seed,
                        lot + 1
                    ),
                    quantity: ((seed * 13 + lot * 29) % 150) as i64,
                    unit_cost_cents: price_cents * cost_pct / 100,
                    unit_price_cents: price_cents,
                    expiry_date: Some(today + Duration::days(90 + ((seed + lot) % 700) as i64)),
                };

                if let Err(e) = ledger.insert_batch(new_batch).await {
                    eprintln!("Failed to insert batch for {}: {}", product.name, e);
                    continue;
                }
                batches += 1;
            }

            if products % 50 == 0 {
                println!("  Generated {} products...", products);
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} batches in {:?}",
        products, batches, elapsed
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
