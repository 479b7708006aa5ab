//! # Seed Data Generator
//!
//! Populates a development database with a demo owner and stocked products.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products for owner "demo" (default)
//! cargo run -p billbook-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p billbook-db --bin seed -- --count 2000
//!
//! # Specify database path and owner
//! cargo run -p billbook-db --bin seed -- --db ./data/billbook.db --owner shop-42
//! ```
//!
//! ## Generated Data
//! - One owner with a GST-registered profile
//! - Products across grocery categories, each with an opening stock entry
//! - One bulk import that tops up every tenth product
//!
//! Each product has:
//! - SKU from the `PRD-NNNN` sequence
//! - Name built from item and pack size
//! - Price: ₹10.00 - ₹499.00 plus a pack-size addon
//! - Stock: 0 - 100
//! - GST slab: 0%, 5%, 12%, 18% or 28%

use std::env;

use billbook_core::{Money, NewProduct, OwnerProfile, StockImportRow, TaxRate, STANDARD_GST_SLABS_BPS};
use billbook_db::{Database, DbConfig};

/// Item names per category for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Staples",
        &[
            "Basmati Rice",
            "Sona Masoori Rice",
            "Whole Wheat Atta",
            "Maida",
            "Besan",
            "Sugar",
            "Jaggery",
            "Rock Salt",
        ],
    ),
    (
        "Pulses",
        &["Toor Dal", "Moong Dal", "Chana Dal", "Urad Dal", "Masoor Dal", "Rajma", "Kabuli Chana"],
    ),
    (
        "Oils",
        &["Sunflower Oil", "Groundnut Oil", "Mustard Oil", "Coconut Oil", "Ghee"],
    ),
    (
        "Spices",
        &[
            "Turmeric Powder",
            "Red Chilli Powder",
            "Coriander Powder",
            "Garam Masala",
            "Cumin Seeds",
            "Mustard Seeds",
            "Black Pepper",
        ],
    ),
    (
        "Beverages",
        &["Assam Tea", "Filter Coffee", "Green Tea", "Health Drink", "Mango Drink"],
    ),
    (
        "Personal Care",
        &["Bath Soap", "Shampoo", "Toothpaste", "Hair Oil", "Face Wash"],
    ),
];

/// Pack sizes with a price addon in paise
const SIZES: &[(&str, i64)] = &[
    ("100g", 0),
    ("250g", 2_000),
    ("500g", 4_500),
    ("1kg", 8_000),
    ("5kg", 35_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./billbook_dev.db");
    let mut owner_id = String::from("demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--owner" | "-o" => {
                if i + 1 < args.len() {
                    owner_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Billbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>     Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>     Database file path (default: ./billbook_dev.db)");
                println!("  -o, --owner <ID>    Owner id to seed (default: demo)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Billbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Owner:    {}", owner_id);
    println!("Products: {}", count);
    println!();

    // Connect to database
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.owners().get(&owner_id).await?.is_none() {
        db.owners()
            .register(
                &owner_id,
                OwnerProfile {
                    business_name: "Sharma General Stores".to_string(),
                    gstin: Some("29ABCDE1234F1Z5".to_string()),
                    address: Some("12 MG Road, Bengaluru".to_string()),
                    state: Some("Karnataka".to_string()),
                    state_code: Some("29".to_string()),
                },
            )
            .await?;
        println!("✓ Registered owner {}", owner_id);
    }

    // Check existing products
    let existing = db.products().count(&owner_id).await?;
    if existing > 0 {
        println!("⚠ Owner already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate products
    println!();
    println!("Generating products...");

    let mut generated = 0;
    let mut top_ups = Vec::new();
    let start = std::time::Instant::now();

    'outer: for (category, items) in CATEGORIES {
        for item in items.iter() {
            for (size, price_addon) in SIZES {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category, item, size, *price_addon, generated + 1);
                let sku = product.sku.clone();

                if let Err(e) = db.products().create(&owner_id, "seed", product).await {
                    eprintln!("Failed to insert {}: {}", sku, e);
                    continue;
                }

                generated += 1;
                if generated % 10 == 0 {
                    top_ups.push(StockImportRow {
                        sku,
                        name: None,
                        quantity: 25,
                    });
                }

                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    // Exercise the bulk import path
    println!();
    println!("Importing stock top-ups...");
    let summary = db.inventory().import_stock(&owner_id, &top_ups, "seed").await?;
    println!(
        "  Import: {} updated, {} created, {} skipped",
        summary.updated, summary.created, summary.skipped
    );

    // Verify
    println!();
    println!("Verifying...");
    let search_results = db.products().search(&owner_id, "dal", 10).await?;
    println!("  Search 'dal': {} results", search_results.len());

    let low = db.products().low_stock(&owner_id).await?;
    println!("  Low stock: {} products", low.len());

    let mismatches = db.ledger().verify_all(&owner_id).await?;
    println!("  Ledger mismatches: {}", mismatches.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(category: &str, item: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    let sku = format!("PRD-{:04}", seed);

    // Base price ₹10.00 - ₹499.00 + size addon
    let base_price = 1_000 + ((seed * 1_733) % 48_900) as i64;
    let price = Money::from_cents(base_price + price_addon);

    let tax_rate = TaxRate::from_bps(STANDARD_GST_SLABS_BPS[seed % STANDARD_GST_SLABS_BPS.len()]);

    // Stock 0 - 100
    let stock = (seed * 37 % 101) as i64;

    NewProduct::new(sku, format!("{} {}", item, size), price)
        .with_category(category)
        .with_tax_rate(tax_rate)
        .with_opening_stock(stock)
}
