//! # Seed Data Generator
//!
//! Populates the database with a demo workshop: clients, a garment catalog
//! and entries in every stage of fulfilment.
//!
//! ## Usage
//! ```bash
//! # 40 entries (default)
//! cargo run -p atelier-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p atelier-db --bin seed -- --entries 200 --db ./data/atelier.db
//! ```
//!
//! ## Generated Data
//! - Three clients, one of them the special client (small-quantity surcharge)
//! - Products per garment family, two of them still unpriced
//! - Entries rotated through: untouched, partially delivered, fully
//!   delivered
//!
//! No documents are generated; invoicing is left to the workbench.

use chrono::{Duration, NaiveDate};
use std::env;

use atelier_core::delivery::{DeliveryInput, DeliveryItemInput};
use atelier_core::entry::{EntryItemInput, NewEntry};
use atelier_core::{Client, Money, Product, SizeQuantities, DEFAULT_SPECIAL_CLIENT_NAME};
use atelier_db::{Database, DbConfig, ReconcilerConfig};

const CLIENTS: &[(&str, &str, &str)] = &[
    ("client-austral", DEFAULT_SPECIAL_CLIENT_NAME, "A11111111"),
    ("client-norte", "Textiles Norte S.L.", "B22222222"),
    ("client-club", "Club Deportivo Sur", "G33333333"),
];

/// (reference, model, category, price in cents)
const PRODUCTS: &[(&str, &str, &str, i64)] = &[
    ("POL-001", "Polo Classic", "Polos", 500),
    ("POL-002", "Polo Piqué", "Polos", 650),
    ("CAM-010", "Camiseta Técnica", "Camisetas", 420),
    ("CAM-011", "Camiseta Algodón", "Camisetas", 380),
    ("SUD-100", "Sudadera Capucha", "Sudaderas", 1450),
    ("CHQ-200", "Chaqueta Softshell", "Chaquetas", 2890),
    ("PAN-300", "Pantalón Chándal", "Pantalones", 1120),
    ("GOR-400", "Gorra Bordada", "Accesorios", 310),
    ("CAM-NEW", "Camiseta Prototipo", "Camisetas", 0),
    ("SUD-NEW", "Sudadera Prototipo", "Sudaderas", 0),
];

const SIZES: &[&str] = &["XS", "S", "M", "L", "XL"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./atelier_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--entries" | "-e" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
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
                println!("Atelier Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -e, --entries <N>  Number of entries to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./atelier_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Atelier Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Entries:  {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.products().count().await? > 0 {
        println!("⚠ Database already has a catalog");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (id, name, vat) in CLIENTS {
        db.clients()
            .insert(&Client {
                id: id.to_string(),
                name: name.to_string(),
                address: "Polígono Industrial, Nave 4".to_string(),
                email: format!("{}@example.com", id),
                phone: String::new(),
                vat_number: vat.to_string(),
            })
            .await?;
    }
    println!("✓ {} clients", CLIENTS.len());

    for (index, (reference, model, category, cents)) in PRODUCTS.iter().enumerate() {
        db.products()
            .insert(&Product {
                id: format!("product-{:02}", index + 1),
                code: format!("{:04}", index + 1),
                reference: reference.to_string(),
                model_name: model.to_string(),
                price: Money::from_cents(*cents),
                category: category.to_string(),
                description: String::new(),
                client_id: None,
            })
            .await?;
    }
    println!("✓ {} products ({} needing price)", PRODUCTS.len(), db.products().list_needing_price().await?.len());

    println!();
    println!("Generating entries...");

    let reconciler = db.reconciler(ReconcilerConfig::default());
    let start = std::time::Instant::now();
    let first_day = NaiveDate::from_ymd_opt(2024, 1, 8).ok_or("invalid start date")?;
    let mut deliveries = 0;

    for seed in 0..count {
        let (client_id, _, _) = CLIENTS[seed % CLIENTS.len()];
        let input = NewEntry {
            date: first_day + Duration::days((seed / 2) as i64),
            client_id: client_id.to_string(),
            items: (0..1 + seed % 3).map(|line| item_for(seed, line)).collect(),
        };

        let created = match reconciler.create_entry(&input, "Seed").await {
            Ok(created) => created,
            Err(e) => {
                eprintln!("Failed to create entry {}: {}", seed, e);
                continue;
            }
        };

        // 0: untouched, 1: half delivered, 2: fully delivered
        let stage = seed % 3;
        if stage == 0 {
            continue;
        }

        let delivery = DeliveryInput {
            entry_id: created.id.clone(),
            delivery_date: None,
            who_delivered: "Seed".to_string(),
            items: created
                .items
                .iter()
                .map(|item| DeliveryItemInput {
                    entry_item_id: item.id.clone(),
                    size_quantities: item
                        .size_quantities
                        .iter()
                        .map(|(size, qty)| (size, if stage == 1 { qty / 2 } else { qty }))
                        .collect(),
                })
                .collect(),
        };

        match reconciler.record_delivery(&delivery).await {
            Ok(_) => deliveries += 1,
            Err(e) => eprintln!("Failed to deliver entry {}: {}", created.code, e),
        }

        if (seed + 1) % 50 == 0 {
            println!("  Generated {} entries...", seed + 1);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} entries and {} deliveries in {:?}", db.entries().count().await?, deliveries, elapsed);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// One entry line with quantities spread over a few sizes.
fn item_for(seed: usize, line: usize) -> EntryItemInput {
    let (reference, _, _, _) = PRODUCTS[(seed * 3 + line) % PRODUCTS.len()];
    let sizes: SizeQuantities = SIZES
        .iter()
        .enumerate()
        .skip((seed + line) % 2)
        .step_by(1 + line)
        .map(|(offset, size)| (*size, 2 + ((seed + offset * 7) % 14) as i64))
        .collect();

    EntryItemInput {
        id: None,
        product_id: String::new(),
        product_ref: reference.to_string(),
        description: String::new(),
        size_quantities: sizes,
        optional_ref1: None,
        optional_ref2: None,
        image_url: None,
    }
}
