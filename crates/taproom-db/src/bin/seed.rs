//! # Seed Data
//!
//! Prepares a database for a fresh till: schema, the "Producto común" row
//! and the demo beers.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p taproom-db --bin seed
//!
//! # Specify database path
//! cargo run -p taproom-db --bin seed -- --db ./data/taproom.db
//!
//! # Load a price list instead of the demo beers
//! cargo run -p taproom-db --bin seed -- --import ./precios.csv
//! ```
//!
//! Demo products are only inserted into an empty catalog, so running the
//! seed twice changes nothing the second time.

use std::env;
use taproom_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./taproom_dev.db");
    let mut import: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--import" | "-i" => {
                if i + 1 < args.len() {
                    import = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Taproom POS Seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./taproom_dev.db)");
                println!("  -i, --import <CSV>    Load products from a ';' separated price list");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("Taproom POS Seed");
    println!("================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    match import {
        Some(path) => {
            let report = db.interchange().import_products_file(&path).await?;
            println!(
                "✓ Imported {}: {} created, {} updated, {} skipped",
                path, report.created, report.updated, report.skipped
            );
        }
        None => {
            let inserted = db.products().ensure_demo_products().await?;
            if inserted == 0 {
                println!("⚠ Catalog already has products, demo beers skipped");
            } else {
                println!("✓ Inserted {} demo products", inserted);
            }
        }
    }

    let common_id = db.products().ensure_common_product().await?;
    println!("✓ Common product ready (id {})", common_id);

    println!();
    println!("✓ Seed complete! {} products in catalog", db.products().count().await?);

    db.close().await;
    Ok(())
}
