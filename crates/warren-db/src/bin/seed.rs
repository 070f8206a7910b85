//! # Seed Data Generator
//!
//! Populates a development database with a small shop.
//!
//! ## Usage
//! ```bash
//! cargo run -p warren-db --bin seed
//! cargo run -p warren-db --bin seed -- --db ./data/warren.db
//! cargo run -p warren-db --bin seed -- --admin-email owner@warren.test
//! ```
//!
//! ## Generated Data
//! - Rabbits across common breeds, every third one a breeder with a loan fee
//! - Food and equipment with varied stock, a few of them low
//! - One admin user

use chrono::NaiveDate;
use std::env;
use warren_core::{
    Gender, NewUser, ProductCategory, ProductInput, RabbitInput, UserRole,
};
use warren_db::{Database, DbConfig, RabbitFilter};

const BREEDS: &[&str] = &[
    "Holland Lop",
    "Netherland Dwarf",
    "Mini Rex",
    "Lionhead",
    "Flemish Giant",
];

const NAMES: &[&str] = &[
    "Mochi", "Pudding", "Thunder", "Bamboo", "Kanom", "Sakura", "Biscuit", "Nam Tan", "Pepper",
    "Latte",
];

/// `(name, category, price in baht, stock)`
const PRODUCTS: &[(&str, ProductCategory, i64, i64)] = &[
    ("Timothy Hay 1kg", ProductCategory::Food, 290, 40),
    ("Alfalfa Hay 500g", ProductCategory::Food, 180, 25),
    ("Adult Pellets 2kg", ProductCategory::Food, 450, 18),
    ("Junior Pellets 1kg", ProductCategory::Food, 260, 3),
    ("Dried Papaya Treats", ProductCategory::Food, 120, 60),
    ("Hay Rack", ProductCategory::Equipment, 350, 12),
    ("Water Bottle 500ml", ProductCategory::Equipment, 190, 2),
    ("Litter Tray", ProductCategory::Equipment, 420, 9),
    ("Wooden Hideout", ProductCategory::Equipment, 890, 4),
    ("Exercise Pen", ProductCategory::Equipment, 2_400, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./warren_dev.db");
    let mut admin_email = String::from("admin@warren.test");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Warren Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./warren_dev.db)");
                println!("      --admin-email <E>   Admin account email (default: admin@warren.test)");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Warren Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.rabbits().list(&RabbitFilter::default()).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} rabbits", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut rabbits = 0;
    for (idx, name) in NAMES.iter().enumerate() {
        let input = generate_rabbit(name, idx);
        if let Err(e) = db.rabbits().insert(&input).await {
            eprintln!("Failed to insert rabbit {}: {}", name, e);
            continue;
        }
        rabbits += 1;
    }
    println!("✓ Inserted {} rabbits", rabbits);

    let mut products = 0;
    for (name, category, baht, stock) in PRODUCTS {
        let input = ProductInput {
            name: name.to_string(),
            category: *category,
            price_cents: baht * 100,
            stock: *stock,
            description: None,
        };
        if let Err(e) = db.products().insert(&input).await {
            eprintln!("Failed to insert product {}: {}", name, e);
            continue;
        }
        products += 1;
    }
    println!("✓ Inserted {} products", products);

    let admin = NewUser {
        name: "Shop Admin".to_string(),
        email: admin_email.clone(),
        phone: None,
        address: None,
    };
    match db.users().create_with_role(&admin, UserRole::Admin).await {
        Ok(user) => println!("✓ Admin user #{} <{}>", user.id, user.email),
        Err(e) => eprintln!("Failed to create admin {}: {}", admin_email, e),
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one rabbit listing with deterministic variety.
fn generate_rabbit(name: &str, seed: usize) -> RabbitInput {
    let is_breeder = seed % 3 == 0;
    let gender = if seed % 2 == 0 {
        Gender::Female
    } else {
        Gender::Male
    };

    // Born within the last couple of years
    let month = (seed % 12) as u32 + 1;
    let year = if seed % 4 == 0 { 2023 } else { 2024 };

    // ฿1,500 - ฿5,500
    let price_cents = (1_500 + (seed as i64 * 450) % 4_000) * 100;

    RabbitInput {
        name: name.to_string(),
        breed: BREEDS[seed % BREEDS.len()].to_string(),
        gender,
        birth_date: NaiveDate::from_ymd_opt(year, month, 1),
        price_cents,
        is_breeder,
        loan_fee_cents: is_breeder.then_some(80_000),
        description: None,
    }
}
