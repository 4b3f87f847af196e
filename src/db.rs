// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("cl.pelletbook", "Pelletbook", "pelletbook"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("pelletbook.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS products(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        product_type TEXT NOT NULL CHECK(product_type IN ('Pellet','Vacam')),
        sales_type TEXT NOT NULL CHECK(sales_type IN ('Local','Distribuidor')),
        unit_label TEXT NOT NULL,
        kg_per_unit INTEGER NOT NULL,
        unit_price TEXT NOT NULL,
        by_weight INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS branches(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS document_types(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS payment_methods(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS sales(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        product_id INTEGER NOT NULL,
        branch_id INTEGER NOT NULL,
        document_type_id INTEGER NOT NULL,
        document_number TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        total_kg INTEGER NOT NULL,
        unit_price TEXT NOT NULL,
        discount TEXT NOT NULL DEFAULT '0',
        net TEXT NOT NULL,
        tax TEXT NOT NULL,
        total TEXT NOT NULL,
        net_per_kg TEXT NOT NULL,
        payment_method_id INTEGER NOT NULL,
        receipt_number TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(product_id) REFERENCES products(id),
        FOREIGN KEY(branch_id) REFERENCES branches(id),
        FOREIGN KEY(document_type_id) REFERENCES document_types(id),
        FOREIGN KEY(payment_method_id) REFERENCES payment_methods(id)
    );
    CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(date);

    INSERT OR IGNORE INTO document_types(name) VALUES
        ('Boleta'), ('Factura'), ('Nota de Crédito'), ('Nota de Débito');

    INSERT OR IGNORE INTO payment_methods(name) VALUES
        ('Efectivo'), ('Tarjeta Débito'), ('Tarjeta Crédito'),
        ('Transferencia'), ('Cheque'), ('Muestra Gratis');
    "#,
    )?;
    Ok(())
}
