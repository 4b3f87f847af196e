// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Product;
use crate::utils::{fmt_clp, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            conn.execute("DELETE FROM products WHERE name=?1", params![name])?;
            println!("Removed product '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let product_type = sub.get_one::<String>("type").unwrap();
    let sales_type = sub.get_one::<String>("sales-type").unwrap();
    let unit_label = sub.get_one::<String>("unit").unwrap();
    let kg_per_unit = *sub.get_one::<i64>("kg").unwrap();
    let unit_price = parse_decimal(sub.get_one::<String>("price").unwrap())?;
    let by_weight = sub.get_flag("by-weight");

    if kg_per_unit <= 0 {
        bail!("kg per unit must be positive");
    }
    if unit_price.is_sign_negative() {
        bail!("unit price must not be negative");
    }

    conn.execute(
        "INSERT INTO products(name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            name,
            product_type,
            sales_type,
            unit_label,
            kg_per_unit,
            unit_price.to_string(),
            by_weight as i64
        ],
    )?;
    println!(
        "Added product '{}' ({}, {}, {} kg/unit, {})",
        name,
        product_type,
        sales_type,
        kg_per_unit,
        fmt_clp(&unit_price)
    );
    Ok(())
}

pub fn list_products(conn: &Connection) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight
         FROM products ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(Product {
            id: r.get(0)?,
            name: r.get(1)?,
            product_type: r.get(2)?,
            sales_type: r.get(3)?,
            unit_label: r.get(4)?,
            kg_per_unit: r.get(5)?,
            unit_price: parse_decimal(&r.get::<_, String>(6)?)?,
            by_weight: r.get::<_, i64>(7)? != 0,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = list_products(conn)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.product_type.clone(),
                    p.sales_type.clone(),
                    p.unit_label.clone(),
                    p.kg_per_unit.to_string(),
                    fmt_clp(&p.unit_price),
                    if p.by_weight { "per kg" } else { "per unit" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Type", "Sales type", "Unit", "Kg/unit", "Price", "Pricing"],
                rows,
            )
        );
    }
    Ok(())
}
