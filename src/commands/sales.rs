// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::search::{self, screen_value};
use crate::models::{Product, Sale};
use crate::utils::{
    fmt_clp, id_for_branch, id_for_document_type, id_for_payment_method, maybe_print_json,
    parse_date, parse_decimal, pretty_table, product_by_name, split_iva, validate_range,
};
use anyhow::{bail, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub const CREDIT_NOTE: &str = "Nota de Crédito";
pub const DEBIT_NOTE: &str = "Nota de Débito";
pub const CASH: &str = "Efectivo";
pub const FREE_SAMPLE: &str = "Muestra Gratis";

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Derived amounts for one ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFigures {
    pub quantity: i64,
    pub total_kg: i64,
    pub unit_price: Decimal,
    pub net: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub net_per_kg: Decimal,
}

/// Compute quantities, weight and the IVA decomposition for a sale.
///
/// Credit notes flip every magnitude negative; debit notes force the gross
/// positive. Free samples are recorded with all money fields at zero.
pub fn compute_sale(
    product: &Product,
    quantity: i64,
    discount: Decimal,
    document_type: &str,
    free_sample: bool,
) -> SaleFigures {
    let unit_price = if free_sample {
        Decimal::ZERO
    } else {
        product.unit_price - discount
    };
    let total_kg = product.kg_per_unit * quantity;
    let units = if product.by_weight { total_kg } else { quantity };
    let total = unit_price * Decimal::from(units);
    let (net, tax) = split_iva(total);
    // Per-kilo figure is kept positive even on credit notes.
    let net_per_kg = if total_kg != 0 {
        (net / Decimal::from(total_kg)).round_dp(4)
    } else {
        Decimal::ZERO
    };

    let mut figures = SaleFigures {
        quantity,
        total_kg,
        unit_price,
        net,
        tax,
        total,
        net_per_kg,
    };
    if document_type == CREDIT_NOTE {
        figures.quantity = -figures.quantity.abs();
        figures.total_kg = -figures.total_kg.abs();
        figures.net = -figures.net.abs();
        figures.tax = -figures.tax.abs();
        figures.total = -figures.total.abs();
    } else if document_type == DEBIT_NOTE {
        figures.total = figures.total.abs();
        let (net, tax) = split_iva(figures.total);
        figures.net = net;
        figures.tax = tax;
    }
    figures
}

pub fn is_document_unique(
    conn: &Connection,
    document_type_id: i64,
    document_number: &str,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sales WHERE document_type_id=?1 AND document_number=?2",
        params![document_type_id, document_number],
        |r| r.get(0),
    )?;
    Ok(count == 0)
}

pub fn is_receipt_unique(conn: &Connection, receipt_number: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sales WHERE receipt_number=?1",
        params![receipt_number],
        |r| r.get(0),
    )?;
    Ok(count == 0)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    validate_range(date, date)?;

    let product_name = sub.get_one::<String>("product").unwrap();
    let branch_name = sub.get_one::<String>("branch").unwrap();
    let document_type = sub.get_one::<String>("doc-type").unwrap();
    let document_number = sub.get_one::<String>("doc-number").unwrap().trim();
    let quantity = *sub.get_one::<i64>("quantity").unwrap();
    let discount = match sub.get_one::<String>("discount") {
        Some(d) => parse_decimal(d)?,
        None => Decimal::ZERO,
    };
    let payment_method = sub.get_one::<String>("payment").unwrap();
    let receipt_number = sub.get_one::<String>("receipt").map(|s| s.trim().to_string());

    if quantity <= 0 {
        bail!("Quantity must be a positive integer");
    }
    screen_value(document_number)?;

    let product = product_by_name(conn, product_name)?;
    let branch_id = id_for_branch(conn, branch_name)?;
    let document_type_id = id_for_document_type(conn, document_type)?;
    let payment_method_id = id_for_payment_method(conn, payment_method)?;

    // "0" marks unnumbered internal documents; those skip the uniqueness rule.
    if document_number != "0" && !is_document_unique(conn, document_type_id, document_number)? {
        bail!(
            "{} number {} already exists",
            document_type,
            document_number
        );
    }
    // Receipts are not issued for cash sales or credit/debit notes.
    let receipt_checked =
        payment_method != CASH && document_type != CREDIT_NOTE && document_type != DEBIT_NOTE;
    if let Some(receipt) = receipt_number.as_deref().filter(|r| !r.is_empty()) {
        if receipt_checked && !is_receipt_unique(conn, receipt)? {
            bail!("Receipt number {} already exists", receipt);
        }
    }

    let figures = compute_sale(
        &product,
        quantity,
        discount,
        document_type,
        payment_method == FREE_SAMPLE,
    );

    conn.execute(
        "INSERT INTO sales(date, product_id, branch_id, document_type_id, document_number,
             quantity, total_kg, unit_price, discount, net, tax, total, net_per_kg,
             payment_method_id, receipt_number)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        params![
            date.to_string(),
            product.id,
            branch_id,
            document_type_id,
            document_number,
            figures.quantity,
            figures.total_kg,
            figures.unit_price.to_string(),
            discount.to_string(),
            figures.net.to_string(),
            figures.tax.to_string(),
            figures.total.to_string(),
            figures.net_per_kg.to_string(),
            payment_method_id,
            receipt_number.as_deref().filter(|r| !r.is_empty()),
        ],
    )?;
    println!(
        "Recorded {} x {} on {} at {} ({} {})",
        figures.quantity,
        product.name,
        date,
        branch_name,
        document_type,
        fmt_clp(&figures.total)
    );
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<Sale>> {
    let mut sql = format!("{} WHERE 1=1", search::BASE_QUERY);
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(date) = sub.get_one::<String>("date") {
        sql.push_str(" AND s.date=?");
        params_vec.push(date.into());
    }
    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(s.date,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(branch) = sub.get_one::<String>("branch") {
        sql.push_str(" AND b.name=?");
        params_vec.push(branch.into());
    }
    sql.push_str(" ORDER BY s.date DESC, s.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    search::query_sales(conn, &sql, &params_vec)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|s| {
                vec![
                    s.date.to_string(),
                    s.product.clone(),
                    s.branch.clone(),
                    s.document_type.clone(),
                    s.document_number.clone(),
                    s.quantity.to_string(),
                    s.total_kg.to_string(),
                    fmt_clp(&s.total),
                    s.payment_method.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "Date", "Product", "Branch", "Doc", "N°", "Qty", "Kg", "Total", "Payment",
                ],
                rows,
            )
        );
    }
    Ok(())
}
