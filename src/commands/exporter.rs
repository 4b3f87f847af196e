// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::reports::{self, ProductSummary};
use crate::commands::search::{filter_from_matches, run_search};
use crate::models::Sale;
use crate::utils::{get_exchange_rate, parse_date, validate_range};
use anyhow::{bail, Result};
use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("search", sub)) => export_search(conn, sub),
        Some(("report", sub)) => export_report(conn, sub),
        _ => Ok(()),
    }
}

const SEARCH_HEADERS: [&str; 15] = [
    "date",
    "product",
    "branch",
    "document_type",
    "document_number",
    "quantity",
    "total_kg",
    "unit_price",
    "discount",
    "net",
    "tax",
    "total",
    "net_per_kg",
    "payment_method",
    "receipt_number",
];

fn dec_f64(d: &Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn export_search(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    if !matches!(fmt.as_str(), "csv" | "json" | "xlsx") {
        bail!("Unknown format: {} (use csv|json|xlsx)", fmt);
    }

    let filter = filter_from_matches(sub)?;
    let rows = run_search(conn, &filter)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(SEARCH_HEADERS)?;
            for s in &rows {
                wtr.write_record([
                    s.date.to_string(),
                    s.product.clone(),
                    s.branch.clone(),
                    s.document_type.clone(),
                    s.document_number.clone(),
                    s.quantity.to_string(),
                    s.total_kg.to_string(),
                    s.unit_price.to_string(),
                    s.discount.to_string(),
                    s.net.to_string(),
                    s.tax.to_string(),
                    s.total.to_string(),
                    s.net_per_kg.to_string(),
                    s.payment_method.clone(),
                    s.receipt_number.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
        "xlsx" => write_search_workbook(&rows, out)?,
        _ => unreachable!(),
    }
    println!("Exported {} record(s) to {}", rows.len(), out);
    Ok(())
}

fn write_search_workbook(rows: &[Sale], out: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let ws = workbook.add_worksheet();
    ws.set_name("Resultados")?;

    for (col, header) in SEARCH_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, s) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, s.date.to_string())?;
        ws.write_string(row, 1, &s.product)?;
        ws.write_string(row, 2, &s.branch)?;
        ws.write_string(row, 3, &s.document_type)?;
        ws.write_string(row, 4, &s.document_number)?;
        ws.write_number(row, 5, s.quantity as f64)?;
        ws.write_number(row, 6, s.total_kg as f64)?;
        ws.write_number(row, 7, dec_f64(&s.unit_price))?;
        ws.write_number(row, 8, dec_f64(&s.discount))?;
        ws.write_number(row, 9, dec_f64(&s.net))?;
        ws.write_number(row, 10, dec_f64(&s.tax))?;
        ws.write_number(row, 11, dec_f64(&s.total))?;
        ws.write_number(row, 12, dec_f64(&s.net_per_kg))?;
        ws.write_string(row, 13, &s.payment_method)?;
        ws.write_string(row, 14, s.receipt_number.clone().unwrap_or_default())?;
    }

    // Summary block under the table
    let total: Decimal = rows.iter().map(|s| s.total).sum();
    let units: i64 = rows.iter().map(|s| s.quantity).sum();
    let average = if rows.is_empty() {
        Decimal::ZERO
    } else {
        total / Decimal::from(rows.len() as i64)
    };
    let base = rows.len() as u32 + 2;
    ws.write_string_with_format(base, 0, "Registros", &bold)?;
    ws.write_number(base, 1, rows.len() as f64)?;
    ws.write_string_with_format(base + 1, 0, "Total", &bold)?;
    ws.write_number(base + 1, 1, dec_f64(&total))?;
    ws.write_string_with_format(base + 2, 0, "Unidades", &bold)?;
    ws.write_number(base + 2, 1, units as f64)?;
    ws.write_string_with_format(base + 3, 0, "Venta promedio", &bold)?;
    ws.write_number(base + 3, 1, dec_f64(&average))?;

    workbook.save(out)?;
    Ok(())
}

fn write_summary_table(
    ws: &mut Worksheet,
    summary: &[(String, ProductSummary)],
    bold: &Format,
) -> Result<()> {
    const HEADERS: [&str; 8] = [
        "Producto",
        "Cantidad",
        "Unidad",
        "Kilos",
        "Toneladas",
        "Neto",
        "Total",
        "USD",
    ];
    for (col, header) in HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *header, bold)?;
    }
    for (i, (name, s)) in summary.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, name)?;
        ws.write_number(row, 1, s.quantity as f64)?;
        ws.write_string(row, 2, &s.unit_label)?;
        ws.write_number(row, 3, dec_f64(&s.kg))?;
        ws.write_number(row, 4, dec_f64(&s.tons))?;
        ws.write_number(row, 5, dec_f64(&s.net))?;
        ws.write_number(row, 6, dec_f64(&s.total))?;
        ws.write_number(row, 7, dec_f64(&s.usd))?;
    }
    Ok(())
}

fn export_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("from").unwrap())?;
    let end = parse_date(sub.get_one::<String>("to").unwrap())?;
    let out = sub.get_one::<String>("out").unwrap();
    validate_range(start, end)?;

    let rate = get_exchange_rate(conn)?;
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let lines = reports::product_lines_between(conn, start, end, None)?;
    let summary = reports::aggregate_products(&lines, rate);
    {
        let ws = workbook.add_worksheet();
        ws.set_name("Resumen")?;
        write_summary_table(ws, &summary, &bold)?;
    }

    let mut stmt = conn.prepare("SELECT name FROM branches ORDER BY name")?;
    let branches: Vec<String> = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<_>>()?;
    for branch in &branches {
        let lines = reports::product_lines_between(conn, start, end, Some(branch))?;
        let summary = reports::aggregate_products(&lines, rate);
        let ws = workbook.add_worksheet();
        ws.set_name(branch)?;
        write_summary_table(ws, &summary, &bold)?;
    }

    workbook.save(out)?;
    println!(
        "Exported report {} .. {} ({} branch sheet(s)) to {}",
        start,
        end,
        branches.len(),
        out
    );
    Ok(())
}
