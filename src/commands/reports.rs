// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{
    fmt_clp, fmt_usd, get_exchange_rate, kg_to_tons, maybe_print_json, parse_date, parse_decimal,
    parse_month, pretty_table, split_iva, validate_range,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("daily", sub)) => daily(conn, sub)?,
        Some(("monthly", sub)) => monthly(conn, sub)?,
        Some(("branches", sub)) => branches(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// One ledger row reduced to what product aggregation needs.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub product: String,
    pub product_type: String,
    pub unit_label: String,
    pub quantity: i64,
    pub kg: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProductSummary {
    pub quantity: i64,
    pub unit_label: String,
    pub kg: Decimal,
    pub tons: Decimal,
    pub net: Decimal,
    pub total: Decimal,
    pub usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub revenue_clp: Decimal,
    pub revenue_usd: Decimal,
    pub units: i64,
    pub tons: Decimal,
    pub revenue_per_unit: Option<Decimal>,
    pub revenue_per_ton: Option<Decimal>,
    pub active_products: usize,
}

fn finalize(unit_label: String, quantity: i64, kg: i64, total: Decimal, rate: Decimal) -> ProductSummary {
    let (net, _) = split_iva(total);
    let kg_dec = Decimal::from(kg);
    let usd = if rate.is_zero() {
        Decimal::ZERO
    } else {
        (total / rate).round_dp(2)
    };
    ProductSummary {
        quantity,
        unit_label,
        kg: kg_dec,
        tons: kg_to_tons(kg_dec),
        net,
        total,
        usd,
    }
}

/// Fold ledger rows into per-product summaries, ordered by product name,
/// followed by the Pellet / Vacam category totals when nonzero. The fold is
/// a plain sum per key, so row order never changes the result.
pub fn aggregate_products(lines: &[SaleLine], rate: Decimal) -> Vec<(String, ProductSummary)> {
    let mut by_product: BTreeMap<String, (String, String, i64, i64, Decimal)> = BTreeMap::new();
    for line in lines {
        let entry = by_product.entry(line.product.clone()).or_insert_with(|| {
            (
                line.product_type.clone(),
                line.unit_label.clone(),
                0,
                0,
                Decimal::ZERO,
            )
        });
        entry.2 += line.quantity;
        entry.3 += line.kg;
        entry.4 += line.total;
    }

    let mut pellet = (0i64, 0i64, Decimal::ZERO);
    let mut vacam = (0i64, 0i64, Decimal::ZERO);
    let mut out = Vec::with_capacity(by_product.len() + 2);
    for (name, (product_type, unit_label, quantity, kg, total)) in by_product {
        match product_type.as_str() {
            "Pellet" => {
                pellet.0 += quantity;
                pellet.1 += kg;
                pellet.2 += total;
            }
            "Vacam" => {
                vacam.0 += quantity;
                vacam.1 += kg;
                vacam.2 += total;
            }
            _ => {}
        }
        out.push((name, finalize(unit_label, quantity, kg, total, rate)));
    }
    if pellet.0 != 0 {
        out.push((
            "Total Pellet".to_string(),
            finalize("bolsas".to_string(), pellet.0, pellet.1, pellet.2, rate),
        ));
    }
    if vacam.0 != 0 {
        out.push((
            "Total Vacam".to_string(),
            finalize("total".to_string(), vacam.0, vacam.1, vacam.2, rate),
        ));
    }
    out
}

/// KPI block over a product summary; the "Total *" category rows are skipped
/// so nothing is counted twice.
pub fn kpi_metrics(summary: &[(String, ProductSummary)], rate: Decimal) -> Kpis {
    let mut revenue = Decimal::ZERO;
    let mut units = 0i64;
    let mut tons = Decimal::ZERO;
    let mut active = 0usize;
    for (name, s) in summary {
        if name.starts_with("Total ") {
            continue;
        }
        revenue += s.total;
        units += s.quantity;
        tons += s.tons;
        if s.quantity != 0 {
            active += 1;
        }
    }
    let revenue_usd = if rate.is_zero() {
        Decimal::ZERO
    } else {
        (revenue / rate).round_dp(2)
    };
    Kpis {
        revenue_clp: revenue,
        revenue_usd,
        units,
        tons,
        revenue_per_unit: (units != 0).then(|| (revenue / Decimal::from(units)).round_dp(2)),
        revenue_per_ton: (!tons.is_zero()).then(|| (revenue / tons).round_dp(2)),
        active_products: active,
    }
}

const LINE_QUERY: &str = "SELECT p.name, p.product_type, p.unit_label, s.quantity, s.total_kg, s.total \
     FROM sales s \
     JOIN products p ON s.product_id=p.id \
     JOIN branches b ON s.branch_id=b.id";

fn collect_lines(conn: &Connection, sql: &str, params_vec: &[String]) -> Result<Vec<SaleLine>> {
    let mut stmt = conn.prepare(sql)?;
    let bound: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;
    let mut lines = Vec::new();
    while let Some(r) = rows.next()? {
        lines.push(SaleLine {
            product: r.get(0)?,
            product_type: r.get(1)?,
            unit_label: r.get(2)?,
            quantity: r.get(3)?,
            kg: r.get(4)?,
            total: parse_decimal(&r.get::<_, String>(5)?)?,
        });
    }
    Ok(lines)
}

pub fn product_lines_on(conn: &Connection, date: NaiveDate) -> Result<Vec<SaleLine>> {
    collect_lines(
        conn,
        &format!("{} WHERE s.date=?", LINE_QUERY),
        &[date.to_string()],
    )
}

pub fn product_lines_month(conn: &Connection, month: &str) -> Result<Vec<SaleLine>> {
    collect_lines(
        conn,
        &format!("{} WHERE substr(s.date,1,7)=?", LINE_QUERY),
        &[month.to_string()],
    )
}

pub fn product_lines_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    branch: Option<&str>,
) -> Result<Vec<SaleLine>> {
    let mut sql = format!("{} WHERE s.date BETWEEN ? AND ?", LINE_QUERY);
    let mut params_vec = vec![start.to_string(), end.to_string()];
    if let Some(branch) = branch {
        sql.push_str(" AND b.name=?");
        params_vec.push(branch.to_string());
    }
    collect_lines(conn, &sql, &params_vec)
}

fn summary_rows(summary: &[(String, ProductSummary)]) -> Vec<Vec<String>> {
    summary
        .iter()
        .map(|(name, s)| {
            vec![
                name.clone(),
                s.quantity.to_string(),
                s.unit_label.clone(),
                s.kg.to_string(),
                s.tons.round_dp(3).to_string(),
                fmt_clp(&s.net),
                fmt_clp(&s.total),
                fmt_usd(&s.usd),
            ]
        })
        .collect()
}

fn kpi_rows(kpis: &Kpis) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["Revenue (CLP)".into(), fmt_clp(&kpis.revenue_clp)],
        vec!["Revenue (USD)".into(), fmt_usd(&kpis.revenue_usd)],
        vec!["Units sold".into(), kpis.units.to_string()],
        vec!["Tons sold".into(), kpis.tons.round_dp(3).to_string()],
    ];
    if let Some(per_unit) = kpis.revenue_per_unit {
        rows.push(vec!["Revenue / unit".into(), fmt_clp(&per_unit)]);
    }
    if let Some(per_ton) = kpis.revenue_per_ton {
        rows.push(vec!["Revenue / ton".into(), fmt_clp(&per_ton)]);
    }
    rows.push(vec![
        "Active products".into(),
        kpis.active_products.to_string(),
    ]);
    rows
}

fn print_summary(
    sub: &clap::ArgMatches,
    summary: Vec<(String, ProductSummary)>,
    kpis: Kpis,
) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if json_flag || jsonl_flag {
        let payload = serde_json::json!({
            "products": summary
                .iter()
                .map(|(name, s)| serde_json::json!({ "product": name, "summary": s }))
                .collect::<Vec<_>>(),
            "kpis": kpis,
        });
        maybe_print_json(json_flag, jsonl_flag, &payload)?;
        return Ok(());
    }
    println!(
        "{}",
        pretty_table(
            &["Product", "Qty", "Unit", "Kg", "Tons", "Net", "Total", "USD"],
            summary_rows(&summary),
        )
    );
    println!("{}", pretty_table(&["KPI", "Value"], kpi_rows(&kpis)));
    Ok(())
}

fn daily(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    validate_range(date, date)?;
    let rate = get_exchange_rate(conn)?;
    let lines = product_lines_on(conn, date)?;
    let summary = aggregate_products(&lines, rate);
    let kpis = kpi_metrics(&summary, rate);
    print_summary(sub, summary, kpis)
}

fn monthly(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let rate = get_exchange_rate(conn)?;
    let lines = product_lines_month(conn, &month)?;
    let summary = aggregate_products(&lines, rate);
    let kpis = kpi_metrics(&summary, rate);
    print_summary(sub, summary, kpis)
}

// Branch comparison

#[derive(Debug, Clone)]
pub struct BranchLine {
    pub branch: String,
    pub sales_type: String,
    pub quantity: i64,
    pub kg: i64,
    pub net: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LineTotals {
    pub quantity: i64,
    pub tons: Decimal,
    pub net: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchMetrics {
    pub branch: String,
    pub revenue: Decimal,
    pub share_pct: Decimal,
    pub tons: Decimal,
    pub revenue_per_ton: Option<Decimal>,
}

fn sales_type_label(sales_type: &str) -> Option<&'static str> {
    match sales_type {
        "Local" => Some("Pellet (venta local)"),
        "Distribuidor" => Some("Pellet (venta distribuidor)"),
        _ => None,
    }
}

/// Group rows as branch -> sales-type label -> running totals.
pub fn aggregate_branches(
    lines: &[BranchLine],
) -> BTreeMap<String, BTreeMap<&'static str, LineTotals>> {
    let mut grouped: BTreeMap<String, BTreeMap<&'static str, LineTotals>> = BTreeMap::new();
    for line in lines {
        let Some(label) = sales_type_label(&line.sales_type) else {
            continue;
        };
        let totals = grouped
            .entry(line.branch.clone())
            .or_default()
            .entry(label)
            .or_default();
        totals.quantity += line.quantity;
        totals.tons += kg_to_tons(Decimal::from(line.kg));
        totals.net += line.net;
        totals.total += line.total;
    }
    grouped
}

pub fn branch_metrics(
    grouped: &BTreeMap<String, BTreeMap<&'static str, LineTotals>>,
) -> Vec<BranchMetrics> {
    let grand_total: Decimal = grouped
        .values()
        .flat_map(|per_type| per_type.values())
        .map(|t| t.total)
        .sum();
    grouped
        .iter()
        .map(|(branch, per_type)| {
            let revenue: Decimal = per_type.values().map(|t| t.total).sum();
            let tons: Decimal = per_type.values().map(|t| t.tons).sum();
            let share_pct = if grand_total.is_zero() {
                Decimal::ZERO
            } else {
                (revenue / grand_total * Decimal::from(100)).round_dp(2)
            };
            BranchMetrics {
                branch: branch.clone(),
                revenue,
                share_pct,
                tons,
                revenue_per_ton: (!tons.is_zero()).then(|| (revenue / tons).round_dp(2)),
            }
        })
        .collect()
}

pub fn branch_lines_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<BranchLine>> {
    let mut stmt = conn.prepare(
        "SELECT b.name, p.sales_type, s.quantity, s.total_kg, s.net, s.total
         FROM sales s
         JOIN products p ON s.product_id=p.id
         JOIN branches b ON s.branch_id=b.id
         WHERE s.date BETWEEN ?1 AND ?2 AND p.product_type='Pellet'",
    )?;
    let mut rows = stmt.query(params![start.to_string(), end.to_string()])?;
    let mut lines = Vec::new();
    while let Some(r) = rows.next()? {
        lines.push(BranchLine {
            branch: r.get(0)?,
            sales_type: r.get(1)?,
            quantity: r.get(2)?,
            kg: r.get(3)?,
            net: parse_decimal(&r.get::<_, String>(4)?)?,
            total: parse_decimal(&r.get::<_, String>(5)?)?,
        });
    }
    Ok(lines)
}

fn branches(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let start = parse_date(sub.get_one::<String>("from").unwrap())?;
    let end = parse_date(sub.get_one::<String>("to").unwrap())?;
    validate_range(start, end)?;

    let lines = branch_lines_between(conn, start, end)?;
    let grouped = aggregate_branches(&lines);
    let metrics = branch_metrics(&grouped);

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if json_flag || jsonl_flag {
        let payload = serde_json::json!({ "branches": grouped, "metrics": metrics });
        maybe_print_json(json_flag, jsonl_flag, &payload)?;
        return Ok(());
    }

    let mut rows = Vec::new();
    for (branch, per_type) in &grouped {
        for (label, totals) in per_type {
            rows.push(vec![
                branch.clone(),
                (*label).to_string(),
                totals.quantity.to_string(),
                totals.tons.round_dp(3).to_string(),
                fmt_clp(&totals.net),
                fmt_clp(&totals.total),
            ]);
        }
    }
    println!(
        "{}",
        pretty_table(
            &["Branch", "Sales type", "Qty", "Tons", "Net", "Total"],
            rows,
        )
    );

    let metric_rows: Vec<Vec<String>> = metrics
        .iter()
        .map(|m| {
            vec![
                m.branch.clone(),
                fmt_clp(&m.revenue),
                format!("{}%", m.share_pct),
                m.tons.round_dp(3).to_string(),
                m.revenue_per_ton
                    .as_ref()
                    .map(fmt_clp)
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Branch", "Revenue", "Share", "Tons", "Revenue/ton"],
            metric_rows,
        )
    );
    if let [a, b] = metrics.as_slice() {
        println!("Gap {} vs {}: {}", a.branch, b.branch, fmt_clp(&(a.revenue - b.revenue)));
    }
    Ok(())
}
