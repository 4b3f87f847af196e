// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pelletbook::commands::reports::{
    aggregate_branches, aggregate_products, branch_lines_between, branch_metrics, kpi_metrics,
    product_lines_month, product_lines_on, BranchLine, SaleLine,
};
use pelletbook::db;
use pelletbook::utils::get_exchange_rate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn line(product: &str, product_type: &str, unit: &str, qty: i64, kg: i64, total: &str) -> SaleLine {
    SaleLine {
        product: product.into(),
        product_type: product_type.into(),
        unit_label: unit.into(),
        quantity: qty,
        kg,
        total: dec(total),
    }
}

fn rate() -> Decimal {
    Decimal::from(945)
}

#[test]
fn aggregation_is_order_independent() {
    let a = vec![
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 10, 150, "45000"),
        line("Vacam 25", "Vacam", "unidades", 2, 50, "30000"),
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 5, 75, "22500"),
    ];
    let mut b = a.clone();
    b.reverse();
    assert_eq!(aggregate_products(&a, rate()), aggregate_products(&b, rate()));
}

#[test]
fn category_totals_appear_with_fixed_unit_labels() {
    let lines = vec![
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 10, 150, "45000"),
        line("Pellet Granel", "Pellet", "kg", 500, 500, "150000"),
        line("Vacam 25", "Vacam", "unidades", 2, 50, "30000"),
    ];
    let summary = aggregate_products(&lines, rate());
    let names: Vec<&str> = summary.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Pellet Bolsa 15 Kg (Retiro)",
            "Pellet Granel",
            "Vacam 25",
            "Total Pellet",
            "Total Vacam",
        ]
    );

    let pellet = &summary.iter().find(|(n, _)| n == "Total Pellet").unwrap().1;
    assert_eq!(pellet.unit_label, "bolsas");
    assert_eq!(pellet.quantity, 510);
    assert_eq!(pellet.kg, Decimal::from(650));
    assert_eq!(pellet.tons, dec("0.65"));
    assert_eq!(pellet.total, Decimal::from(195_000));

    let vacam = &summary.iter().find(|(n, _)| n == "Total Vacam").unwrap().1;
    assert_eq!(vacam.unit_label, "total");
    assert_eq!(vacam.total, Decimal::from(30000));
}

#[test]
fn credit_note_lines_cancel_category_totals() {
    let lines = vec![
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 10, 150, "45000"),
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", -10, -150, "-45000"),
    ];
    let summary = aggregate_products(&lines, rate());
    // Net zero quantity drops the category row entirely.
    assert!(summary.iter().all(|(n, _)| n != "Total Pellet"));
}

#[test]
fn usd_column_uses_the_exchange_rate() {
    let lines = vec![line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 21, 315, "94500")];
    let summary = aggregate_products(&lines, rate());
    assert_eq!(summary[0].1.usd, dec("100.00"));
}

#[test]
fn kpis_skip_category_totals() {
    let lines = vec![
        line("Pellet Bolsa 15 Kg (Retiro)", "Pellet", "bolsas", 10, 150, "45000"),
        line("Vacam 25", "Vacam", "unidades", 2, 50, "30000"),
    ];
    let summary = aggregate_products(&lines, rate());
    let kpis = kpi_metrics(&summary, rate());
    assert_eq!(kpis.revenue_clp, Decimal::from(75000));
    assert_eq!(kpis.units, 12);
    assert_eq!(kpis.tons, dec("0.20"));
    assert_eq!(kpis.active_products, 2);
    assert_eq!(kpis.revenue_per_unit, Some(Decimal::from(6250)));
    assert_eq!(kpis.revenue_per_ton, Some(Decimal::from(375_000)));
}

#[test]
fn branch_shares_sum_to_one_hundred() {
    let lines = vec![
        BranchLine {
            branch: "Osorno".into(),
            sales_type: "Local".into(),
            quantity: 10,
            kg: 150,
            net: dec("252100.84"),
            total: dec("300000"),
        },
        BranchLine {
            branch: "La Unión".into(),
            sales_type: "Distribuidor".into(),
            quantity: 5,
            kg: 75,
            net: dec("84033.61"),
            total: dec("100000"),
        },
    ];
    let grouped = aggregate_branches(&lines);
    assert_eq!(
        grouped["Osorno"]["Pellet (venta local)"].quantity,
        10
    );
    assert_eq!(
        grouped["La Unión"]["Pellet (venta distribuidor)"].total,
        dec("100000")
    );

    let metrics = branch_metrics(&grouped);
    let share_sum: Decimal = metrics.iter().map(|m| m.share_pct).sum();
    assert_eq!(share_sum, Decimal::from(100));
    let osorno = metrics.iter().find(|m| m.branch == "Osorno").unwrap();
    assert_eq!(osorno.share_pct, Decimal::from(75));
}

fn seeded_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO branches(name) VALUES ('Osorno'), ('La Unión');
        INSERT INTO products(name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight)
        VALUES ('Pellet Bolsa 15 Kg (Retiro)', 'Pellet', 'Local', 'bolsas', 15, '4500', 0),
               ('Pellet Bolsa 15 Kg (Distribuidor)', 'Pellet', 'Distribuidor', 'bolsas', 15, '4000', 0);
        "#,
    )
    .unwrap();
    let insert = |date: &str, product_id: i64, branch_id: i64, qty: i64, total: &str| {
        let total_dec: Decimal = total.parse().unwrap();
        let net = (total_dec / dec("1.19")).round_dp(4);
        conn.execute(
            "INSERT INTO sales(date, product_id, branch_id, document_type_id, document_number,
                 quantity, total_kg, unit_price, discount, net, tax, total, net_per_kg,
                 payment_method_id)
             VALUES (?1, ?2, ?3, 1, '0', ?4, ?5, '4500', '0', ?6, ?7, ?8, '252.1008', 1)",
            params![
                date,
                product_id,
                branch_id,
                qty,
                qty * 15,
                net.to_string(),
                (total_dec - net).to_string(),
                total
            ],
        )
        .unwrap();
    };
    insert("2025-06-10", 1, 1, 10, "45000");
    insert("2025-06-10", 2, 2, 20, "80000");
    insert("2025-06-11", 1, 1, 4, "18000");
    conn
}

#[test]
fn daily_and_monthly_lines_slice_the_ledger() {
    let conn = seeded_conn();
    let daily = product_lines_on(&conn, "2025-06-10".parse().unwrap()).unwrap();
    assert_eq!(daily.len(), 2);
    let monthly = product_lines_month(&conn, "2025-06").unwrap();
    assert_eq!(monthly.len(), 3);
    let rate = get_exchange_rate(&conn).unwrap();
    assert_eq!(rate, Decimal::from(945));

    let summary = aggregate_products(&monthly, rate);
    let pellet = &summary.iter().find(|(n, _)| n == "Total Pellet").unwrap().1;
    assert_eq!(pellet.quantity, 34);
    assert_eq!(pellet.total, Decimal::from(143_000));
}

#[test]
fn branch_comparison_reads_pellet_rows_only() {
    let conn = seeded_conn();
    let lines = branch_lines_between(
        &conn,
        "2025-06-01".parse().unwrap(),
        "2025-06-30".parse().unwrap(),
    )
    .unwrap();
    assert_eq!(lines.len(), 3);
    let grouped = aggregate_branches(&lines);
    let metrics = branch_metrics(&grouped);
    assert_eq!(metrics.len(), 2);
    let total: Decimal = metrics.iter().map(|m| m.revenue).sum();
    assert_eq!(total, Decimal::from(143_000));
}
