// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pelletbook::models::Product;
use pelletbook::{cli, commands::sales, db};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO branches(name) VALUES ('Osorno'), ('La Unión');
        INSERT INTO products(name, product_type, sales_type, unit_label, kg_per_unit, unit_price, by_weight)
        VALUES ('Pellet Bolsa 15 Kg (Retiro)', 'Pellet', 'Local', 'bolsas', 15, '4500', 0),
               ('Pellet Bolsa 15 Kg (Distribuidor)', 'Pellet', 'Distribuidor', 'bolsas', 15, '4000', 0),
               ('Pellet Granel', 'Pellet', 'Local', 'kg', 1, '300', 1);
        "#,
    )
    .unwrap();
    conn
}

fn bag_product() -> Product {
    Product {
        id: 1,
        name: "Pellet Bolsa 15 Kg (Retiro)".into(),
        product_type: "Pellet".into(),
        sales_type: "Local".into(),
        unit_label: "bolsas".into(),
        kg_per_unit: 15,
        unit_price: Decimal::from(4500),
        by_weight: false,
    }
}

fn bulk_product() -> Product {
    Product {
        id: 3,
        name: "Pellet Granel".into(),
        product_type: "Pellet".into(),
        sales_type: "Local".into(),
        unit_label: "kg".into(),
        kg_per_unit: 1,
        unit_price: Decimal::from(300),
        by_weight: true,
    }
}

fn add_sale(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut full = vec!["pelletbook", "sale", "add"];
    full.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(full);
    if let Some(("sale", m)) = matches.subcommand() {
        sales::handle(conn, m)
    } else {
        panic!("no sale subcommand");
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn iva_decomposition_for_bagged_product() {
    let figures = sales::compute_sale(&bag_product(), 10, Decimal::ZERO, "Boleta", false);
    assert_eq!(figures.quantity, 10);
    assert_eq!(figures.total_kg, 150);
    assert_eq!(figures.total, Decimal::from(45000));
    assert_eq!(figures.net, dec("37815.1261"));
    assert_eq!(figures.net + figures.tax, figures.total);
    assert_eq!(figures.net_per_kg, dec("252.1008"));
}

#[test]
fn bulk_product_prices_per_kilogram() {
    let figures = sales::compute_sale(&bulk_product(), 500, Decimal::ZERO, "Boleta", false);
    assert_eq!(figures.total_kg, 500);
    assert_eq!(figures.total, Decimal::from(150_000));
    assert_eq!(figures.net + figures.tax, figures.total);
}

#[test]
fn discount_reduces_unit_price() {
    let figures = sales::compute_sale(&bag_product(), 10, Decimal::from(500), "Boleta", false);
    assert_eq!(figures.unit_price, Decimal::from(4000));
    assert_eq!(figures.total, Decimal::from(40000));
}

#[test]
fn credit_note_flips_magnitudes_but_not_net_per_kg() {
    let figures = sales::compute_sale(&bag_product(), 10, Decimal::ZERO, "Nota de Crédito", false);
    assert_eq!(figures.quantity, -10);
    assert_eq!(figures.total_kg, -150);
    assert_eq!(figures.total, Decimal::from(-45000));
    assert!(figures.net.is_sign_negative());
    assert!(figures.tax.is_sign_negative());
    assert_eq!(figures.net_per_kg, dec("252.1008"));
}

#[test]
fn debit_note_forces_gross_positive() {
    // Discount larger than the price would go negative on any other document.
    let figures = sales::compute_sale(&bag_product(), 1, Decimal::from(5000), "Nota de Débito", false);
    assert_eq!(figures.total, Decimal::from(500));
    assert!(figures.net.is_sign_positive());
    assert_eq!(figures.net + figures.tax, figures.total);
}

#[test]
fn free_sample_zeroes_all_money_fields() {
    let figures = sales::compute_sale(&bag_product(), 5, Decimal::ZERO, "Boleta", true);
    assert_eq!(figures.unit_price, Decimal::ZERO);
    assert_eq!(figures.total, Decimal::ZERO);
    assert_eq!(figures.net, Decimal::ZERO);
    assert_eq!(figures.tax, Decimal::ZERO);
    assert_eq!(figures.net_per_kg, Decimal::ZERO);
    assert_eq!(figures.total_kg, 75);
}

#[test]
fn duplicate_document_number_rejected_per_type() {
    let conn = setup();
    let base = [
        "--date",
        "2025-05-05",
        "--product",
        "Pellet Bolsa 15 Kg (Retiro)",
        "--branch",
        "Osorno",
        "--doc-type",
        "Boleta",
        "--doc-number",
        "101",
        "--quantity",
        "10",
        "--payment",
        "Efectivo",
    ];
    add_sale(&conn, &base).unwrap();
    assert!(add_sale(&conn, &base).is_err());

    // Same number under another document type is a different series.
    add_sale(
        &conn,
        &[
            "--date",
            "2025-05-05",
            "--product",
            "Pellet Bolsa 15 Kg (Retiro)",
            "--branch",
            "Osorno",
            "--doc-type",
            "Factura",
            "--doc-number",
            "101",
            "--quantity",
            "10",
            "--payment",
            "Transferencia",
        ],
    )
    .unwrap();
}

#[test]
fn unnumbered_documents_skip_uniqueness() {
    let conn = setup();
    for _ in 0..2 {
        add_sale(
            &conn,
            &[
                "--date",
                "2025-05-06",
                "--product",
                "Pellet Bolsa 15 Kg (Retiro)",
                "--branch",
                "Osorno",
                "--doc-type",
                "Boleta",
                "--doc-number",
                "0",
                "--quantity",
                "2",
                "--payment",
                "Efectivo",
            ],
        )
        .unwrap();
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sales", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn receipt_uniqueness_enforced_except_for_cash() {
    let conn = setup();
    let with_receipt = |doc: &'static str, pay: &'static str, receipt: &'static str| {
        vec![
            "--date",
            "2025-05-07",
            "--product",
            "Pellet Bolsa 15 Kg (Retiro)",
            "--branch",
            "La Unión",
            "--doc-type",
            "Boleta",
            "--doc-number",
            doc,
            "--quantity",
            "1",
            "--payment",
            pay,
            "--receipt",
            receipt,
        ]
    };
    add_sale(&conn, &with_receipt("201", "Transferencia", "R1")).unwrap();
    assert!(add_sale(&conn, &with_receipt("202", "Transferencia", "R1")).is_err());
    // Cash sales never issue real receipts, so the number may repeat.
    add_sale(&conn, &with_receipt("203", "Efectivo", "R1")).unwrap();
}

#[test]
fn rejects_zero_quantity_and_out_of_range_dates() {
    let conn = setup();
    let mk = |date: &'static str, qty: &'static str| {
        vec![
            "--date",
            date,
            "--product",
            "Pellet Bolsa 15 Kg (Retiro)",
            "--branch",
            "Osorno",
            "--doc-type",
            "Boleta",
            "--doc-number",
            "301",
            "--quantity",
            qty,
            "--payment",
            "Efectivo",
        ]
    };
    assert!(add_sale(&conn, &mk("2025-05-08", "0")).is_err());
    assert!(add_sale(&conn, &mk("2024-01-15", "1")).is_err());
    assert!(add_sale(&conn, &mk("2099-01-01", "1")).is_err());
}

#[test]
fn list_limit_and_order_respected() {
    let conn = setup();
    for (i, date) in ["2025-05-01", "2025-05-02", "2025-05-03"].into_iter().enumerate() {
        add_sale(
            &conn,
            &[
                "--date",
                date,
                "--product",
                "Pellet Bolsa 15 Kg (Retiro)",
                "--branch",
                "Osorno",
                "--doc-type",
                "Boleta",
                "--doc-number",
                &format!("40{}", i),
                "--quantity",
                "1",
                "--payment",
                "Efectivo",
            ],
        )
        .unwrap();
    }
    let matches =
        cli::build_cli().get_matches_from(["pelletbook", "sale", "list", "--limit", "2"]);
    if let Some(("sale", sale_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = sale_m.subcommand() {
            let rows = sales::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date.to_string(), "2025-05-03");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no sale subcommand");
    }
}
