// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub product_type: String, // Pellet | Vacam
    pub sales_type: String,   // Local | Distribuidor
    pub unit_label: String,
    pub kg_per_unit: i64,
    pub unit_price: Decimal,
    pub by_weight: bool,
}

/// One sales ledger row, joined against the lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub date: NaiveDate,
    pub product: String,
    pub branch: String,
    pub document_type: String,
    pub document_number: String,
    pub quantity: i64,
    pub total_kg: i64,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub net: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub net_per_kg: Decimal,
    pub payment_method: String,
    pub receipt_number: Option<String>,
}
