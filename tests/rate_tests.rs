// Copyright (c) 2025 Daniel Jara.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pelletbook::db;
use pelletbook::utils::{get_exchange_rate, set_exchange_rate};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

#[test]
fn default_rate_applies_until_one_is_stored() {
    let conn = setup();
    assert_eq!(get_exchange_rate(&conn).unwrap(), Decimal::from(945));
}

#[test]
fn stored_rate_overrides_the_default_and_upserts() {
    let conn = setup();
    set_exchange_rate(&conn, "903.5".parse().unwrap()).unwrap();
    assert_eq!(get_exchange_rate(&conn).unwrap(), "903.5".parse::<Decimal>().unwrap());

    set_exchange_rate(&conn, Decimal::from(950)).unwrap();
    assert_eq!(get_exchange_rate(&conn).unwrap(), Decimal::from(950));

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM settings WHERE key='exchange_rate'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}
