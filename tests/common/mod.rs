#![allow(dead_code)]

pub mod mocks;

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::runtime::Runtime;

/// Rows of the `Addresses` table in insertion order.
pub fn read_addresses(database: &Path) -> Vec<(String, String, String, String, String)> {
    query_database(database, |pool, runtime| {
        runtime
            .block_on(
                sqlx::query_as(
                    r#"SELECT "Address", "Acronym", "Name", "Institution", "Position"
                       FROM "Addresses" ORDER BY rowid"#,
                )
                .fetch_all(pool),
            )
            .expect("Unable to read Addresses")
    })
}

/// Column names of the `Addresses` table, in declaration order.
pub fn address_columns(database: &Path) -> Vec<String> {
    query_database(database, |pool, runtime| {
        runtime
            .block_on(
                sqlx::query_scalar(
                    "SELECT name FROM pragma_table_info('Addresses') ORDER BY cid",
                )
                .fetch_all(pool),
            )
            .expect("Unable to read table info")
    })
}

fn query_database<T>(
    database: &Path,
    query: impl FnOnce(&sqlx::SqlitePool, &Runtime) -> T,
) -> T {
    let runtime = Runtime::new().expect("Unable to start runtime");
    let options = SqliteConnectOptions::new()
        .filename(database)
        .read_only(true);
    let pool = runtime
        .block_on(
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options),
        )
        .expect("Unable to open database");

    let result = query(&pool, &runtime);

    runtime.block_on(pool.close());
    result
}
