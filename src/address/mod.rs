//! Contact address import.
//!
//! Rows of the input file carry five text fields, named by [`FIELD_SCHEMA`].
//! The file itself has no header row: the names are supplied to the CSV
//! reader and reused as the columns of the destination table.

use serde::Deserialize;
use sqlx::{Sqlite, query_builder::Separated};

use crate::item::rdbc::DatabaseItemBinder;

/// Import settings.
pub mod config;

/// Runs a whole import: reader, data store, job.
pub mod importer;

/// Maps parsed records to [`Address`] rows.
pub mod processor;

/// Column names, in table order. Also the header names of the input file.
pub const FIELD_SCHEMA: [&str; 5] = ["Address", "Acronym", "Name", "Institution", "Position"];

/// One row of the `Addresses` table.
///
/// Every column of [`FIELD_SCHEMA`] has a field, so a row can never be
/// missing a key; absent values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Address {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Acronym")]
    pub acronym: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Institution")]
    pub institution: String,
    #[serde(rename = "Position")]
    pub position: String,
}

impl Address {
    /// Values in [`FIELD_SCHEMA`] order.
    pub fn values(&self) -> [&str; 5] {
        [
            self.address.as_str(),
            self.acronym.as_str(),
            self.name.as_str(),
            self.institution.as_str(),
            self.position.as_str(),
        ]
    }
}

/// Binds an [`Address`] in [`FIELD_SCHEMA`] order.
#[derive(Default)]
pub struct AddressBinder;

impl DatabaseItemBinder<Address, Sqlite> for AddressBinder {
    fn bind(&self, item: &Address, mut query_builder: Separated<Sqlite, &str>) {
        for value in item.values() {
            query_builder.push_bind(value.to_owned());
        }
    }
}
