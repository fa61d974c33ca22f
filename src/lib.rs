/*!
 # address-import

 Imports a CSV file of contact addresses into a freshly created SQLite table.

 The input file has no header row: its fields are, in order, `Address`,
 `Acronym`, `Name`, `Institution` and `Position`, separated by commas, one
 record per line with blank lines between records. Each record with at least
 two fields becomes one row of the `Addresses` table; blank-line artifacts are
 skipped.

 ## Core Concepts

 The import is a small batch job:

- **Job:** the entire import, composed of `Step`s run in order.
- **Step:** either a chunk-oriented step (read, process, write) or a tasklet
  step running a single action.
- **ItemReader:** the CSV reader, one record at a time.
- **ItemProcessor:** maps a record to an `Address` row, or filters it out.
- **ItemWriter:** inserts rows into the SQLite table, one chunk at a time.
- **Tasklet:** creates the destination table before the import step runs.

 ## Getting Started

```no_run
use address_import::{
    address::{config::ImportConfig, importer::AddressImporter},
    BatchError,
};

fn main() -> Result<(), BatchError> {
    let config = ImportConfig::default()
        .input_path("contacts/Address.csv")
        .output_path("contacts/address.db");

    let report = AddressImporter::new(config)?.run()?;

    println!(
        "{} rows written, {} records skipped",
        report.write_count, report.skipped_count
    );
    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
 -   MIT license

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers and writers (CSV reader, SQLite writer)
pub mod item;

/// Single-action steps
pub mod tasklet;

/// The contact address import
pub mod address;
