use sqlx::{Database, query_builder::Separated};

/// This module contains the SQLite writer implementation.
pub mod sqlite_writer;

/// Trait for binding item data to database query parameters.
///
/// The writer pushes one bound value per configured column, so an
/// implementation must bind the item's values in the same order as the
/// columns given to the writer.
///
/// # Examples
///
/// ```no_run
/// use address_import::item::rdbc::DatabaseItemBinder;
/// use sqlx::{query_builder::Separated, Sqlite};
///
/// struct User {
///     id: i32,
///     name: String,
/// }
///
/// struct UserBinder;
/// impl DatabaseItemBinder<User, Sqlite> for UserBinder {
///     fn bind(&self, item: &User, mut query_builder: Separated<Sqlite, &str>) {
///         query_builder.push_bind(item.id);
///         query_builder.push_bind(item.name.clone());
///     }
/// }
/// ```
pub trait DatabaseItemBinder<O, DB: Database> {
    /// Binds the properties of an item to a separated query builder.
    fn bind(&self, item: &O, query_builder: Separated<DB, &str>);
}

/// Quotes an SQL identifier (table or column name), doubling embedded quotes.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

pub use sqlite_writer::SqliteItemWriter;

#[cfg(test)]
mod tests {
    use super::quote_identifier;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("Addresses"), "\"Addresses\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
