use sqlx::{Pool, QueryBuilder, Sqlite};
use tokio::runtime::Handle;

use crate::BatchError;
use crate::core::item::{ItemWriter, ItemWriterResult};
use crate::item::rdbc::{DatabaseItemBinder, quote_identifier};

// SQLite refuses statements with more bound parameters than SQLITE_MAX_VARIABLE_NUMBER
const BIND_LIMIT: usize = 32766;

/// A writer for inserting items into a SQLite database using SQLx.
///
/// Each chunk is inserted with multi-row `INSERT` statements; a chunk whose
/// parameter count would exceed SQLite's limit is split over several
/// statements. Rows are not wrapped in a transaction: a failing statement
/// leaves the rows of the previous statements in place.
///
/// The writer is synchronous. Every statement is driven to completion on the
/// Tokio runtime given with `runtime`, so `write` must not be called from
/// inside that runtime's async context.
///
/// # Examples
///
/// ```no_run
/// use address_import::item::rdbc::sqlite_writer::SqliteItemWriter;
/// use address_import::item::rdbc::DatabaseItemBinder;
/// use address_import::core::item::ItemWriter;
/// use sqlx::{query_builder::Separated, sqlite::SqlitePoolOptions, Sqlite};
///
/// struct Product {
///     id: i32,
///     name: String,
/// }
///
/// struct ProductBinder;
/// impl DatabaseItemBinder<Product, Sqlite> for ProductBinder {
///     fn bind(&self, item: &Product, mut query_builder: Separated<Sqlite, &str>) {
///         query_builder.push_bind(item.id);
///         query_builder.push_bind(item.name.clone());
///     }
/// }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = tokio::runtime::Runtime::new()?;
/// let pool = runtime.block_on(
///     SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:"),
/// )?;
///
/// let writer = SqliteItemWriter::<Product>::new()
///     .pool(&pool)
///     .runtime(runtime.handle().clone())
///     .table("products")
///     .add_column("id")
///     .add_column("name")
///     .item_binder(&ProductBinder);
///
/// writer.write(&[Product { id: 1, name: "Laptop".to_string() }])?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteItemWriter<'a, O> {
    pool: Option<&'a Pool<Sqlite>>,
    runtime: Option<Handle>,
    table: Option<&'a str>,
    columns: Vec<&'a str>,
    item_binder: Option<&'a dyn DatabaseItemBinder<O, Sqlite>>,
}

impl<O> Default for SqliteItemWriter<'_, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, O> SqliteItemWriter<'a, O> {
    /// Creates a writer with nothing configured.
    ///
    /// Pool, runtime, table, at least one column and an item binder must be
    /// set before the first `write`.
    pub fn new() -> Self {
        Self {
            pool: None,
            runtime: None,
            table: None,
            columns: Vec::new(),
            item_binder: None,
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the runtime the database calls are blocked on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn table(mut self, table: &'a str) -> Self {
        self.table = Some(table);
        self
    }

    /// Adds a column. Columns are filled in the order they are added.
    pub fn add_column(mut self, column: &'a str) -> Self {
        self.columns.push(column);
        self
    }

    pub fn add_columns(mut self, columns: &[&'a str]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    pub fn item_binder(mut self, item_binder: &'a dyn DatabaseItemBinder<O, Sqlite>) -> Self {
        self.item_binder = Some(item_binder);
        self
    }

    fn insert_prefix(table: &str, columns: &[&str]) -> String {
        let columns = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(",");
        format!("INSERT INTO {} ({}) ", quote_identifier(table), columns)
    }
}

impl<O> ItemWriter<O> for SqliteItemWriter<'_, O> {
    /// Writes items to the SQLite table using batch inserts.
    ///
    /// # Errors
    ///
    /// - `BatchError::Configuration` if the writer is missing a setting
    /// - `BatchError::ItemWriter` if SQLite rejects a statement (missing
    ///   table, constraint violation, I/O failure...)
    fn write(&self, items: &[O]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(());
        }

        let missing = |setting: &str| {
            BatchError::Configuration(format!("SqliteItemWriter: {} is required", setting))
        };
        let pool = self.pool.ok_or_else(|| missing("pool"))?;
        let runtime = self.runtime.as_ref().ok_or_else(|| missing("runtime"))?;
        let table = self.table.ok_or_else(|| missing("table"))?;
        let item_binder = self.item_binder.ok_or_else(|| missing("item binder"))?;
        if self.columns.is_empty() {
            return Err(missing("at least one column"));
        }

        let prefix = Self::insert_prefix(table, &self.columns);

        for batch in items.chunks(BIND_LIMIT / self.columns.len()) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(prefix.as_str());
            query_builder.push_values(batch, |b, item| {
                item_binder.bind(item, b);
            });

            let result = runtime.block_on(async { query_builder.build().execute(pool).await });

            match result {
                Ok(_) => {
                    log::debug!(
                        "Successfully wrote {} items to SQLite table {}",
                        batch.len(),
                        table
                    );
                }
                Err(e) => {
                    log::error!("Failed to write items to SQLite table {}: {}", table, e);
                    return Err(BatchError::ItemWriter(format!("SQLite write failed: {}", e)));
                }
            }
        }

        Ok(())
    }
}
