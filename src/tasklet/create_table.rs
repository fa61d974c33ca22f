//! # Create Table Tasklet
//!
//! Creates the destination table of an import before any row is written to it.
//! Every column is declared `TEXT`, in the order the columns were added.
//!
//! The statement is a plain `CREATE TABLE`: if the table already exists the
//! tasklet fails instead of appending to it.
//!
//! ## Examples
//!
//! ```rust
//! use address_import::core::step::{Step, StepBuilder, StepExecution};
//! use address_import::tasklet::create_table::CreateTableTaskletBuilder;
//! use sqlx::sqlite::SqlitePoolOptions;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let pool = runtime.block_on(
//!     SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:"),
//! )?;
//!
//! let tasklet = CreateTableTaskletBuilder::new()
//!     .pool(&pool)
//!     .runtime(runtime.handle().clone())
//!     .table("contacts")
//!     .add_column("name")
//!     .add_column("email")
//!     .build()?;
//!
//! let step = StepBuilder::new("create-contacts").tasklet(&tasklet).build();
//!
//! let mut step_execution = StepExecution::new("create-contacts");
//! step.execute(&mut step_execution)?;
//! # Ok(())
//! # }
//! ```

use log::{debug, info};
use sqlx::{Pool, Sqlite};
use tokio::runtime::Handle;

use crate::{
    BatchError,
    core::step::{RepeatStatus, StepExecution, Tasklet},
    item::rdbc::quote_identifier,
};

pub struct CreateTableTasklet<'a> {
    pool: &'a Pool<Sqlite>,
    runtime: Handle,
    table: String,
    columns: Vec<String>,
}

impl CreateTableTasklet<'_> {
    /// The `CREATE TABLE` statement run by this tasklet.
    pub fn statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| format!("{} TEXT", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");

        format!("CREATE TABLE {} ({})", quote_identifier(&self.table), columns)
    }
}

impl Tasklet for CreateTableTasklet<'_> {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        let statement = self.statement();
        info!("Creating table {}", self.table);
        debug!("{}", statement);

        self.runtime
            .block_on(sqlx::query(&statement).execute(self.pool))
            .map_err(|error| {
                BatchError::Tasklet(format!("unable to create table {}: {}", self.table, error))
            })?;

        Ok(RepeatStatus::Finished)
    }
}

pub struct CreateTableTaskletBuilder<'a> {
    pool: Option<&'a Pool<Sqlite>>,
    runtime: Option<Handle>,
    table: Option<String>,
    columns: Vec<String>,
}

impl Default for CreateTableTaskletBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CreateTableTaskletBuilder<'a> {
    pub fn new() -> Self {
        Self {
            pool: None,
            runtime: None,
            table: None,
            columns: Vec::new(),
        }
    }

    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn add_column<S: Into<String>>(mut self, column: S) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn add_columns(mut self, columns: &[&str]) -> Self {
        self.columns.extend(columns.iter().map(|column| column.to_string()));
        self
    }

    /// # Errors
    /// `BatchError::Configuration` if the pool, runtime or table is missing,
    /// the table name is empty, or no column was added.
    pub fn build(self) -> Result<CreateTableTasklet<'a>, BatchError> {
        let pool = self.pool.ok_or_else(|| {
            BatchError::Configuration("CreateTableTasklet: pool is required".to_string())
        })?;
        let runtime = self.runtime.ok_or_else(|| {
            BatchError::Configuration("CreateTableTasklet: runtime is required".to_string())
        })?;
        let table = self
            .table
            .filter(|table| !table.is_empty())
            .ok_or_else(|| {
                BatchError::Configuration("CreateTableTasklet: table is required".to_string())
            })?;

        if self.columns.is_empty() {
            return Err(BatchError::Configuration(format!(
                "CreateTableTasklet: table {} needs at least one column",
                table
            )));
        }

        Ok(CreateTableTasklet {
            pool,
            runtime,
            table,
            columns: self.columns,
        })
    }
}
