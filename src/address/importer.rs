use std::{path::Path, time::Duration};

use csv::StringRecord;
use log::info;
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::{
    BatchError,
    core::{
        job::{Job, JobBuilder},
        step::StepBuilder,
    },
    item::{
        csv::csv_reader::{CsvItemReader, CsvItemReaderBuilder},
        rdbc::SqliteItemWriter,
    },
    tasklet::create_table::CreateTableTaskletBuilder,
};

use super::{
    Address, AddressBinder, FIELD_SCHEMA, config::ImportConfig, processor::AddressProcessor,
};

const JOB_NAME: &str = "address-import";
const CREATE_TABLE_STEP: &str = "create-table";
const IMPORT_STEP: &str = "import-addresses";

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// Records produced by the CSV parse
    pub read_count: usize,
    /// Degenerate records left out of the table
    pub skipped_count: usize,
    /// Rows inserted into the table
    pub write_count: usize,
    pub duration: Duration,
}

/// Imports the address file into a new database table.
///
/// A run happens in this order, each stage failing the whole run:
///
/// 1. the input file is read and parsed completely;
/// 2. the data store is created, which fails if the output file exists;
/// 3. a job creates the table, then inserts one row per non-degenerate record;
/// 4. the data store is closed, whether the job succeeded or not.
///
/// # Examples
///
/// ```no_run
/// use address_import::address::{config::ImportConfig, importer::AddressImporter};
///
/// # fn example() -> Result<(), address_import::BatchError> {
/// let report = AddressImporter::new(ImportConfig::from_working_dir()?)?.run()?;
/// println!("{} rows imported", report.write_count);
/// # Ok(())
/// # }
/// ```
pub struct AddressImporter {
    config: ImportConfig,
}

impl AddressImporter {
    pub fn new(config: ImportConfig) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self) -> Result<ImportReport, BatchError> {
        let input_path = self.config.get_input_path();
        let output_path = self.config.get_output_path();

        info!(
            "Importing {} into {}",
            input_path.display(),
            output_path.display()
        );

        let reader = CsvItemReaderBuilder::new()
            .delimiter(self.config.get_delimiter())
            .headers(&FIELD_SCHEMA)
            .flexible(true)
            .from_path(input_path)?;
        info!(
            "Parsed {} records from {}",
            reader.remaining(),
            input_path.display()
        );

        let runtime = build_runtime()?;
        let pool = runtime.block_on(create_data_store(output_path))?;

        let result = self.run_job(&reader, &pool, runtime.handle());

        runtime.block_on(pool.close());
        info!("Closed data store {}", output_path.display());

        let report = result?;

        info!(
            "Import finished: {} records read, {} skipped, {} rows written in {:?}",
            report.read_count, report.skipped_count, report.write_count, report.duration
        );

        Ok(report)
    }

    fn run_job(
        &self,
        reader: &CsvItemReader,
        pool: &Pool<Sqlite>,
        runtime: &Handle,
    ) -> Result<ImportReport, BatchError> {
        let table = self.config.get_table();

        let create_table = CreateTableTaskletBuilder::new()
            .pool(pool)
            .runtime(runtime.clone())
            .table(table)
            .add_columns(&FIELD_SCHEMA)
            .build()?;

        let processor = AddressProcessor::new(reader.headers());
        let binder = AddressBinder;
        let writer = SqliteItemWriter::<Address>::new()
            .pool(pool)
            .runtime(runtime.clone())
            .table(table)
            .add_columns(&FIELD_SCHEMA)
            .item_binder(&binder);

        let create_table_step = StepBuilder::new(CREATE_TABLE_STEP)
            .tasklet(&create_table)
            .build();

        let import_step = StepBuilder::new(IMPORT_STEP)
            .chunk::<StringRecord, Address>(self.config.get_chunk_size())
            .reader(reader)
            .processor(&processor)
            .writer(&writer)
            .build()?;

        let job = JobBuilder::new()
            .name(JOB_NAME.to_string())
            .start(&create_table_step)
            .next(&import_step)
            .build();

        let execution = job.run()?;

        let import = execution.step_execution(IMPORT_STEP).ok_or_else(|| {
            BatchError::Step(format!("{} did not record an execution", IMPORT_STEP))
        })?;

        Ok(ImportReport {
            read_count: import.read_count,
            skipped_count: import.filter_count,
            write_count: import.write_count,
            duration: execution.duration,
        })
    }
}

fn build_runtime() -> Result<Runtime, BatchError> {
    Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|error| BatchError::DataStore(format!("unable to start runtime: {}", error)))
}

/// Creates a new SQLite database file at `path` and opens a one-connection
/// pool on it.
///
/// # Errors
/// `BatchError::DataStore` if the file already exists or cannot be created.
pub async fn create_data_store(path: &Path) -> Result<Pool<Sqlite>, BatchError> {
    if path.exists() {
        return Err(BatchError::DataStore(format!(
            "{} already exists",
            path.display()
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|error| {
            BatchError::DataStore(format!("unable to create {}: {}", path.display(), error))
        })
}
