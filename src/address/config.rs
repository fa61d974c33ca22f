use std::{
    env,
    path::{Path, PathBuf},
};

use crate::BatchError;

pub const DEFAULT_INPUT_FILE: &str = "Address.csv";
pub const DEFAULT_OUTPUT_FILE: &str = "address.db";
pub const DEFAULT_TABLE: &str = "Addresses";
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Settings of one import run.
///
/// # Examples
///
/// ```
/// use address_import::address::config::ImportConfig;
///
/// let config = ImportConfig::default()
///     .input_path("/tmp/contacts.csv")
///     .output_path("/tmp/contacts.db")
///     .chunk_size(500);
///
/// assert_eq!(config.get_table(), "Addresses");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    input_path: PathBuf,
    output_path: PathBuf,
    table: String,
    delimiter: u8,
    chunk_size: usize,
}

impl Default for ImportConfig {
    /// Default file names, relative to the current directory.
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            table: DEFAULT_TABLE.to_string(),
            delimiter: b',',
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ImportConfig {
    /// Default settings with both files resolved against the process working
    /// directory.
    pub fn from_working_dir() -> Result<Self, BatchError> {
        let dir = env::current_dir().map_err(|error| {
            BatchError::Configuration(format!("unable to resolve working directory: {}", error))
        })?;

        Ok(Self::in_dir(&dir))
    }

    /// Default settings with both files placed in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            input_path: dir.join(DEFAULT_INPUT_FILE),
            output_path: dir.join(DEFAULT_OUTPUT_FILE),
            ..Self::default()
        }
    }

    pub fn input_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.table = table.into();
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of rows inserted per statement batch.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn get_input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn get_output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn get_table(&self) -> &str {
        &self.table
    }

    pub fn get_delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if self.table.trim().is_empty() {
            return Err(BatchError::Configuration(
                "table name must not be empty".to_string(),
            ));
        }
        if self.input_path == self.output_path {
            return Err(BatchError::Configuration(format!(
                "input and output are the same file: {}",
                self.input_path.display()
            )));
        }
        Ok(())
    }
}
