use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemProcessor from: {0}")]
    ItemProcessor(String),

    #[error("Step failed: {0}")]
    Step(String),

    #[error("Tasklet from: {0}")]
    Tasklet(String),

    #[error("Data store: {0}")]
    DataStore(String),

    #[error("Configuration: {0}")]
    Configuration(String),
}
