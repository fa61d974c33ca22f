use address_import::{
    BatchError,
    address::{config::ImportConfig, importer::AddressImporter},
};
use env_logger::Env;

/// Imports `Address.csv` from the working directory into `address.db`.
fn main() -> Result<(), BatchError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ImportConfig::from_working_dir()?;
    AddressImporter::new(config)?.run()?;

    Ok(())
}
