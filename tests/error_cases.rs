mod common;

use std::fs;

use address_import::{
    BatchError,
    address::{
        Address, FIELD_SCHEMA, config::ImportConfig, importer::AddressImporter,
        processor::AddressProcessor,
    },
    core::step::{Step, StepBuilder, StepExecution, StepStatus},
    item::csv::csv_reader::CsvItemReaderBuilder,
};
use csv::StringRecord;
use tempfile::tempdir;

use common::{mocks::MockAddressWriter, read_addresses};

#[test]
fn missing_input_fails_before_creating_the_store() {
    let dir = tempdir().unwrap();

    let result = AddressImporter::new(ImportConfig::in_dir(dir.path()))
        .unwrap()
        .run();

    assert!(matches!(result, Err(BatchError::ItemReader(_))));
    assert!(!dir.path().join("address.db").exists());
}

#[test]
fn invalid_utf8_input_fails_before_creating_the_store() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("Address.csv"), [0x31, 0x2c, 0xff, 0xfe, 0x0a]).unwrap();

    let result = AddressImporter::new(ImportConfig::in_dir(dir.path()))
        .unwrap()
        .run();

    assert!(matches!(result, Err(BatchError::ItemReader(_))));
    assert!(!dir.path().join("address.db").exists());
}

#[test]
fn unterminated_quote_fails_before_creating_the_store() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("Address.csv"),
        "1 Quay,\"QY,Ann,Port,Clerk\n\n2 Dock,DK,Bob,Harbour,Pilot\n",
    )
    .unwrap();

    let result = AddressImporter::new(ImportConfig::in_dir(dir.path()))
        .unwrap()
        .run();

    assert!(matches!(result, Err(BatchError::ItemReader(_))));
    assert!(!dir.path().join("address.db").exists());
}

#[test]
fn text_after_a_closing_quote_fails_before_creating_the_store() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("Address.csv"), "\"1 Quay\"x,QY,Ann,Port,Clerk\n").unwrap();

    let result = AddressImporter::new(ImportConfig::in_dir(dir.path()))
        .unwrap()
        .run();

    assert!(matches!(result, Err(BatchError::ItemReader(_))));
    assert!(!dir.path().join("address.db").exists());
}

#[test]
fn rerunning_against_an_existing_store_fails() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("Address.csv"),
        "123 Main St,ABC,Jane Doe,Acme,Engineer\n",
    )
    .unwrap();
    let importer = AddressImporter::new(ImportConfig::in_dir(dir.path())).unwrap();

    importer.run().unwrap();
    let second = importer.run();

    assert!(matches!(second, Err(BatchError::DataStore(_))));
    // The first import is left untouched
    assert_eq!(read_addresses(&dir.path().join("address.db")).len(), 1);
}

#[test]
fn write_failure_fails_the_step() {
    let reader = CsvItemReaderBuilder::new()
        .headers(&FIELD_SCHEMA)
        .flexible(true)
        .from_str("1 Quay,QY,Ann,Port,Clerk\n2 Dock,DK,Bob,Harbour,Pilot\n")
        .unwrap();
    let processor = AddressProcessor::new(reader.headers());

    let mut writer = MockAddressWriter::default();
    writer.expect_open().times(1).returning(|| Ok(()));
    writer
        .expect_write()
        .times(1)
        .returning(|_items| Err(BatchError::ItemWriter("disk full".to_string())));
    writer.expect_flush().never();
    writer.expect_close().times(1).returning(|| Ok(()));

    let step = StepBuilder::new("import")
        .chunk::<StringRecord, Address>(10)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()
        .unwrap();

    let mut execution = StepExecution::new(step.get_name());
    let result = step.execute(&mut execution);

    assert!(matches!(result, Err(BatchError::Step(_))));
    assert_eq!(execution.status, StepStatus::WriteError);
    assert_eq!(execution.read_count, 2);
    assert_eq!(execution.write_count, 0);
    assert_eq!(execution.write_error_count, 2);
}

#[test]
fn writer_only_receives_non_degenerate_rows() {
    let reader = CsvItemReaderBuilder::new()
        .headers(&FIELD_SCHEMA)
        .flexible(true)
        .from_str("1 Quay,QY,Ann,Port,Clerk\nstray\n2 Dock,DK,Bob,Harbour,Pilot\n")
        .unwrap();
    let processor = AddressProcessor::new(reader.headers());

    let mut writer = MockAddressWriter::default();
    writer.expect_open().returning(|| Ok(()));
    writer
        .expect_write()
        .withf(|items| {
            items.len() == 2 && items[0].address == "1 Quay" && items[1].address == "2 Dock"
        })
        .times(1)
        .returning(|_items| Ok(()));
    writer.expect_flush().times(1).returning(|| Ok(()));
    writer.expect_close().returning(|| Ok(()));

    let step = StepBuilder::new("import")
        .chunk::<StringRecord, Address>(10)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()
        .unwrap();

    let mut execution = StepExecution::new(step.get_name());
    step.execute(&mut execution).unwrap();

    assert_eq!(execution.read_count, 3);
    assert_eq!(execution.filter_count, 1);
    assert_eq!(execution.write_count, 2);
}

#[test]
fn open_failure_is_reported_as_a_write_error() {
    let reader = CsvItemReaderBuilder::new()
        .headers(&FIELD_SCHEMA)
        .from_str("1 Quay,QY,Ann,Port,Clerk\n")
        .unwrap();
    let processor = AddressProcessor::new(reader.headers());

    let mut writer = MockAddressWriter::default();
    writer
        .expect_open()
        .returning(|| Err(BatchError::ItemWriter("locked".to_string())));
    writer.expect_write().never();
    writer.expect_close().returning(|| Ok(()));

    let step = StepBuilder::new("import")
        .chunk::<StringRecord, Address>(10)
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .build()
        .unwrap();

    let mut execution = StepExecution::new(step.get_name());
    let result = step.execute(&mut execution);

    assert!(result.is_err());
    assert_eq!(execution.status, StepStatus::WriteError);
    assert_eq!(execution.read_count, 0);
}
