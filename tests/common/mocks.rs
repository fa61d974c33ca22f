//! Mock version of the address row writer.
use mockall::mock;

use address_import::{
    address::Address,
    core::item::{ItemWriter, ItemWriterResult},
};

mock! {
    pub AddressWriter {}
    impl ItemWriter<Address> for AddressWriter {
        fn write(&self, items: &[Address]) -> ItemWriterResult;
        fn flush(&self) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}
