use csv::StringRecord;
use log::debug;

use crate::{
    BatchError,
    core::item::{ItemProcessor, ItemProcessorResult},
};

use super::Address;

/// Records with fewer fields than this are blank-line artifacts of the parse.
const MIN_FIELDS: usize = 2;

/// Turns a parsed record into an [`Address`] row.
///
/// Fields are matched to columns through the reader's header names, not their
/// position in [`super::FIELD_SCHEMA`]. Missing trailing fields become empty
/// strings and extra fields are ignored. Values are kept verbatim.
///
/// Records with fewer than two fields are filtered out.
pub struct AddressProcessor {
    headers: StringRecord,
}

impl AddressProcessor {
    pub fn new(headers: &StringRecord) -> Self {
        Self {
            headers: headers.clone(),
        }
    }
}

impl ItemProcessor<StringRecord, Address> for AddressProcessor {
    fn process(&self, item: &StringRecord) -> ItemProcessorResult<Address> {
        if item.len() < MIN_FIELDS {
            debug!("Skipping degenerate record: {:?}", item);
            return Ok(None);
        }

        debug!("Record: {:?}", item);

        // One field per header so that every column gets a value.
        let fields: StringRecord = (0..self.headers.len())
            .map(|index| item.get(index).unwrap_or(""))
            .collect();

        fields
            .deserialize(Some(&self.headers))
            .map(Some)
            .map_err(|error| BatchError::ItemProcessor(error.to_string()))
    }
}
