/// CSV support for reading tabular data.
///
/// The reader tokenizes its whole input up front and hands out raw
/// `csv::StringRecord`s, leaving the mapping of fields to domain types to an
/// `ItemProcessor`. This keeps records of unexpected length available to the
/// processor instead of failing deserialization inside the reader.
///
/// # Examples
///
/// ```
/// use address_import::item::csv::csv_reader::CsvItemReaderBuilder;
/// use address_import::core::item::ItemReader;
///
/// let csv_data = "\
/// city,country,pop
/// Boston,United States,4628910
/// Concord,United States,42695
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .delimiter(b',')
///     .from_str(csv_data)
///     .unwrap();
///
/// let mut cities = Vec::new();
/// while let Some(record) = reader.read().unwrap() {
///     cities.push(record[0].to_string());
/// }
///
/// assert_eq!(cities, vec!["Boston", "Concord"]);
/// ```

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;
