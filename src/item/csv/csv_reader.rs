use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use log::debug;
use std::{cell::RefCell, collections::VecDeque, fs, path::Path};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// A CSV item reader that implements the `ItemReader` trait.
///
/// The whole input is tokenized when the reader is built, so a malformed
/// source is reported before any item is handed to a step. Items are the raw
/// `StringRecord`s, in input order; `headers()` gives the names of their
/// fields.
///
/// # Examples
///
/// ```
/// use address_import::item::csv::csv_reader::CsvItemReaderBuilder;
/// use address_import::core::item::ItemReader;
///
/// let data = "\
/// Boston,United States,4628910
///
/// Concord,United States,42695
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .headers(&["city", "country", "pop"])
///     .from_str(data)
///     .unwrap();
///
/// assert_eq!(reader.headers(), &vec!["city", "country", "pop"]);
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(&record[0], "Boston");
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(&record[0], "Concord");
///
/// assert!(reader.read().unwrap().is_none());
/// ```
pub struct CsvItemReader {
    headers: StringRecord,
    /// Records not handed out yet
    records: RefCell<VecDeque<StringRecord>>,
}

impl CsvItemReader {
    /// Field names of the records produced by this reader.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Number of records left to read.
    pub fn remaining(&self) -> usize {
        self.records.borrow().len()
    }
}

impl ItemReader<StringRecord> for CsvItemReader {
    fn read(&self) -> ItemReaderResult<StringRecord> {
        Ok(self.records.borrow_mut().pop_front())
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Terminator: CRLF (accepts `\r\n`, `\n` and `\r`)
/// - Headers: read from the first row, unless given with `headers`
/// - Trimming: none, fields are kept verbatim
/// - Flexible: false, every record must have the same number of fields
pub struct CsvItemReaderBuilder {
    delimiter: u8,
    terminator: Terminator,
    has_headers: bool,
    headers: Option<StringRecord>,
    trim: Trim,
    flexible: bool,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::CRLF,
            has_headers: true,
            headers: None,
            trim: Trim::None,
            flexible: false,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the record terminator.
    ///
    /// Empty lines between records are skipped by the tokenizer, so a
    /// blank-line record separator needs no dedicated setting.
    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Sets whether the first row of the input holds the field names.
    ///
    /// Ignored when `headers` supplies the names.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Supplies the field names explicitly. The input is then read as data
    /// from its first row.
    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = Some(StringRecord::from(headers.to_vec()));
        self
    }

    pub fn trim(mut self, trim: Trim) -> Self {
        self.trim = trim;
        self
    }

    /// Accept records whose number of fields differs from the headers.
    pub fn flexible(mut self, yes: bool) -> Self {
        self.flexible = yes;
        self
    }

    /// Parses `data` into a reader.
    ///
    /// # Errors
    /// `BatchError::ItemReader` if the data cannot be tokenized, including a
    /// quoted field that is never closed or is followed by anything but a
    /// delimiter or a terminator.
    pub fn from_str(self, data: &str) -> Result<CsvItemReader, BatchError> {
        check_quoting(data.as_bytes(), self.delimiter, self.terminator)?;

        let mut rdr = ReaderBuilder::new()
            .trim(self.trim)
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .has_headers(self.headers.is_none() && self.has_headers)
            .flexible(self.flexible)
            .from_reader(data.as_bytes());

        let headers = match self.headers {
            Some(headers) => headers,
            None if self.has_headers => rdr
                .headers()
                .map_err(|error| BatchError::ItemReader(error.to_string()))?
                .clone(),
            None => StringRecord::new(),
        };

        let records = rdr
            .into_records()
            .collect::<Result<VecDeque<StringRecord>, csv::Error>>()
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;

        debug!("Parsed {} CSV records", records.len());

        Ok(CsvItemReader {
            headers,
            records: RefCell::new(records),
        })
    }

    /// Loads the whole file at `path` and parses it.
    ///
    /// # Errors
    /// `BatchError::ItemReader` if the file cannot be read (missing,
    /// unreadable, not UTF-8) or cannot be tokenized.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader, BatchError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|error| {
            BatchError::ItemReader(format!("unable to read {}: {}", path.display(), error))
        })?;

        self.from_str(&data)
    }
}

const QUOTE: u8 = b'"';

fn is_terminator(byte: u8, terminator: Terminator) -> bool {
    match terminator {
        Terminator::Any(terminator) => byte == terminator,
        _ => byte == b'\r' || byte == b'\n',
    }
}

/// Rejects the quoting mistakes the `csv` tokenizer accepts silently.
///
/// A field opening with a quote must be closed, and its closing quote must be
/// followed by a delimiter, a terminator or the end of the input. Quotes
/// inside an unquoted field are literal.
fn check_quoting(data: &[u8], delimiter: u8, terminator: Terminator) -> Result<(), BatchError> {
    let mut line = 1;
    let mut field_start = true;
    // Line of the opening quote of the field being read, if it is quoted
    let mut quoted_since: Option<usize> = None;
    let mut after_closing_quote = false;
    let mut bytes = data.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        if byte == b'\n' {
            line += 1;
        }

        if quoted_since.is_some() {
            if byte == QUOTE {
                if bytes.peek() == Some(&QUOTE) {
                    bytes.next();
                } else {
                    quoted_since = None;
                    after_closing_quote = true;
                }
            }
            continue;
        }

        let ends_field = byte == delimiter || is_terminator(byte, terminator);

        if after_closing_quote {
            if !ends_field {
                return Err(BatchError::ItemReader(format!(
                    "line {}: unexpected character {:?} after a quoted field",
                    line,
                    char::from(byte)
                )));
            }
            after_closing_quote = false;
        } else if field_start && byte == QUOTE {
            quoted_since = Some(line);
            field_start = false;
            continue;
        }

        field_start = ends_field;
    }

    match quoted_since {
        Some(start) => Err(BatchError::ItemReader(format!(
            "line {}: quoted field is never closed",
            start
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use csv::{StringRecord, Trim};
    use tempfile::NamedTempFile;

    use crate::{BatchError, core::item::ItemReader};

    use super::CsvItemReaderBuilder;

    fn read_all(reader: &impl ItemReader<StringRecord>) -> Vec<StringRecord> {
        let mut records = Vec::new();
        while let Some(record) = reader.read().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn reads_headers_from_first_row() -> Result<(), Box<dyn Error>> {
        let data = "city,country,pop\nBoston,United States,4628910\nConcord,United States,42695";

        let reader = CsvItemReaderBuilder::new().from_str(data)?;

        assert_eq!(reader.headers(), &vec!["city", "country", "pop"]);
        assert_eq!(
            read_all(&reader),
            vec![
                vec!["Boston", "United States", "4628910"],
                vec!["Concord", "United States", "42695"],
            ]
        );

        Ok(())
    }

    #[test]
    fn explicit_headers_read_every_row_as_data() -> Result<(), Box<dyn Error>> {
        let data = "1 Rue Haute,ULB,Ann,Universite,Chair\n\n2 Low St,MIT,Bo,Institute,Fellow\n";

        let reader = CsvItemReaderBuilder::new()
            .headers(&["Address", "Acronym", "Name", "Institution", "Position"])
            .from_str(data)?;

        assert_eq!(reader.remaining(), 2);
        let records = read_all(&reader);
        assert_eq!(&records[0][0], "1 Rue Haute");
        assert_eq!(&records[1][4], "Fellow");

        Ok(())
    }

    #[test]
    fn keeps_fields_verbatim_unless_trimming_is_asked() -> Result<(), Box<dyn Error>> {
        let data = "  padded ,\"quoted, with comma\"\n";

        let verbatim = CsvItemReaderBuilder::new()
            .headers(&["a", "b"])
            .from_str(data)?;
        assert_eq!(
            read_all(&verbatim),
            vec![vec!["  padded ", "quoted, with comma"]]
        );

        let trimmed = CsvItemReaderBuilder::new()
            .headers(&["a", "b"])
            .trim(Trim::All)
            .from_str(data)?;
        assert_eq!(
            read_all(&trimmed),
            vec![vec!["padded", "quoted, with comma"]]
        );

        Ok(())
    }

    #[test]
    fn uneven_records_need_flexible_mode() {
        let data = "a,b,c\nonly one\n";

        let strict = CsvItemReaderBuilder::new()
            .headers(&["x", "y", "z"])
            .from_str(data);
        assert!(matches!(strict, Err(BatchError::ItemReader(_))));

        let flexible = CsvItemReaderBuilder::new()
            .headers(&["x", "y", "z"])
            .flexible(true)
            .from_str(data)
            .unwrap();
        assert_eq!(flexible.remaining(), 2);
    }

    #[test]
    fn from_path_reads_the_whole_file() -> Result<(), Box<dyn Error>> {
        let file = NamedTempFile::new()?;
        fs::write(file.path(), "a;b\nc;d\n")?;

        let reader = CsvItemReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(file.path())?;

        assert!(reader.headers().is_empty());
        assert_eq!(read_all(&reader), vec![vec!["a", "b"], vec!["c", "d"]]);

        Ok(())
    }

    #[test]
    fn from_path_fails_on_missing_file() {
        let result = CsvItemReaderBuilder::new().from_path("does/not/exist.csv");

        match result {
            Err(BatchError::ItemReader(msg)) => assert!(msg.contains("exist.csv")),
            _ => panic!("Expected BatchError::ItemReader"),
        }
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let data = "1 Quay,\"QY,Ann,Port,Clerk\n\n2 Dock,DK,Bob,Harbour,Pilot\n";

        let result = CsvItemReaderBuilder::new()
            .headers(&["a", "b", "c", "d", "e"])
            .flexible(true)
            .from_str(data);

        match result {
            Err(BatchError::ItemReader(msg)) => assert!(msg.contains("line 1")),
            _ => panic!("Expected BatchError::ItemReader"),
        }
    }

    #[test]
    fn text_after_closing_quote_is_rejected() {
        let data = "2 Dock,DK\n\n\"1 Quay\"x,QY,Ann,Port,Clerk\n";

        let result = CsvItemReaderBuilder::new()
            .headers(&["a", "b", "c", "d", "e"])
            .flexible(true)
            .from_str(data);

        match result {
            Err(BatchError::ItemReader(msg)) => assert!(msg.contains("line 3")),
            _ => panic!("Expected BatchError::ItemReader"),
        }
    }

    #[test]
    fn well_formed_quoting_is_accepted() -> Result<(), Box<dyn Error>> {
        let data = "\"say \"\"hi\"\"\",\"multi\nline\",mid\"quote\n\"\",\"last\"";

        let reader = CsvItemReaderBuilder::new()
            .headers(&["a", "b", "c"])
            .flexible(true)
            .from_str(data)?;

        assert_eq!(
            read_all(&reader),
            vec![
                vec!["say \"hi\"", "multi\nline", "mid\"quote"],
                vec!["", "last"],
            ]
        );

        Ok(())
    }
}
