#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, trace};
use nf_columnar::{Column, ColumnError};
use nf_frame::{DataFrame, FrameError};
use nf_types::{DEFAULT_NA_TOKEN, ErrorCategory, Kind, Nullable, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header written above the index labels when `CsvWriteOptions::index` is set.
pub const INDEX_HEADER: &str = "index";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("csv column '{0}' not found")]
    UnknownColumn(String),
    #[error("delimiter {0:?} must be a single ASCII character")]
    InvalidDelimiter(char),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl IoError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownColumn(_) => ErrorCategory::NotFound,
            Self::Io(err) if err.kind() == std::io::ErrorKind::NotFound => ErrorCategory::NotFound,
            Self::Csv(err) if matches!(err.kind(), csv::ErrorKind::UnequalLengths { .. }) => {
                ErrorCategory::ShapeMismatch
            }
            Self::MissingHeaders
            | Self::InvalidDelimiter(_)
            | Self::Csv(_)
            | Self::Io(_)
            | Self::Utf8(_)
            | Self::Json(_) => ErrorCategory::InvalidArgument,
            Self::Column(err) => err.category(),
            Self::Frame(err) => err.category(),
        }
    }
}

/// How CSV text becomes a [`DataFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvReadOptions {
    pub delimiter: char,
    /// First record names the columns; otherwise columns are named `0..n`.
    pub has_header: bool,
    /// Cell text read as NA.
    pub na_token: String,
    /// Column kinds to use instead of inference.
    pub kinds: BTreeMap<String, Kind>,
    /// Keep only these columns (file order is preserved).
    pub usecols: Option<Vec<String>>,
    /// Stop after this many data rows.
    pub nrows: Option<usize>,
    /// Column whose cells become the row labels (and is removed).
    pub index_col: Option<String>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            na_token: DEFAULT_NA_TOKEN.to_owned(),
            kinds: BTreeMap::new(),
            usecols: None,
            nrows: None,
            index_col: None,
        }
    }
}

impl CsvReadOptions {
    /// Options from a JSON object; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How a [`DataFrame`] becomes CSV text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvWriteOptions {
    pub delimiter: char,
    pub na_token: String,
    pub header: bool,
    /// Write index labels as a leading [`INDEX_HEADER`] column.
    pub index: bool,
    /// Write only these columns, in this order.
    pub columns: Option<Vec<String>>,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            na_token: DEFAULT_NA_TOKEN.to_owned(),
            header: true,
            index: false,
            columns: None,
        }
    }
}

impl CsvWriteOptions {
    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8, IoError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(IoError::InvalidDelimiter(delimiter))
}

// ── Import contract ────────────────────────────────────────────────────

fn is_missing_cell(cell: &str, na_token: &str) -> bool {
    cell == na_token || cell.trim().is_empty()
}

/// Narrowest kind that holds every present cell.
///
/// Int if every cell parses as `i64`, else Double if every cell parses as
/// `f64`, else Bool if every cell is `true`/`false`, else Str. Blank cells and
/// the NA token are not evidence; a column without evidence is Double.
#[must_use]
pub fn infer_kind<S: AsRef<str>>(cells: &[S], na_token: &str) -> Kind {
    let present: Vec<&str> = cells
        .iter()
        .map(AsRef::as_ref)
        .filter(|cell| !is_missing_cell(cell, na_token))
        .map(str::trim)
        .collect();
    if present.is_empty() {
        return Kind::Double;
    }
    if present.iter().all(|cell| cell.parse::<i64>().is_ok()) {
        Kind::Int
    } else if present.iter().all(|cell| cell.parse::<f64>().is_ok()) {
        Kind::Double
    } else if present.iter().all(|cell| cell.parse::<bool>().is_ok()) {
        Kind::Bool
    } else {
        Kind::Str
    }
}

fn parse_cells<T, S>(cells: &[S], na_token: &str) -> Vec<Nullable<T>>
where
    T: std::str::FromStr + nf_types::Primitive,
    S: AsRef<str>,
{
    cells
        .iter()
        .map(|cell| {
            let cell = cell.as_ref();
            if is_missing_cell(cell, na_token) {
                Nullable::na()
            } else {
                Nullable::from(cell.trim().parse::<T>().ok())
            }
        })
        .collect()
}

/// Parses text cells into a column of `kind`.
///
/// The NA token and cells that fail to parse become NA. Str columns keep
/// blank cells as empty strings.
#[must_use]
pub fn parse_column<S: AsRef<str>>(kind: Kind, cells: &[S], na_token: &str) -> Column {
    match kind {
        Kind::Int => Column::from_nullables(parse_cells::<i64, S>(cells, na_token)),
        Kind::Double => Column::from_nullables(parse_cells::<f64, S>(cells, na_token)),
        Kind::Bool => Column::from_nullables(parse_cells::<bool, S>(cells, na_token)),
        Kind::Str => Column::from_nullables(
            cells
                .iter()
                .map(|cell| {
                    let cell = cell.as_ref();
                    if cell == na_token {
                        Nullable::na()
                    } else {
                        Nullable::from(cell.to_owned())
                    }
                })
                .collect::<Vec<Nullable<String>>>(),
        ),
    }
}

// ── Export contract ────────────────────────────────────────────────────

fn render_value(value: &Value, na_token: &str) -> String {
    match value {
        Value::Na => na_token.to_owned(),
        Value::Double(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.1}"),
        other => other.to_string(),
    }
}

/// Text of one cell: the NA token for missing values, otherwise the value's
/// natural text. Integral doubles keep a trailing `.0`.
#[must_use]
pub fn render_cell(column: &Column, row: usize, na_token: &str) -> String {
    column
        .get(row)
        .map_or_else(|| na_token.to_owned(), |value| render_value(&value, na_token))
}

/// Every row of `frame` as cell text, in column order.
#[must_use]
pub fn export_rows(frame: &DataFrame, na_token: &str) -> Vec<Vec<String>> {
    (0..frame.num_rows())
        .map(|row| {
            frame
                .iter()
                .map(|(_, column)| render_cell(column, row, na_token))
                .collect()
        })
        .collect()
}

// ── CSV reading ────────────────────────────────────────────────────────

pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    read_csv_str_with_options(input, &CsvReadOptions::default())
}

pub fn read_csv_str_with_options(
    input: &str,
    options: &CsvReadOptions,
) -> Result<DataFrame, IoError> {
    read_from(input.as_bytes(), options)
}

pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    read_csv_with_options(path, &CsvReadOptions::default())
}

pub fn read_csv_with_options(
    path: impl AsRef<Path>,
    options: &CsvReadOptions,
) -> Result<DataFrame, IoError> {
    let path = path.as_ref();
    debug!("reading csv from {}", path.display());
    read_from(File::open(path)?, options)
}

fn read_from<R: Read>(input: R, options: &CsvReadOptions) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte(options.delimiter)?)
        .has_headers(options.has_header)
        .from_reader(input);

    let headers = if options.has_header {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        if headers.is_empty() {
            return Err(IoError::MissingHeaders);
        }
        Some(headers)
    } else {
        None
    };

    let limit = options.nrows.unwrap_or(usize::MAX);
    let records = reader
        .records()
        .take(limit)
        .collect::<Result<Vec<StringRecord>, _>>()?;

    let names = headers.unwrap_or_else(|| {
        let width = records.first().map_or(0, StringRecord::len);
        (0..width).map(|i| i.to_string()).collect()
    });

    for name in options
        .kinds
        .keys()
        .chain(options.usecols.iter().flatten())
        .chain(options.index_col.iter())
    {
        if !names.contains(name) {
            return Err(IoError::UnknownColumn(name.clone()));
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for (position, name) in names.iter().enumerate() {
        let wanted = options
            .usecols
            .as_ref()
            .is_none_or(|cols| cols.contains(name))
            || options.index_col.as_ref() == Some(name);
        if !wanted {
            continue;
        }
        let cells: Vec<&str> = records
            .iter()
            .map(|record| record.get(position).unwrap_or_default())
            .collect();
        let kind = options
            .kinds
            .get(name)
            .copied()
            .unwrap_or_else(|| infer_kind(&cells, &options.na_token));
        trace!("csv column '{name}' read as {kind}");
        columns.push((name.clone(), parse_column(kind, &cells, &options.na_token)));
    }

    let mut frame = DataFrame::from_columns(columns)?;
    if let Some(index_col) = &options.index_col {
        frame = frame.set_index_column(index_col, true)?;
    }
    debug!(
        "read csv: {} rows x {} columns",
        frame.num_rows(),
        frame.num_columns()
    );
    Ok(frame)
}

// ── CSV writing ────────────────────────────────────────────────────────

pub fn write_csv_string(frame: &DataFrame) -> Result<String, IoError> {
    write_csv_string_with_options(frame, &CsvWriteOptions::default())
}

pub fn write_csv_string_with_options(
    frame: &DataFrame,
    options: &CsvWriteOptions,
) -> Result<String, IoError> {
    let bytes = write_to(Vec::new(), frame, options)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_csv(frame: &DataFrame, path: impl AsRef<Path>) -> Result<(), IoError> {
    write_csv_with_options(frame, path, &CsvWriteOptions::default())
}

pub fn write_csv_with_options(
    frame: &DataFrame,
    path: impl AsRef<Path>,
    options: &CsvWriteOptions,
) -> Result<(), IoError> {
    let path = path.as_ref();
    debug!("writing csv to {}", path.display());
    write_to(File::create(path)?, frame, options)?;
    Ok(())
}

fn write_to<W: Write>(
    output: W,
    frame: &DataFrame,
    options: &CsvWriteOptions,
) -> Result<W, IoError> {
    let selected: Vec<(&str, &Column)> = match &options.columns {
        Some(names) => names
            .iter()
            .map(|name| {
                frame
                    .column(name)
                    .map(|column| (name.as_str(), column))
                    .map_err(|_| IoError::UnknownColumn(name.clone()))
            })
            .collect::<Result<_, _>>()?,
        None => frame.iter().collect(),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter_byte(options.delimiter)?)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(output);

    if options.header {
        let mut header: Vec<&str> = Vec::with_capacity(selected.len() + 1);
        if options.index {
            header.push(INDEX_HEADER);
        }
        header.extend(selected.iter().map(|(name, _)| *name));
        writer.write_record(&header)?;
    }

    let labels = frame.index().labels();
    for row in 0..frame.num_rows() {
        let mut record: Vec<String> = Vec::with_capacity(selected.len() + 1);
        if options.index
            && let Some(label) = labels.get(row)
        {
            record.push(label.clone());
        }
        record.extend(
            selected
                .iter()
                .map(|(_, column)| render_cell(column, row, &options.na_token)),
        );
        writer.write_record(&record)?;
    }

    debug!(
        "wrote csv: {} rows x {} columns",
        frame.num_rows(),
        selected.len()
    );
    writer.flush()?;
    writer.into_inner().map_err(|err| IoError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use nf_columnar::Column;
    use nf_frame::DataFrame;
    use nf_types::{ErrorCategory, Kind, Value};

    use super::{
        CsvReadOptions, CsvWriteOptions, IoError, export_rows, infer_kind, parse_column,
        read_csv_str, read_csv_str_with_options, render_cell, write_csv_string,
        write_csv_string_with_options,
    };

    // ── Import contract ────────────────────────────────────────────────

    #[test]
    fn infer_kind_picks_narrowest() {
        assert_eq!(infer_kind(&["1", "NA", "-3"], "NA"), Kind::Int);
        assert_eq!(infer_kind(&["1", "2.5"], "NA"), Kind::Double);
        assert_eq!(infer_kind(&["true", "false", ""], "NA"), Kind::Bool);
        assert_eq!(infer_kind(&["1", "x"], "NA"), Kind::Str);
        assert_eq!(infer_kind(&["NA", ""], "NA"), Kind::Double);
        assert_eq!(infer_kind::<&str>(&[], "NA"), Kind::Double);
    }

    #[test]
    fn parse_column_maps_na_token_and_failures_to_na() {
        let ints = parse_column(Kind::Int, &["1", "NA", "oops", " 4 "], "NA");
        assert_eq!(
            ints,
            Column::from(vec![Some(1_i64), None, None, Some(4)])
        );
        let strs = parse_column(Kind::Str, &["a", "", "-"], "-");
        assert_eq!(
            strs,
            Column::from(vec![Some("a"), Some(""), None])
        );
        let bools = parse_column(Kind::Bool, &["true", "yes"], "NA");
        assert_eq!(bools, Column::from(vec![Some(true), None]));
    }

    // ── Export contract ────────────────────────────────────────────────

    #[test]
    fn render_cell_keeps_double_kind_visible() {
        let doubles = Column::from(vec![Some(3.0), Some(2.5), None]);
        assert_eq!(render_cell(&doubles, 0, "NA"), "3.0");
        assert_eq!(render_cell(&doubles, 1, "NA"), "2.5");
        assert_eq!(render_cell(&doubles, 2, "?"), "?");
        assert_eq!(render_cell(&doubles, 9, "NA"), "NA");
        let bools = Column::from(vec![true, false]);
        assert_eq!(render_cell(&bools, 1, "NA"), "false");
    }

    #[test]
    fn export_rows_follows_column_order() {
        let df = DataFrame::from_columns([
            ("z", Column::from(vec![1_i64, 2])),
            ("a", Column::from(vec![Some("x"), None])),
        ])
        .expect("frame");
        assert_eq!(
            export_rows(&df, "NA"),
            vec![vec!["1", "x"], vec!["2", "NA"]]
        );
    }

    // ── Reading ────────────────────────────────────────────────────────

    #[test]
    fn mixed_dtypes_are_inferred() {
        let input = "ints,floats,strings,bools,nulls\n\
                     1,1.5,hello,true,NA\n\
                     2,2.7,world,false,\n\
                     3,3.14,foo,true,NA\n";
        let frame = read_csv_str(input).expect("parse");
        assert_eq!(frame.column_names(), &["ints", "floats", "strings", "bools", "nulls"]);
        assert_eq!(frame.column("ints").expect("ints").kind(), Kind::Int);
        assert_eq!(
            frame.column("floats").expect("floats").get(1),
            Some(Value::Double(2.7))
        );
        assert_eq!(
            frame.column("strings").expect("strings").get(2),
            Some(Value::from("foo"))
        );
        assert_eq!(frame.column("bools").expect("bools").kind(), Kind::Bool);
        let nulls = frame.column("nulls").expect("nulls");
        assert_eq!(nulls.kind(), Kind::Double);
        assert_eq!(nulls.na_count(), 3);
        assert!(frame.index().is_default());
    }

    #[test]
    fn header_only_input_gives_empty_columns() {
        let frame = read_csv_str("x,y,z\n").expect("parse");
        assert_eq!(frame.num_rows(), 0);
        assert_eq!(frame.column_names(), &["x", "y", "z"]);
    }

    #[test]
    fn empty_input_has_no_headers() {
        let err = read_csv_str("").expect_err("empty");
        assert!(matches!(err, IoError::MissingHeaders));
    }

    #[test]
    fn quoted_fields_and_unicode_headers() {
        let input = "名前,address\n\"Smith, John\",\"123 Main St\nApt 4\"\nJane,\"456 Oak, Suite 1\"\n";
        let frame = read_csv_str(input).expect("parse");
        assert_eq!(frame.num_rows(), 2);
        assert_eq!(
            frame.column("名前").expect("name").get(0),
            Some(Value::from("Smith, John"))
        );
        let address = frame.column("address").expect("address").get(0);
        assert!(address.as_ref().and_then(Value::as_str).is_some_and(|s| s.contains('\n')));
    }

    #[test]
    fn trailing_newline_is_optional() {
        let with = read_csv_str("a,b\n1,2\n3,4\n").expect("with");
        let without = read_csv_str("a,b\n1,2\n3,4").expect("without");
        assert!(with.equals(&without));
    }

    #[test]
    fn ragged_rows_are_shape_errors() {
        let err = read_csv_str("a,b\n1,2\n3\n").expect_err("ragged");
        assert_eq!(err.category(), ErrorCategory::ShapeMismatch);
    }

    #[test]
    fn headerless_input_numbers_columns() {
        let options = CsvReadOptions {
            has_header: false,
            ..CsvReadOptions::default()
        };
        let frame = read_csv_str_with_options("1,a\n2,b\n", &options).expect("parse");
        assert_eq!(frame.column_names(), &["0", "1"]);
        assert_eq!(frame.num_rows(), 2);
    }

    #[test]
    fn read_options_select_and_limit() {
        let input = "id;name;score\nk1;ann;1.5\nk2;bob;-\nk3;cid;3\n";
        let options = CsvReadOptions {
            delimiter: ';',
            na_token: "-".to_owned(),
            usecols: Some(vec!["score".to_owned()]),
            nrows: Some(2),
            index_col: Some("id".to_owned()),
            ..CsvReadOptions::default()
        };
        let frame = read_csv_str_with_options(input, &options).expect("parse");
        assert_eq!(frame.column_names(), &["score"]);
        assert_eq!(frame.index().labels(), &["k1", "k2"]);
        assert_eq!(
            frame.column("score").expect("score"),
            &Column::from(vec![Some(1.5), None])
        );
    }

    #[test]
    fn explicit_kinds_override_inference() {
        let mut kinds = BTreeMap::new();
        kinds.insert("code".to_owned(), Kind::Str);
        kinds.insert("n".to_owned(), Kind::Double);
        let options = CsvReadOptions {
            kinds,
            ..CsvReadOptions::default()
        };
        let frame = read_csv_str_with_options("code,n\n007,1\n", &options).expect("parse");
        assert_eq!(
            frame.column("code").expect("code").get(0),
            Some(Value::from("007"))
        );
        assert_eq!(frame.column("n").expect("n").kind(), Kind::Double);
    }

    #[test]
    fn unknown_option_columns_are_not_found() {
        let options = CsvReadOptions {
            usecols: Some(vec!["missing".to_owned()]),
            ..CsvReadOptions::default()
        };
        let err = read_csv_str_with_options("a\n1\n", &options).expect_err("unknown");
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let options = CsvReadOptions {
            delimiter: '→',
            ..CsvReadOptions::default()
        };
        let err = read_csv_str_with_options("a\n", &options).expect_err("delimiter");
        assert!(matches!(err, IoError::InvalidDelimiter('→')));
    }

    #[test]
    fn options_load_from_json() {
        let read = CsvReadOptions::from_json_str(
            r#"{"delimiter":"\t","kinds":{"id":"str"},"nrows":10}"#,
        )
        .expect("read options");
        assert_eq!(read.delimiter, '\t');
        assert_eq!(read.kinds.get("id"), Some(&Kind::Str));
        assert_eq!(read.nrows, Some(10));
        assert!(read.has_header);
        assert_eq!(read.na_token, "NA");

        let write = CsvWriteOptions::from_json_str(r#"{"index":true}"#).expect("write options");
        assert!(write.index && write.header);
        assert!(CsvReadOptions::from_json_str("{\"nrows\":\"x\"}").is_err());
    }

    // ── Writing ────────────────────────────────────────────────────────

    #[test]
    fn golden_output() {
        let input = "a,b,c,d\n1,hello,3.14,true\n2,NA,4,false\n3,\"x,y\",NA,NA\n";
        let frame = read_csv_str(input).expect("parse");
        let output = write_csv_string(&frame).expect("write");
        let expected = "a,b,c,d\n1,hello,3.14,true\n2,NA,4.0,false\n3,\"x,y\",NA,NA\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn write_options_shape_output() {
        let frame = DataFrame::from_columns([
            ("x", Column::from(vec![1_i64, 2])),
            ("y", Column::from(vec![Some(0.5), None])),
        ])
        .expect("frame")
        .set_index(vec!["r1".to_owned(), "r2".to_owned()])
        .expect("labels");
        let options = CsvWriteOptions {
            delimiter: '|',
            na_token: String::new(),
            index: true,
            columns: Some(vec!["y".to_owned()]),
            ..CsvWriteOptions::default()
        };
        let output = write_csv_string_with_options(&frame, &options).expect("write");
        assert_eq!(output, "index|y\nr1|0.5\nr2|\n");

        let headerless = CsvWriteOptions {
            header: false,
            ..CsvWriteOptions::default()
        };
        let output = write_csv_string_with_options(&frame, &headerless).expect("write");
        assert_eq!(output, "1,0.5\n2,NA\n");

        let missing = CsvWriteOptions {
            columns: Some(vec!["nope".to_owned()]),
            ..CsvWriteOptions::default()
        };
        assert!(matches!(
            write_csv_string_with_options(&frame, &missing),
            Err(IoError::UnknownColumn(_))
        ));
    }

    #[test]
    fn index_column_survives_round_trip() {
        let frame = DataFrame::from_columns([("v", Column::from(vec![1_i64, 2]))])
            .expect("frame")
            .set_index(vec!["a".to_owned(), "b".to_owned()])
            .expect("labels");
        let options = CsvWriteOptions {
            index: true,
            ..CsvWriteOptions::default()
        };
        let text = write_csv_string_with_options(&frame, &options).expect("write");
        let read = CsvReadOptions {
            index_col: Some(super::INDEX_HEADER.to_owned()),
            ..CsvReadOptions::default()
        };
        let back = read_csv_str_with_options(&text, &read).expect("read");
        assert_eq!(back, frame);
    }
}
