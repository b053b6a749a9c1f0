//! Operation streams
//!
//! Rows are split from delimited text, then dispatched to a decoder chosen
//! by a key extracted from the row (usually the first column).

use cadence_core::{Operation, OperationId, Time};
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::io::BufRead;
use std::rc::Rc;

use crate::database::DATABASE_OPERATION_KINDS;
use crate::error::DecodingError;

pub type Row = Vec<String>;

type RowIter = Box<dyn Iterator<Item = Result<Row, DecodingError>>>;

/// Turns one row into one event
pub trait EventDecoder<T> {
    fn decode_event(&mut self, row: &[String]) -> Result<T, DecodingError>;
}

impl<T, F> EventDecoder<T> for F
where
    F: FnMut(&[String]) -> Result<T, DecodingError>,
{
    fn decode_event(&mut self, row: &[String]) -> Result<T, DecodingError> {
        self(row)
    }
}

/// Split delimited lines into rows, skipping blank lines
pub fn csv_rows<R>(
    reader: R,
    delimiter: &str,
) -> impl Iterator<Item = Result<Row, DecodingError>> + use<R>
where
    R: BufRead,
{
    let delimiter = delimiter.to_string();
    reader.lines().filter_map(move |line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line
            .split(delimiter.as_str())
            .map(str::to_string)
            .collect())),
        Err(e) => Some(Err(DecodingError::Io(e.to_string()))),
    })
}

/// Event stream over delimited rows, one decoder per key
pub struct CsvEventStreamReader<T, K> {
    rows: RowIter,
    decoders: HashMap<K, Box<dyn EventDecoder<T>>>,
    key_extractor: Box<dyn Fn(&[String]) -> K>,
}

impl<T, K> CsvEventStreamReader<T, K>
where
    K: Eq + Hash + Display,
{
    pub fn new<I>(
        rows: I,
        decoders: HashMap<K, Box<dyn EventDecoder<T>>>,
        key_extractor: impl Fn(&[String]) -> K + 'static,
    ) -> Self
    where
        I: Iterator<Item = Result<Row, DecodingError>> + 'static,
    {
        Self {
            rows: Box::new(rows),
            decoders,
            key_extractor: Box::new(key_extractor),
        }
    }
}

impl<T, K> Iterator for CsvEventStreamReader<T, K>
where
    K: Eq + Hash + Display,
{
    type Item = Result<T, DecodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        let key = (self.key_extractor)(&row);
        Some(match self.decoders.get_mut(&key) {
            Some(decoder) => decoder.decode_event(&row),
            None => Err(DecodingError::NoDecoder {
                row,
                key: key.to_string(),
            }),
        })
    }
}

/// Decoder for `kind|scheduled_ms|dependency_ms|params_json` rows
///
/// An empty dependency means none, empty params mean `null`. Params may
/// contain the delimiter; everything after the third column is params.
/// Decoders sharing `next_id` hand out ids in stream order.
pub fn operation_decoder(
    delimiter: &str,
    next_id: Rc<Cell<OperationId>>,
) -> impl FnMut(&[String]) -> Result<Operation, DecodingError> + use<> {
    let delimiter = delimiter.to_string();
    move |row: &[String]| {
        let invalid = |reason: String| DecodingError::InvalidRow {
            row: row.to_vec(),
            reason,
        };
        if row.len() < 2 {
            return Err(invalid(format!("expected at least 2 columns, got {}", row.len())));
        }

        let scheduled_ms = parse_millis(&row[1])
            .ok_or_else(|| invalid(format!("invalid scheduled start '{}'", row[1])))?;
        let mut operation = Operation::new(next_id.get(), row[0].trim(), Time::from_milli(scheduled_ms));

        if let Some(dependency) = row.get(2).map(|column| column.trim())
            && !dependency.is_empty()
        {
            let dependency_ms = parse_millis(dependency)
                .ok_or_else(|| invalid(format!("invalid dependency time '{}'", dependency)))?;
            operation = operation.with_dependency(Time::from_milli(dependency_ms));
        }

        if row.len() > 3 {
            let params = row[3..].join(&delimiter);
            if !params.trim().is_empty() {
                let params: Value = serde_json::from_str(&params)
                    .map_err(|e| invalid(format!("invalid params: {}", e)))?;
                operation = operation.with_params(params);
            }
        }

        next_id.set(next_id.get() + 1);
        Ok(operation)
    }
}

fn parse_millis(column: &str) -> Option<u64> {
    column.trim().parse().ok()
}

/// Database operations read from delimited text
///
/// Rows whose kind is not a database operation surface as
/// [`DecodingError::NoDecoder`].
pub fn operation_stream<R>(reader: R, delimiter: &str) -> CsvEventStreamReader<Operation, String>
where
    R: BufRead + 'static,
{
    let next_id = Rc::new(Cell::new(0));
    let decoders = DATABASE_OPERATION_KINDS
        .iter()
        .map(|kind| {
            let decoder: Box<dyn EventDecoder<Operation>> =
                Box::new(operation_decoder(delimiter, Rc::clone(&next_id)));
            (kind.to_string(), decoder)
        })
        .collect();

    CsvEventStreamReader::new(csv_rows(reader, delimiter), decoders, |row: &[String]| {
        row.first().map(|kind| kind.trim().to_string()).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Debug, PartialEq)]
    enum Event {
        Add(i64),
        Name(String),
    }

    fn rows(text: &'static str) -> impl Iterator<Item = Result<Row, DecodingError>> {
        csv_rows(Cursor::new(text), "|")
    }

    #[test]
    fn test_csv_rows_splits_and_skips_blank_lines() {
        let rows: Vec<Row> = rows("a|b|c\n\n  \nd||e\n").map(Result::unwrap).collect();
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string(), String::new(), "e".to_string()],
            ]
        );
    }

    #[test]
    fn test_reader_dispatches_by_key() {
        let mut decoders: HashMap<String, Box<dyn EventDecoder<Event>>> = HashMap::new();
        decoders.insert(
            "add".to_string(),
            Box::new(|row: &[String]| {
                row[1].parse().map(Event::Add).map_err(|_| DecodingError::InvalidRow {
                    row: row.to_vec(),
                    reason: "not a number".to_string(),
                })
            }),
        );
        decoders.insert(
            "name".to_string(),
            Box::new(|row: &[String]| -> Result<Event, DecodingError> {
                Ok(Event::Name(row[1].clone()))
            }),
        );

        let reader = CsvEventStreamReader::new(rows("add|5\nname|x\nadd|-2\n"), decoders, |row| {
            row[0].clone()
        });
        let events: Vec<Event> = reader.map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![Event::Add(5), Event::Name("x".to_string()), Event::Add(-2)]
        );
    }

    #[test]
    fn test_missing_decoder_names_row_and_key() {
        let mut decoders: HashMap<String, Box<dyn EventDecoder<Event>>> = HashMap::new();
        decoders.insert(
            "add".to_string(),
            Box::new(|_: &[String]| -> Result<Event, DecodingError> { Ok(Event::Add(0)) }),
        );

        let mut reader =
            CsvEventStreamReader::new(rows("add|1\nmul|2\n"), decoders, |row| row[0].clone());
        assert!(reader.next().unwrap().is_ok());

        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(
            err,
            DecodingError::NoDecoder {
                row: vec!["mul".to_string(), "2".to_string()],
                key: "mul".to_string(),
            }
        );
        assert!(err.to_string().contains("DECODER KEY: mul"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_operation_stream() {
        let text = "insert|100||{\"table\":\"person\",\"key\":\"p1\",\"values\":{\"name\":\"a|b\"}}\n\
                    read|200|100|{\"table\":\"person\",\"key\":\"p1\"}\n\
                    scan|300\n";
        let operations: Vec<Operation> = operation_stream(Cursor::new(text), "|")
            .map(Result::unwrap)
            .collect();

        assert_eq!(operations.len(), 3);
        assert_eq!(
            operations.iter().map(|op| op.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(operations[0].params["values"]["name"], "a|b");
        assert_eq!(operations[0].dependency_time, None);
        assert_eq!(operations[1].scheduled_start, Time::from_milli(200));
        assert_eq!(operations[1].dependency_time, Some(Time::from_milli(100)));
        assert_eq!(operations[2].kind, "scan");
        assert_eq!(operations[2].params, Value::Null);
    }

    #[test]
    fn test_operation_stream_rejects_bad_rows() {
        let mut stream = operation_stream(Cursor::new("read|soon\nupsert|1\n"), "|");

        assert!(matches!(
            stream.next(),
            Some(Err(DecodingError::InvalidRow { reason, .. })) if reason.contains("soon")
        ));
        assert!(matches!(
            stream.next(),
            Some(Err(DecodingError::NoDecoder { key, .. })) if key == "upsert"
        ));
    }
}
