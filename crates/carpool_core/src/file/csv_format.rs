//! Tabular format: header row of field names, one row per entity.

use super::FileFormat;
use crate::error::{Backend, Cause};
use crate::model::entity::Entity;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl FileFormat for CsvFormat {
    const BACKEND: Backend = Backend::Csv;
    const EXTENSION: &'static str = "csv";

    fn encode<T: Entity>(items: &[T]) -> Result<Vec<u8>, Cause> {
        // Header is written by hand so an empty collection still carries it.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(T::FIELDS)?;
        for item in items {
            writer.serialize(item)?;
        }
        let bytes = writer.into_inner().map_err(|err| err.into_error())?;
        Ok(bytes)
    }

    /// An empty cell reads back as `None`, so `Some("")` cannot be stored.
    fn check<T: Entity>(item: &T) -> Result<(), String> {
        if T::OPTIONAL_TEXT_FIELDS.is_empty() {
            return Ok(());
        }
        let value = serde_json::to_value(item).map_err(|err| err.to_string())?;
        for field in T::OPTIONAL_TEXT_FIELDS {
            if value.get(*field).and_then(Value::as_str) == Some("") {
                return Err(format!(
                    "empty `{field}` is indistinguishable from an absent value in CSV; use None"
                ));
            }
        }
        Ok(())
    }

    fn decode<T: Entity>(bytes: &[u8]) -> Result<Vec<T>, Cause> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        if !headers.iter().eq(T::FIELDS.iter().copied()) {
            return Err(format!(
                "unexpected header row `{}` for {}; expected `{}`",
                headers.iter().collect::<Vec<_>>().join(","),
                T::COLLECTION,
                T::FIELDS.join(",")
            )
            .into());
        }

        let mut items = Vec::new();
        for record in reader.deserialize::<T>() {
            items.push(record?);
        }
        Ok(items)
    }
}
