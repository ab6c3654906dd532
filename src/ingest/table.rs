use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{AppError, Result};

/// A CSV file held in memory, addressed by header name.
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers()?.clone();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!(rows = records.len(), columns = headers.len(), "Read csv");
        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of the named column in row order. Short rows yield empty strings.
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let index = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AppError::MissingColumn(name.to_string()))?;

        Ok(self
            .records
            .iter()
            .map(|record| record.get(index).unwrap_or_default().to_string())
            .collect())
    }
}
