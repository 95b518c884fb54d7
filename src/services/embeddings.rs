//! Movie embedding table.
//!
//! The table is read once at startup from a comma-separated file with a
//! header row naming `feature_1` .. `feature_16` and `id`. Columns are looked
//! up by name, so their order does not matter and extra columns (such as an
//! unnamed index column or a quoted title) are ignored.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::models::{Embedding, MovieId, EMBEDDING_DIM};

/// Name of the identifier column
const ID_COLUMN: &str = "id";

/// Errors that can occur while loading the embedding table
#[derive(Error, Debug)]
pub enum EmbeddingLoadError {
    /// File could not be found or opened
    #[error("Failed to open file {path}: {source}")]
    FileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The reader failed or the input is not valid CSV
    #[error("CSV error: {0}")]
    Csv(#[source] csv::Error),

    /// Header row lacks a required column
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A row does not have as many fields as the header
    #[error("Expected {expected} fields but found {found} in line {line}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },

    /// A field could not be parsed as a number
    #[error("Invalid value for {field} in line {line}: {value:?}")]
    InvalidValue {
        field: String,
        line: usize,
        value: String,
    },

    /// The file has a header but no rows
    #[error("Embedding table contains no movies")]
    Empty,
}

impl From<csv::Error> for EmbeddingLoadError {
    fn from(err: csv::Error) -> Self {
        if let csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } = err.kind()
        {
            return EmbeddingLoadError::FieldCountMismatch {
                expected: *expected_len as usize,
                found: *len as usize,
                line: pos.as_ref().map_or(0, |p| p.line() as usize),
            };
        }
        EmbeddingLoadError::Csv(err)
    }
}

pub type Result<T> = std::result::Result<T, EmbeddingLoadError>;

/// Positions of the required columns within a record
struct ColumnLayout {
    features: [usize; EMBEDDING_DIM],
    id: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| EmbeddingLoadError::MissingColumn(name.to_string()))
        };

        let mut features = [0usize; EMBEDDING_DIM];
        for (i, slot) in features.iter_mut().enumerate() {
            *slot = position(&feature_column(i))?;
        }

        Ok(Self {
            features,
            id: position(ID_COLUMN)?,
        })
    }
}

fn feature_column(index: usize) -> String {
    format!("feature_{}", index + 1)
}

/// Parses an identifier, tolerating integral floats such as `42.0`
fn parse_id(raw: &str, line: usize) -> Result<MovieId> {
    let invalid = || EmbeddingLoadError::InvalidValue {
        field: ID_COLUMN.to_string(),
        line,
        value: raw.to_string(),
    };

    if let Ok(id) = raw.parse::<MovieId>() {
        return Ok(id);
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as MovieId),
        _ => Err(invalid()),
    }
}

/// Read-only lookup from movie id to embedding, plus the catalog of known ids
#[derive(Debug, Clone, Default)]
pub struct EmbeddingTable {
    vectors: HashMap<MovieId, Embedding>,
    /// Known ids in order of first appearance
    catalog: Vec<MovieId>,
}

impl EmbeddingTable {
    /// Loads the table from a CSV file on disk
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EmbeddingLoadError::FileNotFound {
            path: path.display().to_string(),
            source,
        })?;

        let table = Self::from_reader(file)?;

        tracing::info!(
            path = %path.display(),
            movies = table.len(),
            "Loaded movie embeddings"
        );

        Ok(table)
    }

    /// Parses the table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(EmbeddingLoadError::Empty);
        }
        let layout = ColumnLayout::from_headers(&headers)?;

        let mut table = Self::default();

        for result in reader.records() {
            let record = result?;
            let line_no = record.position().map_or(0, |p| p.line() as usize);

            let mut vector = [0.0f32; EMBEDDING_DIM];
            for (i, &column) in layout.features.iter().enumerate() {
                let raw = record.get(column).unwrap_or_default();
                vector[i] = raw.parse().map_err(|_| EmbeddingLoadError::InvalidValue {
                    field: feature_column(i),
                    line: line_no,
                    value: raw.to_string(),
                })?;
            }

            let id = parse_id(record.get(layout.id).unwrap_or_default(), line_no)?;
            table.insert(id, vector);
        }

        if table.is_empty() {
            return Err(EmbeddingLoadError::Empty);
        }

        Ok(table)
    }

    /// Builds a table from in-memory entries
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (MovieId, Embedding)>,
    {
        let mut table = Self::default();
        for (id, vector) in entries {
            table.insert(id, vector);
        }
        table
    }

    /// Last write wins for the vector; the catalog keeps the first position
    fn insert(&mut self, id: MovieId, vector: Embedding) {
        match self.vectors.entry(id) {
            Entry::Occupied(mut existing) => {
                tracing::debug!(movie_id = id, "Duplicate embedding row, keeping the later one");
                existing.insert(vector);
            }
            Entry::Vacant(slot) => {
                slot.insert(vector);
                self.catalog.push(id);
            }
        }
    }

    /// Embedding for a movie, if known
    pub fn get(&self, movie_id: MovieId) -> Option<&Embedding> {
        self.vectors.get(&movie_id)
    }

    /// Embedding for a movie, or the zero vector for unknown ids
    pub fn vector_or_zero(&self, movie_id: MovieId) -> Embedding {
        self.get(movie_id).copied().unwrap_or([0.0; EMBEDDING_DIM])
    }

    /// Every known movie id
    pub fn catalog(&self) -> &[MovieId] {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> String {
        let mut columns: Vec<String> = (0..EMBEDDING_DIM).map(feature_column).collect();
        columns.push("id".to_string());
        columns.join(",")
    }

    fn row(value: f32, id: &str) -> String {
        let mut fields: Vec<String> = (0..EMBEDDING_DIM).map(|_| value.to_string()).collect();
        fields.push(id.to_string());
        fields.join(",")
    }

    fn parse(text: &str) -> Result<EmbeddingTable> {
        EmbeddingTable::from_reader(Cursor::new(text.to_string()))
    }

    #[test]
    fn test_parse_basic_table() {
        let text = format!("{}\n{}\n{}\n", header(), row(0.5, "1"), row(-1.0, "2"));
        let table = parse(&text).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.catalog(), &[1, 2]);
        assert_eq!(table.get(1), Some(&[0.5; EMBEDDING_DIM]));
        assert_eq!(table.get(2), Some(&[-1.0; EMBEDDING_DIM]));
    }

    #[test]
    fn test_columns_located_by_name() {
        // id first, plus an unnamed index column
        let mut columns = vec![String::new(), "id".to_string()];
        columns.extend((0..EMBEDDING_DIM).rev().map(feature_column));
        let mut fields = vec!["0".to_string(), "9".to_string()];
        fields.extend((0..EMBEDDING_DIM).rev().map(|i| i.to_string()));

        let text = format!("{}\n{}\n", columns.join(","), fields.join(","));
        let table = parse(&text).unwrap();

        let vector = table.get(9).unwrap();
        for (i, value) in vector.iter().enumerate() {
            assert_eq!(*value, i as f32);
        }
    }

    #[test]
    fn test_duplicate_ids_last_row_wins() {
        let text = format!(
            "{}\n{}\n{}\n{}\n",
            header(),
            row(1.0, "5"),
            row(2.0, "6"),
            row(3.0, "5")
        );
        let table = parse(&text).unwrap();

        assert_eq!(table.catalog(), &[5, 6]);
        assert_eq!(table.get(5), Some(&[3.0; EMBEDDING_DIM]));
    }

    #[test]
    fn test_integral_float_id_accepted() {
        let text = format!("{}\n{}\n", header(), row(1.0, "42.0"));
        let table = parse(&text).unwrap();
        assert_eq!(table.catalog(), &[42]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = format!("{}\n\n{}\n\n", header(), row(1.0, "1"));
        assert_eq!(parse(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_quoted_extra_column_with_comma() {
        let text = format!(
            "{},title\n{},\"Matrix, The (1999)\"\n",
            header(),
            row(0.5, "7")
        );
        let table = parse(&text).unwrap();

        assert_eq!(table.catalog(), &[7]);
        assert_eq!(table.get(7), Some(&[0.5; EMBEDDING_DIM]));
    }

    #[test]
    fn test_quoted_numeric_fields() {
        let quoted: Vec<String> = row(1.5, "8").split(',').map(|f| format!("\"{}\"", f)).collect();
        let text = format!("{}\n{}\n", header(), quoted.join(","));
        let table = parse(&text).unwrap();

        assert_eq!(table.get(8), Some(&[1.5; EMBEDDING_DIM]));
    }

    #[test]
    fn test_missing_feature_column() {
        let text = header().replace("feature_7,", "");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, EmbeddingLoadError::MissingColumn(ref c) if c == "feature_7"));
    }

    #[test]
    fn test_invalid_feature_value() {
        let bad = row(1.0, "3").replacen("1", "abc", 1);
        let text = format!("{}\n{}\n", header(), bad);
        let err = parse(&text).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingLoadError::InvalidValue { ref field, line: 2, .. } if field == "feature_1"
        ));
    }

    #[test]
    fn test_invalid_id_value() {
        let text = format!("{}\n{}\n", header(), row(1.0, "3.5"));
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, EmbeddingLoadError::InvalidValue { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_short_row() {
        let text = format!("{}\n1.0,2.0,7\n", header());
        let err = parse(&text).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingLoadError::FieldCountMismatch { expected: 17, found: 3, line: 2 }
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse(&format!("{}\n", header())).unwrap_err();
        assert!(matches!(err, EmbeddingLoadError::Empty));
        assert!(matches!(parse("").unwrap_err(), EmbeddingLoadError::Empty));
    }

    #[test]
    fn test_missing_file() {
        let err = EmbeddingTable::load_from_file("/nonexistent/movie_embeddings.csv").unwrap_err();
        assert!(matches!(err, EmbeddingLoadError::FileNotFound { .. }));
    }

    #[test]
    fn test_unknown_id_resolves_to_zero_vector() {
        let table = EmbeddingTable::from_entries([(1, [1.0; EMBEDDING_DIM])]);
        assert_eq!(table.vector_or_zero(99), [0.0; EMBEDDING_DIM]);
        assert_eq!(table.vector_or_zero(1), [1.0; EMBEDDING_DIM]);
    }
}
