//! File I/O for the staged tables
//!
//! The raw survey extract is CSV; every inter-stage hand-off is a Parquet
//! file. Readers return one concatenated `RecordBatch` per table since the
//! pipeline is a synchronous batch process.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Error, Result};
use crate::utils::logging::log_operation_complete;

/// Validates that a file exists and is a regular file
///
/// # Arguments
/// * `path` - The file path to check
///
/// # Returns
/// `Ok(())` if the file exists, otherwise an error
pub fn validate_file(path: &Path) -> Result<()> {
    if !path.exists() || !path.is_file() {
        return Err(Error::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File does not exist: {}", path.display()),
            ),
        ));
    }
    Ok(())
}

/// Read a raw CSV extract into a single record batch with every column as
/// nullable Utf8.
///
/// Survey extracts mix numeric codes, blanks and free text in the same
/// column, so type coercion is done per target column by the cleaner rather
/// than trusting CSV inference.
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    validate_file(path)?;

    // First pass only discovers the column names
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(file, Some(100))?;

    if inferred.fields().is_empty() {
        return Err(Error::Data(format!(
            "no columns found in raw input {}",
            path.display()
        )));
    }

    let string_fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(string_fields));

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    if batches.is_empty() {
        return Err(Error::Data(format!(
            "raw input {} contains no data rows",
            path.display()
        )));
    }

    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Read a Parquet table into a single record batch
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    validate_file(path)?;

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Write a record batch to a Parquet file, creating parent directories
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let start = Instant::now();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;

    log_operation_complete("wrote", path, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir()
            .join("ev-propensity-io-tests")
            .join(format!("{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn csv_reads_every_column_as_nullable_strings() {
        let dir = temp_dir("csv");
        let path = dir.join("raw.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "hhid,age,income").unwrap();
        writeln!(file, "H1,34,1200.5").unwrap();
        writeln!(file, "H2,,").unwrap();

        let batch = read_csv(&path).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        for field in batch.schema().fields() {
            assert_eq!(field.data_type(), &DataType::Utf8);
        }
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = read_csv(Path::new("/nonexistent/raw.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/raw.csv"));
    }

    #[test]
    fn parquet_round_trip_preserves_rows() {
        use crate::models::LabeledHousehold;

        let dir = temp_dir("parquet");
        let path = dir.join("labels.parquet");
        let rows = vec![LabeledHousehold {
            household_id: "H1".to_string(),
            person_id: "P1".to_string(),
            propensity_score: Some(0.5),
            label: Some(1),
        }];

        let batch = LabeledHousehold::to_record_batch(&rows).unwrap();
        write_parquet(&batch, &path).unwrap();

        let restored = read_parquet(&path).unwrap();
        assert_eq!(restored.num_rows(), 1);
        let typed = LabeledHousehold::from_record_batch(&restored).unwrap();
        assert_eq!(typed, rows);
    }
}
