use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type,
};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{MeasurementRecord, MeasurementTable};
use super::schema::Schema;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one measurement per row
/// * `.json`    – `[{ "State": ..., "County": ..., ... }, ...]`
/// * `.parquet` – flat columns with the same names as the CSV headers
pub fn load_file(path: &Path) -> Result<MeasurementTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_csv(file)
        }
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            parse_json(&text)
        }
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} records ({} skipped) from {}",
        table.len(),
        table.skipped_rows,
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Row accumulation shared by every format
// ---------------------------------------------------------------------------

struct TableBuilder {
    schema: Schema,
    records: Vec<MeasurementRecord>,
    skipped: usize,
}

impl TableBuilder {
    fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
            skipped: 0,
        }
    }

    fn push_row<S: AsRef<str>>(&mut self, row: usize, cells: &[S]) -> Result<()> {
        match self.schema.record(row, cells)? {
            Some(rec) => self.records.push(rec),
            None => {
                log::warn!("Row {row}: value is missing or not numeric, skipping");
                self.skipped += 1;
            }
        }
        Ok(())
    }

    fn finish(self) -> MeasurementTable {
        let mut table = MeasurementTable::from_records(self.records, self.schema.cadence);
        table.skipped_rows = self.skipped;
        table
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read a CSV table from any reader. Headers are trimmed, cells are not.
pub fn read_csv<R: Read>(reader: R) -> Result<MeasurementTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let schema = Schema::resolve(&headers)?;

    let mut builder = TableBuilder::new(schema);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cells: Vec<&str> = record.iter().collect();
        builder.push_row(row_no, &cells)?;
    }
    Ok(builder.finish())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "State": "ND", "County": "Cass", "Material": "PM2.5",
///     "Month/Year": "01/2021", "Monthly Measurements": 5.2 },
///   ...
/// ]
/// ```
pub fn parse_json(text: &str) -> Result<MeasurementTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root
        .as_array()
        .context("Expected top-level JSON array")?;

    // Column order is first-seen order across all objects.
    let mut headers: Vec<String> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let schema = Schema::resolve(&headers)?;

    let mut builder = TableBuilder::new(schema);
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let cells: Vec<String> = headers
            .iter()
            .map(|h| obj.get(h).map(json_cell_text).unwrap_or_default())
            .collect();
        builder.push_row(i, &cells)?;
    }
    Ok(builder.finish())
}

fn json_cell_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_f64().map(|f| f.to_string()))
            .unwrap_or_else(|| n.to_string()),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one measurement per row.
///
/// Columns may be strings, integers, floats, or `Date32`; all are rendered
/// to text and resolved exactly like CSV cells. Works with files written by
/// both **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<MeasurementTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let schema = Schema::resolve(&headers)?;
    let reader = builder.build().context("building parquet reader")?;

    let mut table = TableBuilder::new(schema);
    let mut row_no = 0;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells: Vec<String> = batch
                .columns()
                .iter()
                .map(|col| arrow_cell_text(col, row))
                .collect();
            table.push_row(row_no, &cells)?;
            row_no += 1;
        }
    }
    Ok(table.finish())
}

/// Render a single Arrow cell as text. Nulls become the empty string.
fn arrow_cell_text(col: &ArrayRef, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row).to_string(),
        DataType::Float32 => col.as_primitive::<Float32Type>().value(row).to_string(),
        DataType::Float64 => col.as_primitive::<Float64Type>().value(row).to_string(),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        _ => array_value_to_string(col, row).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema as ArrowSchema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::Cadence;
    use crate::data::schema::SchemaError;

    const CSV: &str = "\
State,County,Material,Month/Year,Monthly Measurements,Yearly Measurement Average
ND,Cass,PM2.5,01/2021,5.0,6.0
ND,Cass,PM2.5,02/2021,7.0,6.0
ND,Cass,PM2.5,not-a-date,1.0,6.0
ND,Cass,CO,01/2021,,
MN,Clay,NO2,01/2021,12.5,
";

    #[test]
    fn csv_loads_and_skips_non_numeric_values() {
        let table = read_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(table.cadence, Cadence::Monthly);
        assert!(table.has_yearly_average);
        assert_eq!(table.records[0].period, "01/2021");
        assert_eq!(table.records[0].yearly_average, Some(6.0));
        assert_eq!(table.records[3].yearly_average, None);
        assert_eq!(table.states(), vec!["ND", "MN"]);
        // The CO row was skipped, so it is not offered as an option.
        assert_eq!(table.materials("ND", "Cass"), vec!["PM2.5"]);
    }

    #[test]
    fn csv_missing_column_is_schema_error() {
        let err = read_csv("State,County,Date,Measurement\nND,Cass,2021-01-01,1\n".as_bytes())
            .unwrap_err();
        let schema_err = err.downcast_ref::<SchemaError>().unwrap();
        assert!(matches!(
            schema_err,
            SchemaError::MissingColumn {
                field: "material",
                ..
            }
        ));
    }

    #[test]
    fn csv_ragged_row_is_an_error() {
        let text = "State,County,Material,Date,Measurement\nND,Cass,CO,2021-01-01\n";
        assert!(read_csv(text.as_bytes()).is_err());
    }

    #[test]
    fn json_records_with_split_period() {
        let text = r#"[
            {"Year": 2022, "Month": "Feb", "State": "ND", "County": "Cass",
             "Material": "Ozone", "Measurement": 0.031},
            {"Year": 2022, "Month": "Mar", "State": "ND", "County": "Cass",
             "Material": "Ozone", "Measurement": null}
        ]"#;
        let table = parse_json(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(table.cadence, Cadence::Unspecified);
        assert_eq!(table.records[0].period, "Feb/2022");
        assert_eq!(table.records[0].value, 0.031);
    }

    #[test]
    fn json_float_year_and_month_compose_a_period() {
        let text = r#"[
            {"Year": 2021.0, "Month": 3.0, "State": "ND", "County": "Cass",
             "Material": "CO", "Monthly Measurements": 0.4}
        ]"#;
        let table = parse_json(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].period, "3/2021");
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(parse_json(r#"{"State": "ND"}"#).is_err());
        assert!(parse_json(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("measurements.xlsx")).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn parquet_file_loads_through_schema() {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("State", DataType::Utf8, false),
            Field::new("County", DataType::Utf8, false),
            Field::new("Material", DataType::Utf8, false),
            Field::new("Year", DataType::Int64, false),
            Field::new("Month", DataType::Int64, false),
            Field::new("Daily Measurements", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["CA", "CA"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["Kern", "Kern"])),
                Arc::new(StringArray::from(vec!["CO", "CO"])),
                Arc::new(Int64Array::from(vec![2020, 2020])),
                Arc::new(Int64Array::from(vec![7, 8])),
                Arc::new(Float64Array::from(vec![Some(0.4), None])),
            ],
        )
        .unwrap();

        let path = std::env::temp_dir().join(format!("envdash-test-{}.parquet", std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_rows, 1);
        assert_eq!(table.cadence, Cadence::Daily);
        assert_eq!(table.records[0].period, "7/2020");
        assert_eq!(table.records[0].value, 0.4);
    }
}
