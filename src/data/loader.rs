use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    COL_LATITUDE, COL_LONGITUDE, COL_PM25, COL_PM25_LEGACY, COL_YEAR, COLUMNS, Dataset, Entry,
};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Supported on-disk layouts, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
    Parquet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "parquet" | "pq" => Ok(Self::Parquet),
            other => bail!("Unsupported file extension: .{other}"),
        }
    }
}

/// Load the dataset from a file. Dispatch by extension.
///
/// Empty or null cells are replaced with 0; the number of filled cells is
/// logged as a warning.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let format = FileFormat::from_path(path)?;
    if !path.exists() {
        bail!("Dataset file not found: {}", path.display());
    }

    let mut filled = 0usize;
    let dataset = match format {
        FileFormat::Csv => load_csv(path, &mut filled),
        FileFormat::Json => load_json(path, &mut filled),
        FileFormat::Parquet => load_parquet(path, &mut filled),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    if filled > 0 {
        log::warn!("Data contains {filled} missing values; filled with 0");
    }
    log::info!("Loaded {} entries from {}", dataset.len(), path.display());
    log_head(&dataset);

    Ok(dataset)
}

/// Rewrite the whole dataset to `path`.
///
/// Writes to a sibling temp file first and renames it over the target, so a
/// failed write never leaves a truncated dataset behind.
pub fn save_file(path: &Path, dataset: &Dataset) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    let tmp = temp_path(path);

    let written = match format {
        FileFormat::Csv => save_csv(&tmp, dataset),
        FileFormat::Json => save_json(&tmp, dataset),
        FileFormat::Parquet => save_parquet(&tmp, dataset),
    };
    if let Err(err) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.context(format!("writing {}", tmp.display())));
    }

    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing {} with {}", path.display(), tmp.display()))?;
    log::debug!("Saved {} entries to {}", dataset.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Log the first rows as a table, like a DataFrame head.
fn log_head(dataset: &Dataset) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let head = Dataset::from_entries(dataset.entries().iter().take(5).copied().collect());
    match to_record_batch(&head).and_then(|b| Ok(pretty_format_batches(&[b])?)) {
        Ok(table) => log::debug!("Dataset head:\n{table}"),
        Err(err) => log::debug!("Could not render dataset head: {err:#}"),
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Positions of the four canonical columns within a header.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    year: usize,
    latitude: usize,
    longitude: usize,
    pm25: usize,
}

impl ColumnIndex {
    fn resolve<'a>(headers: impl Iterator<Item = &'a str> + Clone) -> Result<Self> {
        let find = |name: &str| headers.clone().position(|h| h.trim() == name);
        let require = |name: &str| find(name).with_context(|| format!("missing '{name}' column"));

        Ok(Self {
            year: require(COL_YEAR)?,
            latitude: require(COL_LATITUDE)?,
            longitude: require(COL_LONGITUDE)?,
            pm25: find(COL_PM25)
                .or_else(|| find(COL_PM25_LEGACY))
                .with_context(|| format!("missing '{COL_PM25}' column"))?,
        })
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// CSV layout: header row naming `Year, Latitude, Longitude, PM25`
/// (or `PM2.5`) in any order. Other columns are ignored.
fn load_csv(path: &Path, filled: &mut usize) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let cols = ColumnIndex::resolve(headers.iter())?;

    let mut entries = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        entries.push(Entry {
            year: parse_year(cell(cols.year), row_no, filled)?,
            latitude: parse_float(cell(cols.latitude), row_no, COL_LATITUDE, filled)?,
            longitude: parse_float(cell(cols.longitude), row_no, COL_LONGITUDE, filled)?,
            pm25: parse_float(cell(cols.pm25), row_no, COL_PM25, filled)?,
        });
    }

    Ok(Dataset::from_entries(entries))
}

fn is_missing(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null")
}

/// Years written by float-typed writers appear as `2019.0`; accept those.
fn parse_year(s: &str, row: usize, filled: &mut usize) -> Result<i64> {
    if is_missing(s) {
        *filled += 1;
        return Ok(0);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Ok(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Ok(f as i64),
        _ => bail!("Row {row}, {COL_YEAR}: '{s}' is not an integer"),
    }
}

fn parse_float(s: &str, row: usize, col: &str, filled: &mut usize) -> Result<f64> {
    if is_missing(s) {
        *filled += 1;
        return Ok(0.0);
    }
    s.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

fn save_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for entry in dataset.entries() {
        writer.serialize(entry).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Year": 2019, "Latitude": 51.5, "Longitude": -0.12, "PM25": 10.4 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, filled: &mut usize) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let pm25_key = json_pm25_key(records)?;
    let mut entries = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let number = |col: &str, filled: &mut usize| -> Result<f64> {
            match obj.get(col) {
                None | Some(JsonValue::Null) => {
                    *filled += 1;
                    Ok(0.0)
                }
                Some(v) => v
                    .as_f64()
                    .with_context(|| format!("Row {i}, {col}: not a number")),
            }
        };

        let year = number(COL_YEAR, filled)?;
        if year.fract() != 0.0 {
            bail!("Row {i}, {COL_YEAR}: {year} is not an integer");
        }

        entries.push(Entry {
            year: year as i64,
            latitude: number(COL_LATITUDE, filled)?,
            longitude: number(COL_LONGITUDE, filled)?,
            pm25: number(pm25_key, filled)?,
        });
    }

    Ok(Dataset::from_entries(entries))
}

/// Check the required columns against the keys of all records and pick the
/// PM2.5 spelling. A column absent from every record makes the file malformed;
/// gaps in individual records are filled later.
fn json_pm25_key(records: &[JsonValue]) -> Result<&'static str> {
    if records.is_empty() {
        return Ok(COL_PM25);
    }
    let keys: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.as_object())
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();

    for col in [COL_YEAR, COL_LATITUDE, COL_LONGITUDE] {
        if !keys.contains(col) {
            bail!("missing '{col}' column");
        }
    }
    if keys.contains(COL_PM25) {
        Ok(COL_PM25)
    } else if keys.contains(COL_PM25_LEGACY) {
        Ok(COL_PM25_LEGACY)
    } else {
        bail!("missing '{COL_PM25}' column")
    }
}

fn save_json(path: &Path, dataset: &Dataset) -> Result<()> {
    let file = File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(BufWriter::new(file), dataset.entries())
        .context("writing JSON")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Expected schema: `Year` Int64/Int32, the rest Float64/Float32
/// (integer value columns are widened). Works with files written by
/// both Pandas and Polars.
fn load_parquet(path: &Path, filled: &mut usize) -> Result<Dataset> {
    let file = File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut entries = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let cols = ColumnIndex::resolve(schema.fields().iter().map(|f| f.name().as_str()))?;

        let year = batch.column(cols.year);
        let latitude = batch.column(cols.latitude);
        let longitude = batch.column(cols.longitude);
        let pm25 = batch.column(cols.pm25);

        for row in 0..batch.num_rows() {
            let year_value = extract_f64(year, row, filled)
                .with_context(|| format!("Row {row}: failed to read '{COL_YEAR}'"))?;
            if year_value.fract() != 0.0 {
                bail!("Row {row}, {COL_YEAR}: {year_value} is not an integer");
            }
            entries.push(Entry {
                year: year_value as i64,
                latitude: extract_f64(latitude, row, filled)
                    .with_context(|| format!("Row {row}: failed to read '{COL_LATITUDE}'"))?,
                longitude: extract_f64(longitude, row, filled)
                    .with_context(|| format!("Row {row}: failed to read '{COL_LONGITUDE}'"))?,
                pm25: extract_f64(pm25, row, filled)
                    .with_context(|| format!("Row {row}: failed to read '{COL_PM25}'"))?,
            });
        }
    }

    Ok(Dataset::from_entries(entries))
}

/// Extract a numeric cell as `f64`; nulls and NaN become 0.
fn extract_f64(col: &ArrayRef, row: usize, filled: &mut usize) -> Result<f64> {
    if col.is_null(row) {
        *filled += 1;
        return Ok(0.0);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any.downcast_ref::<Float32Array>().map(|a| a.value(row) as f64),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    let value = value.context("column type does not match its declared data type")?;
    if value.is_nan() {
        *filled += 1;
        return Ok(0.0);
    }
    Ok(value)
}

/// Build an Arrow batch with the canonical schema.
fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let entries = dataset.entries();
    let schema = Arc::new(Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Int64, false),
        Field::new(COLUMNS[1], DataType::Float64, false),
        Field::new(COLUMNS[2], DataType::Float64, false),
        Field::new(COLUMNS[3], DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(entries.iter().map(|e| e.year))),
        Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.latitude))),
        Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.longitude))),
        Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.pm25))),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn save_parquet(path: &Path, dataset: &Dataset) -> Result<()> {
    let batch = to_record_batch(dataset)?;
    let file = File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::from_entries(vec![
            Entry::new(2019, 51.5, -0.12, 10.4),
            Entry::new(2020, 48.85, 2.35, 0.0),
            Entry::new(2021, 40.71, -74.0, 8.25),
        ])
    }

    #[test]
    fn csv_fills_missing_values_with_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.csv");
        std::fs::write(
            &path,
            "Year,Latitude,Longitude,PM25\n2019,51.5,-0.12,10.4\n2020.0,48.85,,\n,1.0,2.0,NaN\n",
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.entries()[1], Entry::new(2020, 48.85, 0.0, 0.0));
        assert_eq!(ds.entries()[2], Entry::new(0, 1.0, 2.0, 0.0));
    }

    #[test]
    fn csv_accepts_legacy_pm25_header_and_extra_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.csv");
        std::fs::write(
            &path,
            "Station,PM2.5,Year,Latitude,Longitude\nA,3.5,2018,1.0,2.0\n",
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.entries(), &[Entry::new(2018, 1.0, 2.0, 3.5)]);
    }

    #[test]
    fn csv_round_trip_uses_canonical_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.csv");
        save_file(&path, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Year,Latitude,Longitude,PM25\n"));
        assert_eq!(load_file(&path).unwrap(), sample());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn json_records_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.json");
        save_file(&path, &sample()).unwrap();
        assert_eq!(load_file(&path).unwrap(), sample());
    }

    #[test]
    fn json_nulls_become_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.json");
        std::fs::write(
            &path,
            r#"[{"Year": 2020, "Latitude": null, "Longitude": 3.0, "PM2.5": 4.5}]"#,
        )
        .unwrap();
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.entries(), &[Entry::new(2020, 0.0, 3.0, 4.5)]);
    }

    #[test]
    fn parquet_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.parquet");
        save_file(&path, &sample()).unwrap();
        assert_eq!(load_file(&path).unwrap(), sample());
    }

    /// Write a parquet file whose four columns are all Float64.
    fn write_float_parquet(path: &Path, years: Vec<f64>, pm25: Vec<f64>) {
        let n = years.len();
        let schema = Arc::new(Schema::new(
            COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Float64, false))
                .collect::<Vec<_>>(),
        ));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(years)),
            Arc::new(Float64Array::from(vec![1.0; n])),
            Arc::new(Float64Array::from(vec![2.0; n])),
            Arc::new(Float64Array::from(pm25)),
        ];
        let batch = RecordBatch::try_new(schema, columns).unwrap();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), batch.schema(), None)
            .unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_nan_is_filled_with_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.parquet");
        write_float_parquet(&path, vec![2019.0, 2020.0], vec![f64::NAN, 4.0]);

        let ds = load_file(&path).unwrap();
        assert_eq!(
            ds.entries(),
            &[Entry::new(2019, 1.0, 2.0, 0.0), Entry::new(2020, 1.0, 2.0, 4.0)]
        );
    }

    #[test]
    fn parquet_fractional_year_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.parquet");
        write_float_parquet(&path, vec![2019.7, 2020.0], vec![1.0, 2.0]);

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("not an integer"));
    }

    #[test]
    fn json_missing_column_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.json");
        std::fs::write(&path, r#"[{"Year": 2020, "Latitude": 1.0, "Longitude": 2.0}]"#).unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing 'PM25' column"));
    }

    #[test]
    fn json_gap_in_one_record_is_filled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.json");
        std::fs::write(
            &path,
            r#"[{"Year": 2020, "Latitude": 1.0, "Longitude": 2.0, "PM25": 3.0},
                {"Year": 2021, "Latitude": 1.0, "Longitude": 2.0}]"#,
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.entries()[1], Entry::new(2021, 1.0, 2.0, 0.0));
    }

    #[test]
    fn empty_json_array_loads_empty_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_file(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.csv")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn malformed_values_are_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.csv");
        std::fs::write(&path, "Year,Latitude,Longitude,PM25\n2019,north,1.0,2.0\n").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Latitude"));
    }

    #[test]
    fn missing_column_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pm.csv");
        std::fs::write(&path, "Year,Latitude,PM25\n2019,1.0,2.0\n").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Longitude"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(FileFormat::from_path(Path::new("data.xlsx")).is_err());
        assert_eq!(FileFormat::from_path(Path::new("a.PQ")).unwrap(), FileFormat::Parquet);
    }
}
