//! Survey output file reading
//!
//! Output files are tab-separated without a header. Two layouts are accepted:
//!
//! - 4 columns: `survey  group  measure  value`
//! - 6 columns: `survey  group  measure  cohort  genotype  value`
//!
//! Files with the 4-column layout report cohort and genotype 0.

use super::error::{PlotError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// One row of a survey output file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    /// Index of the file in read order
    pub file: usize,
    pub measure: u32,
    pub survey: i64,
    pub group: i64,
    pub cohort: i64,
    pub genotype: i64,
    pub value: f64,
}

/// Read every record of one output file
///
/// The column count is taken from the first line and the table is read with
/// a fixed schema, so an integer-looking value column never rejects a later
/// fractional value.
pub fn read_records(path: &Path, file: usize) -> Result<Vec<Record>> {
    let columns = column_count(path)?;
    let schema = output_schema(columns).map_err(|e| in_file(path, e))?;

    let handle = File::open(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_schema(Some(Arc::new(schema)))
        .with_parse_options(CsvParseOptions::default().with_separator(b'\t'))
        .into_reader_with_file_handle(handle)
        .finish()?;

    records_from_frame(&df, file).map_err(|e| in_file(path, e))
}

/// Number of tab-separated fields on the first non-blank line
fn column_count(path: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.trim().is_empty() {
            return Ok(line.split('\t').count());
        }
    }
    Err(PlotError::EmptyData)
}

/// Int64 keys followed by a Float64 value column
fn output_schema(columns: usize) -> Result<Schema> {
    if columns != 4 && columns != 6 {
        return Err(PlotError::DataConsistency(format!(
            "expected 4 or 6 columns, found {}",
            columns
        )));
    }
    let mut schema = Schema::with_capacity(columns);
    for i in 1..columns {
        schema.with_column(format!("column_{}", i).into(), DataType::Int64);
    }
    schema.with_column(format!("column_{}", columns).into(), DataType::Float64);
    Ok(schema)
}

fn in_file(path: &Path, err: PlotError) -> PlotError {
    match err {
        PlotError::DataConsistency(msg) => {
            PlotError::DataConsistency(format!("{}: {}", path.display(), msg))
        }
        other => other,
    }
}

/// Convert a headerless output table into records
pub fn records_from_frame(df: &DataFrame, file: usize) -> Result<Vec<Record>> {
    let columns = df.get_columns();
    let (survey, group, measure, cohort, genotype, value) = match columns.len() {
        4 => (
            int_column(&columns[0])?,
            int_column(&columns[1])?,
            int_column(&columns[2])?,
            None,
            None,
            float_column(&columns[3])?,
        ),
        6 => (
            int_column(&columns[0])?,
            int_column(&columns[1])?,
            int_column(&columns[2])?,
            Some(int_column(&columns[3])?),
            Some(int_column(&columns[4])?),
            float_column(&columns[5])?,
        ),
        n => {
            return Err(PlotError::DataConsistency(format!(
                "expected 4 or 6 columns, found {}",
                n
            )))
        }
    };

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let measure_id = measure[row];
        let measure_id = u32::try_from(measure_id).map_err(|_| {
            PlotError::DataConsistency(format!("row {}: invalid measure {}", row + 1, measure_id))
        })?;
        records.push(Record {
            file,
            measure: measure_id,
            survey: survey[row],
            group: group[row],
            cohort: cohort.as_ref().map_or(0, |c| c[row]),
            genotype: genotype.as_ref().map_or(0, |gt| gt[row]),
            value: value[row],
        });
    }
    Ok(records)
}

fn int_column(column: &Column) -> Result<Vec<i64>> {
    let cast = column.cast(&DataType::Int64)?;
    let values = cast.i64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PlotError::DataConsistency(format!(
                    "row {}: missing integer in column {}",
                    row + 1,
                    column.name()
                ))
            })
        })
        .collect()
}

fn float_column(column: &Column) -> Result<Vec<f64>> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PlotError::DataConsistency(format!(
                    "row {}: missing value in column {}",
                    row + 1,
                    column.name()
                ))
            })
        })
        .collect()
}
