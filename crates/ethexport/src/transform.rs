//! Local file transforms run between extraction calls.
//!
//! These are the pure, in-process sub-operations a step applies to files in
//! its staging workspace: projecting one CSV column, filtering JSON lines,
//! and projecting one JSON field. They touch nothing outside the paths they
//! are given.

use serde_json::Value;
use snafu::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{
    CsvSnafu, JsonSnafu, MissingColumnSnafu, MissingFieldSnafu, TransformError, TransformIoSnafu,
};

/// Project one column of a CSV file into a plain text file, one value per
/// line, preserving row order.
pub fn extract_csv_column(
    input: &Path,
    output: &Path,
    column: &str,
) -> Result<(), TransformError> {
    let mut reader = csv::Reader::from_path(input).context(CsvSnafu { path: input })?;
    let headers = reader.headers().context(CsvSnafu { path: input })?;
    let index = headers
        .iter()
        .position(|header| header == column)
        .context(MissingColumnSnafu {
            column,
            path: input,
        })?;

    let mut writer = BufWriter::new(File::create(output).context(TransformIoSnafu { path: output })?);
    for record in reader.records() {
        let record = record.context(CsvSnafu { path: input })?;
        let value = record.get(index).unwrap_or_default();
        writeln!(writer, "{value}").context(TransformIoSnafu { path: output })?;
    }
    writer.flush().context(TransformIoSnafu { path: output })?;
    Ok(())
}

/// Keep only the JSON lines for which `predicate` returns true.
///
/// Returns the number of lines kept. Blank lines are dropped.
pub fn filter_json_lines<F>(
    input: &Path,
    output: &Path,
    predicate: F,
) -> Result<usize, TransformError>
where
    F: Fn(&Value) -> bool,
{
    let reader = BufReader::new(File::open(input).context(TransformIoSnafu { path: input })?);
    let mut writer = BufWriter::new(File::create(output).context(TransformIoSnafu { path: output })?);

    let mut kept = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.context(TransformIoSnafu { path: input })?;
        if line.trim().is_empty() {
            continue;
        }
        let item: Value = serde_json::from_str(&line).context(JsonSnafu {
            path: input,
            line: index + 1,
        })?;
        if predicate(&item) {
            writeln!(writer, "{line}").context(TransformIoSnafu { path: output })?;
            kept += 1;
        }
    }
    writer.flush().context(TransformIoSnafu { path: output })?;
    Ok(kept)
}

/// Project one field of each JSON line into a plain text file.
///
/// Every line must carry the field; a missing field aborts the transform.
pub fn extract_json_field(
    input: &Path,
    output: &Path,
    field: &str,
) -> Result<(), TransformError> {
    let reader = BufReader::new(File::open(input).context(TransformIoSnafu { path: input })?);
    let mut writer = BufWriter::new(File::create(output).context(TransformIoSnafu { path: output })?);

    for (index, line) in reader.lines().enumerate() {
        let line = line.context(TransformIoSnafu { path: input })?;
        if line.trim().is_empty() {
            continue;
        }
        let item: Value = serde_json::from_str(&line).context(JsonSnafu {
            path: input,
            line: index + 1,
        })?;
        let value = item
            .get(field)
            .and_then(Value::as_str)
            .context(MissingFieldSnafu {
                field,
                line: index + 1,
                path: input,
            })?;
        writeln!(writer, "{value}").context(TransformIoSnafu { path: output })?;
    }
    writer.flush().context(TransformIoSnafu { path: output })?;
    Ok(())
}

/// Predicate for contracts that implement a token standard.
pub fn is_token_contract(item: &Value) -> bool {
    let flag = |field: &str| item.get(field).and_then(Value::as_bool).unwrap_or(false);
    flag("is_erc20") || flag("is_erc721")
}
