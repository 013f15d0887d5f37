//! Code for reading the area table from a CSV file.
use super::input_err_msg;
use crate::area::{AreaID, VariableMatrix};
use anyhow::{Context, Result, ensure};
use std::io::Read;
use std::path::Path;

const AREAS_FILE_NAME: &str = "areas.csv";

/// The name of the column holding area IDs
const ID_COLUMN: &str = "id";

/// Read the area table from a CSV file.
///
/// The first column must be `id`. Every other column is a numeric variable; its header gives the
/// variable name.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A [`VariableMatrix`] with one row per area, in file order
pub fn read_areas(model_dir: &Path) -> Result<VariableMatrix> {
    let file_path = model_dir.join(AREAS_FILE_NAME);
    let reader = csv::Reader::from_path(&file_path).with_context(|| input_err_msg(&file_path))?;
    read_areas_from_reader(reader).with_context(|| input_err_msg(&file_path))
}

fn read_areas_from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<VariableMatrix> {
    let headers = reader.headers()?.clone();
    ensure!(
        headers.get(0) == Some(ID_COLUMN),
        "The first column must be `{ID_COLUMN}`"
    );
    let variables: Vec<String> = headers.iter().skip(1).map(String::from).collect();
    ensure!(!variables.is_empty(), "No variable columns found");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = AreaID::new(record.get(0).unwrap_or_default());
        ensure!(!id.0.is_empty(), "Area IDs cannot be empty");

        let values = record
            .iter()
            .skip(1)
            .zip(&variables)
            .map(|(cell, name)| {
                let value: f64 = cell
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid value '{cell}' for {name} in area {id}"))?;
                ensure!(
                    value.is_finite(),
                    "Value for {name} in area {id} must be finite"
                );
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push((id, values));
    }
    ensure!(!rows.is_empty(), "There must be at least one area");

    VariableMatrix::new(variables, rows)
}
