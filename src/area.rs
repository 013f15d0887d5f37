//! Areas are the geographic units (e.g. census tracts) which get grouped into regions.
//!
//! All per-area data lives in a [`VariableMatrix`], a table of named numeric columns with one row
//! per area, keyed by [`AreaID`]. The raw input table, the selected explanatory variables and the
//! standardised solver input are all values of this type, so rows can always be matched up by ID
//! rather than by position.
use crate::id::define_id_type;
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::fmt;

define_id_type! {AreaID}

/// The special floor variable name meaning "count each area once"
pub const AREA_COUNT_FLOOR_VARIABLE: &str = "areas";

/// A table of numeric variables with one row per area
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMatrix {
    variables: IndexSet<String>,
    rows: IndexMap<AreaID, Vec<f64>>,
}

impl VariableMatrix {
    /// Create a new [`VariableMatrix`].
    ///
    /// Every row must have one value per variable and variable names must be unique.
    pub fn new<I>(variables: Vec<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (AreaID, Vec<f64>)>,
    {
        let n_variables = variables.len();
        let variables: IndexSet<_> = variables.into_iter().collect();
        ensure!(
            variables.len() == n_variables,
            "Variable names must be unique"
        );

        let mut map = IndexMap::new();
        for (id, values) in rows {
            ensure!(
                values.len() == n_variables,
                "Area {id} has {} values but there are {n_variables} variables",
                values.len()
            );
            ensure!(
                map.insert(id.clone(), values).is_none(),
                "Duplicate area ID {id}"
            );
        }

        Ok(Self {
            variables,
            rows: map,
        })
    }

    /// The variable names, in column order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// The number of variables (columns)
    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of areas (rows)
    pub fn n_areas(&self) -> usize {
        self.rows.len()
    }

    /// The area IDs, in row order
    pub fn area_ids(&self) -> impl Iterator<Item = &AreaID> {
        self.rows.keys()
    }

    /// Iterate over the rows of the matrix
    pub fn iter(&self) -> impl Iterator<Item = (&AreaID, &[f64])> {
        self.rows.iter().map(|(id, row)| (id, row.as_slice()))
    }

    /// Get the values for the given area
    pub fn row(&self, id: &AreaID) -> Option<&[f64]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    /// Get the values for the area in the given row position
    pub fn row_at(&self, index: usize) -> Option<&[f64]> {
        self.rows.get_index(index).map(|(_, row)| row.as_slice())
    }

    /// The row position of the given area
    pub fn index_of(&self, id: &AreaID) -> Option<usize> {
        self.rows.get_index_of(id)
    }

    /// Iterate over the values of the variable in the given column
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.values().map(move |row| row[index])
    }

    /// The column position of the named variable
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.get_index_of(name)
    }

    /// Create a new matrix by applying `f` to every column.
    ///
    /// `f` receives the column position, the variable name and its column of values and returns
    /// the new values.
    pub fn map_columns<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, &str, Vec<f64>) -> Result<Vec<f64>>,
    {
        let mut rows: IndexMap<AreaID, Vec<f64>> = self
            .rows
            .keys()
            .map(|id| (id.clone(), Vec::with_capacity(self.n_variables())))
            .collect();
        for (index, name) in self.variables.iter().enumerate() {
            let column = f(index, name, self.column(index).collect())?;
            ensure!(
                column.len() == rows.len(),
                "Transformed column {name} has the wrong length"
            );
            for (row, value) in rows.values_mut().zip(column) {
                row.push(value);
            }
        }

        Ok(Self {
            variables: self.variables.clone(),
            rows,
        })
    }

    /// Create a new matrix containing only the named variables, in the given order.
    ///
    /// # Arguments
    ///
    /// * `names` - The variables to keep
    pub fn select(&self, names: &[String]) -> Result<Self> {
        ensure!(!names.is_empty(), "No variables selected");
        let indexes = names
            .iter()
            .map(|name| {
                self.variable_index(name)
                    .with_context(|| format!("Unknown variable {name}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self.rows.iter().map(|(id, row)| {
            (
                id.clone(),
                indexes.iter().map(|&index| row[index]).collect(),
            )
        });

        Self::new(names.to_vec(), rows)
    }

    /// Get the per-area values for the floor variable.
    ///
    /// For [`FloorVariable::AreaCount`] every area has a value of 1.
    pub fn floor_values(&self, floor_variable: &FloorVariable) -> Result<FloorValues> {
        match floor_variable {
            FloorVariable::AreaCount => Ok(self.rows.keys().map(|id| (id.clone(), 1.0)).collect()),
            FloorVariable::Column(name) => {
                let index = self
                    .variable_index(name)
                    .with_context(|| format!("Unknown floor variable {name}"))?;
                self.rows
                    .iter()
                    .map(|(id, row)| {
                        let value = row[index];
                        ensure!(
                            value >= 0.0,
                            "Floor variable {name} cannot be negative (area {id} has {value})"
                        );
                        Ok((id.clone(), value))
                    })
                    .collect()
            }
        }
    }
}

/// The value of the floor variable for each area
pub type FloorValues = IndexMap<AreaID, f64>;

/// The quantity which each region must reach a minimum of
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum FloorVariable {
    /// Each area counts once, so the floor is a minimum number of areas
    AreaCount,
    /// A column of the area table (e.g. population)
    Column(String),
}

impl From<String> for FloorVariable {
    fn from(name: String) -> Self {
        if name == AREA_COUNT_FLOOR_VARIABLE {
            Self::AreaCount
        } else {
            Self::Column(name)
        }
    }
}

impl fmt::Display for FloorVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AreaCount => write!(f, "{AREA_COUNT_FLOOR_VARIABLE}"),
            Self::Column(name) => write!(f, "{name}"),
        }
    }
}
