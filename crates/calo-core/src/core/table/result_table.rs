use super::column::{Column, ColumnKind};
use super::error::TableError;
use indexmap::IndexMap;

/// Name of the ground-truth label column appended to every simulated batch.
pub const TRUE_LABEL: &str = "true_label";

/// A homogeneous table with one row per simulated event.
///
/// All columns have the same number of rows. Column order is insertion order and is
/// part of the schema: two tables can only be concatenated if their column names
/// and kinds agree position by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: IndexMap<String, Column>,
    num_rows: usize,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. The first column fixes the row count.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), TableError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.num_rows,
                found: column.len(),
            });
        }
        self.num_rows = column.len();
        self.columns.insert(name, column);
        Ok(())
    }

    /// Builder-style variant of [`push_column`](Self::push_column).
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, TableError> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Appends a `Float32` column whose every row holds `value`.
    pub fn with_constant_column(
        self,
        name: impl Into<String>,
        value: f32,
    ) -> Result<Self, TableError> {
        let rows = self.num_rows;
        self.with_column(name, Column::Float32(vec![value; rows]))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_ragged_columns(&self) -> bool {
        self.columns.values().any(Column::is_ragged)
    }

    fn schema(&self) -> Vec<(&str, ColumnKind)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column.kind()))
            .collect()
    }

    /// Converts every ragged column into flat per-row sequences.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidOffsets`] if a ragged column's offsets are
    /// inconsistent with its content or with the table's row count.
    pub fn normalize_ragged(mut self) -> Result<Self, TableError> {
        let num_rows = self.num_rows;
        for (name, column) in self.columns.iter_mut() {
            if let Column::Jagged(jagged) = column {
                jagged
                    .validate(num_rows)
                    .map_err(|reason| TableError::InvalidOffsets {
                        name: name.clone(),
                        reason,
                    })?;
                *column = Column::List(jagged.to_rows());
            }
        }
        Ok(self)
    }

    /// Stacks tables vertically, preserving table order and row order within each table.
    ///
    /// Rows are never sorted, deduplicated or dropped.
    pub fn concat(tables: impl IntoIterator<Item = ResultTable>) -> Result<Self, TableError> {
        let mut tables = tables.into_iter();
        let Some(mut combined) = tables.next() else {
            return Ok(Self::new());
        };

        for (position, table) in tables.enumerate() {
            if table.schema() != combined.schema() {
                return Err(TableError::SchemaMismatch(format!(
                    "table {} has columns {:?}, expected {:?}",
                    position + 1,
                    table.schema(),
                    combined.schema()
                )));
            }
            let added_rows = table.num_rows;
            for ((name, target), (_, source)) in combined.columns.iter_mut().zip(table.columns) {
                target.append(source).map_err(|(expected, found)| {
                    TableError::SchemaMismatch(format!(
                        "column '{}' is {:?}, expected {:?}",
                        name, found, expected
                    ))
                })?;
            }
            combined.num_rows += added_rows;
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::column::JaggedArray;

    fn batch(energies: &[f64], hits: &[Vec<f64>], label: f32) -> ResultTable {
        ResultTable::new()
            .with_column("true_energy", Column::Float64(energies.to_vec()))
            .unwrap()
            .with_column("hit_energy", Column::Jagged(JaggedArray::from_rows(hits)))
            .unwrap()
            .with_constant_column(TRUE_LABEL, label)
            .unwrap()
    }

    #[test]
    fn push_column_rejects_length_mismatch() {
        let mut table = ResultTable::new();
        table.push_column("a", Column::Float64(vec![1.0, 2.0])).unwrap();
        let result = table.push_column("b", Column::Int64(vec![1]));
        assert_eq!(
            result,
            Err(TableError::LengthMismatch {
                name: "b".into(),
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn push_column_rejects_duplicate_names() {
        let mut table = ResultTable::new();
        table.push_column("a", Column::Float64(vec![1.0])).unwrap();
        let result = table.push_column("a", Column::Float64(vec![2.0]));
        assert_eq!(result, Err(TableError::DuplicateColumn("a".into())));
    }

    #[test]
    fn with_constant_column_fills_every_row() {
        let table = batch(&[1.0, 2.0, 3.0], &[vec![], vec![], vec![]], 0.211);
        assert_eq!(
            table.column(TRUE_LABEL),
            Some(&Column::Float32(vec![0.211; 3]))
        );
    }

    #[test]
    fn concat_preserves_batch_then_event_order() {
        let first = batch(&[1.0; 100], &vec![vec![0.5]; 100], 0.211);
        let second = batch(&[2.0; 100], &vec![vec![0.25, 0.25]; 100], 0.13);

        let table = ResultTable::concat([first, second]).unwrap();

        assert_eq!(table.num_rows(), 200);
        let Some(Column::Float32(labels)) = table.column(TRUE_LABEL) else {
            panic!("label column missing");
        };
        assert!(labels[..100].iter().all(|&l| l == 0.211));
        assert!(labels[100..].iter().all(|&l| l == 0.13));
        let Some(Column::Float64(energies)) = table.column("true_energy") else {
            panic!("energy column missing");
        };
        assert_eq!(energies[99], 1.0);
        assert_eq!(energies[100], 2.0);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let table = ResultTable::concat(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn concat_rejects_schema_mismatch() {
        let first = batch(&[1.0], &[vec![1.0]], 0.211);
        let second = ResultTable::new()
            .with_column("true_energy", Column::Float64(vec![1.0]))
            .unwrap();
        let result = ResultTable::concat([first, second]);
        assert!(matches!(result, Err(TableError::SchemaMismatch(_))));
    }

    #[test]
    fn normalize_ragged_converts_jagged_to_lists() {
        let table = batch(&[1.0, 2.0], &[vec![0.1, 0.2], vec![]], 1.0)
            .normalize_ragged()
            .unwrap();
        assert!(!table.has_ragged_columns());
        assert_eq!(
            table.column("hit_energy"),
            Some(&Column::List(vec![vec![0.1, 0.2], vec![]]))
        );
    }

    #[test]
    fn normalize_ragged_reports_inconsistent_offsets() {
        let mut table = ResultTable::new()
            .with_column("true_energy", Column::Float64(vec![1.0, 2.0]))
            .unwrap();
        table
            .push_column(
                "hit_energy",
                Column::Jagged(JaggedArray::new(vec![0, 3, 2], vec![1.0, 2.0])),
            )
            .unwrap();
        let result = table.normalize_ragged();
        assert!(matches!(
            result,
            Err(TableError::InvalidOffsets { name, .. }) if name == "hit_energy"
        ));
    }
}
