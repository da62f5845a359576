/// Engine-native ragged column: all values of all rows in `content`, with row `i`
/// spanning `content[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JaggedArray {
    pub offsets: Vec<usize>,
    pub content: Vec<f64>,
}

impl JaggedArray {
    pub fn new(offsets: Vec<usize>, content: Vec<f64>) -> Self {
        Self { offsets, content }
    }

    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut content = Vec::new();
        offsets.push(0);
        for row in rows {
            content.extend_from_slice(row.as_ref());
            offsets.push(content.len());
        }
        Self { offsets, content }
    }

    /// Number of rows described by the offsets (zero for an empty offset vector).
    pub fn num_rows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Checks the offsets describe `expected_rows` contiguous, in-bounds rows.
    pub fn validate(&self, expected_rows: usize) -> Result<(), String> {
        if self.offsets.is_empty() {
            return if expected_rows == 0 && self.content.is_empty() {
                Ok(())
            } else {
                Err("offsets are empty".to_string())
            };
        }
        if self.offsets[0] != 0 {
            return Err(format!("first offset is {}, expected 0", self.offsets[0]));
        }
        if self.num_rows() != expected_rows {
            return Err(format!(
                "offsets describe {} rows, expected {}",
                self.num_rows(),
                expected_rows
            ));
        }
        if let Some(w) = self.offsets.windows(2).find(|w| w[1] < w[0]) {
            return Err(format!("offsets decrease from {} to {}", w[0], w[1]));
        }
        let last = *self.offsets.last().unwrap_or(&0);
        if last != self.content.len() {
            return Err(format!(
                "last offset is {}, but content holds {} values",
                last,
                self.content.len()
            ));
        }
        Ok(())
    }

    /// Splits the content into one owned sequence per row. Call [`validate`](Self::validate) first.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.offsets
            .windows(2)
            .map(|w| self.content[w[0]..w[1]].to_vec())
            .collect()
    }

    fn extend(&mut self, other: JaggedArray) {
        let base = self.content.len();
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.offsets
            .extend(other.offsets.iter().skip(1).map(|o| o + base));
        self.content.extend(other.content);
    }
}

/// The physical type of a column, used for schema comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float64,
    Float32,
    Int64,
    Jagged,
    List,
}

/// One named column of a [`ResultTable`](super::ResultTable).
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int64(Vec<i64>),
    /// Ragged, engine-native layout. Never persisted directly.
    Jagged(JaggedArray),
    /// Flat per-row sequences; the storage-ready form of a ragged column.
    List(Vec<Vec<f64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float64(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Jagged(j) => j.num_rows(),
            Column::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Float64(_) => ColumnKind::Float64,
            Column::Float32(_) => ColumnKind::Float32,
            Column::Int64(_) => ColumnKind::Int64,
            Column::Jagged(_) => ColumnKind::Jagged,
            Column::List(_) => ColumnKind::List,
        }
    }

    pub fn is_ragged(&self) -> bool {
        matches!(self, Column::Jagged(_))
    }

    /// Appends the rows of `other`. Both columns must have the same kind.
    pub(crate) fn append(&mut self, other: Column) -> Result<(), (ColumnKind, ColumnKind)> {
        match (self, other) {
            (Column::Float64(a), Column::Float64(b)) => a.extend(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend(b),
            (Column::Jagged(a), Column::Jagged(b)) => a.extend(b),
            (Column::List(a), Column::List(b)) => a.extend(b),
            (a, b) => return Err((a.kind(), b.kind())),
        }
        Ok(())
    }
}
