//! On-disk part layout: directory named
//! `<partition>_<min>_<max>_<level>[_<mutation>]`, containing per-column
//! `.bin`/`.mrk` files, `primary.idx`, and `columns.txt`/`checksums.txt`.

use std::path::PathBuf;

use crate::column::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct PartName {
    pub partition: String,
    pub min_block: u64,
    pub max_block: u64,
    pub level: u32,
    pub mutation: Option<u64>,
}

impl PartName {
    pub fn directory_name(&self) -> String {
        match self.mutation {
            Some(m) => format!("{}_{}_{}_{}_{}", self.partition, self.min_block, self.max_block, self.level, m),
            None => format!("{}_{}_{}_{}", self.partition, self.min_block, self.max_block, self.level),
        }
    }

    /// The name a merge of `self` and `other` (same partition) produces:
    /// spans both block ranges, bumps the level by one.
    pub fn merged_with(&self, other: &PartName) -> PartName {
        PartName {
            partition: self.partition.clone(),
            min_block: self.min_block.min(other.min_block),
            max_block: self.max_block.max(other.max_block),
            level: self.level.max(other.level) + 1,
            mutation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: PartName,
    pub path: PathBuf,
    pub columns: Vec<(String, DataType)>,
    pub rows_count: u64,
    pub marks_count: u64,
    /// Compressed `.bin` + `.mrk` byte size per column; used to pick the
    /// smallest column to inject when no requested column has a file.
    pub column_byte_size: Vec<(String, u64)>,
    /// `(column, dependencies)`: for a column added by `ALTER ADD COLUMN`
    /// that predates this part, the other columns needed to evaluate its
    /// DEFAULT expression. Empty for a column with no declared default.
    pub default_dependencies: Vec<(String, Vec<String>)>,
}

impl Part {
    pub fn directory(&self) -> PathBuf {
        self.path.join(self.name.directory_name())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Columns needed to evaluate `column`'s DEFAULT expression, if this
    /// part predates that column and it declares one.
    pub fn default_dependencies_for(&self, column: &str) -> &[String] {
        self.default_dependencies.iter().find(|(c, _)| c == column).map(|(_, deps)| deps.as_slice()).unwrap_or(&[])
    }

    /// Smallest column by `.bin + .mrk` size, used to provide a row count
    /// when no requested column exists in this part. Logical error if the
    /// part has no columns at all.
    pub fn smallest_column(&self) -> Option<&str> {
        self.column_byte_size.iter().min_by_key(|(_, size)| *size).map(|(name, _)| name.as_str())
    }

    pub fn escaped_file_stem(column_name: &str) -> String {
        // Escapes dots (nested column names) so each column maps to one
        // filesystem-safe stem.
        column_name.replace('.', "%2E")
    }
}
