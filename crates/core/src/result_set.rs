use std::collections::BTreeMap;

use serde_json::Value;

/// One returned record: bin name to value. The field set may vary from row
/// to row within the same result.
pub type Record = BTreeMap<String, Value>;

/// Ordered query result with the tabular header derived from the first row
/// only; later rows may carry extra fields (ignored for headers) or miss
/// some (rendered blank).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub rows: Vec<Record>,
    pub header_keys: Vec<String>,
}

impl ResultSet {
    #[must_use]
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let header_keys = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self { rows, header_keys }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flattened cells for one row, aligned to `header_keys`; fields absent
    /// from the row come back as empty strings.
    #[must_use]
    pub fn row_cells(&self, index: usize) -> Vec<String> {
        let Some(row) = self.rows.get(index) else {
            return Vec::new();
        };
        self.header_keys
            .iter()
            .map(|key| row.get(key).map(display_value).unwrap_or_default())
            .collect()
    }
}

/// Renders a bin value for the key/value record view: strings verbatim,
/// null as blank, everything nested as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
