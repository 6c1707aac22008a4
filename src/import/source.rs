// Bulk import rows: column name -> value, keyed by the FOLIO column

use serde_json::Value;

use crate::domain::Metadata;
use crate::error::PickingError;

pub const FOLIO_COLUMN: &str = "FOLIO";

/// One externally supplied row with normalized column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    columns: Vec<(String, String)>,
}

impl ImportRow {
    /// Column names are trimmed and upper-cased; a repeated column keeps its last value.
    pub fn from_columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = ImportRow::default();
        for (name, value) in columns {
            let name = name.as_ref().trim().to_uppercase();
            let value = value.into();
            match row.columns.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = value,
                None => row.columns.push((name, value)),
            }
        }
        row
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// The trimmed folio, if the row carries a non-empty one
    pub fn folio(&self) -> Option<&str> {
        self.get(FOLIO_COLUMN)
            .map(str::trim)
            .filter(|folio| !folio.is_empty())
    }

    /// Every column except FOLIO, in source order
    pub fn metadata(&self) -> Metadata {
        self.columns
            .iter()
            .filter(|(name, _)| name != FOLIO_COLUMN)
            .cloned()
            .collect()
    }
}

/// Render a JSON cell the way a spreadsheet export would: strings as-is,
/// numbers and booleans stringified, null as empty.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Parse a JSON array of objects into import rows
pub fn rows_from_json(json: &str) -> Result<Vec<ImportRow>, PickingError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PickingError::InvalidInput(format!("import file is not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(PickingError::InvalidInput(
            "import file must be a JSON array of rows".to_string(),
        ));
    };

    Ok(items
        .iter()
        .map(|item| match item {
            Value::Object(map) => {
                ImportRow::from_columns(map.iter().map(|(k, v)| (k.as_str(), cell_text(v))))
            }
            // Not an object: no columns, so it will be reported as malformed
            _ => ImportRow::default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_are_normalized() {
        let row = ImportRow::from_columns([(" folio ", " F-1 "), ("ruta", "R2")]);
        assert_eq!(row.folio(), Some("F-1"));
        assert_eq!(row.get("RUTA"), Some("R2"));
    }

    #[test]
    fn test_blank_or_missing_folio_is_none() {
        assert_eq!(ImportRow::from_columns([("FOLIO", "   ")]).folio(), None);
        assert_eq!(ImportRow::from_columns([("RUTA", "R1")]).folio(), None);
    }

    #[test]
    fn test_metadata_excludes_folio_and_keeps_order() {
        let row = ImportRow::from_columns([("REGION", "N"), ("FOLIO", "A"), ("RUTA", "R1")]);
        let metadata = row.metadata();
        let columns: Vec<_> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["REGION", "RUTA"]);
    }

    #[test]
    fn test_json_cells_are_stringified() {
        let rows = rows_from_json(r#"[{"FOLIO": 1042, "urgente": true, "NOTA": null}, 7]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].folio(), Some("1042"));
        assert_eq!(rows[0].get("URGENTE"), Some("true"));
        assert_eq!(rows[0].get("NOTA"), Some(""));
        assert_eq!(rows[1].folio(), None);
    }

    #[test]
    fn test_non_array_json_is_rejected() {
        assert!(matches!(
            rows_from_json(r#"{"FOLIO": "A"}"#),
            Err(PickingError::InvalidInput(_))
        ));
    }
}
