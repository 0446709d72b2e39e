//! JSONEachRow streaming parser: one JSON object per line,
//! resolved against a byte-hash from column name to position. Unknown
//! fields throw unless `skip_unknown_fields`; nested `a.b.c` keys are
//! flattened when `import_nested_json`.

use std::collections::HashMap;

use serde_json::Value;

use crate::column::{DataType, Field};
use crate::error::{EngineError, EngineResult, ErrorCode};

pub struct JsonEachRowSettings {
    pub skip_unknown_fields: bool,
    pub import_nested_json: bool,
}

impl Default for JsonEachRowSettings {
    fn default() -> Self {
        Self { skip_unknown_fields: false, import_nested_json: false }
    }
}

/// Maps a known column name to its position in the target schema — the
/// "byte-hash from column name to position" described above, backed here
/// by `std::collections::HashMap` rather than a hand-rolled perfect hash.
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(columns: &[(String, DataType)]) -> Self {
        let positions = columns.iter().enumerate().map(|(i, (name, _))| (name.clone(), i)).collect();
        Self { positions }
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten(&key, v, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}

fn field_from_json(value: &Value, data_type: &DataType) -> EngineResult<Field> {
    if value.is_null() {
        return Ok(Field::Null);
    }
    Ok(match data_type {
        DataType::UInt64 | DataType::Date => Field::UInt64(
            value.as_u64().ok_or_else(|| type_error(value, "UInt64"))?,
        ),
        DataType::Int64 => Field::Int64(value.as_i64().ok_or_else(|| type_error(value, "Int64"))?),
        DataType::Float64 => Field::Float64(value.as_f64().ok_or_else(|| type_error(value, "Float64"))?),
        DataType::String => Field::String(
            value.as_str().map(|s| s.to_string()).ok_or_else(|| type_error(value, "String"))?,
        ),
        other => return Err(EngineError::new(ErrorCode::UnsupportedMethod, format!("JSONEachRow can't parse into {other:?}"))),
    })
}

fn type_error(value: &Value, expected: &str) -> EngineError {
    EngineError::new(ErrorCode::TypeMismatch, format!("expected {expected}, got {value}"))
}

/// Parses one JSON object line into `(column_index, field)` pairs ready to
/// be inserted into the target block's columns, in schema order.
pub fn parse_row(
    line: &str,
    schema: &[(String, DataType)],
    index: &ColumnIndex,
    settings: &JsonEachRowSettings,
) -> EngineResult<Vec<(usize, Field)>> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| EngineError::new(ErrorCode::TypeMismatch, format!("invalid JSON line: {e}")))?;
    let object = value.as_object().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, "JSONEachRow line is not an object"))?;

    let mut flattened = Vec::new();
    if settings.import_nested_json {
        for (k, v) in object {
            flatten(k, v, &mut flattened);
        }
    } else {
        flattened.extend(object.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let mut out = Vec::with_capacity(schema.len());
    for (key, value) in &flattened {
        match index.positions.get(key) {
            Some(&pos) => {
                let field = field_from_json(value, &schema[pos].1)?;
                out.push((pos, field));
            }
            None if settings.skip_unknown_fields => continue,
            None => {
                return Err(EngineError::new(ErrorCode::UnknownIdentifier, format!("unknown field '{key}' in JSONEachRow input")));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<(String, DataType)> {
        vec![("id".to_string(), DataType::UInt64), ("name".to_string(), DataType::String)]
    }

    #[test]
    fn parses_known_fields_by_position() {
        let schema = schema();
        let index = ColumnIndex::new(&schema);
        let row = parse_row(r#"{"id": 1, "name": "a"}"#, &schema, &index, &JsonEachRowSettings::default()).unwrap();
        assert_eq!(row.len(), 2);
        assert!(row.contains(&(0, Field::UInt64(1))));
        assert!(row.contains(&(1, Field::String("a".to_string()))));
    }

    #[test]
    fn unknown_field_errors_without_skip_flag() {
        let schema = schema();
        let index = ColumnIndex::new(&schema);
        let err = parse_row(r#"{"id": 1, "extra": true}"#, &schema, &index, &JsonEachRowSettings::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownIdentifier);
    }

    #[test]
    fn unknown_field_is_skipped_when_flag_set() {
        let schema = schema();
        let index = ColumnIndex::new(&schema);
        let settings = JsonEachRowSettings { skip_unknown_fields: true, ..JsonEachRowSettings::default() };
        let row = parse_row(r#"{"id": 1, "extra": true}"#, &schema, &index, &settings).unwrap();
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn nested_keys_flatten_with_dotted_names_when_enabled() {
        let schema = vec![("user.name".to_string(), DataType::String)];
        let index = ColumnIndex::new(&schema);
        let settings = JsonEachRowSettings { import_nested_json: true, ..JsonEachRowSettings::default() };
        let row = parse_row(r#"{"user": {"name": "ana"}}"#, &schema, &index, &settings).unwrap();
        assert_eq!(row, vec![(0, Field::String("ana".to_string()))]);
    }
}
