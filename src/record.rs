// Registry records - open-ended key/value rows as the registry API returns them

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const MANAGEMENT_KEY: &str = "mgmBldrgstPk";

/// A single cell. Upstream only promises strings, numbers and nulls;
/// anything else is kept as its JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(serde_json::Number),
    Text(String),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RegistryRecord(BTreeMap<String, FieldValue>);

impl RegistryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects map field by field; a bare scalar lands under "value"
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => RegistryRecord(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
            other => {
                let mut record = RegistryRecord::new();
                record.insert("value", FieldValue::from(other));
                record
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Stringified cell; missing keys and nulls render empty
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The registry's internal id, used to fetch unit and owner rows
    pub fn management_key(&self) -> Option<String> {
        let key = self.text(MANAGEMENT_KEY);
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for RegistryRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RegistryRecord::from_json)
    }
}

// ============================================================================
// ARRAY-OR-OBJECT NORMALIZATION
// ============================================================================

/// Normalize a field that upstream sends either as one object or as an array.
/// Arrays pass through, a lone value is wrapped, absence (missing, null or "") is empty.
pub fn as_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// Pull `response.body.items.item` out of a registry payload as records
pub fn flatten_items(payload: &Value) -> Vec<RegistryRecord> {
    as_list(payload.pointer("/response/body/items/item"))
        .into_iter()
        .map(RegistryRecord::from_json)
        .collect()
}

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
}

/// Main title-record fields shown in the table and exported to CSV
pub const TITLE_COLUMNS: &[Column] = &[
    Column { key: "platPlc", label: "대지위치" },
    Column { key: "mainPurpsCdNm", label: "주용도" },
    Column { key: "totArea", label: "연면적(㎡)" },
    Column { key: "bcRat", label: "건폐율(%)" },
    Column { key: "vlRat", label: "용적률(%)" },
    Column { key: "grndFlrCnt", label: "지상층수" },
    Column { key: "ugrndFlrCnt", label: "지하층수" },
    Column { key: "useAprDay", label: "사용승인일" },
    Column { key: MANAGEMENT_KEY, label: "관리번호" },
];

/// How a table picks its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSet {
    Curated(&'static [Column]),
    /// Keys of the first record, as observed at render time
    Observed,
}

impl ColumnSet {
    /// (key, header label) pairs for the given rows
    pub fn resolve(&self, records: &[RegistryRecord]) -> Vec<(String, String)> {
        match self {
            ColumnSet::Curated(columns) => columns
                .iter()
                .map(|c| (c.key.to_string(), c.label.to_string()))
                .collect(),
            ColumnSet::Observed => records
                .first()
                .map(|r| r.keys().map(|k| (k.to_string(), k.to_string())).collect())
                .unwrap_or_default(),
        }
    }

    pub fn keys(&self, records: &[RegistryRecord]) -> Vec<String> {
        self.resolve(records).into_iter().map(|(key, _)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(item: Value) -> Value {
        json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL SERVICE." },
                "body": { "items": { "item": item }, "totalCount": 1 }
            }
        })
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let item = json!({ "platPlc": "서울특별시 강남구 개포동 12번지", "grndFlrCnt": 15 });
        let from_object = flatten_items(&payload(item.clone()));
        let from_array = flatten_items(&payload(json!([item])));
        assert_eq!(from_object.len(), 1);
        assert_eq!(from_object, from_array);
    }

    #[test]
    fn test_array_passes_through() {
        let items = json!([{ "bldNm": "A" }, { "bldNm": "B" }, { "bldNm": "C" }]);
        let records = flatten_items(&payload(items));
        let names: Vec<String> = records.iter().map(|r| r.text("bldNm")).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_absent_item_is_empty() {
        assert!(flatten_items(&json!({})).is_empty());
        assert!(flatten_items(&json!({ "response": { "body": { "items": "" } } })).is_empty());
        assert!(flatten_items(&payload(Value::Null)).is_empty());
        assert!(as_list(None).is_empty());
        assert!(as_list(Some(&json!(""))).is_empty());
    }

    #[test]
    fn test_field_values() {
        let record = RegistryRecord::from_json(json!({
            "platPlc": "개포동",
            "totArea": 1234.5,
            "bcRat": null,
            "flag": true
        }));
        assert_eq!(record.text("platPlc"), "개포동");
        assert_eq!(record.text("totArea"), "1234.5");
        assert_eq!(record.text("bcRat"), "");
        assert_eq!(record.text("missing"), "");
        assert_eq!(record.get("flag"), Some(&FieldValue::Text("true".to_string())));
    }

    #[test]
    fn test_management_key_accepts_numbers() {
        let as_text = RegistryRecord::from_json(json!({ "mgmBldrgstPk": "11680-100186290" }));
        let as_number = RegistryRecord::from_json(json!({ "mgmBldrgstPk": 1168010018 }));
        let blank = RegistryRecord::from_json(json!({ "mgmBldrgstPk": " " }));
        assert_eq!(as_text.management_key().as_deref(), Some("11680-100186290"));
        assert_eq!(as_number.management_key().as_deref(), Some("1168010018"));
        assert_eq!(blank.management_key(), None);
    }

    #[test]
    fn test_record_serializes_back_to_plain_json() {
        let original = json!({ "a": "1", "b": 2, "c": null });
        let record = RegistryRecord::from_json(original.clone());
        assert_eq!(serde_json::to_value(&record).unwrap(), original);
    }

    #[test]
    fn test_column_sets() {
        let records = vec![RegistryRecord::from_json(json!({ "b": "x", "a": "y" }))];
        assert_eq!(ColumnSet::Observed.keys(&records), vec!["a", "b"]);
        assert!(ColumnSet::Observed.keys(&[]).is_empty());

        let curated = ColumnSet::Curated(TITLE_COLUMNS).resolve(&records);
        assert_eq!(curated.len(), TITLE_COLUMNS.len());
        assert_eq!(curated[0], ("platPlc".to_string(), "대지위치".to_string()));
    }
}
