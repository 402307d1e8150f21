use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

/// One extracted table row: run-specific column names mapped to cell text,
/// plus a unique `id` generated fresh on every run.
///
/// Fields are an ordered association rather than a map so that column order
/// survives into serialization and duplicate header names stay representable.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Build a record from (column, value) pairs with a fresh UUID id.
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Rebuild a record read back from the store.
    pub fn from_parts(id: String, fields: Vec<(String, String)>) -> Self {
        Self { id, fields }
    }

    /// First value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// Serialized as a JSON object: fields in column order, then "id" last.
// Duplicate column names are emitted as repeated keys in document order;
// map-collapsing consumers see the last occurrence.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(kv: &[(&str, &str)]) -> Vec<(String, String)> {
        kv.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fresh_ids_are_distinct() {
        let a = Record::new(pairs(&[("Magnitud", "4.5")]));
        let b = Record::new(pairs(&[("Magnitud", "4.5")]));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn json_preserves_column_order() {
        let mut r = Record::new(pairs(&[("Fecha", "2024-01-01"), ("Hora", "10:00"), ("Magnitud", "4.5")]));
        r.id = "fixed".to_string();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"Fecha":"2024-01-01","Hora":"10:00","Magnitud":"4.5","id":"fixed"}"#
        );
    }

    #[test]
    fn duplicate_columns_kept_positionally() {
        let mut r = Record::new(pairs(&[("Fecha", "a"), ("Fecha", "b")]));
        r.id = "fixed".to_string();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Fecha":"a","Fecha":"b","id":"fixed"}"#);
        // First occurrence wins for direct lookup
        assert_eq!(r.get("Fecha"), Some("a"));
    }

    #[test]
    fn get_missing_column() {
        let r = Record::new(pairs(&[("Fecha", "2024-01-01")]));
        assert_eq!(r.get("Hora"), None);
    }
}
