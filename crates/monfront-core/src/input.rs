use crate::error::{FrontendError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// RawValue
// ---------------------------------------------------------------------------

/// A request parameter exactly as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Str(String),
    List(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
}

impl RawValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            RawValue::Map(map) => Some(map),
            _ => None,
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawValue::Str(if *b { "1" } else { "0" }.to_string())),
            Value::Number(n) => Some(RawValue::Str(n.to_string())),
            Value::String(s) => Some(RawValue::Str(s.clone())),
            Value::Array(items) => Some(RawValue::List(
                items.iter().filter_map(RawValue::from_json).collect(),
            )),
            Value::Object(members) => Some(RawValue::Map(
                members
                    .iter()
                    .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    /// Turn maps keyed `0..n` into lists, recursively.
    fn normalize(self) -> Self {
        match self {
            RawValue::Map(map) => {
                let map: BTreeMap<String, RawValue> =
                    map.into_iter().map(|(k, v)| (k, v.normalize())).collect();
                match sequential_indexes(&map) {
                    Some(order) => {
                        let mut map = map;
                        RawValue::List(
                            order
                                .iter()
                                .filter_map(|key| map.remove(key))
                                .collect(),
                        )
                    }
                    None => RawValue::Map(map),
                }
            }
            RawValue::List(items) => {
                RawValue::List(items.into_iter().map(RawValue::normalize).collect())
            }
            other => other,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Str(s)
    }
}

/// If every key is a distinct index in `0..len`, return the keys in index order.
fn sequential_indexes(map: &BTreeMap<String, RawValue>) -> Option<Vec<String>> {
    if map.is_empty() {
        return None;
    }
    let mut slots: Vec<Option<&String>> = vec![None; map.len()];
    for key in map.keys() {
        if key.len() > 1 && key.starts_with('0') {
            return None;
        }
        let idx: usize = key.parse().ok()?;
        let slot = slots.get_mut(idx)?;
        *slot = Some(key);
    }
    slots.into_iter().map(|k| k.cloned()).collect()
}

// ---------------------------------------------------------------------------
// RawInput
// ---------------------------------------------------------------------------

/// The unvalidated request bag: parameter name to submitted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, RawValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `application/x-www-form-urlencoded` data (or a query string)
    /// honouring the `name[]` / `name[key]` bracket convention.
    pub fn from_form(data: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(data))
    }

    /// Build the bag from decoded `name=value` pairs, with the same bracket
    /// convention as [`from_form`](Self::from_form).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut root: BTreeMap<String, RawValue> = BTreeMap::new();
        for (key, value) in pairs {
            let path = split_key(key.as_ref());
            insert_path(&mut root, &path, value.into());
        }
        let fields = root.into_iter().map(|(k, v)| (k, v.normalize())).collect();
        Self { fields }
    }

    /// Build the bag from a JSON object body.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let Some(members) = value.as_object() else {
            return Err(FrontendError::InvalidParameter(
                "request body must be a JSON object".to_string(),
            ));
        };
        let fields = members
            .iter()
            .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Ok(Self { fields })
    }

    /// Overlay `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(mut self, other: RawInput) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<RawValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.fields.iter()
    }
}

impl From<BTreeMap<String, RawValue>> for RawInput {
    fn from(fields: BTreeMap<String, RawValue>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bracket-key helpers
// ---------------------------------------------------------------------------

/// `a[b][]` → `["a", "b", ""]`. Malformed keys are taken literally.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }
    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return vec![key.to_string()];
    }
    segments
}

fn insert_path(map: &mut BTreeMap<String, RawValue>, path: &[String], value: String) {
    let (head, tail) = match path.split_first() {
        Some(split) => split,
        None => return,
    };
    let key = if head.is_empty() {
        map.len().to_string()
    } else {
        head.clone()
    };

    if tail.is_empty() {
        map.insert(key, RawValue::Str(value));
        return;
    }

    let slot = map
        .entry(key)
        .or_insert_with(|| RawValue::Map(BTreeMap::new()));
    if !matches!(slot, RawValue::Map(_)) {
        *slot = RawValue::Map(BTreeMap::new());
    }
    if let RawValue::Map(child) = slot {
        insert_path(child, tail, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pairs_become_strings() {
        let input = RawInput::from_form(b"action=discovery.disable&name=Local+network");
        assert_eq!(input.get("action"), Some(&RawValue::from("discovery.disable")));
        assert_eq!(input.get("name"), Some(&RawValue::from("Local network")));
    }

    #[test]
    fn pairs_follow_bracket_convention() {
        let raw = RawInput::from_pairs([("druleids[]", "5"), ("druleids[]", "7"), ("name", "a b")]);
        let ids = raw.get("druleids").and_then(RawValue::as_list).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(raw.get("name").and_then(RawValue::as_str), Some("a b"));
    }

    #[test]
    fn bracket_append_builds_list() {
        let input = RawInput::from_form(b"druleids%5B%5D=5&druleids%5B%5D=7");
        assert_eq!(
            input.get("druleids"),
            Some(&RawValue::List(vec!["5".into(), "7".into()]))
        );
    }

    #[test]
    fn indexed_objects_become_list_of_maps() {
        let input = RawInput::from_form(
            b"excluded_downtimes[0][name]=a&excluded_downtimes[1][name]=b&excluded_downtimes[1][duration_days]=2",
        );
        let list = input.get("excluded_downtimes").and_then(RawValue::as_list).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].as_map().unwrap()["duration_days"], RawValue::from("2"));
    }

    #[test]
    fn named_keys_stay_a_map() {
        let input = RawInput::from_form(b"filter[name]=x&filter[status]=1");
        let map = input.get("filter").and_then(RawValue::as_map).unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn sparse_indexes_stay_a_map() {
        let input = RawInput::from_form(b"ids[0]=1&ids[2]=3");
        assert!(input.get("ids").unwrap().as_map().is_some());
    }

    #[test]
    fn malformed_brackets_are_literal() {
        let input = RawInput::from_form(b"a[b=1");
        assert_eq!(input.get("a[b"), Some(&RawValue::from("1")));
    }

    #[test]
    fn json_scalars_are_stringified() {
        let body = serde_json::json!({
            "status": 1,
            "enabled": true,
            "skip": null,
            "ids": [5, 7]
        });
        let input = RawInput::from_json(&body).unwrap();
        assert_eq!(input.get("status"), Some(&RawValue::from("1")));
        assert_eq!(input.get("enabled"), Some(&RawValue::from("1")));
        assert!(!input.contains("skip"));
        assert_eq!(
            input.get("ids"),
            Some(&RawValue::List(vec!["5".into(), "7".into()]))
        );
    }

    #[test]
    fn json_body_must_be_object() {
        assert!(RawInput::from_json(&serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn merge_prefers_overlay() {
        let query = RawInput::from_form(b"action=a&name=x");
        let body = RawInput::from_form(b"name=y");
        let merged = query.merge(body);
        assert_eq!(merged.get("name"), Some(&RawValue::from("y")));
        assert_eq!(merged.get("action"), Some(&RawValue::from("a")));
    }
}
