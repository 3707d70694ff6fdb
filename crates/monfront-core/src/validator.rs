use crate::api::{EntityApi, Query};
use crate::caller::Caller;
use crate::input::{RawInput, RawValue};
use crate::messages::MessageCollector;
use crate::rules::{FieldRule, Presence, RuleKind, RuleSet};
use crate::timeparse;
use crate::types::{EntityKind, Id, MAX_ID};
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The normalized bag: only fields named by the rule set, already coerced
/// (integers, ids, seconds, timestamps).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Input {
    fields: Map<String, Value>,
}

impl Input {
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn id(&self, field: &str) -> Option<Id> {
        self.fields.get(field).and_then(Value::as_u64)
    }

    pub fn ids(&self, field: &str) -> Vec<Id> {
        self.fields
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Input {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

// ---------------------------------------------------------------------------
// Invalid
// ---------------------------------------------------------------------------

/// Why validation did not produce an [`Input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalid {
    /// A `fatal` field failed; the request is answered generically.
    Fatal,
    /// Field messages were pushed into the collector.
    Recoverable,
}

/// Per-action check run once every field rule has passed.
pub type CrossCheck = fn(&Input, &mut MessageCollector) -> bool;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub struct Validator<'a> {
    caller: &'a Caller,
    api: &'a dyn EntityApi,
}

struct FieldError(String);

impl<'a> Validator<'a> {
    pub fn new(caller: &'a Caller, api: &'a dyn EntityApi) -> Self {
        Self { caller, api }
    }

    /// Check `raw` against `rules`. On recoverable failure every message is
    /// pushed into `messages`; a fatal failure pushes nothing.
    pub fn validate(
        &self,
        rules: &RuleSet,
        raw: &RawInput,
        messages: &mut MessageCollector,
    ) -> Result<Input, Invalid> {
        let mut errors = Vec::new();
        let input = self.validate_set(rules, |f| raw.get(f), "", &mut errors)?;
        if errors.is_empty() {
            Ok(input)
        } else {
            messages.extend_errors(errors);
            Err(Invalid::Recoverable)
        }
    }

    /// [`validate`](Self::validate) followed by an optional cross-field check.
    pub fn validate_with(
        &self,
        rules: &RuleSet,
        raw: &RawInput,
        check: Option<CrossCheck>,
        messages: &mut MessageCollector,
    ) -> Result<Input, Invalid> {
        let input = self.validate(rules, raw, messages)?;
        match check {
            Some(check) if !check(&input, messages) => Err(Invalid::Recoverable),
            _ => Ok(input),
        }
    }

    fn validate_set<'r>(
        &self,
        rules: &RuleSet,
        lookup: impl Fn(&str) -> Option<&'r RawValue>,
        prefix: &str,
        errors: &mut Vec<String>,
    ) -> Result<Input, Invalid> {
        let mut out = Map::new();
        for rule in rules {
            let name = format!("{prefix}{}", rule.field);
            let default;
            let raw = match (lookup(rule.field), &rule.presence) {
                (Some(v), _) => v,
                (None, Presence::Default(d)) => {
                    default = RawValue::Str(d.clone());
                    &default
                }
                (None, Presence::Required) => {
                    if rule.fatal {
                        return Err(Invalid::Fatal);
                    }
                    errors.push(format!("Field \"{name}\" is mandatory."));
                    continue;
                }
                (None, Presence::Optional) => continue,
            };

            let mut nested = Vec::new();
            match self.check_field(rule, &name, raw, &mut nested) {
                Ok(value) if nested.is_empty() => {
                    out.insert(rule.field.to_string(), value);
                }
                Ok(_) => {
                    if rule.fatal {
                        return Err(Invalid::Fatal);
                    }
                    errors.append(&mut nested);
                }
                Err(FieldError(m)) => {
                    if rule.fatal {
                        return Err(Invalid::Fatal);
                    }
                    errors.push(m);
                }
            }
        }
        Ok(Input::from(out))
    }

    fn check_field(
        &self,
        rule: &FieldRule,
        name: &str,
        raw: &RawValue,
        nested: &mut Vec<String>,
    ) -> Result<Value, FieldError> {
        let incorrect = || FieldError(format!("Incorrect value for \"{name}\" field."));
        let reason = |r: &str| FieldError(format!("Incorrect value for field \"{name}\": {r}."));
        let out_of_range =
            |v: &str| FieldError(format!("Incorrect value \"{v}\" for \"{name}\" field."));

        match &rule.kind {
            RuleKind::String { max_len } => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                if rule.not_empty && s.trim().is_empty() {
                    return Err(reason("cannot be empty"));
                }
                if max_len.is_some_and(|max| s.chars().count() > max) {
                    return Err(reason("value is too long"));
                }
                Ok(Value::String(s.to_string()))
            }
            RuleKind::Int32 { min, max } => {
                let s = raw.as_str().map(str::trim).unwrap_or_default();
                let n: i64 = s
                    .parse::<i32>()
                    .map(i64::from)
                    .map_err(|_| FieldError(format!("Field \"{name}\" is not integer.")))?;
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return Err(out_of_range(s));
                }
                Ok(Value::from(n))
            }
            RuleKind::Float { min, max } => {
                let s = raw.as_str().map(str::trim).unwrap_or_default();
                let n: f64 = s
                    .parse()
                    .ok()
                    .filter(|n: &f64| n.is_finite())
                    .ok_or_else(|| reason("a number is expected"))?;
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    return Err(out_of_range(s));
                }
                Ok(Value::from(n))
            }
            RuleKind::Id => parse_id(raw).map(Value::from).ok_or_else(incorrect),
            RuleKind::Db(kind) => {
                let id = parse_id(raw).ok_or_else(incorrect)?;
                if !self.exists(*kind, &[id]) {
                    return Err(reason("object does not exist"));
                }
                Ok(Value::from(id))
            }
            RuleKind::ArrayId | RuleKind::ArrayDb(_) => {
                let ids = parse_id_list(raw).ok_or_else(incorrect)?;
                if rule.not_empty && ids.is_empty() {
                    return Err(reason("cannot be empty"));
                }
                if let RuleKind::ArrayDb(kind) = &rule.kind {
                    if !ids.is_empty() && !self.exists(*kind, &ids) {
                        return Err(reason("object does not exist"));
                    }
                }
                Ok(Value::from(ids))
            }
            RuleKind::Array => {
                let empty = match raw {
                    RawValue::List(items) => items.is_empty(),
                    RawValue::Map(map) => map.is_empty(),
                    RawValue::Str(_) => return Err(incorrect()),
                };
                if rule.not_empty && empty {
                    return Err(reason("cannot be empty"));
                }
                Ok(raw_to_json(raw))
            }
            RuleKind::In(values) => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                if !values.iter().any(|v| v == s) {
                    return Err(out_of_range(s));
                }
                if values.iter().all(|v| v.parse::<i64>().is_ok()) {
                    Ok(Value::from(s.parse::<i64>().unwrap_or_default()))
                } else {
                    Ok(Value::String(s.to_string()))
                }
            }
            RuleKind::TimeUnit { min, max } => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                let secs = timeparse::parse_time_unit(s).map_err(|r| reason(&r))?;
                if min.is_some_and(|m| secs < m) || max.is_some_and(|m| secs > m) {
                    let bounds = format!(
                        "value must be one of {}-{}",
                        min.unwrap_or(0),
                        max.unwrap_or(i64::MAX)
                    );
                    return Err(reason(&bounds));
                }
                Ok(Value::from(secs))
            }
            RuleKind::TimePeriods => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                if rule.not_empty && s.trim().is_empty() {
                    return Err(reason("cannot be empty"));
                }
                timeparse::parse_time_periods(s).map_err(|r| reason(&r))?;
                Ok(Value::String(s.trim().to_string()))
            }
            RuleKind::AbsTime => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                let dt = timeparse::parse_abs_time(s).map_err(|r| reason(&r))?;
                Ok(Value::from(dt.and_utc().timestamp()))
            }
            RuleKind::Json => {
                let s = raw.as_str().ok_or_else(incorrect)?;
                serde_json::from_str::<Value>(s).map_err(|_| reason("JSON is expected"))
            }
            RuleKind::Objects(set) => {
                let items = raw.as_list().ok_or_else(incorrect)?;
                if rule.not_empty && items.is_empty() {
                    return Err(reason("cannot be empty"));
                }
                let mut rows = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let map = item.as_map().ok_or_else(incorrect)?;
                    let prefix = format!("{name}/{}/", i + 1);
                    match self.validate_set(set, |f| map.get(f), &prefix, nested) {
                        Ok(row) => rows.push(Value::Object(row.into_map())),
                        Err(_) => return Err(incorrect()),
                    }
                }
                Ok(Value::Array(rows))
            }
        }
    }

    /// One read-only lookup confirming every id exists.
    fn exists(&self, kind: EntityKind, ids: &[Id]) -> bool {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        match self.api.get(self.caller, kind, &Query::ids(&unique)) {
            Ok(records) => records.len() == unique.len(),
            Err(e) => {
                tracing::debug!(kind = %kind, error = %e, "existence lookup failed");
                false
            }
        }
    }
}

fn parse_id(raw: &RawValue) -> Option<Id> {
    let s = raw.as_str()?.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<Id>().ok().filter(|id| *id <= MAX_ID)
}

fn parse_id_list(raw: &RawValue) -> Option<Vec<Id>> {
    match raw {
        RawValue::List(items) => items.iter().map(parse_id).collect(),
        RawValue::Map(map) => map.values().map(parse_id).collect(),
        RawValue::Str(_) => None,
    }
}

fn raw_to_json(raw: &RawValue) -> Value {
    match raw {
        RawValue::Str(s) => Value::String(s.clone()),
        RawValue::List(items) => Value::Array(items.iter().map(raw_to_json).collect()),
        RawValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), raw_to_json(v)))
                .collect(),
        ),
    }
}
