//! Declarative input rules.
//!
//! Every action describes its accepted parameters as a [`RuleSet`] of typed
//! [`FieldRule`]s. Rule sets are plain values built once when the action
//! registry is constructed; the validator interprets them per request.

use crate::types::EntityKind;

// ---------------------------------------------------------------------------
// RuleKind
// ---------------------------------------------------------------------------

/// The type (and type-specific bounds) a field must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    String { max_len: Option<usize> },
    Int32 { min: Option<i64>, max: Option<i64> },
    Float { min: Option<f64>, max: Option<f64> },
    Id,
    /// Id of an existing record of the given kind.
    Db(EntityKind),
    ArrayId,
    ArrayDb(EntityKind),
    /// Any list or map, passed through unchanged.
    Array,
    /// Membership in a fixed set. A set of integers normalizes to integers.
    In(Vec<String>),
    TimeUnit { min: Option<i64>, max: Option<i64> },
    TimePeriods,
    AbsTime,
    Json,
    /// List of maps, each checked against a nested rule set.
    Objects(RuleSet),
}

impl RuleKind {
    pub fn string() -> Self {
        RuleKind::String { max_len: None }
    }

    pub fn string_max(max_len: usize) -> Self {
        RuleKind::String {
            max_len: Some(max_len),
        }
    }

    pub fn int32() -> Self {
        RuleKind::Int32 {
            min: None,
            max: None,
        }
    }

    pub fn int_range(min: i64, max: i64) -> Self {
        RuleKind::Int32 {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn float_range(min: f64, max: f64) -> Self {
        RuleKind::Float {
            min: Some(min),
            max: Some(max),
        }
    }

    /// `in 0,1` style membership.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        RuleKind::In(values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn time_unit(min: i64, max: i64) -> Self {
        RuleKind::TimeUnit {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Short description used by `monfront actions list` and logs.
    pub fn describe(&self) -> String {
        match self {
            RuleKind::String { max_len: Some(n) } => format!("string({n})"),
            RuleKind::String { max_len: None } => "string".to_string(),
            RuleKind::Int32 {
                min: Some(a),
                max: Some(b),
            } => format!("int32 {a}:{b}"),
            RuleKind::Int32 { .. } => "int32".to_string(),
            RuleKind::Float {
                min: Some(a),
                max: Some(b),
            } => format!("float {a}:{b}"),
            RuleKind::Float { .. } => "float".to_string(),
            RuleKind::Id => "id".to_string(),
            RuleKind::Db(kind) => format!("db {}.{}", kind.table(), kind.id_field()),
            RuleKind::ArrayId => "array_id".to_string(),
            RuleKind::ArrayDb(kind) => format!("array_db {}.{}", kind.table(), kind.id_field()),
            RuleKind::Array => "array".to_string(),
            RuleKind::In(values) => format!("in {}", values.join(",")),
            RuleKind::TimeUnit { .. } => "time_unit".to_string(),
            RuleKind::TimePeriods => "time_periods".to_string(),
            RuleKind::AbsTime => "abs_time".to_string(),
            RuleKind::Json => "json".to_string(),
            RuleKind::Objects(set) => format!("objects({})", set.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    /// Optional; the raw default is validated like submitted input.
    Default(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub presence: Presence,
    pub fatal: bool,
    pub not_empty: bool,
    pub kind: RuleKind,
}

impl FieldRule {
    pub fn new(field: &'static str, kind: RuleKind) -> Self {
        Self {
            field,
            presence: Presence::Optional,
            fatal: false,
            not_empty: false,
            kind,
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn default_value(mut self, value: impl ToString) -> Self {
        self.presence = Presence::Default(value.to_string());
        self
    }

    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    pub fn not_empty(mut self) -> Self {
        self.not_empty = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// `required|not_empty|db drules.druleid` style summary.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        match &self.presence {
            Presence::Required => parts.push("required".to_string()),
            Presence::Default(v) => parts.push(format!("default {v}")),
            Presence::Optional => {}
        }
        if self.fatal {
            parts.push("fatal".to_string());
        }
        if self.not_empty {
            parts.push("not_empty".to_string());
        }
        parts.push(self.kind.describe());
        parts.join("|")
    }
}

// Short constructors for the action tables.

pub fn string(field: &'static str) -> FieldRule {
    FieldRule::new(field, RuleKind::string())
}

pub fn int32(field: &'static str) -> FieldRule {
    FieldRule::new(field, RuleKind::int32())
}

pub fn id(field: &'static str) -> FieldRule {
    FieldRule::new(field, RuleKind::Id)
}

pub fn db(field: &'static str, kind: EntityKind) -> FieldRule {
    FieldRule::new(field, RuleKind::Db(kind))
}

pub fn array_db(field: &'static str, kind: EntityKind) -> FieldRule {
    FieldRule::new(field, RuleKind::ArrayDb(kind))
}

pub fn one_of<I, S>(field: &'static str, values: I) -> FieldRule
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    FieldRule::new(field, RuleKind::one_of(values))
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Ordered field rules; order defines the order of error messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldRule> {
        self.rules.iter()
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.field)
    }

    /// The same rules with every default turned into a plain optional
    /// field, so an omitted field stays untouched on update.
    pub fn without_defaults(mut self) -> Self {
        for rule in &mut self.rules {
            if matches!(rule.presence, Presence::Default(_)) {
                rule.presence = Presence::Optional;
            }
        }
        self
    }

    /// Prepend `rule`, e.g. the record id of an update form.
    pub fn with_first(mut self, rule: FieldRule) -> Self {
        self.rules.insert(0, rule);
        self
    }
}

impl FromIterator<FieldRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = FieldRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a FieldRule;
    type IntoIter = std::slice::Iter<'a, FieldRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
