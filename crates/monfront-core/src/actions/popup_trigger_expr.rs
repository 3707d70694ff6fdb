//! Trigger condition builder popup.
//!
//! Without `add` the popup answers with the form model (item, functions
//! usable with it, current parameters). With `add` it composes the
//! expression and hands it back for the destination field. Validation
//! errors only stop the request when `add` is set; otherwise they ride
//! along with the form model.

use super::invalid_json;
use crate::api::{field_id, ApiResult, Query, Record};
use crate::input::{RawInput, RawValue};
use crate::messages::MessageCollector;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::types::{EntityKind, Id};
use crate::validator::Input;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const INSERT_FAILED: &str = "Cannot insert trigger expression";
const OPERATORS: [&str; 6] = ["=", "<>", ">", "<", ">=", "<="];

const PARAM_TYPE_TIME: i64 = 0;
const PARAM_TYPE_COUNTS: i64 = 1;

/// Item value types.
const VALUE_FLOAT: i64 = 0;
const VALUE_UNSIGNED: i64 = 3;
const VALUE_BINARY: i64 = 5;

/// Parameters quoted as strings in the composed expression.
const QUOTED_PARAMS: [&str; 5] = ["o", "v", "mode", "pattern", "string"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `pi()`: no item, no comparison.
    Constant,
    /// `now()>0`: no item.
    Standalone,
    /// `avg(/host/key,5m)>0`
    History,
    /// `abs(last(/host/key))>0`
    OverLast,
}

#[derive(Debug)]
struct Function {
    name: &'static str,
    description: &'static str,
    shape: Shape,
    numeric_only: bool,
    /// Parameter names in expression order. `last` and `shift` fold into
    /// the first argument.
    params: &'static [&'static str],
}

const FUNCTIONS: &[Function] = &[
    Function {
        name: "abs",
        description: "abs() - Absolute value",
        shape: Shape::OverLast,
        numeric_only: true,
        params: &["last", "shift"],
    },
    Function {
        name: "avg",
        description: "avg() - Average value of a period T",
        shape: Shape::History,
        numeric_only: true,
        params: &["last", "shift"],
    },
    Function {
        name: "count",
        description: "count() - Number of successfully retrieved values V (which fulfill operator O) for period T",
        shape: Shape::History,
        numeric_only: false,
        params: &["last", "shift", "o", "v"],
    },
    Function {
        name: "date",
        description: "date() - Current date",
        shape: Shape::Standalone,
        numeric_only: false,
        params: &[],
    },
    Function {
        name: "dayofweek",
        description: "dayofweek() - Day of week",
        shape: Shape::Standalone,
        numeric_only: false,
        params: &[],
    },
    Function {
        name: "find",
        description: "find() - Check occurrence of pattern V (which fulfill operator O) for period T (1 - match, 0 - no match)",
        shape: Shape::History,
        numeric_only: false,
        params: &["last", "shift", "o", "v"],
    },
    Function {
        name: "last",
        description: "last() - Last (most recent) T value",
        shape: Shape::History,
        numeric_only: false,
        params: &["last", "shift"],
    },
    Function {
        name: "length",
        description: "length() - Length of last (most recent) T value in characters",
        shape: Shape::OverLast,
        numeric_only: false,
        params: &["last", "shift"],
    },
    Function {
        name: "max",
        description: "max() - Maximum value for period T",
        shape: Shape::History,
        numeric_only: true,
        params: &["last", "shift"],
    },
    Function {
        name: "min",
        description: "min() - Minimum value for period T",
        shape: Shape::History,
        numeric_only: true,
        params: &["last", "shift"],
    },
    Function {
        name: "nodata",
        description: "nodata() - No data received during period of time T (1 - true, 0 - false), Mode (strict - ignore proxy time delay in sending data)",
        shape: Shape::History,
        numeric_only: false,
        params: &["last", "mode"],
    },
    Function {
        name: "now",
        description: "now() - Number of seconds since the Epoch",
        shape: Shape::Standalone,
        numeric_only: false,
        params: &[],
    },
    Function {
        name: "pi",
        description: "pi() - Pi constant",
        shape: Shape::Constant,
        numeric_only: false,
        params: &[],
    },
    Function {
        name: "sum",
        description: "sum() - Sum of values of a period T",
        shape: Shape::History,
        numeric_only: true,
        params: &["last", "shift"],
    },
    Function {
        name: "time",
        description: "time() - Current time",
        shape: Shape::Standalone,
        numeric_only: false,
        params: &[],
    },
];

fn function(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

impl Function {
    fn allows(&self, value_type: Option<i64>) -> bool {
        !self.numeric_only || value_type.map_or(true, |t| t == VALUE_FLOAT || t == VALUE_UNSIGNED)
    }
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![ActionDef {
        name: "popup.triggerexpr",
        entity: EntityKind::Trigger,
        style: ResponseStyle::Json,
        rules,
        check: None,
        invalid,
        authorize,
        execute,
    }]
}

fn rules() -> RuleSet {
    RuleSet::new(vec![
        string("dstfrm").fatal(),
        string("dstfld1").not_empty(),
        one_of("context", ["host", "template"]).required(),
        string("expression"),
        db("itemid", EntityKind::Item),
        one_of("function", FUNCTIONS.iter().map(|f| f.name)),
        one_of("operator", OPERATORS),
        FieldRule::new("params", RuleKind::Array),
        one_of("paramtype", [PARAM_TYPE_TIME, PARAM_TYPE_COUNTS]),
        string("value").not_empty(),
        db("hostid", EntityKind::Host),
        db("groupid", EntityKind::HostGroup),
        one_of("add", [1]),
    ])
}

/// Errors stop the request only when the caller asked to insert.
fn invalid(ctx: &Context<'_>, messages: &mut MessageCollector) -> Outcome {
    if ctx.raw.contains("add") {
        return Outcome::json_error(INSERT_FAILED, messages.take_texts(), None);
    }
    form_model(ctx, &Form::from_raw(ctx.raw), messages)
}

/// The builder only reads items through the caller's own API session.
fn authorize(_: &Context<'_>, _: &Input) -> ApiResult<bool> {
    Ok(true)
}

fn execute(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let form = Form::from_input(input);
    if input.has("add") {
        insert(ctx, &form, messages)
    } else {
        form_model(ctx, &form, messages)
    }
}

// ---------------------------------------------------------------------------
// Form values
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Form {
    dstfrm: String,
    dstfld1: String,
    context: String,
    expression: String,
    itemid: Option<Id>,
    function: String,
    operator: String,
    paramtype: i64,
    params: Map<String, Value>,
    value: String,
    hostid: Option<Id>,
    groupid: Option<Id>,
}

impl Form {
    fn from_input(input: &Input) -> Self {
        let text = |f: &str| input.str(f).unwrap_or_default().to_string();
        Self {
            dstfrm: text("dstfrm"),
            dstfld1: text("dstfld1"),
            context: text("context"),
            expression: text("expression"),
            itemid: input.id("itemid"),
            function: input.str("function").unwrap_or("last").to_string(),
            operator: input.str("operator").unwrap_or("=").to_string(),
            paramtype: input.i64("paramtype").unwrap_or(PARAM_TYPE_TIME),
            params: input
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            value: input.str("value").unwrap_or("0").to_string(),
            hostid: input.id("hostid"),
            groupid: input.id("groupid"),
        }
    }

    /// Best effort over unvalidated input; unusable values fall back to
    /// the defaults.
    fn from_raw(raw: &RawInput) -> Self {
        let text = |f: &str| raw.get(f).and_then(RawValue::as_str).map(str::to_string);
        let id = |f: &str| text(f).and_then(|s| s.parse::<Id>().ok());
        let params = raw
            .get("params")
            .and_then(RawValue::as_map)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), Value::String(s.to_string()))))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            dstfrm: text("dstfrm").unwrap_or_default(),
            dstfld1: text("dstfld1").unwrap_or_default(),
            context: text("context").unwrap_or_default(),
            expression: text("expression").unwrap_or_default(),
            itemid: id("itemid"),
            function: text("function")
                .filter(|f| function(f).is_some())
                .unwrap_or_else(|| "last".to_string()),
            operator: text("operator")
                .filter(|o| OPERATORS.contains(&o.as_str()))
                .unwrap_or_else(|| "=".to_string()),
            paramtype: text("paramtype")
                .and_then(|s| s.parse().ok())
                .filter(|t| *t == PARAM_TYPE_TIME || *t == PARAM_TYPE_COUNTS)
                .unwrap_or(PARAM_TYPE_TIME),
            params,
            value: text("value").unwrap_or_else(|| "0".to_string()),
            hostid: id("hostid"),
            groupid: id("groupid"),
        }
    }

    fn param(&self, name: &str) -> String {
        match self.params.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Item {
    itemid: Id,
    key: String,
    value_type: Option<i64>,
    /// Technical host name used inside expressions.
    host: String,
    description: String,
}

fn text_of(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn load_item(ctx: &Context<'_>, itemid: Id) -> ApiResult<Option<Item>> {
    let Some(record) = ctx
        .api
        .get(ctx.caller, EntityKind::Item, &Query::ids(&[itemid]))?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let host = match field_id(&record, "hostid") {
        Some(hostid) => ctx
            .api
            .get(ctx.caller, EntityKind::Host, &Query::ids(&[hostid]))?
            .into_iter()
            .next(),
        None => None,
    };
    let technical = host.as_ref().and_then(|h| text_of(h, "host")).unwrap_or_default();
    let visible = host
        .as_ref()
        .and_then(|h| text_of(h, "name"))
        .unwrap_or_else(|| technical.clone());
    let name = text_of(&record, "name").unwrap_or_default();
    Ok(Some(Item {
        itemid,
        key: text_of(&record, "key_").unwrap_or_default(),
        value_type: text_of(&record, "value_type").and_then(|t| t.parse().ok()),
        host: technical,
        description: format!("{visible}: {name}"),
    }))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn form_model(ctx: &Context<'_>, form: &Form, messages: &mut MessageCollector) -> Outcome {
    let item = match form.itemid.map(|id| load_item(ctx, id)).transpose() {
        Ok(item) => item.flatten(),
        Err(e) => {
            messages.extend_errors(e.messages);
            return invalid_json(ctx, messages);
        }
    };
    let value_type = item.as_ref().and_then(|i| i.value_type);

    let functions: Vec<Value> = FUNCTIONS
        .iter()
        .filter(|f| f.allows(value_type))
        .map(|f| json!({ "name": f.name, "description": f.description }))
        .collect();
    let selected = function(&form.function)
        .filter(|f| f.allows(value_type))
        .or_else(|| function("last"));
    let item_required = selected.is_some_and(|f| matches!(f.shape, Shape::History | Shape::OverLast));

    let notices = if messages.is_empty() {
        Value::Null
    } else {
        json!(messages.take_texts())
    };
    Outcome::data(json!({
        "title": "Condition",
        "dstfrm": form.dstfrm,
        "dstfld1": form.dstfld1,
        "context": form.context,
        "expression": form.expression,
        "itemid": item.as_ref().map_or(0, |i| i.itemid).to_string(),
        "item_key": item.as_ref().map(|i| i.key.clone()).unwrap_or_default(),
        "item_description": item.as_ref().map(|i| i.description.clone()).unwrap_or_default(),
        "item_value_type": value_type,
        "item_required": item_required,
        "functions": functions,
        "function": selected.map_or("last", |f| f.name),
        "operator": form.operator,
        "params": form.params,
        "paramtype": form.paramtype,
        "value": form.value,
        "groupid": form.groupid.unwrap_or_default().to_string(),
        "hostid": form.hostid.unwrap_or_default().to_string(),
        "messages": notices,
    }))
}

fn insert(ctx: &Context<'_>, form: &Form, messages: &mut MessageCollector) -> Outcome {
    let expression = match compose(ctx, form, messages) {
        Ok(expression) => expression,
        Err(e) => {
            messages.extend_errors(e.messages);
            None
        }
    };
    match expression {
        Some(expression) if !messages.has_errors() => Outcome::data(json!({
            "expression": expression,
            "dstfld1": form.dstfld1,
            "dstfrm": form.dstfrm,
        })),
        _ => Outcome::json_error(INSERT_FAILED, messages.take_texts(), None),
    }
}

/// Build the expression text, or push the reason it cannot be built.
fn compose(ctx: &Context<'_>, form: &Form, messages: &mut MessageCollector) -> ApiResult<Option<String>> {
    let Some(f) = function(&form.function) else {
        messages.error(format!("Incorrect value \"{}\" for \"function\" field.", form.function));
        return Ok(None);
    };
    let op = &form.operator;
    let value = quote_value(&form.value);

    match f.shape {
        Shape::Constant => return Ok(Some(format!("{}()", f.name))),
        Shape::Standalone => return Ok(Some(format!("{}(){op}{value}", f.name))),
        Shape::History | Shape::OverLast => {}
    }

    let item = match form.itemid {
        Some(id) => load_item(ctx, id)?,
        None => None,
    };
    let Some(item) = item else {
        messages.error("Item not selected");
        return Ok(None);
    };
    if item.value_type == Some(VALUE_BINARY) {
        messages.error(format!("Binary item \"{}\" cannot be used in trigger", item.key));
        return Ok(None);
    }

    let mut last = form.param("last");
    if form.paramtype == PARAM_TYPE_COUNTS && last.parse::<i64>().is_ok() {
        last = format!("#{last}");
    }
    let shift = form.param("shift");
    if !shift.is_empty() {
        last = format!("{last}:{shift}");
    }
    let rest: Vec<String> = f
        .params
        .iter()
        .filter(|p| !matches!(**p, "last" | "shift"))
        .map(|p| {
            let v = form.param(p);
            if QUOTED_PARAMS.contains(p) && !v.is_empty() {
                quote_string(&v)
            } else {
                v
            }
        })
        .collect();

    let query = format!("/{}/{}", item.host, item.key);
    let expression = match f.shape {
        Shape::OverLast => {
            let last = if last.is_empty() { String::new() } else { format!(",{last}") };
            let rest = rest.join(",");
            let rest = rest.trim_end_matches(',');
            let rest = if rest.is_empty() { String::new() } else { format!(",{rest}") };
            format!("{}(last({query}{last}){rest}){op}{value}", f.name)
        }
        _ => {
            let mut args = vec![last];
            args.extend(rest);
            let args = args.join(",");
            let args = args.trim_end_matches(',');
            let args = if args.is_empty() { String::new() } else { format!(",{args}") };
            format!("{}({query}{args}){op}{value}", f.name)
        }
    };
    Ok(Some(expression))
}

fn bare_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(-?\d+(\.\d+)?[smhdwKMGT]?|\{\$[A-Z0-9_.]+\}|\{#[A-Z0-9_.]+\})$")
            .expect("valid regex")
    })
}

fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Numbers and macros stay bare; anything else becomes a string literal.
fn quote_value(s: &str) -> String {
    if bare_value_re().is_match(s) {
        s.to_string()
    } else {
        quote_string(s)
    }
}
