//! Generic record picker popup.
//!
//! `srctbl` names the source table; each table declares the lowest user
//! type that may open it and the fields a caller may copy back into the
//! calling form. Group and host filters are confirmed by lookup before
//! anything is listed.

use super::invalid_json;
use crate::api::{field_id, ids_of, record_id, ApiResult, Query, Record};
use crate::messages::MessageCollector;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::types::{EntityKind, Id, UserType};
use crate::validator::Input;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// A filter selector: an id field and a by-name field on the request.
#[derive(Debug, Clone, Copy)]
struct Filter {
    kind: EntityKind,
    id_field: &'static str,
    name_field: &'static str,
}

const GROUP: Filter = Filter {
    kind: EntityKind::HostGroup,
    id_field: "groupid",
    name_field: "group",
};

const HOST: Filter = Filter {
    kind: EntityKind::Host,
    id_field: "hostid",
    name_field: "host",
};

#[derive(Debug)]
struct Source {
    name: &'static str,
    title: &'static str,
    min_user_type: UserType,
    kind: EntityKind,
    src_fields: &'static [&'static str],
    columns: &'static [&'static str],
    /// Records are listed only once this filter is set, and only those whose
    /// record field matches it.
    narrow: Option<(Filter, &'static str)>,
}

const SOURCES: &[Source] = &[
    Source {
        name: "hosts",
        title: "Hosts",
        min_user_type: UserType::User,
        kind: EntityKind::Host,
        src_fields: &["hostid", "host"],
        columns: &["Name"],
        narrow: Some((GROUP, "groupid")),
    },
    Source {
        name: "host_groups",
        title: "Host groups",
        min_user_type: UserType::User,
        kind: EntityKind::HostGroup,
        src_fields: &["groupid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "items",
        title: "Items",
        min_user_type: UserType::User,
        kind: EntityKind::Item,
        src_fields: &["itemid", "name"],
        columns: &["Name", "Key"],
        narrow: Some((HOST, "hostid")),
    },
    Source {
        name: "triggers",
        title: "Triggers",
        min_user_type: UserType::User,
        kind: EntityKind::Trigger,
        src_fields: &["description", "triggerid", "expression"],
        columns: &["Name", "Severity", "Status"],
        narrow: Some((HOST, "hostid")),
    },
    Source {
        name: "proxies",
        title: "Proxies",
        min_user_type: UserType::Admin,
        kind: EntityKind::Proxy,
        src_fields: &["proxyid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "users",
        title: "Users",
        min_user_type: UserType::User,
        kind: EntityKind::User,
        src_fields: &["usergrpid", "username", "fullname", "userid"],
        columns: &["Username", "Name", "Last name"],
        narrow: None,
    },
    Source {
        name: "drules",
        title: "Discovery rules",
        min_user_type: UserType::Admin,
        kind: EntityKind::DiscoveryRule,
        src_fields: &["druleid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "dashboard",
        title: "Dashboards",
        min_user_type: UserType::User,
        kind: EntityKind::Dashboard,
        src_fields: &["dashboardid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "sla",
        title: "SLA",
        min_user_type: UserType::User,
        kind: EntityKind::Sla,
        src_fields: &["slaid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "actions",
        title: "Actions",
        min_user_type: UserType::User,
        kind: EntityKind::Action,
        src_fields: &["actionid", "name"],
        columns: &["Name"],
        narrow: None,
    },
    Source {
        name: "media_types",
        title: "Media types",
        min_user_type: UserType::User,
        kind: EntityKind::MediaType,
        src_fields: &["mediatypeid", "name"],
        columns: &["Media type"],
        narrow: None,
    },
];

fn source(name: &str) -> Option<&'static Source> {
    SOURCES.iter().find(|s| s.name == name)
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![ActionDef {
        name: "popup.generic",
        entity: EntityKind::Host,
        style: ResponseStyle::Json,
        rules,
        check: Some(check_src_fields),
        invalid: invalid_json,
        authorize,
        execute,
    }]
}

fn rules() -> RuleSet {
    RuleSet::new(vec![
        one_of("srctbl", SOURCES.iter().map(|s| s.name)).required().fatal(),
        string("dstfrm").fatal(),
        string("dstfld1").not_empty(),
        string("dstfld2"),
        string("srcfld1").required(),
        string("srcfld2"),
        db("groupid", EntityKind::HostGroup),
        string("group"),
        db("hostid", EntityKind::Host),
        string("host"),
        one_of("multiselect", [1]),
        FieldRule::new("excludeids", RuleKind::ArrayId),
        FieldRule::new("disableids", RuleKind::ArrayId),
        one_of("writeonly", [1]),
    ])
}

/// Source fields must be ones the chosen table hands out.
fn check_src_fields(input: &Input, messages: &mut MessageCollector) -> bool {
    let Some(source) = input.str("srctbl").and_then(source) else {
        return false;
    };
    let mut ok = true;
    for field in ["srcfld1", "srcfld2"] {
        if let Some(value) = input.str(field) {
            if !source.src_fields.contains(&value) {
                messages.error(format!("Incorrect value \"{value}\" for \"{field}\" field."));
                ok = false;
            }
        }
    }
    ok
}

/// Ids the filter selects: by name when one is given, else by id. `None`
/// when the request sets neither.
fn resolve(ctx: &Context<'_>, input: &Input, filter: &Filter) -> ApiResult<Option<Vec<Id>>> {
    let query = match (input.str(filter.name_field), input.id(filter.id_field)) {
        (Some(name), _) if !name.is_empty() => Query::all().filter(filter.kind.name_field(), name),
        (_, Some(id)) => Query::ids(&[id]),
        _ => return Ok(None),
    };
    let found = ctx.api.get(ctx.caller, filter.kind, &query)?;
    Ok(Some(ids_of(filter.kind, &found)))
}

fn authorize(ctx: &Context<'_>, input: &Input) -> ApiResult<bool> {
    let Some(source) = input.str("srctbl").and_then(source) else {
        return Ok(false);
    };
    if ctx.caller.user_type < source.min_user_type {
        return Ok(false);
    }
    for filter in [GROUP, HOST] {
        if resolve(ctx, input, &filter)?.is_some_and(|ids| ids.is_empty()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// One table row: the record id plus whichever source fields it carries.
fn row(source: &Source, record: &Record, disabled: &BTreeSet<Id>) -> Value {
    let mut out = Map::new();
    let id = record_id(source.kind, record);
    out.insert(
        "id".to_string(),
        id.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    for field in source.src_fields {
        if let Some(v) = record.get(*field) {
            out.insert((*field).to_string(), v.clone());
        }
    }
    if id.is_some_and(|id| disabled.contains(&id)) {
        out.insert("_disabled".to_string(), Value::Bool(true));
    }
    Value::Object(out)
}

fn execute(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let Some(source) = input.str("srctbl").and_then(source) else {
        return Outcome::Fatal;
    };

    let narrowed = match source.narrow {
        Some((filter, field)) => match resolve(ctx, input, &filter) {
            Ok(ids) => Some((ids.unwrap_or_default(), field)),
            Err(e) => {
                messages.extend_errors(e.messages);
                return invalid_json(ctx, messages);
            }
        },
        None => None,
    };
    let preselect_required = narrowed.as_ref().is_some_and(|(ids, _)| ids.is_empty());

    let mut records = if preselect_required {
        Vec::new()
    } else {
        let mut query = Query::all();
        query.editable = input.has("writeonly");
        match ctx.api.get(ctx.caller, source.kind, &query) {
            Ok(found) => found,
            Err(e) => {
                messages.extend_errors(e.messages);
                return invalid_json(ctx, messages);
            }
        }
    };

    if let Some((ids, field)) = &narrowed {
        records.retain(|r| field_id(r, field).is_some_and(|id| ids.contains(&id)));
    }
    let excluded: BTreeSet<Id> = input.ids("excludeids").into_iter().collect();
    records.retain(|r| record_id(source.kind, r).map_or(true, |id| !excluded.contains(&id)));

    let sort_field = source.kind.name_field();
    records.sort_by(|a, b| {
        let key = |r: &Record| r.get(sort_field).and_then(Value::as_str).unwrap_or_default().to_lowercase();
        key(a).cmp(&key(b))
    });

    let disabled: BTreeSet<Id> = input.ids("disableids").into_iter().collect();
    let rows: Vec<Value> = records.iter().map(|r| row(source, r, &disabled)).collect();
    tracing::debug!(srctbl = source.name, rows = rows.len(), "popup records listed");

    let notices = if messages.is_empty() {
        Value::Null
    } else {
        json!(messages.take_texts())
    };
    Outcome::data(json!({
        "title": source.title,
        "popup_type": source.name,
        "multiselect": input.has("multiselect"),
        "table_columns": source.columns,
        "table_records": rows,
        "preselect_required": preselect_required,
        "messages": notices,
    }))
}
