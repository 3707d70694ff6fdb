use crate::api::{ids_of, ApiResult, EntityApi, Query};
use crate::caller::Caller;
use crate::types::{EntityKind, Id};
use std::collections::BTreeSet;

/// True only when a single lookup restricted to `ids` returns exactly as
/// many records as ids were requested. Duplicate ids therefore never pass,
/// and neither does an empty list.
pub fn ids_accessible(
    api: &dyn EntityApi,
    caller: &Caller,
    kind: EntityKind,
    ids: &[Id],
    editable: bool,
) -> ApiResult<bool> {
    if ids.is_empty() {
        return Ok(false);
    }
    let mut query = Query::ids(ids);
    query.editable = editable;
    let found = api.get(caller, kind, &query)?;
    Ok(found.len() == ids.len())
}

/// Subset of `ids`, in request order, that still exists and is editable.
/// Lookup failures yield an empty list.
pub fn editable_ids(api: &dyn EntityApi, caller: &Caller, kind: EntityKind, ids: &[Id]) -> Vec<Id> {
    if ids.is_empty() {
        return Vec::new();
    }
    match api.get(caller, kind, &Query::ids(ids).editable()) {
        Ok(records) => {
            let found: BTreeSet<Id> = ids_of(kind, &records).into_iter().collect();
            ids.iter().copied().filter(|id| found.contains(id)).collect()
        }
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "keepids lookup failed");
            Vec::new()
        }
    }
}
