use super::{ApiError, ApiResult, EntityApi, Mutation, Query, Record, Verb, NO_PERMISSIONS};
use crate::caller::Caller;
use crate::error::{FrontendError, Result};
use crate::types::{EntityKind, Id};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-user visibility of one entity kind. Users without a restriction see
/// and edit everything; super admins are never restricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restriction {
    pub readable: BTreeSet<Id>,
    pub writable: BTreeSet<Id>,
}

#[derive(Debug, Default)]
struct Store {
    records: BTreeMap<EntityKind, BTreeMap<Id, Record>>,
    last_id: BTreeMap<EntityKind, Id>,
    restrictions: HashMap<(Id, EntityKind), Restriction>,
    failures: HashMap<(EntityKind, Verb, Option<Id>), String>,
    notices: HashMap<(EntityKind, Verb), String>,
}

impl Store {
    fn can_see(&self, caller: &Caller, kind: EntityKind, id: Id, editable: bool) -> bool {
        if caller.is_super_admin() {
            return true;
        }
        match self.restrictions.get(&(caller.userid, kind)) {
            None => true,
            Some(r) if editable => r.writable.contains(&id),
            Some(r) => r.readable.contains(&id) || r.writable.contains(&id),
        }
    }

    fn table(&self, kind: EntityKind) -> Option<&BTreeMap<Id, Record>> {
        self.records.get(&kind)
    }

    fn next_id(&mut self, kind: EntityKind) -> Id {
        let last = self.last_id.entry(kind).or_insert(0);
        *last += 1;
        *last
    }

    fn check_failure(&self, kind: EntityKind, verb: Verb, id: Option<Id>) -> ApiResult<()> {
        match self.failures.get(&(kind, verb, id)) {
            Some(message) => Err(ApiError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn notices(&self, kind: EntityKind, verb: Verb) -> Vec<String> {
        self.notices.get(&(kind, verb)).cloned().into_iter().collect()
    }

    /// Name clash against stored records other than `except`. Token names
    /// only clash among the tokens of one user.
    fn name_taken(&self, kind: EntityKind, record: &Record, except: Option<Id>) -> bool {
        let field = kind.name_field();
        let Some(name) = record.get(field) else {
            return false;
        };
        let owner = owner_of(kind, record, except.and_then(|id| self.stored(kind, id)));
        self.table(kind).is_some_and(|t| {
            t.iter().any(|(id, r)| {
                Some(*id) != except
                    && r.get(field) == Some(name)
                    && owner.is_none_or(|o| values_match(r.get("userid"), o))
            })
        })
    }

    fn stored(&self, kind: EntityKind, id: Id) -> Option<&Record> {
        self.table(kind).and_then(|t| t.get(&id))
    }
}

/// The user a token belongs to: from the submitted record, else from the
/// stored one. `None` for every other kind.
fn owner_of<'a>(kind: EntityKind, record: &'a Record, stored: Option<&'a Record>) -> Option<&'a Value> {
    if kind != EntityKind::Token {
        return None;
    }
    record
        .get("userid")
        .or_else(|| stored.and_then(|r| r.get("userid")))
}

fn already_exists(kind: EntityKind, name: &Value) -> ApiError {
    let name = match name {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ApiError::new(format!("{} \"{}\" already exists.", kind.label(), name))
}

fn values_match(stored: Option<&Value>, wanted: &Value) -> bool {
    match (stored, wanted) {
        (None, _) => false,
        (Some(a), b) if a == b => true,
        (Some(Value::String(a)), Value::Number(b)) | (Some(Value::Number(b)), Value::String(a)) => {
            *a == b.to_string()
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// MemoryApi
// ---------------------------------------------------------------------------

/// In-process [`EntityApi`] keeping records per entity kind.
#[derive(Debug, Default)]
pub struct MemoryApi {
    store: RwLock<Store>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a record as-is. An id already present in the record is kept and
    /// advances the kind's sequence; otherwise the next id is assigned.
    pub fn insert(&self, kind: EntityKind, mut record: Record) -> Id {
        let mut store = self.write();
        let id = match super::record_id(kind, &record) {
            Some(id) => {
                let last = store.last_id.entry(kind).or_insert(0);
                *last = (*last).max(id);
                id
            }
            None => store.next_id(kind),
        };
        record.insert(kind.id_field().to_string(), Value::String(id.to_string()));
        store.records.entry(kind).or_default().insert(id, record);
        id
    }

    /// Load seed records keyed by table name (`drules`, `hosts`, ...).
    pub fn seed(&self, seed: &BTreeMap<String, Vec<Value>>) -> Result<()> {
        for (table, records) in seed {
            let kind: EntityKind = table.parse()?;
            for value in records {
                let Some(record) = value.as_object() else {
                    return Err(FrontendError::InvalidSeed {
                        kind: table.clone(),
                        reason: "record must be an object".to_string(),
                    });
                };
                self.insert(kind, record.clone());
            }
        }
        Ok(())
    }

    pub fn restrict(
        &self,
        userid: Id,
        kind: EntityKind,
        readable: impl IntoIterator<Item = Id>,
        writable: impl IntoIterator<Item = Id>,
    ) {
        let restriction = Restriction {
            readable: readable.into_iter().collect(),
            writable: writable.into_iter().collect(),
        };
        self.write().restrictions.insert((userid, kind), restriction);
    }

    /// Make `verb` fail with `message` whenever it touches `id`
    /// (`None` targets create calls).
    pub fn fail_on(&self, kind: EntityKind, verb: Verb, id: Option<Id>, message: impl Into<String>) {
        self.write().failures.insert((kind, verb, id), message.into());
    }

    /// Attach an informational notice to every successful `verb` on `kind`.
    pub fn notice_on(&self, kind: EntityKind, verb: Verb, message: impl Into<String>) {
        self.write().notices.insert((kind, verb), message.into());
    }

    pub fn record(&self, kind: EntityKind, id: Id) -> Option<Record> {
        self.read().table(kind).and_then(|t| t.get(&id)).cloned()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.read().table(kind).map_or(0, BTreeMap::len)
    }
}

impl EntityApi for MemoryApi {
    fn get(&self, caller: &Caller, kind: EntityKind, query: &Query) -> ApiResult<Vec<Record>> {
        let store = self.read();
        store.check_failure(kind, Verb::Get, None)?;
        let Some(table) = store.table(kind) else {
            return Ok(Vec::new());
        };

        let wanted: Option<BTreeSet<Id>> = query.ids.as_ref().map(|ids| ids.iter().copied().collect());
        let records = table
            .iter()
            .filter(|(id, _)| wanted.as_ref().is_none_or(|w| w.contains(id)))
            .filter(|(id, _)| store.can_see(caller, kind, **id, query.editable))
            .filter(|(_, r)| {
                query
                    .filter
                    .iter()
                    .all(|(field, value)| values_match(r.get(field), value))
            })
            .map(|(_, r)| r.clone())
            .collect();
        Ok(records)
    }

    fn create(&self, caller: &Caller, kind: EntityKind, records: Vec<Record>) -> ApiResult<Mutation> {
        let mut store = self.write();
        if records.is_empty() {
            return Err(ApiError::new("Empty input parameter."));
        }
        store.check_failure(kind, Verb::Create, None)?;

        let name_field = kind.name_field();
        let mut batch_names: Vec<(&Value, Option<&Value>)> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let Some(name) = record.get(name_field) else {
                return Err(ApiError::new(format!(
                    "Invalid parameter \"/{}\": the parameter \"{}\" is missing.",
                    i + 1,
                    name_field
                )));
            };
            let owner = owner_of(kind, record, None);
            let clash = batch_names.iter().any(|(n, o)| *n == name && *o == owner);
            if store.name_taken(kind, record, None) || clash {
                return Err(already_exists(kind, name));
            }
            batch_names.push((name, owner));
        }

        let mut ids = Vec::with_capacity(records.len());
        for mut record in records {
            let id = store.next_id(kind);
            record.insert(kind.id_field().to_string(), Value::String(id.to_string()));
            store.records.entry(kind).or_default().insert(id, record);
            ids.push(id);
        }
        tracing::debug!(kind = %kind, userid = caller.userid, ?ids, "memory api create");
        Ok(Mutation {
            ids,
            notices: store.notices(kind, Verb::Create),
        })
    }

    fn update(&self, caller: &Caller, kind: EntityKind, records: Vec<Record>) -> ApiResult<Mutation> {
        let mut store = self.write();
        if records.is_empty() {
            return Err(ApiError::new("Empty input parameter."));
        }

        let name_field = kind.name_field();
        let mut ids = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let Some(id) = super::record_id(kind, record) else {
                return Err(ApiError::new(format!(
                    "Invalid parameter \"/{}\": the parameter \"{}\" is missing.",
                    i + 1,
                    kind.id_field()
                )));
            };
            let exists = store.table(kind).is_some_and(|t| t.contains_key(&id));
            if !exists || !store.can_see(caller, kind, id, true) {
                return Err(ApiError::new(NO_PERMISSIONS));
            }
            store.check_failure(kind, Verb::Update, Some(id))?;
            if store.name_taken(kind, record, Some(id)) {
                if let Some(name) = record.get(name_field) {
                    return Err(already_exists(kind, name));
                }
            }
            ids.push(id);
        }

        for (id, record) in ids.iter().zip(records) {
            if let Some(stored) = store.records.get_mut(&kind).and_then(|t| t.get_mut(id)) {
                stored.extend(record);
            }
        }
        tracing::debug!(kind = %kind, userid = caller.userid, ?ids, "memory api update");
        Ok(Mutation {
            ids,
            notices: store.notices(kind, Verb::Update),
        })
    }

    fn delete(&self, caller: &Caller, kind: EntityKind, ids: &[Id]) -> ApiResult<Mutation> {
        let mut store = self.write();
        if ids.is_empty() {
            return Err(ApiError::new("Empty input parameter."));
        }

        let mut seen = BTreeSet::new();
        for (i, id) in ids.iter().enumerate() {
            if !seen.insert(*id) {
                return Err(ApiError::new(format!(
                    "Invalid parameter \"/{}\": value ({}) already exists.",
                    i + 1,
                    id
                )));
            }
            let exists = store.table(kind).is_some_and(|t| t.contains_key(id));
            if !exists || !store.can_see(caller, kind, *id, true) {
                return Err(ApiError::new(NO_PERMISSIONS));
            }
            if kind == EntityKind::User && *id == caller.userid {
                return Err(ApiError::new("User is not allowed to delete himself."));
            }
            store.check_failure(kind, Verb::Delete, Some(*id))?;
        }

        if let Some(table) = store.records.get_mut(&kind) {
            for id in ids {
                table.remove(id);
            }
        }
        tracing::debug!(kind = %kind, userid = caller.userid, ?ids, "memory api delete");
        Ok(Mutation {
            ids: ids.to_vec(),
            notices: store.notices(kind, Verb::Delete),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserType;
    use serde_json::json;

    fn obj(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn admin() -> Caller {
        Caller::new(2, "admin", UserType::Admin)
    }

    fn super_admin() -> Caller {
        Caller::new(1, "Admin", UserType::SuperAdmin)
    }

    #[test]
    fn insert_keeps_explicit_ids_and_advances_sequence() {
        let api = MemoryApi::new();
        assert_eq!(api.insert(EntityKind::DiscoveryRule, obj(json!({"druleid": "5", "name": "a"}))), 5);
        assert_eq!(api.insert(EntityKind::DiscoveryRule, obj(json!({"name": "b"}))), 6);
        assert_eq!(api.count(EntityKind::DiscoveryRule), 2);
    }

    #[test]
    fn get_honours_ids_filter_and_restrictions() {
        let api = MemoryApi::new();
        for name in ["a", "b", "c"] {
            api.insert(EntityKind::Host, obj(json!({"host": name, "status": 0})));
        }
        api.restrict(2, EntityKind::Host, [1, 2], [1]);

        let visible = api.get(&admin(), EntityKind::Host, &Query::all()).unwrap();
        assert_eq!(visible.len(), 2);

        let editable = api
            .get(&admin(), EntityKind::Host, &Query::ids(&[1, 2, 3]).editable())
            .unwrap();
        assert_eq!(super::super::ids_of(EntityKind::Host, &editable), vec![1]);

        let all = api.get(&super_admin(), EntityKind::Host, &Query::all().filter("host", "c")).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn filter_matches_numbers_against_strings() {
        let api = MemoryApi::new();
        api.insert(EntityKind::Host, obj(json!({"host": "a", "status": "1"})));
        let found = api
            .get(&super_admin(), EntityKind::Host, &Query::all().filter("status", 1))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let api = MemoryApi::new();
        api.insert(EntityKind::DiscoveryRule, obj(json!({"name": "Local"})));
        let err = api
            .create(&super_admin(), EntityKind::DiscoveryRule, vec![obj(json!({"name": "Local"}))])
            .unwrap_err();
        assert_eq!(err.messages, vec!["Discovery rule \"Local\" already exists."]);
        assert_eq!(api.count(EntityKind::DiscoveryRule), 1);
    }

    #[test]
    fn token_names_are_unique_per_user() {
        let api = MemoryApi::new();
        api.insert(EntityKind::Token, obj(json!({"name": "ci", "userid": "1"})));
        let other_user = obj(json!({"name": "ci", "userid": "3"}));
        assert!(api.create(&super_admin(), EntityKind::Token, vec![other_user]).is_ok());

        let same_user = obj(json!({"name": "ci", "userid": "1"}));
        let err = api
            .create(&super_admin(), EntityKind::Token, vec![same_user])
            .unwrap_err();
        assert_eq!(err.messages, vec!["API token \"ci\" already exists."]);

        let rename = obj(json!({"tokenid": "2", "name": "ci"}));
        assert!(api.update(&super_admin(), EntityKind::Token, vec![rename]).is_ok());
        assert_eq!(api.count(EntityKind::Token), 2);
    }

    #[test]
    fn update_is_all_or_nothing() {
        let api = MemoryApi::new();
        api.insert(EntityKind::DiscoveryRule, obj(json!({"druleid": "5", "name": "a", "status": "0"})));
        api.insert(EntityKind::DiscoveryRule, obj(json!({"druleid": "7", "name": "b", "status": "0"})));
        api.fail_on(EntityKind::DiscoveryRule, Verb::Update, Some(7), "boom");

        let records = super::super::id_records(EntityKind::DiscoveryRule, &[5, 7], "status", "1");
        let err = api.update(&super_admin(), EntityKind::DiscoveryRule, records).unwrap_err();
        assert_eq!(err.messages, vec!["boom"]);
        let rule = api.record(EntityKind::DiscoveryRule, 5).unwrap();
        assert_eq!(rule["status"], json!("0"));
    }

    #[test]
    fn update_requires_write_access() {
        let api = MemoryApi::new();
        api.insert(EntityKind::Host, obj(json!({"host": "a"})));
        api.restrict(2, EntityKind::Host, [1], []);
        let records = super::super::id_records(EntityKind::Host, &[1], "status", "1");
        let err = api.update(&admin(), EntityKind::Host, records).unwrap_err();
        assert_eq!(err.messages, vec![NO_PERMISSIONS]);
    }

    #[test]
    fn delete_refuses_self_and_duplicates() {
        let api = MemoryApi::new();
        api.insert(EntityKind::User, obj(json!({"userid": "1", "username": "Admin"})));
        api.insert(EntityKind::User, obj(json!({"userid": "3", "username": "guest"})));

        let err = api.delete(&super_admin(), EntityKind::User, &[1]).unwrap_err();
        assert_eq!(err.messages, vec!["User is not allowed to delete himself."]);

        assert!(api.delete(&super_admin(), EntityKind::User, &[3, 3]).is_err());
        assert_eq!(api.count(EntityKind::User), 2);

        let done = api.delete(&super_admin(), EntityKind::User, &[3]).unwrap();
        assert_eq!(done.ids, vec![3]);
        assert_eq!(api.count(EntityKind::User), 1);
    }

    #[test]
    fn notices_are_returned_on_success() {
        let api = MemoryApi::new();
        api.insert(EntityKind::Sla, obj(json!({"name": "gold"})));
        api.notice_on(EntityKind::Sla, Verb::Delete, "SLA reports recalculated.");
        let done = api.delete(&super_admin(), EntityKind::Sla, &[1]).unwrap();
        assert_eq!(done.notices, vec!["SLA reports recalculated."]);
    }

    #[test]
    fn seed_rejects_unknown_tables() {
        let api = MemoryApi::new();
        let mut seed = BTreeMap::new();
        seed.insert("bogus".to_string(), vec![json!({"name": "x"})]);
        assert!(api.seed(&seed).is_err());
    }
}
