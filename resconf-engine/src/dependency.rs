use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use resconf_schema::{FieldKind, Record, ReferenceStorage, ResourceId, Value};

use crate::registry::Snapshot;

/// Locates one reference field: the owning resource, then field and entry indices down
/// through any nested blocks or run overrides
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyKey {
    pub owner: ResourceId,
    pub path: Vec<usize>,
}

/// Reference fields whose names could not be resolved when they were stored
#[derive(Debug, Default, Clone)]
pub struct Dependencies {
    records: BTreeMap<DependencyKey, Vec<String>>,
}

/// A reference still naming no known resource once parsing has finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub resource_type: &'static str,
    pub resource: String,
    pub field: &'static str,
    pub name: String,
}

impl Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\": {} \"{}\" not found",
            self.resource_type, self.resource, self.field, self.name
        )
    }
}

impl Dependencies {
    /// Records a name to resolve later; a single reference keeps only the latest name
    pub fn add(&mut self, storage: ReferenceStorage, key: DependencyKey, name: &str) {
        let names = self.records.entry(key).or_default();
        match storage {
            ReferenceStorage::Single => {
                names.clear();
                names.push(name.to_owned());
            }
            ReferenceStorage::List => names.push(name.to_owned()),
            ReferenceStorage::Set => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_owned());
                }
            }
        }
    }

    /// Drops the record for a field that has since been given a resolvable name
    pub fn forget(&mut self, key: &DependencyKey) {
        self.records.remove(key);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self, key: &DependencyKey) -> Option<&[String]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Back-patches every recorded reference whose target now exists in the snapshot
    ///
    /// Resolved records are removed. Names still missing are returned, and their records kept.
    pub fn resolve(&mut self, snapshot: &mut Snapshot) -> Vec<Unresolved> {
        let mut unresolved = vec![];
        let records = std::mem::take(&mut self.records);
        for (key, names) in records {
            let Some(owner) = snapshot.get(key.owner) else {
                tracing::debug!("Dropping dependency of vanished resource {:?}", key.owner);
                continue;
            };
            let Some((record, index)) = slot(owner.record(), &key.path) else {
                continue;
            };
            let field = &record.fields()[index];
            let FieldKind::Reference { target, .. } = field.kind else {
                continue;
            };
            let found: Vec<_> = names
                .iter()
                .map(|name| (name, snapshot.find_by_name(target, name).map(|r| r.id())))
                .collect();
            let (resource_type, resource) = (
                owner.resource_type().name,
                owner.name().unwrap_or_default().to_owned(),
            );
            let mut missing = vec![];
            for (name, id) in found {
                match id {
                    Some(id) => {
                        tracing::debug!("Resolved {} \"{}\" for {} \"{}\"", field.name, name, resource_type, resource);
                        if let Some(value) = snapshot
                            .get_mut(key.owner)
                            .and_then(|owner| slot_mut(owner.record_mut(), &key.path))
                        {
                            patch(value, name, id);
                        }
                    }
                    None => {
                        unresolved.push(Unresolved {
                            resource_type,
                            resource: resource.clone(),
                            field: field.name,
                            name: name.clone(),
                        });
                        missing.push(name.clone());
                    }
                }
            }
            if !missing.is_empty() {
                self.records.insert(key, missing);
            }
        }
        unresolved
    }
}

/// Fills in the target of every unresolved reference with the given name
fn patch(value: &mut Value, name: &str, id: ResourceId) {
    let references = match value {
        Value::Reference(reference) => std::slice::from_mut(reference),
        Value::References(references) => references.as_mut_slice(),
        _ => return,
    };
    for reference in references {
        if reference.target.is_none() && reference.name == name {
            reference.target = Some(id);
        }
    }
}

/// The record holding the field at the end of a path, and that field's index
fn slot<'r>(record: &'r Record, path: &[usize]) -> Option<(&'r Record, usize)> {
    match path {
        [index] => Some((record, *index)),
        [index, entry, rest @ ..] => {
            let nested = match record.value(*index) {
                Value::Blocks(blocks) => blocks.get(*entry)?,
                Value::Runs(runs) => &runs.get(*entry)?.overrides,
                _ => return None,
            };
            slot(nested, rest)
        }
        [] => None,
    }
}

fn slot_mut<'r>(record: &'r mut Record, path: &[usize]) -> Option<&'r mut Value> {
    match path {
        [index] => Some(record.value_mut(*index)),
        [index, entry, rest @ ..] => {
            let nested = match record.value_mut(*index) {
                Value::Blocks(blocks) => blocks.get_mut(*entry)?,
                Value::Runs(runs) => &mut runs.get_mut(*entry)?.overrides,
                _ => return None,
            };
            slot_mut(nested, rest)
        }
        [] => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &[usize]) -> DependencyKey {
        DependencyKey {
            owner: ResourceId { rcode: 1, serial: 4 },
            path: path.to_vec(),
        }
    }

    #[test]
    fn single_storage_keeps_latest_name() {
        let mut dependencies = Dependencies::default();
        dependencies.add(ReferenceStorage::Single, key(&[2]), "Weekly");
        dependencies.add(ReferenceStorage::Single, key(&[2]), "Daily");
        assert_eq!(dependencies.names(&key(&[2])), Some(&["Daily".to_owned()][..]));
    }

    #[test]
    fn list_appends_and_set_ignores_repeats() {
        let mut dependencies = Dependencies::default();
        for name in ["a", "b", "a"] {
            dependencies.add(ReferenceStorage::List, key(&[3]), name);
            dependencies.add(ReferenceStorage::Set, key(&[4]), name);
        }
        assert_eq!(dependencies.names(&key(&[3])).map(<[_]>::len), Some(3));
        assert_eq!(dependencies.names(&key(&[4])).map(<[_]>::len), Some(2));
        assert_eq!(dependencies.len(), 2);
    }

    #[test]
    fn nested_paths_are_distinct_keys() {
        let mut dependencies = Dependencies::default();
        dependencies.add(ReferenceStorage::Single, key(&[5, 0, 1]), "Weekly");
        dependencies.add(ReferenceStorage::Single, key(&[5, 1, 1]), "Monthly");
        assert_eq!(dependencies.len(), 2);
    }

    #[test]
    fn unresolved_renders_owner_and_name() {
        let unresolved = Unresolved {
            resource_type: "Job",
            resource: "Backup1".into(),
            field: "Pool",
            name: "Missing".into(),
        };
        assert_eq!(unresolved.to_string(), "Job \"Backup1\": Pool \"Missing\" not found");
    }
}
