use resconf_lexer::{ParseError, Token};
use resconf_schema::{Record, Reference, ReferenceStorage, Value};

use super::Context;

/// Stores one name, or a comma separated list of names for list and set storage
///
/// Names of resources already committed resolve immediately. The others are recorded as
/// dependencies and resolved once every resource is known.
pub(super) fn store_reference(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    target: u32,
    storage: ReferenceStorage,
) -> Result<(), ParseError> {
    let mut names = vec![cx.value_word()?.1];
    if storage != ReferenceStorage::Single {
        while cx.tokens.peek() == &Token::Comma {
            cx.tokens.next_token();
            names.push(cx.value_word()?.1);
        }
    }
    let key = cx.key(index);
    if !record.is_present(index) {
        if let Value::References(references) = record.value_mut(index) {
            references.clear();
        }
    }
    for name in names {
        let resolved = cx.snapshot.find_by_name(target, &name).map(|r| r.id());
        match resolved {
            Some(id) => tracing::trace!("Resolved \"{}\" to {:?}", name, id),
            None => {
                tracing::debug!("Deferring reference to \"{}\"", name);
                cx.dependencies.add(storage, key.clone(), &name);
            }
        }
        let reference = Reference {
            name,
            target: resolved,
        };
        match (storage, record.value_mut(index)) {
            (ReferenceStorage::Single, value) => {
                if reference.is_resolved() {
                    cx.dependencies.forget(&key);
                }
                *value = Value::Reference(reference);
            }
            (_, Value::References(references)) => {
                let repeated = references.iter().any(|r| r.name == reference.name);
                if storage == ReferenceStorage::List || !repeated {
                    references.push(reference);
                }
            }
            (_, value) => *value = Value::References(vec![reference]),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::tests::{parse, JOB, POOL};

    #[test]
    fn backward_reference_resolves_immediately() -> anyhow::Result<()> {
        let snapshot = parse("Pool { Name = Default }\nJob { Name = Backup1; Pool = Default }\n")?;
        let job = snapshot.find_by_name(JOB, "Backup1").unwrap();
        let pool = snapshot.find_by_name(POOL, "Default").unwrap();
        assert_eq!(job.get_reference("Pool").unwrap().target, Some(pool.id()));
        Ok(())
    }

    #[test]
    fn lists_accept_commas_and_sets_drop_repeats() -> anyhow::Result<()> {
        let snapshot = parse(indoc::indoc!(
            "
            Job {
              Name = Backup1
              Storage = File1, File2
              Storage = File1
              Notify = a, b, a
            }
            Storage { Name = File1 }
            Storage { Name = File2 }
            "
        ))?;
        let job = snapshot.find_by_name(JOB, "Backup1").unwrap();
        let storage: Vec<_> = job
            .get_references("Storage")
            .unwrap()
            .iter()
            .map(|r| (r.name.as_str(), r.is_resolved()))
            .collect();
        assert_eq!(storage, [("File1", true), ("File2", true), ("File1", true)]);
        let notify: Vec<_> = job
            .get_references("Notify")
            .unwrap()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(notify, ["a", "b"]);
        Ok(())
    }
}
