use anyhow::{bail, Context as _, Result};
use resconf_schema::{FieldKind, HostAddress, Record, Schema, Value, Warnings};

use crate::store::{list_item, parse_port, parse_scalar};

/// Applies every default literal of a freshly allocated record, in field order
///
/// Defaults leave the present and inherited bits alone, and list defaults set rather than
/// append, so applying them twice gives the same record.
pub(crate) fn apply_defaults(
    schema: &Schema,
    rcode: u32,
    record: &mut Record,
    warnings: &mut Warnings,
) -> Result<()> {
    for (index, field) in record.fields().iter().enumerate() {
        let Some(literal) = field.default else {
            continue;
        };
        if !field.has_default_flag() {
            tracing::error!(
                "Field {} has a default value \"{}\" but no default flag",
                field.name,
                literal
            );
            warnings.add(format!(
                "Found default value \"{}\" for {} without the default flag set",
                literal, field.name
            ));
        }
        apply_default(schema, rcode, record, index, literal)
            .with_context(|| format!("Applying default \"{}\" to {}", literal, field.name))?;
    }
    Ok(())
}

fn apply_default(
    schema: &Schema,
    rcode: u32,
    record: &mut Record,
    index: usize,
    literal: &str,
) -> Result<()> {
    let field = &record.fields()[index];
    let value = match field.kind {
        FieldKind::Description => {
            record.set_description(literal);
            Value::Str(literal.to_owned())
        }
        FieldKind::Addresses => Value::Addresses(vec![HostAddress::any(parse_port(literal)?)]),
        FieldKind::Port(sibling) | FieldKind::Address(sibling) => {
            let Some(sibling) = record.index_of(sibling) else {
                bail!("No addresses field named {}", sibling);
            };
            let mut addresses = match record.value(sibling) {
                Value::Addresses(addresses) if !addresses.is_empty() => addresses.clone(),
                _ => vec![HostAddress::any(0)],
            };
            for address in &mut addresses {
                match field.kind {
                    FieldKind::Port(_) => address.port = parse_port(literal)?,
                    _ => address.host = literal.to_owned(),
                }
            }
            *record.value_mut(sibling) = Value::Addresses(addresses);
            return Ok(());
        }
        FieldKind::List(kind) => Value::List(vec![list_item(kind, literal)?]),
        FieldKind::Extension(extension) => extension.default_value(literal)?,
        FieldKind::Name
        | FieldKind::Reference { .. }
        | FieldKind::Block(_)
        | FieldKind::Run(_) => {
            bail!("{:?} fields cannot have a default value", field.kind)
        }
        kind => parse_scalar(schema, rcode, kind, literal)?,
    };
    *record.value_mut(index) = value;
    Ok(())
}
