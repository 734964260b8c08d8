use resconf_lexer::ParseError;
use resconf_schema::{literal, FieldExtension, FieldKind, Record, Value};

use super::{parse_scalar, Context};

pub(super) fn store_name(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
) -> Result<(), ParseError> {
    let (location, name) = cx.value_word()?;
    literal::validate_name(&name).map_err(|e| cx.error_at(location, e))?;
    if let Some(previous) = record.name() {
        return Err(cx.error_at(
            location,
            format!("Attempt to redefine name \"{previous}\" to \"{name}\""),
        ));
    }
    *record.value_mut(index) = Value::Str(name.clone());
    record.set_name(name);
    Ok(())
}

pub(super) fn store_description(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
) -> Result<(), ParseError> {
    let (_, description) = cx.value_word()?;
    *record.value_mut(index) = Value::Str(description.clone());
    record.set_description(description);
    Ok(())
}

pub(super) fn store_scalar(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    kind: FieldKind,
) -> Result<(), ParseError> {
    let (location, text) = match kind {
        FieldKind::Duration | FieldKind::Size32 | FieldKind::Size64 | FieldKind::SizeMatch => {
            let (location, words) = cx.value_words()?;
            (location, words.join(" "))
        }
        _ => cx.value_word()?,
    };
    let value =
        parse_scalar(cx.schema, cx.owner.rcode, kind, &text).map_err(|e| cx.error_at(location, e))?;
    *record.value_mut(index) = value;
    Ok(())
}

pub(super) fn store_extension(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    extension: &dyn FieldExtension,
) -> Result<(), ParseError> {
    let (location, words) = cx.value_words()?;
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let value = extension
        .store(&words)
        .map_err(|e| cx.error_at(location, e))?;
    *record.value_mut(index) = value;
    Ok(())
}
