use resconf_lexer::ParseError;
use resconf_schema::{ListKind, Record, Value};

use super::{list_item, Context};

/// Appends one entry; the first directive for the field replaces any default entries
pub(super) fn store_list(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    kind: ListKind,
) -> Result<(), ParseError> {
    let spanned = cx.value_token()?;
    let text = spanned.token.word().unwrap_or_default();
    if kind.rejects_backslash() && !spanned.token.is_quoted() && text.contains('\\') {
        return Err(cx.error_at(
            spanned.location,
            format!("Backslash found. Use forward slashes or quote the string.: {text}"),
        ));
    }
    let item = list_item(kind, text).map_err(|e| cx.error_at(spanned.location, e))?;
    let first = !record.is_present(index);
    match record.value_mut(index) {
        Value::List(items) => {
            if first {
                items.clear();
            }
            items.push(item);
        }
        other => *other = Value::List(vec![item]),
    }
    Ok(())
}
