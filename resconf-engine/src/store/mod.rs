//! Store routines: one per field kind, each reading a directive's value from the token stream
//! and writing it into the owning record
use anyhow::{anyhow, bail, Result};
use regex::Regex;
use resconf_lexer::{Location, ParseError, Spanned, TokenStream};
use resconf_schema::{
    literal, FieldKind, FileCompare, ListKind, Password, PasswordEncoding, PasswordKind, Record,
    ResourceId, Schema, SizeMatch, Value, Warnings,
};

use crate::{
    dependency::{Dependencies, DependencyKey},
    driver,
    registry::Snapshot,
    schedule,
};

mod address;
mod generic;
mod list;
mod reference;

pub(crate) use address::parse_port;

/// Everything a store routine may touch while one resource is being parsed
pub(crate) struct Context<'p> {
    pub schema: &'static Schema,
    pub tokens: &'p mut TokenStream,
    /// Resources committed so far, for resolving references on the spot
    pub snapshot: &'p Snapshot,
    pub dependencies: &'p mut Dependencies,
    pub warnings: &'p mut Warnings,
    /// The resource being parsed
    pub owner: ResourceId,
    /// Field and entry indices from the resource down to the record being filled
    pub path: Vec<usize>,
    /// Set inside run overrides, where every value is exactly one token
    pub single_token: bool,
}

impl Context<'_> {
    /// Reads the one token holding a value
    pub fn value_token(&mut self) -> Result<Spanned, ParseError> {
        let spanned = self.tokens.next_token();
        if spanned.token.word().is_none() {
            return Err(self
                .tokens
                .error(format!("expected a value, got: {}", spanned.token)));
        }
        Ok(spanned)
    }

    pub fn value_word(&mut self) -> Result<(Location, String), ParseError> {
        let spanned = self.value_token()?;
        let word = spanned.token.word().unwrap_or_default().to_owned();
        Ok((spanned.location, word))
    }

    /// Reads the words of a value that may run to the end of the line, like `60 days`
    pub fn value_words(&mut self) -> Result<(Location, Vec<String>), ParseError> {
        let (location, first) = self.value_word()?;
        let mut words = vec![first];
        if !self.single_token {
            while let Some(word) = self.tokens.peek().word() {
                words.push(word.to_owned());
                self.tokens.next_token();
            }
        }
        Ok((location, words))
    }

    /// Runs `f` with the path extended into one entry of a block or run field
    pub fn nested<T>(&mut self, index: usize, entry: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.path.len();
        self.path.extend([index, entry]);
        let result = f(self);
        self.path.truncate(depth);
        result
    }

    /// The dependency key of a field in the record being filled
    pub fn key(&self, index: usize) -> DependencyKey {
        let mut path = self.path.clone();
        path.push(index);
        DependencyKey {
            owner: self.owner,
            path,
        }
    }

    pub fn error_at(&self, location: Location, error: impl std::fmt::Display) -> ParseError {
        self.tokens.error_at(location, error.to_string())
    }
}

/// Reads one directive's value into field `index` of `record`, then marks the field present
pub(crate) fn store(cx: &mut Context<'_>, record: &mut Record, index: usize) -> Result<(), ParseError> {
    let field = &record.fields()[index];
    tracing::trace!(field = field.name, line = cx.tokens.current_line_number(), "Store");
    match field.kind {
        FieldKind::Name => generic::store_name(cx, record, index)?,
        FieldKind::Description => generic::store_description(cx, record, index)?,
        FieldKind::Addresses => address::store_addresses(cx, record, index)?,
        FieldKind::Address(sibling) => address::store_host(cx, record, sibling)?,
        FieldKind::Port(sibling) => address::store_port(cx, record, sibling)?,
        FieldKind::Reference { target, storage } => {
            reference::store_reference(cx, record, index, target, storage)?
        }
        FieldKind::List(kind) => list::store_list(cx, record, index, kind)?,
        FieldKind::Block(block) => driver::store_block(cx, record, index, block)?,
        FieldKind::Run(run) => schedule::store_run(cx, record, index, run)?,
        FieldKind::Extension(extension) => generic::store_extension(cx, record, index, extension)?,
        kind => generic::store_scalar(cx, record, index, kind)?,
    }
    record.mark_present(index);
    Ok(())
}

/// Converts literal text into the value of a field kind that holds a single value
///
/// Directives and default literals both go through here.
pub(crate) fn parse_scalar(schema: &Schema, rcode: u32, kind: FieldKind, text: &str) -> Result<Value> {
    Ok(match kind {
        FieldKind::Str => Value::Str(text.to_owned()),
        FieldKind::Dir => Value::Str(literal::expand_path(text)),
        FieldKind::Bool => Value::Bool(literal::parse_bool(text)?),
        FieldKind::Int32 => Value::Int(literal::parse_int32(text)?),
        FieldKind::PositiveInt32 => Value::Int(literal::parse_positive_int32(text)?),
        FieldKind::Int64 => Value::Int(literal::parse_int64(text)?),
        FieldKind::Duration => Value::Duration(literal::parse_duration(text)?),
        FieldKind::Size32 => Value::Size(literal::parse_size32(text)?),
        FieldKind::Size64 => Value::Size(literal::parse_size(text)?),
        FieldKind::Password(kind) => {
            let encoding = match kind {
                PasswordKind::Md5 => PasswordEncoding::Md5,
                PasswordKind::Clear => PasswordEncoding::Clear,
                PasswordKind::Auto => schema.auto_password_encoding(rcode),
            };
            let value = match encoding {
                PasswordEncoding::Md5 => literal::md5_hex(text),
                PasswordEncoding::Clear => text.to_owned(),
            };
            Value::Password(Password { encoding, value })
        }
        FieldKind::Keyword(table) => Value::Keyword(table.parse(text)?),
        FieldKind::FileCompare => Value::FileCompare(FileCompare::from_letters(text)?),
        FieldKind::SizeMatch => Value::SizeMatch(SizeMatch::parse(text)?),
        other => bail!("{:?} does not hold a single literal value", other),
    })
}

/// Converts the text of one list entry
pub(crate) fn list_item(kind: ListKind, text: &str) -> Result<String> {
    match kind {
        ListKind::Dir => Ok(literal::expand_path(text)),
        ListKind::Regex => {
            Regex::new(text).map_err(|e| anyhow!("Regex compile error. ERR={}", e))?;
            Ok(text.to_owned())
        }
        _ => Ok(text.to_owned()),
    }
}
