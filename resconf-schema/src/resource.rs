use std::{
    fmt::{self, Display},
    ops::{Deref, DerefMut},
};

use crate::{
    field::{FieldDescriptor, FieldKind},
    schedule::Run,
    schema::{keyword_eq, ResourceType},
    value::{FileCompare, HostAddress, Password, Reference, SizeMatch, Value},
};

/// Identifies a resource within one registry snapshot
///
/// Serial numbers increase in allocation order, so a chain is always sorted by serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub rcode: u32,
    pub serial: u32,
}

/// A set of field indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(u128);

impl FieldSet {
    pub const CAPACITY: usize = 128;

    pub fn insert(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    pub fn remove(&mut self, index: usize) {
        self.0 &= !(1 << index);
    }

    pub fn contains(&self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// The values of one resource, or of one nested block, laid out by field index
#[derive(Debug, Clone)]
pub struct Record {
    fields: &'static [FieldDescriptor],
    name: Option<String>,
    description: Option<String>,
    values: Vec<Value>,
    present: FieldSet,
    inherited: FieldSet,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.fields, other.fields)
            && self.name == other.name
            && self.description == other.description
            && self.values == other.values
            && self.present == other.present
            && self.inherited == other.inherited
    }
}

impl Record {
    pub fn new(fields: &'static [FieldDescriptor]) -> Self {
        Record {
            fields,
            name: None,
            description: None,
            values: fields.iter().map(|f| f.kind.empty_value()).collect(),
            present: FieldSet::default(),
            inherited: FieldSet::default(),
        }
    }

    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn value(&self, index: usize) -> &Value {
        &self.values[index]
    }

    pub fn value_mut(&mut self, index: usize) -> &mut Value {
        &mut self.values[index]
    }

    pub fn index_of(&self, keyword: &str) -> Option<usize> {
        self.fields.iter().position(|f| keyword_eq(f.name, keyword))
    }

    /// The value of the field with the given keyword
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.index_of(keyword).map(|index| &self.values[index])
    }

    /// Whether a directive explicitly set the field
    pub fn is_present(&self, index: usize) -> bool {
        self.present.contains(index)
    }

    /// Records an explicit store: the field is present and no longer inherited
    pub fn mark_present(&mut self, index: usize) {
        self.present.insert(index);
        self.inherited.remove(index);
    }

    pub fn is_inherited(&self, index: usize) -> bool {
        self.inherited.contains(index)
    }

    /// Marks a field as copied from another resource
    pub fn set_inherited(&mut self, index: usize) {
        self.inherited.insert(index);
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword)? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)? {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_duration(&self, keyword: &str) -> Option<u64> {
        match self.get(keyword)? {
            Value::Duration(seconds) => Some(*seconds),
            _ => None,
        }
    }

    pub fn get_size(&self, keyword: &str) -> Option<u64> {
        match self.get(keyword)? {
            Value::Size(bytes) => Some(*bytes),
            _ => None,
        }
    }

    pub fn get_password(&self, keyword: &str) -> Option<&Password> {
        match self.get(keyword)? {
            Value::Password(password) => Some(password),
            _ => None,
        }
    }

    pub fn get_addresses(&self, keyword: &str) -> Option<&[HostAddress]> {
        match self.get(keyword)? {
            Value::Addresses(addresses) => Some(addresses),
            _ => None,
        }
    }

    pub fn get_reference(&self, keyword: &str) -> Option<&Reference> {
        match self.get(keyword)? {
            Value::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn get_references(&self, keyword: &str) -> Option<&[Reference]> {
        match self.get(keyword)? {
            Value::References(references) => Some(references),
            _ => None,
        }
    }

    /// The code stored in a keyword field, see the `from_code` of the matching keyword enum
    pub fn get_keyword(&self, keyword: &str) -> Option<u32> {
        match self.get(keyword)? {
            Value::Keyword(code) => Some(*code),
            _ => None,
        }
    }

    pub fn get_file_compare(&self, keyword: &str) -> Option<FileCompare> {
        match self.get(keyword)? {
            Value::FileCompare(options) => Some(*options),
            _ => None,
        }
    }

    pub fn get_size_match(&self, keyword: &str) -> Option<SizeMatch> {
        match self.get(keyword)? {
            Value::SizeMatch(size) => Some(*size),
            _ => None,
        }
    }

    pub fn get_list(&self, keyword: &str) -> Option<&[String]> {
        match self.get(keyword)? {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn get_blocks(&self, keyword: &str) -> Option<&[Record]> {
        match self.get(keyword)? {
            Value::Blocks(blocks) => Some(blocks),
            _ => None,
        }
    }

    pub fn get_runs(&self, keyword: &str) -> Option<&[Run]> {
        match self.get(keyword)? {
            Value::Runs(runs) => Some(runs),
            _ => None,
        }
    }

    /// Writes the explicitly present fields as directives
    fn write_directives(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (index, field) in self.fields.iter().enumerate() {
            if !self.is_present(index) {
                continue;
            }
            let value = &self.values[index];
            match (field.kind, value) {
                (FieldKind::Name, _) => {
                    if let Some(name) = &self.name {
                        writeln!(f, "{:indent$}{} = {:?}", "", field.name, name)?;
                    }
                }
                (FieldKind::Description, _) => {
                    if let Some(description) = &self.description {
                        writeln!(f, "{:indent$}{} = {:?}", "", field.name, description)?;
                    }
                }
                (FieldKind::Keyword(table), Value::Keyword(code)) => {
                    let keyword = table.name(*code).unwrap_or_default();
                    writeln!(f, "{:indent$}{} = {}", "", field.name, keyword)?;
                }
                (_, Value::List(items)) => {
                    for item in items {
                        writeln!(f, "{:indent$}{} = {:?}", "", field.name, item)?;
                    }
                }
                (_, Value::Blocks(blocks)) => {
                    for block in blocks {
                        writeln!(f, "{:indent$}{} {{", "", field.name)?;
                        block.write_directives(f, indent + 2)?;
                        writeln!(f, "{:indent$}}}", "")?;
                    }
                }
                (_, Value::Runs(runs)) => {
                    for run in runs {
                        write!(f, "{:indent$}{} = ", "", field.name)?;
                        run.overrides.write_overrides(f)?;
                        writeln!(f, "{}", run.when)?;
                    }
                }
                (FieldKind::Address(sibling) | FieldKind::Port(sibling), _) => {
                    // Already written out with the sibling when that was set explicitly
                    let Some(sibling) = self.index_of(sibling) else {
                        continue;
                    };
                    let Value::Addresses(addresses) = &self.values[sibling] else {
                        continue;
                    };
                    match (self.is_present(sibling), addresses.first(), field.kind) {
                        (false, Some(first), FieldKind::Port(_)) => {
                            writeln!(f, "{:indent$}{} = {}", "", field.name, first.port)?
                        }
                        (false, Some(first), _) => {
                            writeln!(f, "{:indent$}{} = {}", "", field.name, first.host)?
                        }
                        _ => {}
                    }
                }
                (_, value) => writeln!(f, "{:indent$}{} = {}", "", field.name, value)?,
            }
        }
        Ok(())
    }

    fn write_overrides(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, field) in self.fields.iter().enumerate() {
            if !self.is_present(index) {
                continue;
            }
            match (field.kind, &self.values[index]) {
                (FieldKind::Keyword(table), Value::Keyword(code)) => {
                    write!(f, "{}={} ", field.name, table.name(*code).unwrap_or_default())?
                }
                (_, value) => write!(f, "{}={} ", field.name, value)?,
            }
        }
        Ok(())
    }
}

/// One named, typed configuration object
#[derive(Debug, Clone)]
pub struct Resource {
    rtype: &'static ResourceType,
    id: ResourceId,
    record: Record,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.rtype, other.rtype) && self.id == other.id && self.record == other.record
    }
}

impl Resource {
    pub fn new(rtype: &'static ResourceType, id: ResourceId) -> Self {
        Resource {
            rtype,
            id,
            record: Record::new(rtype.fields),
        }
    }

    pub fn resource_type(&self) -> &'static ResourceType {
        self.rtype
    }

    pub fn rcode(&self) -> u32 {
        self.rtype.rcode
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

impl Deref for Resource {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.record
    }
}

impl DerefMut for Resource {
    fn deref_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

/// Renders the resource as configuration text, listing only explicitly set fields
impl Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.rtype.name)?;
        self.record.write_directives(f, 2)?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keyword::COMPRESSION, BlockSchema};

    static OPTIONS_FIELDS: &[FieldDescriptor] =
        &[FieldDescriptor::new("Compression", FieldKind::Keyword(&COMPRESSION))];
    static OPTIONS: BlockSchema = BlockSchema {
        name: "Options",
        fields: OPTIONS_FIELDS,
    };
    static FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("Name", FieldKind::Name),
        FieldDescriptor::new("Retention", FieldKind::Duration).default_value("1 day"),
        FieldDescriptor::new("Options", FieldKind::Block(&OPTIONS)).no_equals(),
    ];
    static TYPE: ResourceType = ResourceType {
        name: "Thing",
        group_name: "Things",
        rcode: 0,
        fields: FIELDS,
        alias: None,
    };

    #[test]
    fn field_sets() {
        let mut set = FieldSet::default();
        assert!(set.is_empty());
        set.insert(0);
        set.insert(127);
        assert!(set.contains(127));
        assert!(!set.contains(128));
        set.remove(0);
        assert!(!set.contains(0));
    }

    #[test]
    fn storing_clears_inherited() {
        let mut record = Record::new(FIELDS);
        record.set_inherited(1);
        assert!(record.is_inherited(1));
        record.mark_present(1);
        assert!(record.is_present(1));
        assert!(!record.is_inherited(1));
    }

    #[test]
    fn typed_access_by_keyword() {
        let mut record = Record::new(FIELDS);
        *record.value_mut(1) = Value::Duration(60);
        assert_eq!(record.get_duration("retention"), Some(60));
        assert_eq!(record.get_str("retention"), None);
        assert_eq!(record.get_blocks("Options").map(|b| b.len()), Some(0));
        assert!(record.get("Missing").is_none());
    }

    #[test]
    fn display_lists_only_present_fields() {
        let mut resource = TYPE.instantiate(ResourceId { rcode: 0, serial: 0 });
        resource.set_name("First");
        resource.mark_present(0);
        *resource.value_mut(1) = Value::Duration(86400);
        let mut options = Record::new(OPTIONS_FIELDS);
        *options.value_mut(0) = Value::Keyword(COMPRESSION.parse("gzip9").unwrap());
        options.mark_present(0);
        *resource.value_mut(2) = Value::Blocks(vec![options]);
        resource.mark_present(2);
        assert_eq!(
            resource.to_string(),
            "Thing {\n  Name = \"First\"\n  Options {\n    Compression = gzip9\n  }\n}\n"
        );
    }
}
