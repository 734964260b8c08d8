use std::fmt::Debug;

use bitflags::bitflags;

use crate::{keyword::KeywordTable, value::Value};

bitflags! {
    /// Behaviour flags attached to a [`FieldDescriptor`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The field must be given explicitly in every resource of its type
        const REQUIRED = 1 << 0;
        /// The default literal is applied to every freshly allocated resource
        const DEFAULT = 1 << 1;
        /// The keyword is followed directly by its value (typically a block), without `=`
        const NO_EQUALS = 1 << 2;
        /// Using the keyword records a warning
        const DEPRECATED = 1 << 3;
        /// Only meaningful on some platforms
        const PLATFORM_SPECIFIC = 1 << 4;
    }
}

/// How the names given to a reference field are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceStorage {
    /// One reference; storing again replaces it
    Single,
    /// An ordered list; every name is appended
    List,
    /// A list in which each name appears once
    Set,
}

/// Which encoding a password field stores its value in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordKind {
    /// Stored as an MD5 digest
    Md5,
    /// Stored as given
    Clear,
    /// Chosen per resource type, see [`Schema::auto_password_encoding`](crate::Schema::auto_password_encoding)
    Auto,
}

/// The string-list kinds. Every directive appends one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Str,
    /// Paths, with `~` and environment variables expanded
    Dir,
    /// Regular expressions, validated when stored
    Regex,
    Wild,
    FsType,
    DriveType,
    Meta,
    /// File names; unquoted backslashes are rejected
    FileName,
    /// Plugin command strings; unquoted backslashes are rejected
    PluginName,
}

impl ListKind {
    pub fn rejects_backslash(self) -> bool {
        matches!(self, ListKind::FileName | ListKind::PluginName)
    }
}

/// The closed set of field kinds understood by the store dispatch
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// The resource's unique name
    Name,
    /// The resource's free-text description
    Description,
    Str,
    /// A path, with `~` and environment variables expanded unless it starts with `|`
    Dir,
    Bool,
    Int32,
    /// A non-negative 32 bit integer
    PositiveInt32,
    Int64,
    /// A time span in seconds
    Duration,
    Size32,
    Size64,
    Password(PasswordKind),
    /// A block of `ip`, `ipv4` or `ipv6` listen addresses
    Addresses,
    /// Sets the host of every entry in the named sibling [`FieldKind::Addresses`] field
    Address(&'static str),
    /// Sets the port of every entry in the named sibling [`FieldKind::Addresses`] field
    Port(&'static str),
    /// A reference to another resource of type `target`, by name
    Reference {
        target: u32,
        storage: ReferenceStorage,
    },
    /// One word from a fixed table
    Keyword(&'static KeywordTable),
    /// A run of single character file comparison flags
    FileCompare,
    /// A file size comparison expression
    SizeMatch,
    List(ListKind),
    /// A nested block parsed against its own field list, appended per occurrence
    Block(&'static BlockSchema),
    /// A schedule, with optional leading overrides, appended per occurrence
    Run(&'static RunSchema),
    /// A kind private to one daemon
    Extension(&'static dyn FieldExtension),
}

impl FieldKind {
    /// The value a field of this kind holds before a default or directive sets it
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Addresses => Value::Addresses(vec![]),
            FieldKind::Reference {
                storage: ReferenceStorage::List | ReferenceStorage::Set,
                ..
            } => Value::References(vec![]),
            FieldKind::FileCompare => Value::FileCompare(Default::default()),
            FieldKind::List(_) => Value::List(vec![]),
            FieldKind::Block(_) => Value::Blocks(vec![]),
            FieldKind::Run(_) => Value::Runs(vec![]),
            FieldKind::Extension(extension) => extension.empty(),
            _ => Value::Unset,
        }
    }
}

/// A daemon-specific field kind
///
/// The store dispatch hands an extension the words of one directive (everything up to the end
/// of the line) and writes back whatever value it returns.
pub trait FieldExtension: Debug + Send + Sync {
    /// Convert the words of one directive into a value
    fn store(&self, words: &[&str]) -> anyhow::Result<Value>;

    /// Convert a default literal into a value
    fn default_value(&self, literal: &str) -> anyhow::Result<Value> {
        self.store(&[literal])
    }

    /// The value held before anything is stored
    fn empty(&self) -> Value {
        Value::Unset
    }
}

/// The field list of a nested block, such as an `Include` or `Options` section
#[derive(Debug)]
pub struct BlockSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
}

/// The overrides accepted ahead of a schedule in a `Run` directive
#[derive(Debug)]
pub struct RunSchema {
    pub fields: &'static [FieldDescriptor],
    /// A keyword-kind field that may also be given as a bare word, without `Key=`
    pub implicit: Option<&'static str>,
}

/// Describes one configurable attribute of a resource type
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub flags: FieldFlags,
    pub default: Option<&'static str>,
    /// A legacy keyword still accepted in place of `name`
    pub alias: Option<&'static str>,
    pub description: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDescriptor {
            name,
            kind,
            flags: FieldFlags::empty(),
            default: None,
            alias: None,
            description: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::REQUIRED);
        self
    }

    /// Sets a default literal, applied to every new resource
    pub const fn default_value(mut self, literal: &'static str) -> Self {
        self.flags = self.flags.union(FieldFlags::DEFAULT);
        self.default = Some(literal);
        self
    }

    pub const fn no_equals(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::NO_EQUALS);
        self
    }

    pub const fn deprecated(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::DEPRECATED);
        self
    }

    pub const fn platform_specific(mut self) -> Self {
        self.flags = self.flags.union(FieldFlags::PLATFORM_SPECIFIC);
        self
    }

    pub const fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_required(&self) -> bool {
        self.flags.contains(FieldFlags::REQUIRED)
    }

    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(FieldFlags::DEPRECATED)
    }

    pub fn expects_equals(&self) -> bool {
        !self.flags.contains(FieldFlags::NO_EQUALS)
    }

    pub fn has_default_flag(&self) -> bool {
        self.flags.contains(FieldFlags::DEFAULT)
    }
}
