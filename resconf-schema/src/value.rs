use std::fmt::{self, Display};

use anyhow::{bail, Result};
use bitflags::bitflags;

use crate::{
    literal::{format_duration, parse_size},
    resource::{Record, ResourceId},
    schedule::Run,
};

/// The native representation of one field's value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Neither a default nor a directive has set the field
    Unset,
    Str(String),
    Bool(bool),
    Int(i64),
    /// Seconds
    Duration(u64),
    /// Bytes
    Size(u64),
    Password(Password),
    Addresses(Vec<HostAddress>),
    Reference(Reference),
    References(Vec<Reference>),
    /// A code from the field's keyword table
    Keyword(u32),
    FileCompare(FileCompare),
    SizeMatch(SizeMatch),
    List(Vec<String>),
    Blocks(Vec<Record>),
    Runs(Vec<Run>),
}

impl Value {
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }
}

/// A by-name reference to another resource, resolved once the named resource is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub target: Option<ResourceId>,
}

impl Reference {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Reference {
            name: name.into(),
            target: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordEncoding {
    /// Lower case hex MD5 digest
    Md5,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Password {
    pub encoding: PasswordEncoding,
    pub value: String,
}

impl Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encoding {
            PasswordEncoding::Md5 => write!(f, "[md5]{}", self.value),
            PasswordEncoding::Clear => f.write_str(&self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Any,
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn keyword(self) -> &'static str {
        match self {
            AddressFamily::Any => "ip",
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }
}

/// One listen address. Host names are kept as written; resolving them is left to the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub family: AddressFamily,
    pub host: String,
    pub port: u16,
}

impl HostAddress {
    pub fn any(port: u16) -> Self {
        HostAddress {
            family: AddressFamily::Ipv4,
            host: "0.0.0.0".to_owned(),
            port,
        }
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {{ addr = {}; port = {} }}",
            self.family.keyword(),
            self.host,
            self.port
        )
    }
}

bitflags! {
    /// File attributes compared by verify and accurate jobs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileCompare: u16 {
        const INODES = 1 << 0;
        const PERMISSIONS = 1 << 1;
        const LINKS = 1 << 2;
        const USER_ID = 1 << 3;
        const GROUP_ID = 1 << 4;
        const SIZE = 1 << 5;
        const ATIME = 1 << 6;
        const MTIME = 1 << 7;
        const CTIME = 1 << 8;
        const SIZE_DECREASE = 1 << 9;
        const MD5 = 1 << 10;
        const SHA1 = 1 << 11;
        const ALWAYS = 1 << 12;
    }
}

const FILE_COMPARE_LETTERS: &[(char, FileCompare)] = &[
    ('i', FileCompare::INODES),
    ('p', FileCompare::PERMISSIONS),
    ('n', FileCompare::LINKS),
    ('u', FileCompare::USER_ID),
    ('g', FileCompare::GROUP_ID),
    ('s', FileCompare::SIZE),
    ('a', FileCompare::ATIME),
    ('m', FileCompare::MTIME),
    ('c', FileCompare::CTIME),
    ('d', FileCompare::SIZE_DECREASE),
    ('5', FileCompare::MD5),
    ('1', FileCompare::SHA1),
    ('A', FileCompare::ALWAYS),
];

impl FileCompare {
    /// Parses a run of option letters, each setting one flag
    ///
    /// ```
    /// use resconf_schema::FileCompare;
    ///
    /// let options = FileCompare::from_letters("pins5")?;
    /// assert_eq!(
    ///     options,
    ///     FileCompare::PERMISSIONS | FileCompare::INODES | FileCompare::LINKS
    ///         | FileCompare::SIZE | FileCompare::MD5
    /// );
    /// assert!(FileCompare::from_letters("ix").is_err());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_letters(letters: &str) -> Result<Self> {
        let mut options = FileCompare::empty();
        for letter in letters.chars() {
            match FILE_COMPARE_LETTERS.iter().find(|(c, _)| *c == letter) {
                Some((_, flag)) => options |= *flag,
                None => bail!("expected a file compare option, got: '{}'", letter),
            }
        }
        Ok(options)
    }

    pub fn letters(&self) -> String {
        FILE_COMPARE_LETTERS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(c, _)| *c)
            .collect()
    }
}

/// A comparison against a file's size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMatch {
    Equal(u64),
    Smaller(u64),
    Greater(u64),
    /// Inclusive bounds
    Range(u64, u64),
}

impl SizeMatch {
    /// Parses `<n>` (equal), `<<n>` (smaller), `><n>` (greater) or `<a>-<b>`, each size with an
    /// optional unit
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('<') {
            return Ok(SizeMatch::Smaller(parse_size(rest)?));
        }
        if let Some(rest) = text.strip_prefix('>') {
            return Ok(SizeMatch::Greater(parse_size(rest)?));
        }
        if let Some((low, high)) = text.split_once('-') {
            let (low, high) = (parse_size(low)?, parse_size(high)?);
            if low > high {
                bail!("Size range {} has its lower bound above its upper bound", text);
            }
            return Ok(SizeMatch::Range(low, high));
        }
        Ok(SizeMatch::Equal(parse_size(text)?))
    }

    pub fn matches(&self, size: u64) -> bool {
        match *self {
            SizeMatch::Equal(n) => size == n,
            SizeMatch::Smaller(n) => size < n,
            SizeMatch::Greater(n) => size > n,
            SizeMatch::Range(low, high) => (low..=high).contains(&size),
        }
    }
}

impl Display for SizeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeMatch::Equal(n) => write!(f, "{n}"),
            SizeMatch::Smaller(n) => write!(f, "<{n}"),
            SizeMatch::Greater(n) => write!(f, ">{n}"),
            SizeMatch::Range(low, high) => write!(f, "{low}-{high}"),
        }
    }
}

/// Renders the scalar kinds; container kinds are rendered by [`Record`]
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset | Value::Blocks(_) | Value::Runs(_) => Ok(()),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => f.write_str(if *b { "yes" } else { "no" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Duration(seconds) => f.write_str(&format_duration(*seconds)),
            Value::Size(bytes) => write!(f, "{bytes}"),
            Value::Password(password) => write!(f, "{:?}", password.to_string()),
            Value::Addresses(addresses) => {
                f.write_str("{")?;
                for address in addresses {
                    write!(f, " {address}")?;
                }
                f.write_str(" }")
            }
            Value::Reference(reference) => write!(f, "{:?}", reference.name),
            Value::References(references) => {
                for (i, reference) in references.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}", reference.name)?;
                }
                Ok(())
            }
            Value::Keyword(code) => write!(f, "{code}"),
            Value::FileCompare(options) => f.write_str(&options.letters()),
            Value::SizeMatch(size) => write!(f, "{size}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                Ok(())
            }
        }
    }
}
