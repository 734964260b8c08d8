//! This crate provides the data model of the resource configuration language: [ResourceType]s,
//! their [FieldDescriptor]s, and the [Resource]s and [Value]s a parse produces.
//!
//! A configuration file is a sequence of resources, each a typed block of directives:
//!
//! ```text
//! Pool {
//!   Name = Default
//!   Volume Retention = 365 days
//! }
//! Job {
//!   Name = Backup1; Pool = Default
//!   Run = Level=Full mon-fri at 23:05
//! }
//! ```
//!
//! A [Schema] lists the resource types one daemon understands. Each type lists its fields, and
//! each field has a [FieldKind] which decides how its value is read and stored:
//!
//! | Kind                   | Value                    | Example directive
//! |------------------------|--------------------------|---------------------------------
//! | `Name`, `Description`  | the resource's identity  | `Name = Default`
//! | `Str`, `Dir`           | [Value::Str]             | `Working Directory = ~/lib`
//! | `Bool`                 | [Value::Bool]            | `Auto Prune = yes`
//! | `Int32`, `Int64`, ...  | [Value::Int]             | `Priority = 10`
//! | `Duration`             | [Value::Duration]        | `File Retention = 60 days`
//! | `Size32`, `Size64`     | [Value::Size]            | `Maximum Volume Bytes = 50 GB`
//! | `Password`             | [Value::Password]        | `Password = "secret"`
//! | `Addresses`            | [Value::Addresses]       | `Addresses = { ip = { addr = ::; port = 9101 } }`
//! | `Reference`            | [Value::Reference]/[Value::References] | `Pool = Default`
//! | `Keyword`              | [Value::Keyword]         | `Compression = gzip9`
//! | `FileCompare`          | [Value::FileCompare]     | `Verify = pins5`
//! | `SizeMatch`            | [Value::SizeMatch]       | `Size = <10k`
//! | `List`                 | [Value::List]            | `File = /home`
//! | `Block`                | [Value::Blocks]          | `Include { ... }`
//! | `Run`                  | [Value::Runs]            | `Run = Full 1st sun at 2:05`
//! | `Extension`            | any                      | daemon specific
//!
//! Schemas are plain `static` data:
//!
//! ```
//! use resconf_schema::*;
//!
//! static POOL: &[FieldDescriptor] = &[
//!     FieldDescriptor::new("Name", FieldKind::Name).required(),
//!     FieldDescriptor::new("Volume Retention", FieldKind::Duration).default_value("365 days"),
//! ];
//! static TYPES: &[ResourceType] = &[ResourceType {
//!     name: "Pool",
//!     group_name: "Pools",
//!     rcode: 0,
//!     fields: POOL,
//!     alias: None,
//! }];
//! static SCHEMA: Schema = Schema { name: "example", types: TYPES, auto_password: &[] };
//!
//! SCHEMA.validate()?;
//! let mut warnings = Warnings::default();
//! let pool = SCHEMA.find_type("pool", &mut warnings).expect("no pool type");
//! assert!(pool.find_field("VolumeRetention", &mut warnings).is_some());
//! # Ok::<(), anyhow::Error>(())
//! ```
mod field;
mod keyword;
pub mod literal;
mod resource;
mod schedule;
mod schema;
mod value;
mod warnings;

pub use field::{
    BlockSchema, FieldDescriptor, FieldExtension, FieldFlags, FieldKind, ListKind, PasswordKind,
    ReferenceStorage, RunSchema,
};
pub use keyword::{
    Checksum, Compression, Encryption, KeywordTable, Replace, Shadowing, CHECKSUM, COMPRESSION,
    ENCRYPTION, REPLACE, SHADOWING,
};
pub use resource::{FieldSet, Record, Resource, ResourceId};
pub use schedule::{BitField, DateTimeMask, Run};
pub use schema::{find_field, keyword_eq, ResourceType, Schema};
pub use value::{
    AddressFamily, FileCompare, HostAddress, Password, PasswordEncoding, Reference, SizeMatch,
    Value,
};
pub use warnings::Warnings;

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
}
