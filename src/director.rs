//! A director-style catalog: the resources a backup director reads from `bareos-dir.conf`
//!
//! ```
//! use resconf::director::{self, JOB, POOL};
//! use resconf::engine::Engine;
//!
//! let mut engine = Engine::new(&director::SCHEMA)?;
//! director::install_checks(&mut engine);
//! engine.parse_str(
//!     "bareos-dir.conf",
//!     "Director { Name = dir; Password = secret }\n\
//!      Job { Name = Backup1; Type = Backup; Pool = Full }\n\
//!      Pool { Name = Full }\n",
//! )?;
//! let job = engine.get_by_name(JOB, "Backup1").unwrap();
//! let pool = job.resolve(job.get_reference("Pool").unwrap()).unwrap();
//! assert_eq!(pool.rcode(), POOL);
//! # Ok::<(), anyhow::Error>(())
//! ```
use anyhow::{anyhow, bail, Result};
use resconf_engine::{Engine, Snapshot, Unresolved};
use resconf_schema::{
    keyword_enum, literal, BlockSchema, FieldDescriptor, FieldExtension, FieldKind, ListKind,
    PasswordEncoding, PasswordKind, ReferenceStorage, ResourceType, RunSchema, Schema, Value,
    CHECKSUM, COMPRESSION, ENCRYPTION, REPLACE, SHADOWING,
};

pub const DIRECTOR: u32 = 0;
pub const CLIENT: u32 = 1;
pub const STORAGE: u32 = 2;
pub const POOL: u32 = 3;
pub const SCHEDULE: u32 = 4;
pub const FILESET: u32 = 5;
pub const JOB: u32 = 6;
pub const MESSAGES: u32 = 7;

/// Main file of a director configuration directory
pub const DEFAULT_FILENAME: &str = "bareos-dir.conf";
/// Include tree of a director configuration directory, one subdirectory per resource type
pub const INCLUDE_DIR: &str = "bareos-dir.d";

keyword_enum! {
    /// How much a job backs up
    pub enum Level in LEVELS ("job level") {
        Full => ["full"],
        Incremental => ["incremental"],
        Differential => ["differential"],
        VirtualFull => ["virtualfull"],
    }
}

keyword_enum! {
    pub enum JobType in JOB_TYPES ("job type") {
        Backup => ["backup"],
        Restore => ["restore"],
        Verify => ["verify"],
        Admin => ["admin"],
        Copy => ["copy"],
        Migrate => ["migrate"],
    }
}

keyword_enum! {
    pub enum PoolType in POOL_TYPES ("pool type") {
        Backup => ["backup"],
        Copy => ["copy"],
        Cloned => ["cloned"],
        Archive => ["archive"],
        Migration => ["migration"],
        Scratch => ["scratch"],
    }
}

/// A bandwidth limit such as `10 mb/s`, stored as bytes per second
#[derive(Debug)]
pub struct Speed;

impl FieldExtension for Speed {
    fn store(&self, words: &[&str]) -> Result<Value> {
        let text = words.join(" ");
        let trimmed = text.trim();
        let size = match trimmed.len().checked_sub(2) {
            Some(end) if trimmed[end..].eq_ignore_ascii_case("/s") => &trimmed[..end],
            _ => trimmed,
        };
        let bytes = literal::parse_size(size)
            .map_err(|_| anyhow!("expected a speed, got: {}", text))?;
        Ok(Value::Size(bytes))
    }
}

static SPEED: Speed = Speed;

const fn reference(target: u32) -> FieldKind {
    FieldKind::Reference {
        target,
        storage: ReferenceStorage::Single,
    }
}

static DIRECTOR_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Password", FieldKind::Password(PasswordKind::Auto)).required(),
    FieldDescriptor::new("Dir Addresses", FieldKind::Addresses).default_value("9101"),
    FieldDescriptor::new("Dir Port", FieldKind::Port("Dir Addresses")),
    FieldDescriptor::new("Dir Address", FieldKind::Address("Dir Addresses")),
    FieldDescriptor::new("Working Directory", FieldKind::Dir)
        .default_value("/var/lib/bareos")
        .platform_specific(),
    FieldDescriptor::new("Messages", reference(MESSAGES)),
    FieldDescriptor::new("Maximum Concurrent Jobs", FieldKind::PositiveInt32).default_value("1"),
    FieldDescriptor::new("Heartbeat Interval", FieldKind::Duration).default_value("0"),
    FieldDescriptor::new("Maximum Console Connections", FieldKind::PositiveInt32)
        .default_value("20"),
];

static CLIENT_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Address", FieldKind::Str).required(),
    FieldDescriptor::new("Port", FieldKind::PositiveInt32).default_value("9102"),
    FieldDescriptor::new("Password", FieldKind::Password(PasswordKind::Md5)).required(),
    FieldDescriptor::new("File Retention", FieldKind::Duration).default_value("60 days"),
    FieldDescriptor::new("Job Retention", FieldKind::Duration).default_value("180 days"),
    FieldDescriptor::new("Auto Prune", FieldKind::Bool).default_value("no"),
    FieldDescriptor::new("Maximum Bandwidth Per Job", FieldKind::Extension(&SPEED)),
    FieldDescriptor::new("Enabled", FieldKind::Bool).default_value("yes"),
];

static STORAGE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Address", FieldKind::Str).required(),
    FieldDescriptor::new("Port", FieldKind::PositiveInt32).default_value("9103"),
    FieldDescriptor::new("Password", FieldKind::Password(PasswordKind::Md5)).required(),
    FieldDescriptor::new("Device", FieldKind::List(ListKind::Str)),
    FieldDescriptor::new("Media Type", FieldKind::Str).required(),
    FieldDescriptor::new("Maximum Concurrent Jobs", FieldKind::PositiveInt32).default_value("1"),
    FieldDescriptor::new("Allow Compression", FieldKind::Bool).default_value("yes"),
];

static POOL_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Pool Type", FieldKind::Keyword(&POOL_TYPES)).default_value("backup"),
    FieldDescriptor::new("Label Format", FieldKind::Str),
    FieldDescriptor::new("Use Catalog", FieldKind::Bool).default_value("yes"),
    FieldDescriptor::new("Purge Oldest Volume", FieldKind::Bool).default_value("no"),
    FieldDescriptor::new("Maximum Volumes", FieldKind::PositiveInt32),
    FieldDescriptor::new("Maximum Volume Jobs", FieldKind::PositiveInt32),
    FieldDescriptor::new("Maximum Volume Bytes", FieldKind::Size64),
    FieldDescriptor::new("Volume Retention", FieldKind::Duration).default_value("365 days"),
    FieldDescriptor::new("Volume Use Duration", FieldKind::Duration),
    FieldDescriptor::new("Auto Prune", FieldKind::Bool).default_value("yes"),
    FieldDescriptor::new("Recycle", FieldKind::Bool).default_value("yes"),
    FieldDescriptor::new("Storage", FieldKind::Reference {
        target: STORAGE,
        storage: ReferenceStorage::List,
    }),
    FieldDescriptor::new("Next Pool", reference(POOL)),
    FieldDescriptor::new("Use Volume Once", FieldKind::Bool).deprecated(),
];

static RUN_OVERRIDES: RunSchema = RunSchema {
    fields: &[
        FieldDescriptor::new("Pool", reference(POOL)),
        FieldDescriptor::new("Full Pool", reference(POOL)),
        FieldDescriptor::new("Incremental Pool", reference(POOL)),
        FieldDescriptor::new("Differential Pool", reference(POOL)),
        FieldDescriptor::new("Next Pool", reference(POOL)),
        FieldDescriptor::new("Level", FieldKind::Keyword(&LEVELS)),
        FieldDescriptor::new("Storage", reference(STORAGE)),
        FieldDescriptor::new("Messages", reference(MESSAGES)),
        FieldDescriptor::new("Priority", FieldKind::PositiveInt32),
        FieldDescriptor::new("Spool Data", FieldKind::Bool),
        FieldDescriptor::new("Max Run Sched Time", FieldKind::Duration),
        FieldDescriptor::new("Accurate", FieldKind::Bool),
    ],
    implicit: Some("Level"),
};

static SCHEDULE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Run", FieldKind::Run(&RUN_OVERRIDES)),
    FieldDescriptor::new("Enabled", FieldKind::Bool).default_value("yes"),
];

static OPTIONS: BlockSchema = BlockSchema {
    name: "Options",
    fields: &[
        FieldDescriptor::new("Compression", FieldKind::Keyword(&COMPRESSION)),
        FieldDescriptor::new("Signature", FieldKind::Keyword(&CHECKSUM)),
        FieldDescriptor::new("Verify", FieldKind::FileCompare),
        FieldDescriptor::new("Accurate", FieldKind::FileCompare),
        FieldDescriptor::new("Base Job", FieldKind::FileCompare),
        FieldDescriptor::new("Shadowing", FieldKind::Keyword(&SHADOWING)),
        FieldDescriptor::new("Size", FieldKind::SizeMatch),
        FieldDescriptor::new("One FS", FieldKind::Bool),
        FieldDescriptor::new("No Atime", FieldKind::Bool),
        FieldDescriptor::new("Wild", FieldKind::List(ListKind::Wild)),
        FieldDescriptor::new("Wild Dir", FieldKind::List(ListKind::Wild)),
        FieldDescriptor::new("Regex", FieldKind::List(ListKind::Regex)),
        FieldDescriptor::new("Regex File", FieldKind::List(ListKind::Regex)),
        FieldDescriptor::new("Fs Type", FieldKind::List(ListKind::FsType)),
        FieldDescriptor::new("Drive Type", FieldKind::List(ListKind::DriveType)),
        FieldDescriptor::new("Meta", FieldKind::List(ListKind::Meta)),
        FieldDescriptor::new("Exclude", FieldKind::Bool),
    ],
};

static INCLUDE: BlockSchema = BlockSchema {
    name: "Include",
    fields: &[
        FieldDescriptor::new("File", FieldKind::List(ListKind::FileName)),
        FieldDescriptor::new("Plugin", FieldKind::List(ListKind::PluginName)),
        FieldDescriptor::new("Exclude Dir Containing", FieldKind::List(ListKind::Str)),
        FieldDescriptor::new("Options", FieldKind::Block(&OPTIONS)).no_equals(),
    ],
};

static EXCLUDE: BlockSchema = BlockSchema {
    name: "Exclude",
    fields: &[FieldDescriptor::new("File", FieldKind::List(ListKind::FileName))],
};

static FILESET_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Include", FieldKind::Block(&INCLUDE)).no_equals(),
    FieldDescriptor::new("Exclude", FieldKind::Block(&EXCLUDE)).no_equals(),
    FieldDescriptor::new("Ignore File Set Changes", FieldKind::Bool).default_value("no"),
    FieldDescriptor::new("Enable VSS", FieldKind::Bool).default_value("yes"),
];

static JOB_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Type", FieldKind::Keyword(&JOB_TYPES)).required(),
    FieldDescriptor::new("Level", FieldKind::Keyword(&LEVELS)),
    FieldDescriptor::new("Client", reference(CLIENT)),
    FieldDescriptor::new("File Set", reference(FILESET)),
    FieldDescriptor::new("Schedule", reference(SCHEDULE)),
    FieldDescriptor::new("Storage", FieldKind::Reference {
        target: STORAGE,
        storage: ReferenceStorage::List,
    }),
    FieldDescriptor::new("Pool", reference(POOL)),
    FieldDescriptor::new("Full Backup Pool", reference(POOL)),
    FieldDescriptor::new("Incremental Backup Pool", reference(POOL)),
    FieldDescriptor::new("Messages", reference(MESSAGES)),
    FieldDescriptor::new("Priority", FieldKind::PositiveInt32).default_value("10"),
    FieldDescriptor::new("Max Run Time", FieldKind::Duration),
    FieldDescriptor::new("Spool Data", FieldKind::Bool).default_value("no"),
    FieldDescriptor::new("Replace", FieldKind::Keyword(&REPLACE)).default_value("always"),
    FieldDescriptor::new("Where", FieldKind::Dir),
    FieldDescriptor::new("Maximum Bandwidth", FieldKind::Extension(&SPEED)),
    FieldDescriptor::new("Cipher", FieldKind::Keyword(&ENCRYPTION)),
    FieldDescriptor::new("Run", FieldKind::Run(&RUN_OVERRIDES)),
    FieldDescriptor::new("Enabled", FieldKind::Bool).default_value("yes"),
];

static MESSAGES_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("Name", FieldKind::Name).required(),
    FieldDescriptor::new("Description", FieldKind::Description),
    FieldDescriptor::new("Mail Command", FieldKind::Str),
    FieldDescriptor::new("Operator Command", FieldKind::Str),
    FieldDescriptor::new("Timestamp Format", FieldKind::Str),
    FieldDescriptor::new("Console", FieldKind::List(ListKind::Str)),
    FieldDescriptor::new("Append", FieldKind::List(ListKind::Str)),
    FieldDescriptor::new("Mail", FieldKind::List(ListKind::Str)),
];

static TYPES: &[ResourceType] = &[
    ResourceType {
        name: "Director",
        group_name: "Directors",
        rcode: DIRECTOR,
        fields: DIRECTOR_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "Client",
        group_name: "Clients",
        rcode: CLIENT,
        fields: CLIENT_FIELDS,
        alias: Some("FileDaemon"),
    },
    ResourceType {
        name: "Storage",
        group_name: "Storages",
        rcode: STORAGE,
        fields: STORAGE_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "Pool",
        group_name: "Pools",
        rcode: POOL,
        fields: POOL_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "Schedule",
        group_name: "Schedules",
        rcode: SCHEDULE,
        fields: SCHEDULE_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "FileSet",
        group_name: "FileSets",
        rcode: FILESET,
        fields: FILESET_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "Job",
        group_name: "Jobs",
        rcode: JOB,
        fields: JOB_FIELDS,
        alias: None,
    },
    ResourceType {
        name: "Messages",
        group_name: "Messages",
        rcode: MESSAGES,
        fields: MESSAGES_FIELDS,
        alias: None,
    },
];

pub static SCHEMA: Schema = Schema {
    name: "director",
    types: TYPES,
    // Consoles authenticate the director with a shared clear text secret
    auto_password: &[(DIRECTOR, PasswordEncoding::Clear)],
};

/// Looks a catalog up by the name used in settings files and on the command line
pub fn schema_by_name(name: &str) -> Option<&'static Schema> {
    [&SCHEMA].into_iter().find(|schema| schema.name == name)
}

/// Installs the director's checks of a freshly parsed configuration
pub fn install_checks(engine: &mut Engine) {
    engine.on_after_parse(check_configuration);
}

/// Rejects a configuration with dangling references or without exactly one director
pub fn check_configuration(snapshot: &mut Snapshot, unresolved: &[Unresolved]) -> Result<()> {
    if let Some(first) = unresolved.first() {
        for missing in unresolved {
            tracing::error!("{}", missing);
        }
        bail!(
            "{} unresolved reference(s), the first being {}",
            unresolved.len(),
            first
        );
    }
    match snapshot.chain(DIRECTOR).len() {
        0 => bail!("No Director resource defined"),
        1 => Ok(()),
        n => bail!("Only one Director resource permitted, found {}", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_valid() {
        SCHEMA.validate().unwrap();
        assert!(schema_by_name("director").is_some());
        assert!(schema_by_name("storage").is_none());
    }

    #[test]
    fn speeds() {
        assert_eq!(SPEED.store(&["10", "mb/s"]).unwrap(), Value::Size(10_000_000));
        assert_eq!(SPEED.store(&["512k/s"]).unwrap(), Value::Size(512 * 1024));
        assert_eq!(SPEED.store(&["100"]).unwrap(), Value::Size(100));
        assert_eq!(
            SPEED.store(&["fast"]).unwrap_err().to_string(),
            "expected a speed, got: fast"
        );
    }

    #[test]
    fn keyword_tables_print_back() {
        for level in ["full", "incremental", "differential", "virtualfull"] {
            let level: Level = level.parse().unwrap();
            assert_eq!(LEVELS.name(level.code()), Some(level.to_string().as_str()));
        }
        assert_eq!("Backup".parse::<JobType>().unwrap(), JobType::Backup);
    }
}
