//! A resource configuration engine: parses declarative daemon configuration, validates it
//! against a schema, links resources that name one another, and keeps the result live for
//! concurrent readers.
//!
//! A configuration is a sequence of typed resources:
//!
//! ```text
//! Director {
//!   Name = bareos-dir
//!   Password = "secret"
//! }
//! Job {
//!   Name = BackupClient1
//!   Type = Backup
//!   Pool = Full                    # may be defined further down
//!   Run = Level=Full 1st sun at 2:05
//! }
//! Pool { Name = Full }
//! ```
//!
//! The pieces live in their own crates, re-exported here:
//!
//! * [`schema`] describes resource types and their fields, and holds parsed values
//! * [`lexer`] turns configuration text, with its `@include`s, into tokens
//! * [`engine`] parses, resolves references and publishes snapshots
//! * [`config`] holds the settings of the `resconf` command line tool
//!
//! [`director`] is a complete catalog for a backup director.
//!
//! ```
//! use resconf::{director, engine::Engine};
//!
//! let mut engine = Engine::new(&director::SCHEMA)?;
//! engine.parse_str(
//!     "bareos-dir.conf",
//!     "Director { Name = bareos-dir; Password = secret }\n\
//!      Schedule { Name = Weekly; Run = Full sun at 1:00 }\n",
//! )?;
//! let schedule = engine.get_by_name(director::SCHEDULE, "Weekly").unwrap();
//! print!("{}", *schedule);
//! # Ok::<(), anyhow::Error>(())
//! ```
pub mod director;

pub use resconf_config as config;
pub use resconf_engine as engine;
pub use resconf_lexer as lexer;
pub use resconf_schema as schema;
