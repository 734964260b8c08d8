//! This crate turns configuration text into live resources, following a [resconf_schema::Schema].
//!
//! Parsing happens in two steps. Every resource is read and committed to a private
//! [Snapshot], recording by name any reference to a resource not yet seen. A resolve pass then
//! links those references to the resources that turned up later in the text. Only when both
//! steps succeed does the [Engine] publish the snapshot to its [Registry]; on failure the previous
//! configuration stays live.
//!
//! ```
//! use resconf_engine::Engine;
//! use resconf_schema::*;
//!
//! static POOL: &[FieldDescriptor] = &[FieldDescriptor::new("Name", FieldKind::Name).required()];
//! static JOB: &[FieldDescriptor] = &[
//!     FieldDescriptor::new("Name", FieldKind::Name).required(),
//!     FieldDescriptor::new(
//!         "Pool",
//!         FieldKind::Reference { target: 0, storage: ReferenceStorage::Single },
//!     ),
//! ];
//! static TYPES: &[ResourceType] = &[
//!     ResourceType { name: "Pool", group_name: "Pools", rcode: 0, fields: POOL, alias: None },
//!     ResourceType { name: "Job", group_name: "Jobs", rcode: 1, fields: JOB, alias: None },
//! ];
//! static SCHEMA: Schema = Schema { name: "example", types: TYPES, auto_password: &[] };
//!
//! let mut engine = Engine::new(&SCHEMA)?;
//! engine.parse_str(
//!     "bareos-dir.conf",
//!     "Job { Name = Backup1; Pool = Default }\nPool { Name = Default }\n",
//! )?;
//! let job = engine.get_by_name(1, "Backup1").unwrap();
//! let pool = job.resolve(job.get_reference("Pool").unwrap()).unwrap();
//! assert_eq!(pool.name(), Some("Default"));
//! # Ok::<(), anyhow::Error>(())
//! ```
mod defaults;
mod dependency;
mod driver;
mod engine;
mod registry;
mod schedule;
mod store;


pub use dependency::{Dependencies, DependencyKey, Unresolved};
pub use engine::{AfterParse, BeforeParse, Engine};
pub use registry::{Registry, ResourceHandle, Snapshot};
pub use schedule::{parse_schedule, ScheduleParser};
