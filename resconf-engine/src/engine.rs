use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use resconf_lexer::TokenStream;
use resconf_schema::{ResourceId, Schema, Warnings};

use crate::{
    dependency::Unresolved,
    driver::{self, Parsed},
    registry::{Registry, ResourceHandle, Snapshot},
};

/// Runs before a parse touches any configuration file
pub type BeforeParse = Box<dyn FnMut(&'static Schema) -> Result<()> + Send>;

/// Runs after a parse succeeds, before its snapshot goes live; an error rejects the snapshot
pub type AfterParse = Box<dyn FnMut(&mut Snapshot, &[Unresolved]) -> Result<()> + Send>;

/// Parses configuration for one schema and keeps the resulting resources live
///
/// A parse builds a new snapshot privately and only publishes it once every step has
/// succeeded. On failure the previous snapshot stays live and the error is recorded.
///
/// ```
/// # use resconf_schema::*;
/// # static FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new("Name", FieldKind::Name).required()];
/// # static TYPES: &[ResourceType] = &[ResourceType {
/// #     name: "Pool", group_name: "Pools", rcode: 0, fields: FIELDS, alias: None,
/// # }];
/// # static SCHEMA: Schema = Schema { name: "example", types: TYPES, auto_password: &[] };
/// use resconf_engine::Engine;
///
/// let mut engine = Engine::new(&SCHEMA)?;
/// engine.parse_str("bareos-dir.conf", "Pool { Name = Default }\n")?;
/// assert!(engine.get_by_name(0, "Default").is_some());
///
/// assert!(engine.parse_str("bareos-dir.conf", "Pool { Name = Default\n").is_err());
/// assert!(engine.get_by_name(0, "Default").is_some());
/// assert_eq!(engine.errors().len(), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Engine {
    schema: &'static Schema,
    registry: Arc<Registry>,
    warnings: Warnings,
    errors: Vec<String>,
    unresolved: Vec<Unresolved>,
    default_filename: Option<String>,
    include_dir: Option<String>,
    before_parse: Option<BeforeParse>,
    after_parse: Option<AfterParse>,
}

impl Engine {
    pub fn new(schema: &'static Schema) -> Result<Self> {
        schema
            .validate()
            .with_context(|| format!("Validating schema {}", schema.name))?;
        Ok(Engine {
            schema,
            registry: Arc::new(Registry::new(Snapshot::new(schema))),
            warnings: Warnings::default(),
            errors: vec![],
            unresolved: vec![],
            default_filename: None,
            include_dir: None,
            before_parse: None,
            after_parse: None,
        })
    }

    /// The file read when [`parse`](Self::parse) is given a directory
    pub fn with_default_filename(mut self, name: impl Into<String>) -> Self {
        self.default_filename = Some(name.into());
        self
    }

    /// The include tree, relative to a configuration directory, read when the directory holds
    /// no default file
    pub fn with_include_dir(mut self, dir: impl Into<String>) -> Self {
        self.include_dir = Some(dir.into());
        self
    }

    pub fn on_before_parse(
        &mut self,
        callback: impl FnMut(&'static Schema) -> Result<()> + Send + 'static,
    ) {
        self.before_parse = Some(Box::new(callback));
    }

    pub fn on_after_parse(
        &mut self,
        callback: impl FnMut(&mut Snapshot, &[Unresolved]) -> Result<()> + Send + 'static,
    ) {
        self.after_parse = Some(Box::new(callback));
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The registry, for sharing with threads that read the live snapshot
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.registry.snapshot()
    }

    /// Parses a configuration file, or a configuration directory, and publishes the result
    pub fn parse(&mut self, path: impl AsRef<Utf8Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Parsing configuration {}", path);
        let (default_filename, include_dir) = (self.default_filename.clone(), self.include_dir.clone());
        self.reload(|| open(path, default_filename.as_deref(), include_dir.as_deref()))
    }

    /// Parses configuration text held in memory; `name` stands in for its file name
    pub fn parse_str(&mut self, name: &str, text: &str) -> Result<()> {
        tracing::info!("Parsing configuration text {}", name);
        self.reload(|| Ok(TokenStream::from_text(name, text)?))
    }

    fn reload(&mut self, open: impl FnOnce() -> Result<TokenStream>) -> Result<()> {
        self.warnings.clear();
        self.errors.clear();
        self.unresolved.clear();
        match self.build(open) {
            Ok((snapshot, unresolved)) => {
                tracing::info!(
                    resources = snapshot.len(),
                    warnings = self.warnings.len(),
                    "Configuration parsed"
                );
                self.unresolved = unresolved;
                self.registry.publish(snapshot);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Keeping the previous configuration");
                self.errors.push(format!("{e:#}"));
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        open: impl FnOnce() -> Result<TokenStream>,
    ) -> Result<(Snapshot, Vec<Unresolved>)> {
        if let Some(before) = &mut self.before_parse {
            before(self.schema).context("Before parse callback failed")?;
        }
        let mut tokens = open()?;
        let Parsed {
            mut snapshot,
            unresolved,
        } = driver::parse_tokens(self.schema, &mut tokens, &mut self.warnings)?;
        if let Some(after) = &mut self.after_parse {
            after(&mut snapshot, &unresolved).context("After parse callback failed")?;
        }
        Ok((snapshot, unresolved))
    }

    /// Resources of one type in order; `None` starts at the first
    pub fn get_next(&self, rcode: u32, previous: Option<ResourceId>) -> Option<ResourceHandle> {
        self.registry.get_next(rcode, previous)
    }

    pub fn get_by_name(&self, rcode: u32, name: &str) -> Option<ResourceHandle> {
        self.registry.get_by_name(rcode, name)
    }

    /// Removes one resource from the live configuration
    pub fn remove(&self, rcode: u32, name: &str) -> bool {
        self.registry.remove(rcode, name)
    }

    /// Detaches the live snapshot, leaving an empty one live
    pub fn backup(&self) -> Arc<Snapshot> {
        self.registry.backup(Snapshot::new(self.schema))
    }

    pub fn restore(&self, snapshot: Arc<Snapshot>) {
        self.registry.restore(snapshot)
    }

    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.warnings.add(text);
    }

    /// Warnings of the most recent parse, and any added since
    pub fn warnings(&self) -> &[String] {
        self.warnings.as_slice()
    }

    /// The error of the most recent parse, if it failed
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// References the most recent successful parse could not resolve
    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }
}

/// Lexes a configuration file, or finds the configuration inside a directory
fn open(
    path: &Utf8Path,
    default_filename: Option<&str>,
    include_dir: Option<&str>,
) -> Result<TokenStream> {
    if !path.is_dir() {
        return Ok(TokenStream::from_file(path)?);
    }
    if let Some(name) = default_filename {
        let file = path.join(name);
        if file.is_file() {
            tracing::debug!("Reading default file {}", file);
            return Ok(TokenStream::from_file(&file)?);
        }
    }
    if let Some(dir) = include_dir {
        let files = include_tree(&path.join(dir))?;
        if !files.is_empty() {
            tracing::debug!("Reading {} files from the include tree", files.len());
            return Ok(TokenStream::from_files(files.iter().map(Utf8PathBuf::as_path))?);
        }
    }
    bail!("Found no configuration files in directory {}", path)
}

/// Every `<root>/*/*.conf` file, sorted
fn include_tree(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = vec![];
    if !root.is_dir() {
        return Ok(files);
    }
    let entries = root
        .read_dir_utf8()
        .with_context(|| format!("Reading directory {root}"))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Reading directory {root}"))?;
        if !entry.path().is_dir() {
            continue;
        }
        let group = entry.path();
        let inner = group
            .read_dir_utf8()
            .with_context(|| format!("Reading directory {group}"))?;
        for file in inner {
            let file = file.with_context(|| format!("Reading directory {group}"))?;
            if file.path().is_file() && file.path().extension() == Some("conf") {
                files.push(file.into_path());
            }
        }
    }
    files.sort();
    Ok(files)
}
