use anyhow::{anyhow, Result};
use camino::Utf8Path;
use clap::Parser;
use tracing::{span, Level};

mod args;
use args::CommandLineArgs;
use resconf::{
    config::{Config, ConfigFile, Overrides},
    director,
    engine::Engine,
};

/// Settings file read from the working directory when none is given
const SETTINGS_FILE: &str = "resconf.toml";

fn init_logger(verbosity: u8) {
    let sub = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false);
    let (level, pretty) = match verbosity {
        0 => (Level::WARN, false),
        1 => (Level::INFO, false),
        2 => (Level::INFO, true),
        3 => (Level::DEBUG, true),
        _ => (Level::TRACE, true),
    };
    let sub = sub.with_max_level(level);
    if pretty {
        sub.pretty().init();
    } else {
        sub.init();
    }
}

fn main() -> Result<()> {
    let CommandLineArgs {
        config,
        config_file,
        schema,
        show,
        verbose,
    } = CommandLineArgs::parse();

    init_logger(verbose);
    let span = span!(Level::DEBUG, "main");
    let _guard = span.enter();

    let settings = match config_file {
        Some(path) => ConfigFile::load(path)?,
        None if Utf8Path::new(SETTINGS_FILE).is_file() => ConfigFile::load(SETTINGS_FILE)?,
        None => ConfigFile::default(),
    };
    let config = Config::merge(settings, Overrides { schema, config })?;

    let schema = director::schema_by_name(config.schema())
        .ok_or_else(|| anyhow!("Unknown schema \"{}\"", config.schema()))?;
    let mut engine = Engine::new(schema)?
        .with_default_filename(config.default_filename().unwrap_or(director::DEFAULT_FILENAME))
        .with_include_dir(config.include_dir().unwrap_or(director::INCLUDE_DIR));
    director::install_checks(&mut engine);

    engine.parse(config.config())?;

    let snapshot = engine.snapshot();
    if show {
        for resource in snapshot.resources() {
            println!("{resource}");
        }
    }
    for rtype in schema.types {
        let count = snapshot.chain(rtype.rcode).len();
        if count > 0 {
            tracing::info!("{} {}", count, rtype.group_name);
        }
    }
    if !engine.warnings().is_empty() {
        eprintln!(
            "Parsed {} with {} warning(s)",
            config.config(),
            engine.warnings().len()
        );
    }
    Ok(())
}
