use camino::Utf8PathBuf;
use clap::Parser;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    /// The configuration file or directory to parse (overrides the settings file)
    pub config: Option<Utf8PathBuf>,

    /// The path to the resconf.toml settings file
    #[arg(short, long)]
    pub config_file: Option<Utf8PathBuf>,

    /// The schema catalog to parse with (overrides the settings file)
    #[arg(short, long)]
    pub schema: Option<String>,

    /// Print every parsed resource
    #[arg(long)]
    pub show: bool,

    /// Increase logging verbosity level (0: warn; 1: info; 2: info, pretty; 3: debug; 4: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
