use std::path::PathBuf;

use clap::Parser;

use bluetrace::conf::TraceConfig;
use bluetrace::runtime::{boot, run};

/// Reconstruct BlueStore I/O operation lifecycles from an OSD debug log.
#[derive(Debug, Parser)]
#[command(name = "bluetrace", version)]
struct Cli {
    /// Log file to read; stdin when omitted
    input: Option<PathBuf>,

    /// Config file (overrides BLUETRACE_CONFIG_FILE)
    #[arg(short, long)]
    config: Option<String>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Pretty-print each record
    #[arg(long)]
    pretty: bool,

    /// Emit lifecycles still open at end of input
    #[arg(long)]
    flush_on_eof: bool,

    /// Only emit records with an audit line matching this regex
    #[arg(long)]
    filter: Option<String>,
}

impl Cli {
    /// CLI flags override config values.
    fn apply(&self, config: &mut TraceConfig) {
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if self.flush_on_eof {
            config.flush_on_eof = true;
        }
        if let Some(pattern) = &self.filter {
            config.filter.pattern = Some(pattern.clone());
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    boot::init_logging();

    let mut config = boot::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    run::run_path(&config, cli.input.as_deref())?;
    Ok(())
}
