use clap::Parser;
use specgen::cli::{run_cli, Cli};
use specgen::logging::{init_logging, LogConfig};

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config = log_config.with_level(level.clone());
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format.into());
    }
    if let Err(err) = init_logging(&log_config) {
        eprintln!("warning: {err:#}");
    }

    if let Err(err) = run_cli(cli) {
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}
