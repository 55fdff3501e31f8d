//! dir-tunnel binary entry point.

use std::process::ExitCode;

use dir_tunnel::cli::{self, Args};
use dir_tunnel::config::Config;
use dir_tunnel::{logging, server};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args)?;
    let engine = config.to_engine_config()?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging was already initialized");
    }

    info!("dir-tunnel v{}", env!("CARGO_PKG_VERSION"));
    info!(
        ttl_secs = engine.session_ttl.as_secs(),
        sweep_secs = engine.sweep_interval.as_secs(),
        "session lifetime configured"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        if let Err(e) = server::serve(engine).await {
            error!(error = %e, "server stopped");
            return Err(e);
        }
        info!("dir-tunnel stopped");
        Ok(())
    })?;

    Ok(())
}
