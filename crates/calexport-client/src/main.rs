//! calexport CLI entry point.

use std::process::ExitCode;

use calexport_client::cli::{Args, USAGE};
use calexport_client::commands;
use calexport_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return e.exit_code();
        }
    };

    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if args.version {
        println!("calexport {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let tracing_config = if args.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: logging disabled: {e}");
    }

    let config = args.into_config();
    match commands::export::run(&config).await {
        Ok(count) => {
            println!("Wrote {count} events to '{}'.", config.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    }
}
