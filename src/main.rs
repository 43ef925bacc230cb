//! reqbridge binary.
//!
//! Two modes:
//! - `reqbridge serve` listens for a scripting-side producer on the
//!   configured port and writes one `.dsdx` stream per session.
//! - `reqbridge import <file.html>` converts an HTML export directly.
//!
//! Settings are read from `reqbridge.json` in the working directory;
//! a missing file means defaults (port 5093, output here).

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use reqbridge::config::{EtlConfig, Settings};
use reqbridge::error::Result;
use reqbridge::event::{Events, TracingSink};
use reqbridge::html::HtmlImporter;
use reqbridge::server::Server;
use reqbridge::stream::FrameStack;

const SETTINGS_FILE: &str = "reqbridge.json";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reqbridge=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    let settings = Settings::load(Path::new(SETTINGS_FILE))?;
    let config = EtlConfig::new(&settings.out_dir).with_length_unit(settings.length_unit);
    let events: Events = Arc::new(TracingSink);

    match args {
        [cmd] if cmd == "serve" => Server::new(config, events).run(settings.port).await,
        [cmd, file] if cmd == "import" => {
            let agent = FrameStack::new(config, events);
            HtmlImporter::new(agent).import(Path::new(file))
        }
        _ => {
            eprintln!("usage: reqbridge serve | reqbridge import <file.html>");
            Ok(())
        }
    }
}
