//! Reference request pipeline
//!
//! Runs requests through three stages that exchange values only via the
//! request scope: authorization attaches the user on a plain key, a defaulting
//! key supplies the logger, and the byte-accounting stage installs a boxed slot
//! that the `/hello` endpoint fills in.
//!
//! ```text
//! cargo run --example http_pipeline -- --path /hello --path /missing
//! ```

use anyhow::Context;
use clap::Parser;
use ctxkey::config::ConfigLoader;
use ctxkey::logging::init_logging;
use ctxkey::pipeline::{
    reference_pipeline, Request, RequestKeys, RequestLogger, Response, Supervisor,
};
use ctxkey::Scope;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Parser)]
#[command(name = "http_pipeline", about = "Dispatch requests through the reference pipeline")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request path to dispatch; may be repeated
    #[arg(long = "path", default_value = "/hello")]
    paths: Vec<String>,

    /// Dispatch every path on its own thread
    #[arg(long)]
    parallel: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::load(args.config.as_deref()).context("loading configuration")?;
    init_logging(Some(&config.logging)).context("initializing logging")?;

    let keys = Arc::new(RequestKeys::new());
    let handler = reference_pipeline(keys.clone(), &config.pipeline);

    // Every request branches from this scope
    let base = keys
        .logger
        .set(&Scope::background(), RequestLogger::new("http_pipeline"));

    let responses: Vec<(String, Response)> = if args.parallel {
        let handles: Vec<_> = args
            .paths
            .iter()
            .cloned()
            .map(|path| {
                let handler = handler.clone();
                let base = base.clone();
                thread::spawn(move || {
                    let req = Request::new(path.clone()).with_scope(base);
                    (path, Supervisor::dispatch(handler.as_ref(), req))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("dispatch thread panicked")))
            .collect::<anyhow::Result<_>>()?
    } else {
        args.paths
            .iter()
            .map(|path| {
                let req = Request::new(path.clone()).with_scope(base.clone());
                (path.clone(), Supervisor::dispatch(handler.as_ref(), req))
            })
            .collect()
    };

    for (path, resp) in responses {
        print!("{} {} {}", resp.status, path, resp.body);
    }
    Ok(())
}
