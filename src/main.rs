use std::io::Read;
use std::sync::Arc;

use clap::Parser;
use jotter::config::{Cli, Config, default_config_path, default_session_path};
use jotter::dom;
use jotter::highlight::{Enricher, ViewContext};
use jotter::parser;
use jotter::session::{FileStore, Session};
use jotter::tokenizer::{TokenEngine, Tokenizer};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("jotter starting");

    let config_path = match args.config_path {
        Some(path) => std::path::PathBuf::from(path),
        None => default_config_path(),
    };
    let cfg = if config_path.exists() {
        Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
            tracing::error!(error = %e, path = ?config_path, "failed to load config file");
            std::process::exit(1);
        })
    } else {
        Config::default()
    };

    match FileStore::open(&default_session_path()) {
        Ok(store) => {
            let mut session = Session::open(store);
            let status = session.status();
            tracing::info!(logged_in = status.logged_in, "session restored");
        }
        Err(e) => tracing::warn!(error = %jotter::unpack_error(&e), "failed to open session store"),
    }

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        }
    }
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to read input");
        std::process::exit(1);
    });

    let mut nodes = parser::parse(&input).unwrap_or_else(|e| {
        tracing::error!(error = %jotter::unpack_error(&e), "failed to parse input markup");
        std::process::exit(1);
    });

    let enricher = Enricher::new(
        cfg.highlight.clone(),
        Some(Arc::new(TokenEngine::new()) as Arc<dyn Tokenizer>),
    );
    let ctx = ViewContext::new(args.editable);
    for node in &mut nodes {
        dom::walk_mut(node, &mut |n| enricher.process(n, &ctx));
    }

    if ctx.exposed() {
        tracing::debug!("document contains copyable code blocks");
    }
    print!("{}", dom::to_markup(&nodes));
}
