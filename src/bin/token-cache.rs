use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use futures::future::join_all;
use serde_json::json;
use token_cache::cache::{init_default_cache, TokenRequest};
use token_cache::config::proc_loader;
use token_cache::observability::metrics;
use token_cache::sources::HttpTokenSource;
use token_cache::utils::logging;
use token_cache::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-cache.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// identity the token is issued for
    #[arg(long)]
    email: String,
    /// requested scope, repeatable
    #[arg(short, long = "scope", required = true)]
    scopes: Vec<String>,
    /// address to act on behalf of
    #[arg(long)]
    delegation_email: Option<String>,
    /// validity override for the issued token
    #[arg(long)]
    expiration_seconds: Option<u64>,
    /// number of simultaneous requests to issue
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = proc_loader::file_to_config(Path::new(&args.config)).await?;
    logging::run(&service_config.settings, args.log_level);

    // -------------------------------
    // 2. Create cache and token source
    // -------------------------------

    let default_validity = service_config
        .settings
        .default_validity_seconds
        .map(Duration::from_secs);
    let cache = init_default_cache(default_validity).await;
    let source = HttpTokenSource::from_service_config(&service_config)?;

    // count upstream acquisitions
    let acquisitions = Arc::new(AtomicUsize::new(0));
    let acquire = {
        let acquisitions = acquisitions.clone();
        let fetch = source.acquirer();
        move |request: TokenRequest| {
            acquisitions.fetch_add(1, Ordering::SeqCst);
            fetch(request)
        }
    };

    // -------------------------------
    // 3. Request the token concurrently
    // -------------------------------

    let mut request = TokenRequest {
        email: args.email.to_owned(),
        scopes: args.scopes.to_owned(),
        delegation_email: args.delegation_email.to_owned(),
        expiration: None,
    };
    if let Some(seconds) = args.expiration_seconds {
        request = request.with_expiration(Duration::from_secs(seconds));
    }
    let key = request.cache_key();
    info!("requesting token for '{}' from {} caller(s)", key, args.concurrency);

    let callers = (0..args.concurrency.max(1))
        .map(|_| cache.request(key.clone(), request.clone(), acquire.clone()));
    let outcomes = join_all(callers).await;

    let served = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let token = outcomes
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no request was issued"))?
        .map_err(|err| anyhow!("{}", err))?;

    println!(
        "{}",
        json!({
            "key": key.to_string(),
            "token_type": token.token_type,
            "expires_in": token.expires_in,
            "callers_served": served,
            "acquisitions": acquisitions.load(Ordering::SeqCst),
        })
    );

    if args.print_metrics {
        print!("{}", metrics::render().await?);
    }

    Ok(())
}
