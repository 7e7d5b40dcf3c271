use std::sync::Arc;
use std::time::{Duration, Instant};

mod api;
mod config;
mod contact;
mod geography;
mod handler;
mod http;
mod logger;
mod server;
#[cfg(test)]
mod testing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path without extension
    let cfg = match std::env::args().nth(1) {
        Some(path) => config::Config::load_from(&path)?,
        None => config::Config::load()?,
    };
    logger::init(&cfg)?;

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let drain_timeout = Duration::from_secs(cfg.performance.write_timeout);
    let sweep_every = Duration::from_secs(cfg.contact.rate_limit_sweep_secs.max(1));

    logger::log_server_start(&addr, &cfg);
    let state = Arc::new(config::AppState::build(cfg).await);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    let sweeper = spawn_rate_limit_sweeper(&state, sweep_every);

    server::start_server_loop(listener, state, signals, drain_timeout).await;

    sweeper.abort();
    logger::log_info("Server stopped");
    Ok(())
}

/// Periodically drop rate limit entries whose window has passed
fn spawn_rate_limit_sweeper(
    state: &Arc<config::AppState>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    let limiter = state.contact.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                logger::log_debug(&format!("Swept {removed} expired rate limit entries"));
            }
        }
    })
}
