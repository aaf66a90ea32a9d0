//! LineQueue Server Binary
//!
//! Restores the queue and serves it over TCP until a client sends SHUTDOWN.

use clap::Parser;
use linequeue::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// LineQueue Server
#[derive(Parser, Debug)]
#[command(name = "linequeue-server")]
#[command(about = "Disk-backed FIFO line queue server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:10042")]
    listen: String,

    /// File the queue is dumped to on SHUTDOWN and restored from on start
    #[arg(short, long, default_value = "line_queue.dump")]
    dump_file: String,

    /// Threads executing commands
    #[arg(long, default_value = "4")]
    dispatch_workers: usize,

    /// Non-blocking read/write event loops
    #[arg(long, default_value = "2")]
    io_workers: usize,

    /// Non-blocking accept event loops
    #[arg(long, default_value = "1")]
    acceptor_workers: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,linequeue=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LineQueue Server v{}", linequeue::VERSION);
    tracing::info!("Dump file: {}", args.dump_file);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .dump_path(&args.dump_file)
        .dispatch_workers(args.dispatch_workers)
        .io_workers(args.io_workers)
        .acceptor_workers(args.acceptor_workers)
        .build();

    let server = match Server::start(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    server.wait();

    tracing::info!("Server stopped");
}
