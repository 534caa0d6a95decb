// CLI entry point for the Parry move relay.
//
// Starts a standalone relay, waits for its single match to finish, and
// exits. Logging goes through `tracing`; set `RUST_LOG` to change the filter
// (default `info`). See `server.rs` for the networking architecture.
//
// Usage:
//   relay [OPTIONS]
//     --bind <ADDR>    Bind address (default: 127.0.0.1)
//     --port <PORT>    Listen port (default: 7878, 0 = any free port)
//     --moves <N>      Per-round move count announced to both clients

use parry_relay::server::{RelayConfig, start_relay};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = parse_args();

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            error!("failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "waiting for two participants");

    match handle.join() {
        Some(summary) => info!(
            exchanges = summary.exchanges,
            reason = ?summary.reason,
            "match finished, exiting"
        ),
        None => {
            error!("relay thread panicked");
            std::process::exit(1);
        }
    }
}

/// Parse command-line arguments into a `RelayConfig`. Uses simple
/// `std::env::args()` matching, no clap dependency.
fn parse_args() -> RelayConfig {
    let mut config = RelayConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                i += 1;
                config.bind_addr = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--bind requires an address");
                    std::process::exit(1);
                });
            }
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--moves" => {
                i += 1;
                let moves: u32 = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or_else(|| {
                        eprintln!("--moves requires a positive number");
                        std::process::exit(1);
                    });
                config.move_count_hint = Some(moves);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --bind <ADDR>    Bind address (default: 127.0.0.1)");
    println!("  --port <PORT>    Listen port (default: 7878, 0 = any free port)");
    println!("  --moves <N>      Per-round move count announced to both clients");
    println!("  --help, -h       Show this help");
}
