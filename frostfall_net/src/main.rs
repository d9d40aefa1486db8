// CLI entry point for a standalone match server.
//
// Runs the server without a hosting player: both participants connect as
// guests and the server relays their packets. Useful for playing across a
// network neither player can accept connections on.
//
// Usage:
//   frostfall_server [OPTIONS]
//     --port <PORT>          Listen port (default: 7155)
//     --max-players <N>      Max players (default: 2)

use frostfall_net::server::{ServerConfig, ServerEvent, start_server};

const DEFAULT_PORT: u16 = 7155;

fn main() {
    let config = parse_args();

    let (handle, addr, events) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Server listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The accept and reader threads do the work; this loop just logs.
    // The process exits on SIGINT/SIGTERM, which tears the threads down.
    for event in events {
        match event {
            ServerEvent::Joined { id, name } => println!("{id} joined as {name:?}"),
            ServerEvent::Left { id } => println!("{id} left"),
            ServerEvent::PacketFrom { .. } => {}
        }
    }

    handle.stop();
}

/// Parse command-line arguments into a `ServerConfig`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> ServerConfig {
    let mut config = ServerConfig {
        port: DEFAULT_PORT,
        ..ServerConfig::default()
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--max-players" => {
                i += 1;
                config.max_players =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--max-players requires a valid number");
                        std::process::exit(1);
                    });
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
    println!("Usage: frostfall_server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>          Listen port (default: {DEFAULT_PORT})");
    println!("  --max-players <N>      Max players (default: 2)");
    println!("  --help, -h             Show this help");
}
