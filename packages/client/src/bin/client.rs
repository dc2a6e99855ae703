//! Kizuna terminal client.
//!
//! Signs in with a session token, shows connections and chats, and follows the open
//! conversation live. Automatically reconnects on disconnection (max 5 attempts with
//! 5 second interval) and re-fetches what it may have missed.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kizuna-client -- --token alice-token
//! cargo run --bin kizuna-client -- --url http://127.0.0.1:3000 -t bob-token
//! ```

use clap::Parser;

use kizuna_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kizuna-client")]
#[command(about = "Terminal client for Kizuna connections and chat", long_about = None)]
struct Args {
    /// Session token (sent as a bearer credential)
    #[arg(short = 't', long)]
    token: String,

    /// HTTP base URL of the server
    #[arg(short = 'u', long, default_value = "http://127.0.0.1:8080")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = kizuna_client::run_client(args.url, args.token).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
