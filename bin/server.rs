// Homebase - Web Server
// REST API for every tracker app

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use homebase::api::{router, AppState};
use homebase::{logging, open_database, seed_all, Config, Handlers, TopicExchange};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() {
    logging::init(Config::log_format().expect("Invalid HOMEBASE_LOG_FORMAT"));
    let config = Config::load().expect("Environment misconfigured!");

    println!("🌐 Homebase - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(&config.db_path).expect("Failed to open database");
    println!("✓ Database opened: {:?}", config.db_path);

    let exchange = Arc::new(TopicExchange::new());
    spawn_event_logger(&exchange);

    if config.seed {
        let handlers = Handlers::new(&conn, exchange.as_ref(), "seed");
        let summary = seed_all(&handlers, Utc::now().date_naive()).expect("Failed to seed database");
        info!(seeded = ?summary.seeded, skipped = ?summary.skipped, "Seed finished");
    }

    let app = router(AppState::new(conn, exchange));

    let address = config.address();
    let listener = TcpListener::bind(&address)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {address}: {e}"));
    info!("Server running on {address}");

    println!("\n🚀 Server running on http://{}", address);
    println!("   API: http://{}/api/health", address);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    println!("Server shutting down...");
}

/// Log every published message. Runs until the exchange is dropped.
fn spawn_event_logger(exchange: &TopicExchange) {
    let receiver = exchange.bind("#");
    thread::spawn(move || {
        for message in receiver {
            info!(routing_key = %message.routing_key, payload = %message.payload, "Event published");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
