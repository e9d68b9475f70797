use monitor_link::{ChannelClient, ChannelClientOptions, ChannelEvent};

/// Streams crawl progress from the monitor server until Ctrl+C
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url =
        std::env::var("MONITOR_WS_URL").unwrap_or_else(|_| "ws://localhost:3000/ws".to_string());
    println!("📡 Connecting to: {}\n", url);

    let client = ChannelClient::new(&url, ChannelClientOptions::default())?;

    let _progress = client.subscribe(|event| match event {
        ChannelEvent::Message(message) => {
            println!("📨 {} {:?}", message.kind, message.payload);
        }
        ChannelEvent::StateChange(state) => {
            println!("🔌 Connection {}", state);
        }
    });

    // Queued until the socket opens
    client.send(&serde_json::json!({ "type": "get_status" }))?;

    client.connect().await?;
    println!("✅ Connected, waiting for progress (Ctrl+C to stop)\n");

    tokio::signal::ctrl_c().await?;

    client.disconnect();
    println!("👋 Disconnected");

    Ok(())
}
