use monitor_link::{ChannelClient, ChannelClientOptions};
use std::time::Duration;

/// Watches reconnection against a real monitor server.
///
/// Stop and restart the server while this runs to see the backoff.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url =
        std::env::var("MONITOR_WS_URL").unwrap_or_else(|_| "ws://localhost:3000/ws".to_string());
    println!("📡 Connecting to: {}\n", url);

    let client = ChannelClient::new(
        &url,
        ChannelClientOptions {
            heartbeat_interval: Some(5000),
            ..Default::default()
        },
    )?;

    let _states = client.subscribe_to_state(|state| println!("\n🔌 State: {}", state));

    println!("✅ Test 1: Initial connection...");
    client.connect().await?;
    println!("✅ Connected\n");

    println!("✅ Test 2: Manual disconnect (should NOT auto-reconnect)...");
    client.disconnect();
    tokio::time::sleep(Duration::from_secs(5)).await;
    if client.is_connected() {
        return Err("Should NOT reconnect after manual disconnect".into());
    }
    println!("✅ Stayed disconnected\n");

    println!("✅ Test 3: Reconnect, then interrupt the server...");
    client.connect().await?;

    for i in 1..=60 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        print!(
            "\r⏱  Second {}/60 - {} - attempts {} - queued {}",
            i,
            if client.is_connected() {
                "🟢 Connected"
            } else {
                "🔴 Disconnected"
            },
            client.reconnect_attempts(),
            client.queued_len()
        );
        std::io::Write::flush(&mut std::io::stdout())?;
    }
    println!("\n");

    client.disconnect();
    println!("🎉 Done");
    Ok(())
}
