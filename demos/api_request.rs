use monitor_link::{ApiErrorKind, RequestClient, RequestClientOptions, RequestOptions};

/// Calls the monitor control API and shows how failures are reported
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let base_url = std::env::var("MONITOR_API_URL")
        .unwrap_or_else(|_| "http://localhost:3000/api/".to_string());
    println!("📡 API base: {}\n", base_url);

    let api = RequestClient::new(RequestClientOptions {
        base_url,
        ..Default::default()
    })?;

    println!("✅ GET crawler/status");
    match api.get("crawler/status", &RequestOptions::default()).await {
        Ok(body) => println!("   {:?}\n", body),
        Err(e) => println!("   ❌ {} ({:?})\n", e, e.kind()),
    }

    println!("✅ POST crawler/start with a 2s timeout and no retries");
    let options = RequestOptions::default().with_timeout(2000).with_retries(0);
    let start = serde_json::json!({ "url": "https://example.com", "depth": 2 });
    match api.post("crawler/start", &start, &options).await {
        Ok(body) => println!("   {:?}\n", body),
        Err(e) => match e.kind() {
            ApiErrorKind::Timeout => println!("   ⏱  timed out\n"),
            ApiErrorKind::Connectivity => println!("   🔴 server unreachable\n"),
            _ => println!("   ❌ {} data={:?}\n", e, e.data),
        },
    }

    println!("✅ GET an unknown endpoint (4xx is not retried)");
    if let Err(e) = api.get("does-not-exist", &RequestOptions::default()).await {
        println!("   ❌ {} ({:?})", e, e.kind());
    }

    Ok(())
}
