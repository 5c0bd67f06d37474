use coin_detail_sdk::{AppContext, CoinDetailView, QueryKind, SdkConfig};
use std::time::Duration;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let coin = std::env::args().nth(1).unwrap_or_else(|| "btc-bitcoin".to_string());
    let ctx = AppContext::coinpaprika(SdkConfig::from_env()?)?;

    // Arrive on the price tab the way an in-app link would, with the name as hint
    ctx.router
        .navigate_with_state(&format!("/{}/price", coin), &coin.to_uppercase());
    let mut view = CoinDetailView::mount(&ctx, ctx.router.location())?;

    println!("{}", view.render());

    // Three polling rounds of the price ticker
    for _ in 0..3 {
        match timeout(Duration::from_secs(15), view.changed()).await {
            Ok(true) => {
                println!("{:-<60}", "");
                println!("{}", view.render());
            }
            Ok(false) => break,
            Err(_) => println!("No update within 15s"),
        }
    }

    let stats = ctx.cache.metrics(QueryKind::Price).await;
    println!(
        "price fetches: {} (failed {}), p50 {:.0}ms",
        stats.total_fetches, stats.failed_fetches, stats.latency_p50_ms
    );

    view.go_home();
    println!("Back at {}", ctx.router.location().pathname);

    Ok(())
}
