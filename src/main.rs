use adblock_parser::prelude::*;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🛡️  Adblock Filter Parser Demo");

    // Configuration file path from ADBLOCK_CONFIG, default lists otherwise
    let mut config = match std::env::var("ADBLOCK_CONFIG") {
        Ok(path) => AdblockConfig::load_from_path(path)?,
        Err(_) => AdblockConfig::default(),
    };
    config.custom_filters.push("||example-ads.com^".to_string());
    config.custom_filters.push("@@||example-ads.com/allowed/".to_string());

    let blocker = AdBlocker::new(config).await?;
    let stats = blocker.stats();
    println!(
        "📥 Compiled {} rules ({} exceptions), skipped {} lines",
        stats.compiled,
        stats.exceptions,
        stats.skipped()
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let entries: Vec<&str> = if args.is_empty() {
        vec![
            "https://www.example.com",
            "https://example-ads.com/banner.jpg",
            "https://example-ads.com/allowed/logo.png",
            "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js",
            "/ads/banner.gif",
            "github.com",
        ]
    } else {
        args.iter().map(String::as_str).collect()
    };

    println!("\n📋 Checking entries:");
    for entry in entries {
        let result = blocker.check(entry);
        let status = match result.category {
            BlockCategory::Blocked => "🚫 BLOCKED",
            BlockCategory::Excepted => "✅ ALLOWED (exception)",
            BlockCategory::Clean => "✅ ALLOWED",
        };
        println!("{} - {} ({})", status, entry, result.reason);
        for rule in &result.matched_rules {
            println!("    ↳ {}", rule);
        }
    }

    Ok(())
}
