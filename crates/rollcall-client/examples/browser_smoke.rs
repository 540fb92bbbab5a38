/// Smoke-test for `BrowserPageSource`.
///
/// Launches a headless Chromium, opens <https://example.com>, and checks that
/// the page renders and the listing parser can read its links.
///
/// Run with:
///   cargo run -p rollcall-client --example browser_smoke
use std::time::Duration;

use rollcall_client::{BrowserOptions, BrowserPageSource, SiteSelectors};
use rollcall_core::traits::{PageSource, Target};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let options = BrowserOptions {
        headless: true,
        ..BrowserOptions::default()
    };
    println!("Launching headless browser…");
    let source = BrowserPageSource::launch(options, SiteSelectors::default().compile()?).await?;

    let url = "https://example.com";
    println!("Opening {url} …");
    source.navigate(url).await?;

    let rendered = source.wait_for(Target::Body, Duration::from_secs(10)).await?;
    anyhow::ensure!(rendered, "page body never appeared");

    let current = source.current_url().await?;
    let title = source.text_of(Target::Body).await?.unwrap_or_default();
    anyhow::ensure!(
        title.contains("Example Domain"),
        "unexpected page text: {}",
        title.chars().take(200).collect::<String>()
    );
    println!("OK: rendered {current}");

    let cookies = source.cookies().await?;
    println!("{} cookies in the tab", cookies.len());

    source.close().await?;
    Ok(())
}
