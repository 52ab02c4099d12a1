use oneshot_fetch::{Body, FetchParams, Fetcher};
use snafu::prelude::*;
use tracing_subscriber::EnvFilter;

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let env_filter = EnvFilter::try_from_env("FETCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let url = std::env::args()
        .nth(1)
        .whatever_context("Usage: fetch <url> [body]")?;
    let body = std::env::args().nth(2).map(Body::text);

    let params = FetchParams::builder()
        .maybe_method(std::env::var("METHOD").ok())
        .maybe_cache(std::env::var("CACHE").ok())
        .maybe_redirect(std::env::var("REDIRECT").ok())
        .maybe_body(body)
        .build();

    let fetcher = Fetcher::reqwest().whatever_context("Failed to build HTTP client")?;
    let mut response = fetcher
        .fetch(url, params)
        .await
        .whatever_context("Fetch failed")?;

    println!("{} {}", response.status.as_u16(), response.status_text);
    println!("url: {}", response.url);
    println!("redirected: {}", response.redirected);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!();
    println!(
        "{}",
        response
            .text()
            .whatever_context("Failed to read response body")?
    );

    Ok(())
}
