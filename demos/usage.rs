use google_search_scraper::{ search, GoogleSearchScraper, SearchError, SearchOptions };
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn banner(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("{}", title);
    println!("{}", "=".repeat(70));
}

async fn basic_usage() -> Result<(), SearchError> {
    banner("Example 1: Basic Usage");
    let results = search("python tutorial", SearchOptions::new()).await?;

    println!("\nQuery: {}", results.query());
    println!("Search time: {:.2}s", results.search_time());
    if let Some(answer) = results.answer() {
        let preview: String = answer.chars().take(200).collect();
        println!("\nAnswer: {}...", preview);
    }

    println!("\nTop {} URLs:", results.urls().len());
    for (i, url) in results.urls().iter().take(5).enumerate() {
        println!("{}. {}", i + 1, url);
    }
    Ok(())
}

async fn custom_scraper() -> Result<(), SearchError> {
    banner("Example 2: Custom Scraper Configuration");
    let scraper = GoogleSearchScraper::builder()
        .max_results(5)
        .timeout(20_000)
        .headless(true)
        .stealth_mode(true)
        .build();

    let results = scraper.search("machine learning", SearchOptions::new().extract_answer(true)).await?;

    println!("\nFound {} results", results.total_results());
    println!("Time: {:.2}s", results.search_time());
    println!("\nURLs:");
    for url in results.urls() {
        println!("  - {}", url);
    }
    Ok(())
}

async fn multiple_searches() -> Result<(), SearchError> {
    banner("Example 3: Multiple Searches");
    for query in ["python", "javascript", "rust"] {
        println!("\nSearching: {}", query);
        let results = search(query, SearchOptions::new().max_results(3)).await?;
        println!("  Results: {}", results.urls().len());
        if let Some(top) = results.urls().first() {
            println!("  Top result: {}", top);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    Ok(())
}

async fn error_handling() -> Result<(), SearchError> {
    banner("Example 4: Error Handling");
    // A one second budget rarely survives a browser launch.
    match search("test query", SearchOptions::new().timeout(1_000)).await {
        Ok(results) => println!("Success! Found {} results", results.urls().len()),
        Err(e) => {
            println!("Caught error (expected): {}", e.kind());
            println!("Message: {}", e);
        }
    }
    Ok(())
}

async fn result_map() -> Result<(), SearchError> {
    banner("Example 5: Convert to Map");
    let results = search("web scraping", SearchOptions::new().max_results(3)).await?;
    let map = results.to_map();

    println!("\nResult map keys: {:?}", map.keys().collect::<Vec<_>>());
    println!("Query: {}", map["query"]);
    println!("Total results: {}", map["total_results"]);
    let first = results.urls().first().map(String::as_str).unwrap_or("N/A");
    println!("First URL: {}", first);
    match serde_json::to_string_pretty(&map) {
        Ok(json) => println!("\n{}", json),
        Err(e) => println!("\nCould not render JSON: {}", e),
    }
    Ok(())
}

fn report(name: &str, outcome: Result<(), SearchError>) {
    if let Err(e) = outcome {
        println!("\nExample '{}' failed: {}", name, e);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    banner("Google Search Scraper - Usage Examples");
    let pause = Duration::from_secs(3);

    report("Basic Usage", basic_usage().await);
    tokio::time::sleep(pause).await;
    report("Custom Scraper", custom_scraper().await);
    tokio::time::sleep(pause).await;
    report("Multiple Searches", multiple_searches().await);
    tokio::time::sleep(pause).await;
    report("Error Handling", error_handling().await);
    tokio::time::sleep(pause).await;
    report("Result Map", result_map().await);

    banner("Examples completed!");
}
