use clap::Parser;
use markcrawl::service::{
    BatchScrapeRequest, CrawlRequest, MapRequest, ScrapeRequest, SearchRequest,
};
use markcrawl::{FetchCoordinator, MarkdownService, ServiceConfig, WebDriverRenderer};
use serde::Serialize;
use std::sync::Arc;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };
    ::log::info!(
        "Using WebDriver at {} with {} fetch slots",
        config.webdriver_url,
        config.max_concurrency
    );

    let renderer = Arc::new(WebDriverRenderer::new(&config));
    let coordinator = FetchCoordinator::from_config(renderer, &config);
    let service = MarkdownService::new(coordinator.clone());

    let start_time = std::time::Instant::now();
    let outcome = run(&service, args.command).await;
    coordinator.shutdown().await;

    match outcome {
        Ok(()) => ::log::info!(
            "Done in {:.2} seconds",
            start_time.elapsed().as_secs_f64()
        ),
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// File config (if any), then WEBDRIVER_URL, then command-line flags
fn load_config(args: &Args) -> Result<ServiceConfig, markcrawl::error::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    }
    .with_env_overrides();

    if let Some(url) = &args.webdriver_url {
        config.webdriver_url = url.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    Ok(config)
}

async fn run(service: &MarkdownService, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Scrape(scrape) => {
            let request = ScrapeRequest {
                url: scrape.url,
                wait_for_selector: scrape.wait_for,
                target_selector: scrape.target,
                remove_selector: scrape.remove,
                include_images: scrape.images,
                summarize: scrape.summarize,
                screenshot: scrape.screenshot.is_some(),
                pdf: scrape.pdf.is_some(),
            };
            let response = service.scrape(&request).await?;

            if let (Some(path), Some(bytes)) = (&scrape.screenshot, &response.screenshot) {
                std::fs::write(path, bytes)?;
                ::log::info!("Wrote screenshot to {}", path.display());
            }
            if let (Some(path), Some(bytes)) = (&scrape.pdf, &response.pdf) {
                std::fs::write(path, bytes)?;
                ::log::info!("Wrote PDF to {}", path.display());
            }
            print_json(&response)
        }
        Command::Map { url } => print_json(&service.map(&MapRequest { url }).await?),
        Command::Crawl(crawl) => {
            let request = CrawlRequest {
                url: crawl.url,
                max_depth: crawl.max_depth,
                max_pages: crawl.max_pages,
                wait_for_selector: crawl.wait_for,
                include_images: crawl.images,
            };
            print_json(&service.crawl(&request).await?)
        }
        Command::Batch(batch) => {
            let request = BatchScrapeRequest {
                urls: batch.urls,
                wait_for_selector: batch.wait_for,
                include_images: batch.images,
            };
            let archive = service.batch_scrape(&request).await?;
            std::fs::write(&batch.output, &archive)?;
            println!("{}", batch.output.display());
            Ok(())
        }
        Command::Search(search) => {
            let request = SearchRequest {
                query: search.query,
                limit: search.limit,
                include_images: search.images,
            };
            print_json(&service.search(&request).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
