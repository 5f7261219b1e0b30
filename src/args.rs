use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "markcrawl")]
#[command(about = "Turn web pages into clean Markdown: scrape, map, crawl, batch and search")]
#[command(version)]
pub struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// WebDriver endpoint (overrides config and WEBDRIVER_URL)
    #[arg(long, global = true)]
    pub webdriver_url: Option<String>,

    /// Maximum number of pages rendered at once
    #[arg(short, long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a single page to Markdown
    Scrape(ScrapeArgs),

    /// List the same-host links of a page
    Map {
        url: String,
    },

    /// Crawl a site breadth-first and convert every page
    Crawl(CrawlArgs),

    /// Convert several pages into a zip archive
    Batch(BatchArgs),

    /// Search the web and combine the top results into one document
    Search(SearchArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ScrapeArgs {
    pub url: String,

    /// CSS selector to wait for before capturing
    #[arg(long)]
    pub wait_for: Option<String>,

    /// CSS selector whose content replaces the whole page
    #[arg(long)]
    pub target: Option<String>,

    /// CSS selector of elements to drop
    #[arg(long)]
    pub remove: Option<String>,

    /// Keep images in the Markdown
    #[arg(long)]
    pub images: bool,

    /// Add an extractive summary
    #[arg(long)]
    pub summarize: bool,

    /// Write a PNG screenshot to this file
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Write a PDF print to this file
    #[arg(long)]
    pub pdf: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct CrawlArgs {
    pub url: String,

    /// Follow links from pages shallower than this (1 to 3)
    #[arg(short = 'd', long, default_value_t = 1)]
    pub max_depth: usize,

    /// Maximum number of pages (max 20)
    #[arg(short = 'p', long, default_value_t = 5)]
    pub max_pages: usize,

    #[arg(long)]
    pub wait_for: Option<String>,

    #[arg(long)]
    pub images: bool,
}

#[derive(ClapArgs, Debug)]
pub struct BatchArgs {
    #[arg(required = true)]
    pub urls: Vec<String>,

    #[arg(long)]
    pub wait_for: Option<String>,

    #[arg(long)]
    pub images: bool,

    /// Where to write the archive
    #[arg(short, long, default_value = "batch_scrape.zip")]
    pub output: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    pub query: String,

    /// Number of results to scrape (max 5)
    #[arg(short, long, default_value_t = 3)]
    pub limit: usize,

    #[arg(long)]
    pub images: bool,
}
