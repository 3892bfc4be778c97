use std::io::{BufRead, Write};
use std::time::Duration;

use clap::Parser;
use katexify_core::{
    BlockId, DEFAULT_WRITE_INTERVAL, DryRunStore, PacedStore, RunReport, StoreError, TreeStore,
    Walker,
};
use katexify_notion::config::DEFAULT_API_BASE;
use katexify_notion::{NotionClient, NotionConfig};
use miette::{IntoDiagnostic, Result};

#[derive(Parser)]
#[command(
    version,
    about = "Katexify - turn $inline$ and $$display$$ math on a Notion page into native equations",
    long_about = None
)]
struct Cli {
    /// Notion integration secret
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Page to process, as an id or a page URL
    #[arg(long, env = "PAGE_ID_TO_PROCESS")]
    page: Option<String>,

    /// Notion API base URL
    #[arg(long, env = "NOTION_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Minimum time between two writes, in milliseconds
    #[arg(
        long,
        env = "KATEXIFY_WRITE_INTERVAL_MS",
        default_value_t = DEFAULT_WRITE_INTERVAL.as_millis() as u64
    )]
    write_interval_ms: u64,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Read the page and log the writes without performing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();

    let config = NotionConfig::new(
        cli.api_key.as_deref().unwrap_or_default(),
        cli.page.as_deref().unwrap_or_default(),
    )?
    .with_api_base(&cli.api_base)?;
    let root = config.root.clone();
    tracing::debug!(?config, "loaded configuration");

    if !cli.yes && !cli.dry_run && !confirm(&root)? {
        println!("Cancelled, nothing was changed.");
        return Ok(());
    }

    let store = PacedStore::new(
        NotionClient::new(config),
        Duration::from_millis(cli.write_interval_ms),
    );
    let report = if cli.dry_run {
        println!("Dry run: no changes will be written.");
        walk(&DryRunStore::new(store), &root).await?
    } else {
        walk(&store, &root).await?
    };

    print_summary(&report);
    if !report.is_clean() {
        return Err(miette::miette!(
            help = "blocks listed above may now appear twice; check them on the page",
            "{} operation(s) failed",
            report.failures.len()
        ));
    }

    Ok(())
}

async fn walk<S: TreeStore + Sync>(
    store: &S,
    root: &BlockId,
) -> std::result::Result<RunReport, StoreError> {
    Walker::new(store).run(root).await
}

fn confirm(root: &BlockId) -> Result<bool> {
    println!("⚠ This rewrites blocks on page {root} in place and cannot be undone.");
    println!("  Blocks with display math are deleted and recreated as several blocks.");
    print!("Continue? [y/N] ");
    std::io::stdout().flush().into_diagnostic()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .into_diagnostic()?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_summary(report: &RunReport) {
    println!("{report}");
    for failure in &report.failures {
        println!("  ✗ {failure}");
    }
    if report.is_clean() {
        println!("✓ Done");
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
