mod query;
mod run;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Retail price tracking: scrape listings, reconcile the catalog, inspect history")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check database connectivity
    Ping,
    /// Apply pending database migrations
    Migrate,
    /// Upsert platforms and categories from the catalog file
    Seed,
    /// Scrape every configured listing once and reconcile the results
    Run {
        /// Only scrape listings for this platform
        #[arg(long)]
        platform: Option<String>,

        /// Only scrape listings for this category
        #[arg(long)]
        category: Option<String>,

        /// Fetch and extract without writing products
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one product with its price history
    #[command(group(ArgGroup::new("target").required(true).args(["url", "id"])))]
    Product {
        /// Canonical product URL
        #[arg(long)]
        url: Option<String>,

        /// Product id
        #[arg(long)]
        id: Option<i64>,
    },
    /// Search the catalog
    Search {
        /// Case-insensitive substring of the product name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List recent scrape runs, or the listings of one run
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: i64,

        /// Show per-listing results for this run id
        #[arg(long)]
        run: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = pricewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(
        env = %config.env,
        catalog = %config.catalog_path.display(),
        "configuration loaded"
    );

    let cli = Cli::parse();

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Ping => {
            pricewatch_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Migrate => {
            let applied = pricewatch_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed => {
            let catalog = pricewatch_core::load_catalog(&config.catalog_path)?;
            let seeded = pricewatch_db::seed_catalog(&pool, &catalog).await?;
            println!(
                "seeded {} platform(s) and {} category(ies) from {}",
                seeded.platforms,
                seeded.categories,
                config.catalog_path.display()
            );
        }
        Commands::Run {
            platform,
            category,
            dry_run,
            json,
        } => {
            let filter = pricewatch_ingest::RunFilter {
                platform,
                category,
                dry_run,
            };
            run::run_scrape(pool, &config, &filter, json).await?;
        }
        Commands::Product { url, id } => {
            query::show_product(&pool, url.as_deref(), id).await?;
        }
        Commands::Search {
            name,
            platform,
            category,
            limit,
        } => {
            let filter = pricewatch_db::ProductFilter {
                name_contains: name,
                platform,
                category,
                limit,
                offset: 0,
            };
            query::search_products(&pool, &filter).await?;
        }
        Commands::Runs { limit, run } => match run {
            Some(run_id) => query::show_run(&pool, run_id).await?,
            None => query::list_runs(&pool, limit).await?,
        },
    }

    Ok(())
}
