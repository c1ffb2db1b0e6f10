mod config;
mod fetch;
mod pool;
mod utils;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::RunnerConfig;
use fetch::PageClient;
use pool::BatchPool;
use std::sync::Arc;
use std::time::Duration;
use talentscope_core::{AdvisorError, ConcurrencyAdvisor, ConcurrencyRequest, TaskClass};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Load configuration
    let config_path = matches
        .get_one::<String>("config")
        .context("missing --config value")?;
    let config = RunnerConfig::load(config_path)?;

    let _log_guard = utils::logging::init(&config)?;

    // The advisor samples telemetry at startup, keep it off the async threads
    let advisor = Arc::new(tokio::task::spawn_blocking(ConcurrencyAdvisor::system).await?);

    match matches.subcommand() {
        Some(("status", _)) => status(&advisor).await,
        Some(("advise", args)) => advise(&advisor, &config, args).await,
        Some(("advise-candidates", args)) => advise_candidates(&advisor, args).await,
        Some(("fetch", args)) => fetch_urls(&advisor, &config, args).await,
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn cli() -> Command {
    Command::new("talentscope")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Adaptive worker pool sizing for talentscope crawl and extraction pipelines")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("talentscope.toml")
                .global(true),
        )
        .subcommand(Command::new("status").about("Print host load and registered worker pools as JSON"))
        .subcommand(
            Command::new("advise")
                .about("Recommend a worker count for a batch")
                .arg(
                    Arg::new("tasks")
                        .short('t')
                        .long("tasks")
                        .value_name("NUMBER")
                        .help("Number of tasks in the batch")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("class")
                        .long("class")
                        .value_name("CLASS")
                        .help("io_bound, cpu_bound, mixed or lightweight")
                        .default_value("mixed"),
                )
                .arg(
                    Arg::new("memory-mb")
                        .long("memory-mb")
                        .value_name("MB")
                        .help("Peak memory of one in-flight task")
                        .default_value("500")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("no-prefer-speed")
                        .long("no-prefer-speed")
                        .help("Scale up less aggressively on an idle host")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("advise-candidates")
                .about("Recommend a worker count for candidate evaluation")
                .arg(
                    Arg::new("candidates")
                        .long("candidates")
                        .value_name("NUMBER")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("required")
                        .long("required")
                        .value_name("NUMBER")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("no-homepage")
                        .long("no-homepage")
                        .help("Candidates are evaluated without crawling a homepage")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch a list of URLs with an advisor-sized worker pool")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Newline separated URLs")
                        .required(true),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("NUMBER")
                        .help("Override the recommended worker count")
                        .value_parser(value_parser!(usize)),
                ),
        )
}

/// Runs a sizing call on the blocking pool; it waits on a CPU sample.
async fn recommend<F>(advisor: &Arc<ConcurrencyAdvisor>, sizing: F) -> Result<usize>
where
    F: FnOnce(&ConcurrencyAdvisor) -> Result<usize, AdvisorError> + Send + 'static,
{
    let advisor = advisor.clone();
    let workers = tokio::task::spawn_blocking(move || sizing(&advisor)).await??;
    Ok(workers)
}

async fn status(advisor: &Arc<ConcurrencyAdvisor>) -> Result<()> {
    let advisor = advisor.clone();
    let status = tokio::task::spawn_blocking(move || advisor.get_system_status()).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn advise(advisor: &Arc<ConcurrencyAdvisor>, config: &RunnerConfig, args: &ArgMatches) -> Result<()> {
    let task_count = *args.get_one::<usize>("tasks").context("missing --tasks")?;
    let task_class: TaskClass = args
        .get_one::<String>("class")
        .context("missing --class")?
        .parse()?;
    let memory_mb = *args.get_one::<f64>("memory-mb").context("missing --memory-mb")?;
    let prefer_speed = config.prefer_speed && !args.get_flag("no-prefer-speed");

    let request = ConcurrencyRequest::new(task_count, task_class)
        .with_prefer_speed(prefer_speed)
        .with_memory_per_task_mb(memory_mb);
    let workers = recommend(advisor, move |advisor| advisor.get_optimal_workers(&request)).await?;

    println!("{}", workers);
    Ok(())
}

async fn advise_candidates(advisor: &Arc<ConcurrencyAdvisor>, args: &ArgMatches) -> Result<()> {
    let candidates = *args.get_one::<usize>("candidates").context("missing --candidates")?;
    let required = *args.get_one::<usize>("required").context("missing --required")?;
    let has_homepage = !args.get_flag("no-homepage");

    let workers = recommend(advisor, move |advisor| {
        advisor.get_candidate_processing_workers(candidates, required, has_homepage)
    })
    .await?;

    println!("{}", workers);
    Ok(())
}

async fn fetch_urls(advisor: &Arc<ConcurrencyAdvisor>, config: &RunnerConfig, args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<String>("file").context("missing URL file")?;
    let urls = fetch::load_url_list(path)?;
    if urls.is_empty() {
        warn!("No URLs to fetch in {}", path);
        return Ok(());
    }

    let workers = match args.get_one::<usize>("workers") {
        Some(&workers) => workers,
        None => {
            let url_count = urls.len();
            recommend(advisor, move |advisor| advisor.get_extraction_workers(url_count)).await?
        }
    };

    let client = PageClient::new(Duration::from_secs(config.request_timeout_secs), &config.user_agent)?;
    let pool = BatchPool::new(advisor.clone(), TaskClass::IoBound, workers)
        .with_stats_interval(Duration::from_secs(config.stats_interval_secs));
    info!("Fetching {} URLs with {} workers on {} CPUs", urls.len(), pool.size(), advisor.cpu_count());

    let outcome = pool
        .run(urls.clone(), move |url| {
            let client = client.clone();
            async move { client.fetch(&url).await }
        })
        .await?;

    for (url, result) in urls.iter().zip(&outcome.outputs) {
        match result {
            Ok(page) => println!("OK   {} {} {} bytes in {:.2?}", page.status, page.url, page.bytes, page.elapsed),
            Err(e) => println!("FAIL {} ({})", url, e),
        }
    }

    let stats = &outcome.stats;
    println!(
        "Fetched {}/{} URLs in {:.2?} ({:.1} pages/s)",
        stats.completed() - stats.failed(),
        stats.total,
        stats.elapsed(),
        stats.overall_throughput()
    );
    Ok(())
}
