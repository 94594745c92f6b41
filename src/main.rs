//! Abacus Counter binary
//!
//! Watches a live counter in the terminal or serves it over HTTP.

use abacus_counter::{
    start_web_server, IntervalPolicy,
    web::spawn_dashboard_updater,
    AppState, Callbacks, Category, DashboardState, Poller, PollerEvent, SampleSource,
    SimulatedCounters, WebConfig, DEFAULT_WEB_PORT,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "abacus_counter")]
#[command(about = "🧮 Abacus Counter - live world counters on an abacus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls world population or national debt on a progressive schedule and shows it on an abacus")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Counter to follow: population or debt
    #[arg(short, long, default_value = "population")]
    category: Category,

    /// Probability in [0, 1] that a simulated request fails
    #[arg(long, default_value_t = 0.0)]
    failure_rate: f64,

    /// Simulated request latency in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw the abacus in the terminal on every update (default)
    Watch(WatchArgs),

    /// Serve the dashboard state over HTTP
    Serve(ServeArgs),

    /// Fetch a single sample and exit
    Sample(SampleArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// Switch between population and debt every N seconds
    #[arg(long)]
    toggle_every: Option<u64>,
}

#[derive(Args)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// JSON file with a custom refetch schedule
    #[arg(long)]
    schedule: Option<PathBuf>,
}

#[derive(Args)]
struct SampleArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Watch(args)) => watch_command(&cli, args).await?,
        Some(Commands::Serve(args)) => serve_command(&cli, args).await?,
        Some(Commands::Sample(args)) => sample_command(&cli, args).await?,
        None => watch_command(&cli, &WatchArgs { toggle_every: None }).await?,
    }

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives win; without them the flag-derived level applies.
fn log_filter(level: Level, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), &directives))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn build_source(cli: &Cli) -> Arc<SimulatedCounters> {
    Arc::new(
        SimulatedCounters::new()
            .with_failure_probability(cli.failure_rate)
            .with_latency(Duration::from_millis(cli.latency_ms)),
    )
}

async fn watch_command(cli: &Cli, args: &WatchArgs) -> anyhow::Result<()> {
    let (callbacks, mut events) = Callbacks::channel();
    let poller = Poller::new(build_source(cli), callbacks);
    let mut dashboard = DashboardState::new(cli.category);

    println!("🧮 Following {} (Ctrl+C to quit)", cli.category.label());
    poller.start(cli.category);

    let toggle_period = args.toggle_every.map(Duration::from_secs);
    let mut next_toggle = toggle_period.map(|period| Instant::now() + period);

    loop {
        let toggle_at = next_toggle;
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                dashboard.apply(&event, Instant::now());
                if matches!(event, PollerEvent::Data(_)) {
                    print_dashboard(&dashboard);
                } else if let PollerEvent::Error(failure) = &event {
                    error!("{}", failure);
                }
            }
            _ = async {
                match toggle_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            } => {
                let category = dashboard.category().toggled();
                dashboard.set_category(category);
                poller.set_category(category);
                println!("↔ Switched to {}", category.label());
                next_toggle = toggle_period.map(|period| Instant::now() + period);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping poller");
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    info!("Starting abacus counter server...");

    let mut web_config = WebConfig::new(&args.host, args.port).with_cors(!args.no_cors);
    if let Some(path) = &args.schedule {
        web_config = web_config.with_schedule(load_schedule(path)?);
    }
    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Schedule tiers: {}", web_config.schedule.tiers.len());

    let (callbacks, events) = Callbacks::channel();
    let poller = Arc::new(Poller::with_policy(
        build_source(cli),
        callbacks,
        web_config.schedule.clone(),
    )?);
    let dashboard = Arc::new(RwLock::new(DashboardState::new(cli.category)));
    let _updater = spawn_dashboard_updater(events, dashboard.clone());

    let state = AppState::new(poller, dashboard);
    state.poller.start(cli.category);
    info!("Polling {} started", cli.category);

    start_web_server(web_config, state).await?;
    Ok(())
}

fn load_schedule(path: &Path) -> anyhow::Result<IntervalPolicy> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule {}", path.display()))?;
    let policy: IntervalPolicy = serde_json::from_str(&json)
        .with_context(|| format!("Invalid schedule in {}", path.display()))?;
    policy.validate()?;
    Ok(policy)
}

async fn sample_command(cli: &Cli, args: &SampleArgs) -> anyhow::Result<()> {
    let source = build_source(cli);
    let value = source.get_sample(cli.category).await?;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::json!({
                "category": cli.category,
                "value": value,
                "counters": source.world_counters(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        "pretty" => {
            let mut dashboard = DashboardState::new(cli.category);
            dashboard.apply(&PollerEvent::Data(value), Instant::now());
            print_dashboard(&dashboard);
        }
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

fn print_dashboard(dashboard: &DashboardState) {
    let view = dashboard.view();
    println!();
    println!("🧮 {}", view.label);
    if let Some(value) = view.value {
        println!("   Current count: {:.0}", value);
    }
    if let Some(rate) = view.rate_per_second {
        println!("   Change: {:+.2}/s", rate);
    }
    println!("   Status: {}", view.status);
    print!("{}", view.abacus.render_text());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "abacus_counter",
            "--category",
            "debt",
            "serve",
            "--port",
            "9090",
        ])
        .unwrap();
        assert_eq!(cli.category, Category::Debt);
        match cli.command {
            Some(Commands::Serve(args)) => assert_eq!(args.port, 9090),
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_logging_flags_set_level() {
        let cases = [
            (vec!["abacus_counter"], LevelFilter::WARN),
            (vec!["abacus_counter", "--verbose"], LevelFilter::INFO),
            (vec!["abacus_counter", "--debug"], LevelFilter::DEBUG),
            (vec!["abacus_counter", "-v", "-d"], LevelFilter::DEBUG),
        ];
        for (args, expected) in cases {
            let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
            let filter = log_filter(log_level(&cli), "");
            assert_eq!(filter.max_level_hint(), Some(expected), "args {:?}", args);
        }
    }

    #[test]
    fn test_env_directives_override_flags() {
        let cli = Cli::try_parse_from(["abacus_counter", "--verbose"]).unwrap();
        let filter = log_filter(log_level(&cli), "error");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_serve_schedule_flag() {
        let cli =
            Cli::try_parse_from(["abacus_counter", "serve", "--schedule", "tiers.json"]).unwrap();
        match cli.command {
            Some(Commands::Serve(args)) => {
                assert_eq!(args.schedule, Some(PathBuf::from("tiers.json")));
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_load_schedule_rejects_zero_interval() {
        let path =
            std::env::temp_dir().join(format!("abacus-schedule-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"tiers":[],"otherwise":0}"#).unwrap();
        let result = load_schedule(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["abacus_counter"]).unwrap();
        assert_eq!(cli.category, Category::Population);
        assert_eq!(cli.failure_rate, 0.0);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["abacus_counter", "--category", "gdp"]).is_err());
    }
}
