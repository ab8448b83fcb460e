use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ani_strm::sources::PageRenderer;
use ani_strm::{
    Config, DescriptorWriter, FileConfigStore, HttpClient, RunMode, RunSettings, StrmPlugin,
    StrmService, TaskRunner,
};

const DEFAULT_CONFIG_PATH: &str = "ani-strm.toml";

fn cli() -> Command {
    Command::new("ani-strm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate .strm stream descriptors from anime feeds and catalogs")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: probe standard locations)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Run once and exit")
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .value_name("MODE")
                        .value_parser(["incremental", "full", "search"])
                        .default_value("incremental")
                        .help("Listing to draw from"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the run report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("serve").about("Schedule runs until interrupted"))
        .subcommand(Command::new("status").about("Show configuration and descriptor count"))
        .subcommand(
            Command::new("init-config")
                .about("Write a default configuration file")
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .default_value(DEFAULT_CONFIG_PATH),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    config.validate()?;
    Ok(config)
}

fn http_client(config: &Config) -> Result<(Arc<HttpClient>, Option<Arc<dyn PageRenderer>>)> {
    let client = Arc::new(HttpClient::new(
        config.network.user_agent.as_deref(),
        config.network.proxy.as_deref(),
        config.network.timeout_seconds,
    )?);
    let renderer: Option<Arc<dyn PageRenderer>> = if config.network.render_enabled {
        Some(client.clone())
    } else {
        None
    };
    Ok((client, renderer))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let default_filter = if matches.get_flag("verbose") {
        "ani_strm=debug,warn"
    } else {
        "ani_strm=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match matches.subcommand() {
        Some(("init-config", sub)) => {
            let path = sub
                .get_one::<String>("path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            if path.exists() {
                return Err(anyhow!("{} already exists", path.display()));
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }

        Some(("status", _)) => {
            let config = load_config(&matches)?;
            let writer = DescriptorWriter::new(config.plugin.storageplace.clone());
            println!("{}", config.summary());
            println!("Descriptors: {}", writer.count_existing());
        }

        Some(("run", sub)) => {
            let config = load_config(&matches)?;
            let mode: RunMode = sub
                .get_one::<String>("mode")
                .map(String::as_str)
                .unwrap_or("incremental")
                .parse()
                .map_err(|e: String| anyhow!(e))?;

            let (client, renderer) = http_client(&config)?;
            let runner = TaskRunner::new(RunSettings::from_config(&config), client, renderer);

            let start_time = std::time::Instant::now();
            let report = runner.run(mode).await;
            info!("Run completed in {:.2}s", start_time.elapsed().as_secs_f64());

            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} run: {} discovered, {} created, {} skipped, {} failed",
                    report.mode, report.discovered, report.created, report.skipped, report.failed
                );
            }
        }

        Some(("serve", _)) => {
            let config = load_config(&matches)?;
            let store_path = matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            info!("{}", config.summary());

            let (client, renderer) = http_client(&config)?;
            let store = Arc::new(FileConfigStore::new(store_path));
            let mut service = StrmService::new(config, client, renderer, store);

            service.activate().await?;
            info!("Waiting for scheduled runs; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            service.deactivate().await;
            info!("Stopped");
        }

        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}
