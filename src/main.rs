use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{debug, info};

use linkpulse::config::{StaticConfig, init_config_with};
use linkpulse::runtime::LinkPulse;
use linkpulse::services::CreateLinkRequest;
use linkpulse::storage::{StatsScope, StorageFactory, UserId};
use linkpulse::system::logging::init_logging;

mod cli;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 生成配置不需要加载配置
    if let Commands::Config {
        action: ConfigCommands::Generate { output, force },
    } = &cli.command
    {
        return generate_config(output.as_deref(), *force);
    }

    let config = init_config_with(StaticConfig::load_from(&cli.config));
    let _guard = init_logging(&config.logging).context("Failed to initialize logging")?;
    debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Migrate => {
            StorageFactory::create(&config.database.database_url, config.database.pool_size)
                .await
                .context("Failed to apply migrations")?;
            println!("Migrations applied to {}", config.database.database_url);
        }
        command => {
            let app = LinkPulse::connect(&config)
                .await
                .context("Failed to initialize storage or cache")?;
            let outcome = run_command(&app, command).await;
            app.shutdown().await;
            outcome?;
        }
    }

    Ok(())
}

async fn run_command(app: &LinkPulse, command: Commands) -> Result<()> {
    let ctx = app.request("127.0.0.1", "linkpulse-cli");

    match command {
        Commands::Resolve { short_code, record } => {
            let link = if record {
                app.resolve_and_record(&ctx, &short_code).await
            } else {
                app.resolve(&ctx, &short_code).await
            }
            .with_context(|| format!("Failed to resolve '{}'", short_code))?;
            println!("{} -> {} ({})", link.short_code, link.original_url, link.status);
        }
        Commands::Create { url, code, user } => {
            let req = CreateLinkRequest {
                original_url: url,
                short_code: code,
            };
            let link = app
                .links()
                .create_link(user.map(UserId), req)
                .await
                .context("Failed to create link")?;
            info!("Created link {} via CLI", link.short_code);
            println!("{} -> {}", link.short_code, link.original_url);
        }
        Commands::Stats { user, fresh } => {
            let scope = StatsScope::from(user.map(UserId));
            let stats = if fresh {
                app.stats_aggregator()
                    .compute(scope, chrono::Utc::now())
                    .await
            } else {
                app.stats(&ctx, scope).await
            }
            .context("Failed to load stats")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Migrate | Commands::Config { .. } => {}
    }

    Ok(())
}

fn generate_config(output: Option<&str>, force: bool) -> Result<()> {
    let Some(path) = output else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if Path::new(path).exists() && !force {
        bail!("'{}' already exists; use --force to overwrite", path);
    }
    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow!("Failed to write {}: {}", path, e))?;
    println!("Sample configuration written to {}", path);
    Ok(())
}
