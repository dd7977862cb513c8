use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trailbuster::app::AppContext;
use trailbuster::cli::{commands, Cli, Commands};
use trailbuster::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "trailbuster=debug" } else { "trailbuster=info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(dir) = cli.output_dir.clone() {
        config.crawler.output_dir = dir;
    }

    let mut ctx = AppContext::new(config)?;
    let command = cli.command.unwrap_or_default();

    if !command.needs_login() {
        match command {
            Commands::Stats => commands::print_stats(&ctx),
            Commands::ClearSession => commands::clear_session(&ctx)?,
            Commands::Parse { file, url, module } => {
                commands::parse_file(&ctx, &file, &url, module).await?;
            }
            _ => {}
        }
        return Ok(());
    }

    let email = cli
        .email
        .context("No login email: pass --email or set SALESFORCE_EMAIL")?;
    let auth = ctx.authenticate(&email, !cli.no_session).await?;

    let result = match command {
        Commands::Module { url } => commands::crawl_module(&mut ctx, &auth.session, &url).await,
        Commands::Trail { url } => commands::crawl_trail(&mut ctx, &auth.session, &url).await,
        Commands::Batch { file } => commands::crawl_batch(&mut ctx, &auth.session, &file).await,
        _ => Ok(()),
    };

    auth.close().await;
    result?;
    Ok(())
}
