use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use viewdeck::app::AppContext;
use viewdeck::cli::{commands, Cli, Commands};
use viewdeck::proxy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config, cli.db)?;

    match cli.command {
        Commands::Fetch { refresh } => {
            commands::fetch(&ctx, refresh).await?;
        }
        Commands::List {
            filter,
            sort,
            search,
            keyword,
            classify,
            json,
        } => {
            commands::list(&ctx, &filter, &sort, search, keyword, classify, json).await?;
        }
        Commands::Import { path } => {
            commands::import(&ctx, &path)?;
        }
        Commands::Classify => {
            commands::classify(&ctx).await?;
        }
        Commands::History { clear } => {
            commands::history(&ctx, clear)?;
        }
        Commands::Settings {
            theme,
            autoplay,
            ads,
        } => {
            commands::settings(&ctx, theme, autoplay, ads)?;
        }
        Commands::Clear { target } => {
            commands::clear(&ctx, &target)?;
        }
        Commands::Proxy { port } => {
            let addr: SocketAddr = format!(
                "{}:{}",
                ctx.config.proxy.bind,
                port.unwrap_or(ctx.config.proxy.port)
            )
            .parse()?;
            proxy::serve(addr).await?;
        }
        Commands::Tui => {
            viewdeck::tui::run(Arc::new(ctx)).await?;
        }
    }

    Ok(())
}
