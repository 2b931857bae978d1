use std::sync::Arc;

use args::{CheckArgs, ServeArgs, SitemapArgs};
use clap::Parser;
use config::{read_config, JsonConfigSource};
use context::SiteDirs;
use data::build_sitemap;
use miette::{miette, IntoDiagnostic, Result};
use notify::SendmailNotifier;
use rendering::ResponseRenderer;
use server::Server;
use tracing::metadata::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::args::Args;

mod args;
mod config;
mod context;
pub mod data;
mod notify;
mod rendering;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = Args::parse();
    init_tracing();

    match args.command {
        args::Command::Serve(serve_args) => serve(serve_args).await,
        args::Command::Check(check_args) => check(check_args).await,
        args::Command::Sitemap(sitemap_args) => sitemap(sitemap_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let dirs = SiteDirs::new(&args.directory);
    let renderer = startup_checks(&dirs).await?;

    let server = Server::new(
        Arc::new(JsonConfigSource::new(dirs.config_path.clone())),
        Arc::new(renderer),
        Arc::new(SendmailNotifier::default()),
    );
    server.serve(args.socket, args.pid_file).await
}

async fn check(args: CheckArgs) -> Result<()> {
    let dirs = SiteDirs::new(&args.directory);
    startup_checks(&dirs).await?;
    tracing::info!("site at {} is valid", args.directory.display());

    Ok(())
}

async fn sitemap(args: SitemapArgs) -> Result<()> {
    let dirs = SiteDirs::new(&args.directory);
    let cfg = read_config(&dirs.config_path).await?;
    let base_url = args.base_url.or_else(|| cfg.base_url.clone()).ok_or_else(|| {
        miette!("no base url configured, pass --base-url or set `base_url` in site.json")
    })?;
    let document = build_sitemap(&cfg.pages, &base_url);

    match args.output {
        Some(path) => tokio::fs::write(path, document).await.into_diagnostic()?,
        None => print!("{document}"),
    }

    Ok(())
}

/// Runs the validation every command performs before touching the site:
/// the configuration must parse and the templates it needs must exist.
async fn startup_checks(dirs: &SiteDirs) -> Result<ResponseRenderer> {
    let cfg = read_config(&dirs.config_path).await?;
    let renderer = ResponseRenderer::new(&dirs.template_dir)?;
    renderer.validate_templates(&cfg)?;

    Ok(renderer)
}

fn init_tracing() {
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_max_level(LevelFilter::TRACE)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .compact()
        .init();
}
