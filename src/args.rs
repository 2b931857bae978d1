use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[clap(infer_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Runs the fastcgi worker
    Serve(ServeArgs),

    /// Validates the site configuration and templates
    Check(CheckArgs),

    /// Prints the sitemap document
    Sitemap(SitemapArgs),
}

#[derive(Clone, Debug, Parser)]
pub struct ServeArgs {
    /// site directory containing site.json and templates
    #[clap(default_value = ".")]
    pub directory: PathBuf,

    /// unix socket to listen on instead of the inherited one
    #[clap(long)]
    pub socket: Option<PathBuf>,

    /// file the worker pid is written to
    #[clap(long)]
    pub pid_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Parser)]
pub struct CheckArgs {
    /// site directory containing site.json and templates
    #[clap(default_value = ".")]
    pub directory: PathBuf,
}

#[derive(Clone, Debug, Parser)]
pub struct SitemapArgs {
    /// site directory containing site.json and templates
    #[clap(default_value = ".")]
    pub directory: PathBuf,

    /// base url prefixed to every entry, overrides the configured one
    #[clap(long)]
    pub base_url: Option<String>,

    /// file to write the document to instead of stdout
    #[clap(long)]
    pub output: Option<PathBuf>,
}
