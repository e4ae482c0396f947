use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "di-installer")]
#[command(version)]
#[command(about = "Install or update DiscordInjections", long_about = None)]
pub struct Cli {
    /// Install to this directory instead of asking
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Accept the default install directory without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Print debug logs to the terminal
    #[arg(long)]
    pub debug: bool,

    /// Node.js version to download when none is installed
    #[arg(long, value_name = "VERSION")]
    pub runtime_version: Option<String>,

    /// Base URL of the Node.js distribution mirror
    #[arg(long, value_name = "URL")]
    pub node_mirror: Option<String>,
}
