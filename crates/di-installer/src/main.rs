mod cli;
mod console;
mod logging;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use di_core::{HttpDownloader, InstallError, InstallOutcome, Installer, TokioProcessRunner};
use di_platform::SearchPath;
use log::{error, info, warn};

use crate::cli::Cli;
use crate::console::TerminalConsole;
use crate::settings::InstallerSettings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (mut settings, settings_error) = match InstallerSettings::load() {
        Ok(settings) => (settings, None),
        Err(settings_error) => (InstallerSettings::default(), Some(settings_error)),
    };
    settings.apply_cli(&cli);

    logging::init_logging(settings.debug_logging, settings.max_log_size_bytes);
    info!("di-installer {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(settings_error) = settings_error {
        warn!("Using default settings: {settings_error}");
        eprintln!("Ignoring installer settings, {settings_error}");
    }

    match run(&cli, &settings).await {
        Ok(outcome) => {
            info!(
                "Installed DI v{} at {} (updated: {}, downloaded: {}, runtime downloaded: {})",
                outcome.version,
                outcome.install_dir.display(),
                outcome.updated,
                outcome.downloaded,
                outcome.runtime_downloaded
            );
            ExitCode::SUCCESS
        }
        Err(install_error) => {
            let kind = install_error.kind();
            error!("Install failed ({kind:?}): {install_error}");
            eprintln!("Failed to install DI, the error was: {install_error}");
            ExitCode::from(kind.exit_code())
        }
    }
}

async fn run(cli: &Cli, settings: &InstallerSettings) -> Result<InstallOutcome, InstallError> {
    let config = settings.installer_config(cli, SearchPath::from_env());
    let downloader = HttpDownloader::new(&settings.http_options())?;

    let installer = Installer::new(
        config,
        Arc::new(TerminalConsole),
        Arc::new(downloader),
        Arc::new(TokioProcessRunner),
    );
    installer.run().await
}
