use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::sync::Mutex;

use notas::{
    print_reminder, App, Cli, Config, FileBlobStore, LocalReminderScheduler, Notebook, Result,
};

/// Filter used when `RUST_LOG` is not set
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

pub fn initialize_logger(verbose: bool) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(verbose)),
    )
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    config.validate()?;

    let scheduler = Arc::new(LocalReminderScheduler::new(Arc::new(print_reminder))?);
    let notebook = Notebook::open(
        Box::new(FileBlobStore::new(config.data_dir.clone())),
        config.storage_key.clone(),
        scheduler.clone(),
    );

    let app = App::new(
        Arc::new(Mutex::new(notebook)),
        scheduler,
        config,
        cli.config,
        cli.verbose,
    );
    app.run(cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("Application shutting down");
}
