use clap::Parser;
use habit_app::{app::run, cli::Cli, config::AppConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()
        .unwrap_or_default()
        .with_data_dir(cli.data_dir);
    if let Err(err) = run(config, cli.command).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
