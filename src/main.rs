mod cli;

use cli::{Cli, Commands, init_config, list_actions, load_config, run_decode, run_encode, run_export};

use clap::{CommandFactory, Parser};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = &cli.config;

    if cli.init {
        return init_config(config_path);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Decode { file, pretty } => {
            let config = load_config(config_path)?;
            println!("{}", run_decode(file.as_deref(), &config.cdn_prefix, pretty)?);
        }
        Commands::Encode { action, text, json } => {
            println!("{}", run_encode(&action, text.as_deref(), json.as_deref())?);
        }
        Commands::Actions => println!("{}", list_actions()),
        Commands::Export { socket, pretty } => {
            let config = load_config(config_path)?;
            println!("{}", run_export(&socket, config, pretty).await?);
        }
    }

    Ok(())
}
