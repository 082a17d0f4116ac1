use clap::Parser;
use color_eyre::Result;
use spicy_todo::{
    cli::{self, Cli, Output},
    logging, store, utils, Config, Profile,
};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // An explicit --config path wins over the profile's default location
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(&utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };
    config.apply_env_overrides();

    logging::init_logging(&config.log_level, config.log_format)?;

    // The backend is chosen here, once, and handed to every command
    let store = store::open_store(config.database_url.as_deref())?;

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let mut output = Output {
        out: &mut lock,
        json: cli.json,
    };

    let command = cli.command.unwrap_or_default();
    match cli::run(command, store.as_ref(), &config, &mut output) {
        Ok(()) => Ok(()),
        Err(err) if err.is_client_error() => {
            let code = err.exit_code();
            drop(output);
            drop(lock);
            // Close the store before exiting; process::exit skips destructors
            drop(store);
            eprintln!("Error: {}", err);
            std::process::exit(code);
        }
        Err(err) => Err(err.into()),
    }
}
