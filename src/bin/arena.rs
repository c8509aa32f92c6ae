use arenabox::cli::{self, Cli};
use arenabox::config::types::ArenaError;
use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = match cli::run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            e.downcast_ref::<ArenaError>()
                .map(ArenaError::exit_code)
                .unwrap_or(1)
        }
    };
    std::process::exit(code);
}
