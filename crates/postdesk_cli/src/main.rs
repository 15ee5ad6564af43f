//! CLI smoke entry point.
//!
//! Usage: `postdesk_cli [config.json]`
//!
//! Loads configuration, opens the post store and prints a short summary.

use log::error;
use postdesk_core::{open_db_with, CoreConfig, PostService, SqlitePostRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("postdesk_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_file(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    config.init_logging()?;

    let conn = open_db_with(&config).map_err(|err| err.to_string())?;
    let repo = SqlitePostRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = PostService::new(repo);
    let posts = service.get_list().map_err(|err| err.to_string())?;

    println!("postdesk_core ping={}", postdesk_core::ping());
    println!("postdesk_core version={}", postdesk_core::core_version());
    println!("postdesk_core posts={}", posts.len());
    Ok(())
}
