use std::process::ExitCode;

mod cli;
pub mod config;
pub mod error;
pub mod identifier;
pub mod pbxproj;
pub mod project;
mod utils;

pub fn cli_main() -> ExitCode {
    match cli::Cli::execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<error::Error>())
        .map_or(2, error::Error::exit_code)
}
