//! Postmirror CLI: build and tail the posts search index.

use clap::Parser;
use postmirror::engine::arg_parser::Cli;
use postmirror::engine::handle_run;
use postmirror::types::FatalError;
use std::time::Instant;

fn main() {
    let start_time = Instant::now();
    // Load .env before parsing so env-backed flags see it.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    if let Err(err) = handle_run(&cli) {
        eprintln!("postmirror: {err:#}");
        let code = err
            .downcast_ref::<FatalError>()
            .map_or(1, FatalError::exit_code);
        std::process::exit(code);
    }
    log::debug!("Total time: {:?}", start_time.elapsed());
}
