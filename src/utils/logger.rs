use chrono::Local;
use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Colored, timestamped logging. A long-running tailer logs across hours,
/// so every line carries a clock; dependency noise is capped at warnings.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            let clock = Local::now().format("%H:%M:%S");
            let line = match record.level() {
                Level::Warn => format!("[{name} {clock} {}] {}", "WARN".yellow(), record.args()),
                Level::Error => {
                    let target = record.target().to_string().white();
                    format!(
                        "[{name} {clock} {} {target}] {}",
                        "ERROR".red(),
                        record.args()
                    )
                }
                _ => format!("[{name} {clock}] {}", record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init()
        .ok();
}
