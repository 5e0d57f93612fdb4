use std::process::exit;

#[macro_use]
extern crate slog;
use chip8_win::AppConfig;
use log::{error, info};
use slog::Drain;

static USAGE: &str = "Usage: chip8-win ROM [CONFIG]";

fn main() {
    let decorator = slog_term::PlainDecorator::new(std::io::stdout());
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!("version" => chip8::IMPL_VERSION));

    let _scope_guard = slog_scope::set_global_logger(logger);
    if let Err(err) = slog_stdlog::init_with_level(log::Level::Debug) {
        eprintln!("failed to initialise logging: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (rom_path, config_path) = match args.as_slice() {
        [rom] => (rom, None),
        [rom, config] => (rom, Some(config)),
        _ => {
            eprintln!("{USAGE}");
            exit(64);
        }
    };

    let config = match config_path {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                exit(1);
            }
        },
        None => AppConfig::default(),
    };

    info!("starting...");
    if let Err(err) = chip8_win::play(rom_path, config) {
        error!("{err}");
        exit(1);
    }

    info!("done");
}
