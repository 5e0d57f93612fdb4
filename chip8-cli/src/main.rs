//! Entrypoint for CLI
use std::{env, fs, process::exit, time::Instant};

use chip8::{prelude::*, Chip8DisplayBuffer, Clock, IMPL_VERSION};
use chip8_win::AppConfig;
use log::{error, info};

static USAGE: &str = r#"
usage: chip8 CMD [ARGS]

commands:
    run ROM [--frames N] [--rate HZ] [--seed N] [--realtime]
            Run the target ROM file without a window, and print the display
    dis ROM
            Disassemble the target ROM into readable assembly
    play ROM [CONFIG]
            Open a window and play the target ROM

examples:
    chip8 run maze --frames 120
    chip8 dis breakout.rom
    chip8 play breakout.rom chip8-win/config/app.yaml
"#;

/// Frames to run when `--frames` is not given; ten seconds of machine time.
const DEFAULT_FRAMES: u64 = 600;

/// Output devices for headless runs.
#[derive(Default)]
struct HeadlessDevices {
    draws: u64,
}

impl Devices for HeadlessDevices {
    fn draw(&mut self, _display: Chip8DisplayBuffer) {
        self.draws += 1;
    }

    fn buzz(&mut self, state: bool) {
        info!("buzzer {}", if state { "on" } else { "off" });
    }
}

fn run_bytecode(opts: RunOpts) -> Chip8Result<()> {
    info!("running {}", opts.filepath);

    let mut conf = Chip8Conf::default();
    if let Some(rate) = opts.rate {
        conf.instr_rate = rate;
    }
    conf.seed = opts.seed;

    let mut vm = Chip8Vm::new(conf);
    vm.load_file(&opts.filepath)?;

    let mut devices = HeadlessDevices::default();
    let mut clock = Clock::default();

    let start = Instant::now();
    let mut result = Ok(());
    for _ in 0..opts.frames {
        if opts.realtime {
            clock.wait();
        }
        if let Err(err) = vm.frame(&mut devices) {
            result = Err(err);
            break;
        }
    }
    let end = Instant::now();

    println!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);
    println!("{}", vm.dump_registers()?);

    result
}

fn run_disassembler(filepath: &str) -> Chip8Result<()> {
    let bytecode = fs::read(filepath)?;
    Disassembler::new(bytecode.as_slice()).print_bytecode()?;
    Ok(())
}

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("failed to initialise logging: {err}");
    }

    let result = match parse_args() {
        Some(Cmd::Run(opts)) => run_bytecode(opts),
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath),
        Some(Cmd::Play {
            filepath,
            config_path,
        }) => {
            let config = match config_path {
                Some(path) => AppConfig::from_file(path),
                None => Ok(AppConfig::default()),
            };
            if let Err(err) = config.and_then(|config| chip8_win::play(&filepath, config)) {
                error!("{err}");
                exit(1);
            }
            Ok(())
        }
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        exit(1);
    }
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => parse_run(args).map(Cmd::Run),
        "dis" => Some(Cmd::Dis {
            filepath: args.next()?,
        }),
        "play" => Some(Cmd::Play {
            filepath: args.next()?,
            config_path: args.next(),
        }),
        _ => None,
    }
}

fn parse_run(mut args: impl Iterator<Item = String>) -> Option<RunOpts> {
    let mut opts = RunOpts {
        filepath: args.next()?,
        frames: DEFAULT_FRAMES,
        rate: None,
        seed: None,
        realtime: false,
    };

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--frames" => opts.frames = consume_number(&mut args)?,
            "--rate" => opts.rate = Some(Hz(consume_number(&mut args)?)),
            "--seed" => opts.seed = Some(consume_number(&mut args)?),
            "--realtime" => opts.realtime = true,
            _ => {
                eprintln!("unknown option: {flag}");
                return None;
            }
        }
    }

    Some(opts)
}

/// Consumes the next argument as a number.
fn consume_number(args: &mut impl Iterator<Item = String>) -> Option<u64> {
    let arg = args.next()?;
    match arg.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            eprintln!("expected a number, found: {arg}");
            None
        }
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run headless
    Run(RunOpts),
    /// Disassemble
    Dis { filepath: String },
    /// Run in a window
    Play {
        filepath: String,
        config_path: Option<String>,
    },
}

struct RunOpts {
    filepath: String,
    frames: u64,
    rate: Option<Hz>,
    seed: Option<u64>,
    realtime: bool,
}
