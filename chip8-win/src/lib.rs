mod app;
mod config;
mod error;
mod inputmap;
mod render;
mod window;

pub use self::{
    app::Chip8App,
    config::{AppConfig, Color},
    error::{AppError, ErrorKind},
    inputmap::{InputEvent, InputKind, InputMap},
};

pub type EventLoop = winit::event_loop::EventLoop<()>;

/// Named input actions.
pub mod actions {
    pub const PAUSE: &str = "pause";
    pub const EXIT: &str = "exit";
}

/// Open a window and play the ROM until the window is closed.
pub fn play(rom_path: &str, config: AppConfig) -> Result<(), AppError> {
    let mut event_loop = Chip8App::create_event_loop();
    let input_map = InputMap::default_map()?;

    let mut app = Chip8App::new(&event_loop, config, input_map)?;
    app.load_rom(rom_path)?;
    app.run(&mut event_loop)
}
