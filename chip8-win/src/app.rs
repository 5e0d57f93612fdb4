use chip8::{prelude::*, Chip8DisplayBuffer, Clock};
use log::info;
use winit::{
    dpi::PhysicalSize,
    event::{Event as EV, WindowEvent as WE},
    event_loop::EventLoopBuilder,
    platform::run_return::EventLoopExtRunReturn,
};

use crate::{
    actions::*,
    config::AppConfig,
    error::AppError,
    inputmap::InputKind,
    render::Render,
    window::WindowContext,
    EventLoop, InputMap,
};

/// Chip8 Application
pub struct Chip8App {
    // Renderer must be dropped while the GL context is still alive.
    render: Render,
    window: WindowContext,
    vm: Chip8Vm,
    input_map: InputMap,
    clock: Clock,
    config: AppConfig,
}

/// Output devices of the window frontend.
///
/// Drawing is deferred to the `RedrawRequested` event, so this
/// only records that the window needs to be redrawn.
#[derive(Default)]
struct WindowDevices {
    redraw: bool,
}

impl Devices for WindowDevices {
    fn draw(&mut self, _display: Chip8DisplayBuffer) {
        self.redraw = true;
    }

    fn buzz(&mut self, state: bool) {
        if state {
            info!("buzzer on");
        } else {
            info!("buzzer off");
        }
    }
}

impl Chip8App {
    /// Create the Chip8 window app.
    pub fn new(event_loop: &EventLoop, config: AppConfig, input_map: InputMap) -> Result<Self, AppError> {
        let (width, height) = config.window_size();
        let window = WindowContext::new(event_loop, "chip8", PhysicalSize::new(width, height))?;

        let mut render = Render::new(window.gl.clone())?;
        info!("created OpenGL renderer:\n{}", render.opengl_info());
        let size = window.inner_size();
        render.resize(size.width, size.height);

        let vm = Chip8Vm::new(config.vm.clone());
        info!(
            "instruction rate {}Hz, {} per frame",
            vm.config().instr_rate.0,
            vm.instrs_per_frame()
        );

        Ok(Self {
            render,
            window,
            vm,
            input_map,
            clock: Clock::default(),
            config,
        })
    }

    pub fn create_event_loop() -> EventLoop {
        EventLoopBuilder::new().build()
    }

    /// Load ROM file into VM
    pub fn load_rom(&mut self, filepath: &str) -> Result<(), AppError> {
        info!("load rom: {filepath}");
        self.vm.load_file(filepath)?;
        self.clock.reset();
        Ok(())
    }

    /// Apply queued input to the machine.
    ///
    /// Returns `true` when the user asked to exit.
    fn apply_input(&mut self) -> bool {
        let mut exit = false;

        for event in self.input_map.drain_events() {
            match event.kind {
                InputKind::Chip8(keycode) => self.vm.set_key(keycode, event.is_pressed()),
                InputKind::Action(name) if event.is_pressed() => match name.as_str() {
                    PAUSE => {
                        self.vm.toggle_pause();
                        info!("{:?}", self.vm.state());
                    }
                    EXIT => exit = true,
                    _ => log::debug!("unhandled action: {name}"),
                },
                InputKind::Action(_) => {}
            }
        }

        exit
    }

    fn redraw(&mut self) -> Result<(), AppError> {
        self.window.make_context_current()?;
        self.render.clear_window(self.config.background);
        self.render.draw_display(
            self.vm.display_buffer(),
            self.config.foreground,
            self.config.background,
        );
        self.window.swap_buffers()?;
        Ok(())
    }
}

/// Event Loop.
impl Chip8App {
    /// Run the machine until the window is closed, or it stops with an error.
    pub fn run(&mut self, event_loop: &mut EventLoop) -> Result<(), AppError> {
        let main_window_id = self.window.window_id();
        let mut result = Ok(());

        self.clock.reset();

        event_loop.run_return(|event, _, control_flow| {
            match event {
                EV::MainEventsCleared => {
                    // Quit is only observed between frames.
                    if self.apply_input() {
                        info!("exit");
                        control_flow.set_exit();
                        return;
                    }

                    if self.clock.tick() {
                        let mut devices = WindowDevices::default();

                        if let Err(err) = self.vm.frame(&mut devices) {
                            log::error!("{err}");
                            log::debug!("{}", self.vm.dump_registers().unwrap_or_default());
                            result = Err(err.into());
                            control_flow.set_exit();
                            return;
                        }

                        if devices.redraw {
                            self.window.request_redraw();
                        }
                    }

                    control_flow.set_wait_until(self.clock.deadline());
                }
                EV::RedrawRequested(window_id) if window_id == main_window_id => {
                    if let Err(err) = self.redraw() {
                        log::error!("redraw failed: {err}");
                    }
                }
                EV::WindowEvent { window_id, event } if window_id == main_window_id => {
                    match event {
                        WE::Resized(size) => {
                            // Some platforms like EGL require resizing GL surface to update the size.
                            self.window.resize_surface(size);
                            self.render.resize(size.width, size.height);
                        }
                        WE::KeyboardInput { input, .. } => {
                            if let Some(virtual_keycode) = input.virtual_keycode {
                                self.input_map.push_key(virtual_keycode, input.state);
                            }
                        }
                        WE::Focused(false) => {
                            // Key releases are lost while unfocused.
                            self.input_map.clear_state();
                            self.vm.clear_keys();
                        }
                        WE::CloseRequested => {
                            control_flow.set_exit();
                        }
                        _ => { /* blank */ }
                    }
                }
                _ => { /* blank */ }
            }
        });

        result
    }
}
