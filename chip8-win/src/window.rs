use std::num::NonZeroU32;
use std::rc::Rc;

use glutin::config::Config as GlutinConfig;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::GlProfile;
use glutin::context::{ContextApi, ContextAttributesBuilder, Version as GlVersion};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::GlSurface;
use glutin::surface::SwapInterval;
use glutin::surface::WindowSurface;
use glutin_winit::GlWindow;
use raw_window_handle::HasRawWindowHandle;
use winit::dpi::PhysicalSize;
use winit::window::WindowBuilder;

use crate::{error::AppError, EventLoop};

pub struct WindowContext {
    pub(crate) window: winit::window::Window,
    pub(crate) gl_context: glutin::context::PossiblyCurrentContext,
    pub(crate) gl_surface: glutin::surface::Surface<WindowSurface>,
    pub(crate) gl: Rc<glow::Context>,
}

impl WindowContext {
    /// Create a Window with an OpenGL context.
    ///
    /// - For Windows, the main window must be created first, for the OpenGL
    ///   context to be created.
    /// - For Android, the OpenGL context is created before the window exists.
    pub fn new(event_loop: &EventLoop, title: &str, inner_size: PhysicalSize<u32>) -> Result<Self, AppError> {
        // --------------------------------------------------------------------
        // Window

        let window_builder = WindowBuilder::new()
            .with_resizable(true)
            .with_inner_size(inner_size)
            .with_title(title);

        // The template will match only the configurations supporting rendering
        // to windows.
        let template = ConfigTemplateBuilder::new().prefer_hardware_accelerated(Some(true));

        // Helper crate handles the cross-platform complexity of setting up an OpenGL context.
        let (window, gl_config) = glutin_winit::DisplayBuilder::new()
            .with_preference(glutin_winit::ApiPrefence::FallbackEgl)
            .with_window_builder(Some(window_builder.clone()))
            .build(event_loop, template, |configs| {
                // Pick the config with the maximum number of samples.
                configs
                    .inspect(|c| log::debug!("consider config: num_samples={}", c.num_samples()))
                    .reduce(|best: GlutinConfig, c| {
                        if c.num_samples() > best.num_samples() {
                            c
                        } else {
                            best
                        }
                    })
                    .expect("the system must supply at least one GL config")
            })
            .map_err(AppError::gl)?;

        log::info!("picked GL config with {} samples", gl_config.num_samples());

        // On Android, the window is not available when the OpenGL display has to be created.
        // However on Windows the main window must first exist before OpenGL can be initialized.
        let window = match window {
            Some(window) => window,
            None => {
                log::info!("creating window with finalize_window");
                glutin_winit::finalize_window(event_loop, window_builder, &gl_config)?
            }
        };

        // --------------------------------------------------------------------
        // OpenGL Context

        // Raw handle is required to build the OpenGL context.
        let raw_window_handle = window.raw_window_handle();

        // The display could be obtained from any object created by it, so we
        // can query it from the config.
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(GlVersion::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));

        // Since glutin by default tries to create OpenGL core context, which may not be
        // present we should try GLES.
        let fallback_context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(GlVersion::new(3, 0))))
            .build(Some(raw_window_handle));

        let not_current_gl_context = unsafe {
            match gl_display.create_context(&gl_config, &context_attributes) {
                Ok(context) => context,
                Err(err) => {
                    log::warn!("falling back to OpenGL ES: {err}");
                    gl_display.create_context(&gl_config, &fallback_context_attributes)?
                }
            }
        };

        // --------------------------------------------------------------------
        // Surface

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs)? };

        // Make context current for the next phase of configuration.
        let gl_context = not_current_gl_context.make_current(&gl_surface)?;

        // Frames are paced by `Clock`, so a vsync failure is not fatal.
        if let Some(interval) = NonZeroU32::new(1) {
            if let Err(err) = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(interval)) {
                log::warn!("error setting vsync: {err}");
            }
        }

        // --------------------------------------------------------------------
        // OpenGL Function Pointers

        let gl = unsafe {
            Rc::new(glow::Context::from_loader_function_cstr(|symbol| {
                gl_display.get_proc_address(symbol)
            }))
        };

        Ok(Self {
            window,
            gl_context,
            gl_surface,
            gl,
        })
    }

    /// Returns an identifier unique to the window.
    #[inline]
    pub fn window_id(&self) -> winit::window::WindowId {
        self.window.id()
    }

    /// Queue a `RedrawRequested` event after all OS events have been processed.
    #[inline]
    pub fn request_redraw(&self) {
        self.window.request_redraw()
    }

    #[inline]
    pub fn inner_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    /// Swaps the underlying back buffers when the surface is not single buffered.
    #[inline]
    pub fn swap_buffers(&self) -> glutin::error::Result<()> {
        self.gl_surface.swap_buffers(&self.gl_context)
    }

    /// Make the underlying surface current on the calling thread.
    #[inline]
    pub fn make_context_current(&self) -> glutin::error::Result<()> {
        self.gl_context.make_current(&self.gl_surface)
    }

    /// Resize the surface to a new size.
    ///
    /// Does not resize the window. Zero sized surfaces are ignored.
    pub fn resize_surface(&self, size: PhysicalSize<u32>) {
        if let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            self.gl_surface.resize(&self.gl_context, width, height);
        }
    }
}
