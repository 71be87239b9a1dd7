use anyhow::Result;
use percept_experiment::Session;
use percept_render::StimulusRenderer;
use percept_timing::HighPrecisionTimer;
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::SmallRng;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::error;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

pub type AppSession = Session<HighPrecisionTimer, SmallRng>;

/// The windowed front end: owns the surface, drives render → update each
/// redraw, and routes keyboard input into the session.
pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    session: Option<AppSession>,
    renderer: Option<StimulusRenderer>,
    canvas: Option<Pixmap>,
    refresh_rate: Option<f64>,
    failure: Option<anyhow::Error>,
    should_exit: bool,
}

impl App {
    pub fn new(session: AppSession) -> Self {
        Self {
            window: None,
            pixels: None,
            session: Some(session),
            renderer: None,
            canvas: None,
            refresh_rate: None,
            failure: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let result = event_loop.run_app(&mut self);

        // Teardown: the log is flushed exactly once, whatever ended the run.
        if let Some(session) = self.session.take() {
            let events = session.recorder().entries().len();
            match session.finish() {
                Ok(path) => {
                    println!("\nRun complete. {} events written to {}", events, path.display());
                }
                Err(e) => {
                    if self.failure.is_none() {
                        self.failure = Some(e);
                    } else {
                        error!("event log not written: {e:#}");
                    }
                }
            }
        }

        result?;
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Percept")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        println!("Display Configuration:");
        println!(
            "  Physical size: {}×{}",
            physical_size.width, physical_size.height
        );
        println!("  Scale factor: {:.2}", window.scale_factor());
        if let Some(refresh_rate) = self.refresh_rate {
            println!("  Refresh rate: {:.1} Hz", refresh_rate);
        }

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        self.canvas = Pixmap::new(physical_size.width, physical_size.height);
        self.renderer = Some(StimulusRenderer::new(
            physical_size.width,
            physical_size.height,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer), Some(canvas), Some(session)) = (
            self.pixels.as_mut(),
            self.renderer.as_mut(),
            self.canvas.as_mut(),
            self.session.as_ref(),
        ) else {
            return Ok(());
        };

        renderer.render_frame(canvas, &session.scene())?;
        pixels.frame_mut().copy_from_slice(canvas.data());
        pixels.render()?;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        if let Some(session) = &mut self.session {
            session.update()?;
            if session.finished() {
                self.should_exit = true;
            }
        }
        Ok(())
    }

    fn handle_input(&mut self, event: winit::event::KeyEvent, event_loop: &ActiveEventLoop) {
        if event.repeat {
            return;
        }
        if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
            self.cleanup_and_exit(event_loop);
            return;
        }
        if let Some(session) = &mut self.session {
            if let Err(e) = session.key_pressed() {
                self.fail(e, event_loop);
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!("failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!("failed to resize buffer: {e}");
            }
        }
        self.canvas = Pixmap::new(new_size.width, new_size.height);
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height);
        }
    }

    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        error!("run aborted: {err:#}");
        self.failure = Some(err);
        self.cleanup_and_exit(event_loop);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(e, event_loop);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render().and_then(|_| self.update()) {
                    self.fail(e, event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event, event_loop);
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
