//! Demo host: a winit window with the ripple background behind it.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::BackgroundConfig;
use crate::controller::{Background, FrameOutcome, Viewport};
use crate::error::RunError;
use crate::gpu::Session;
use crate::input::WindowEventTranslator;
use crate::scheduler::FrameTicket;

/// Height of the virtual page the mouse wheel scrolls through, in logical
/// pixels beyond the window.
const SCROLL_RANGE: f32 = 2000.0;

pub struct App {
    window: Option<Arc<Window>>,
    background: Background<Session>,
    translator: WindowEventTranslator,
    ticket: Option<FrameTicket>,
    error: Option<RunError>,
}

impl App {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            window: None,
            background: Background::new(config),
            translator: WindowEventTranslator::new(1.0, SCROLL_RANGE),
            ticket: None,
            error: None,
        }
    }

    pub fn background(&self) -> &Background<Session> {
        &self.background
    }

    fn mount(&mut self, window: Arc<Window>) {
        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f64>(scale_factor);
        let viewport = Viewport::new(logical.width as f32, logical.height as f32, scale_factor);
        self.translator = WindowEventTranslator::new(scale_factor, SCROLL_RANGE);

        let target = window.clone();
        self.ticket = self
            .background
            .mount(viewport, move |config, viewport| Session::new(target, config, viewport));
        if self.ticket.is_some() {
            window.request_redraw();
        }
    }

    fn redraw(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        match self.background.frame(ticket, Instant::now()) {
            FrameOutcome::Rendered(next) | FrameOutcome::Skipped(next) => {
                self.ticket = Some(next);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            FrameOutcome::Stale | FrameOutcome::Halted => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("moire")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        match event_loop.create_window(window_attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                self.mount(window);
            }
            Err(e) => {
                self.error = Some(e.into());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.background.dispose();
                self.ticket = None;
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            event => {
                if let Some(interaction) = self.translator.translate(&event) {
                    self.background.handle_event(interaction, Instant::now());
                }
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.background.dispose();
    }
}

/// Open a window and run the background until it is closed.
pub fn run(config: BackgroundConfig) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
