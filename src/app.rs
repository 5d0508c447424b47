use std::error::Error;
use std::sync::Arc;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::comment::CommentGuard;
use crate::config::AppConfig;
use crate::dom::{Document, MissingElement, NodeId};
use crate::overlay::timer::TracePhase;
use crate::overlay::{FadeStatus, PageOverlay, PageView};
use crate::render::uniform::FadeUniform;
use crate::render::GpuState;
use crate::scheduler::FrameLoop;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    config: AppConfig,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    overlay: Option<PageOverlay>,

    // Page + scripts
    document: Document,
    frame_loop: FrameLoop,
    comment: CommentGuard,
    counter: NodeId,

    // Screen dimensions
    screen_w: u32,
    screen_h: u32,
}

impl App {
    /// Build the page and run its scripts' setup: cache the fade targets,
    /// hook the comment form, and request the first animation frame.
    fn new(config: AppConfig) -> Result<Self, MissingElement> {
        let document = Document::comment_page();
        let mut frame_loop = FrameLoop::new(&document, config.fade, config.frame_interval)?;
        let comment = CommentGuard::attach(&document, config.max_comment_len)?;
        let counter = frame_loop.output();

        log::info!("page scripts loaded ({} elements)", document.len());
        frame_loop.start();

        Ok(Self {
            config,
            window: None,
            gpu: None,
            overlay: None,
            document,
            frame_loop,
            comment,
            counter,
            screen_w: 0,
            screen_h: 0,
        })
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let (w, h) = self.config.window_size;
        let attrs = WindowAttributes::default()
            .with_title("fadetoy")
            .with_inner_size(winit::dpi::PhysicalSize::new(w, h));

        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        self.screen_w = size.width;
        self.screen_h = size.height;
        log::info!("Window created: {}x{}", size.width, size.height);

        let gpu = GpuState::new(window.clone())?;
        log::info!("wgpu + fade pipeline initialized");

        self.overlay = Some(PageOverlay::new(&window, &gpu));
        self.gpu = Some(gpu);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }


    /// One redraw: run a due animation frame, then paint page + overlay.
    fn redraw(&mut self) {
        let now = Instant::now();

        let Some(overlay) = self.overlay.as_mut() else {
            self.frame_loop.poll(&mut self.document, now);
            return;
        };

        overlay.trace.begin(TracePhase::Script);
        self.frame_loop.poll(&mut self.document, now);
        overlay.trace.end(TracePhase::Script);

        let fade = fade_status(&self.frame_loop);
        let opacity = self.document.get(self.frame_loop.target()).opacity();

        let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_ref()) else {
            return;
        };

        overlay.trace.begin(TracePhase::Ui);
        let page = PageView {
            doc: &mut self.document,
            guard: &mut self.comment,
            counter: self.counter,
            fade,
        };
        let paint = overlay.run_frame(window, [self.screen_w, self.screen_h], page);
        overlay.trace.end(TracePhase::Ui);

        overlay.trace.begin(TracePhase::Render);
        let square = FadeUniform::centered(
            Vec2::new(self.screen_w as f32, self.screen_h as f32),
            self.config.square_size,
            opacity,
        );
        gpu.render(&square, overlay, &paint);
        overlay.release(&paint);
        overlay.trace.end(TracePhase::Render);

        overlay.trace.finish_frame();
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        match &event.logical_key {
            Key::Named(NamedKey::Escape) if pressed => {
                log::info!("ESC pressed, exiting");
                event_loop.exit();
            }
            Key::Named(NamedKey::F12) if pressed && !event.repeat => {
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.toggle_trace();
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_window(event_loop) {
            log::error!("Failed to set up window: {e}");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Sleep until the next animation frame or egui repaint is due; idle
        // once neither wants one.
        let now = Instant::now();
        let repaint = self.overlay.as_ref().and_then(PageOverlay::repaint_deadline);
        match earliest(self.frame_loop.next_deadline(now), repaint) {
            Some(due) if due <= now => {
                event_loop.set_control_flow(ControlFlow::Wait);
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            Some(due) => event_loop.set_control_flow(ControlFlow::WaitUntil(due)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let mut consumed = false;
        if let (Some(window), Some(overlay)) = (self.window.as_ref(), self.overlay.as_mut()) {
            let response = overlay.on_window_event(window, &event);
            consumed = response.consumed;
            if response.repaint {
                window.request_redraw();
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                    self.screen_w = new_size.width;
                    self.screen_h = new_size.height;
                }
            }
            WindowEvent::KeyboardInput { event, .. } if !consumed => {
                self.on_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn fade_status(frame_loop: &FrameLoop) -> FadeStatus {
    let anim = frame_loop.animator();
    FadeStatus {
        frame: anim.state().current_frame,
        total_frames: anim.state().total_frames,
        opacity: anim.opacity(),
        target_opacity: anim.track().end_value(),
        callbacks: frame_loop.callbacks(),
        frame_requested: frame_loop.scheduler().is_requested(),
        done: frame_loop.is_done(),
    }
}

/// The sooner of two optional deadlines.
fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Entry point — build the page, create event loop and run.
pub fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(config)?;
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wakes_for_egui_repaint_after_fade() {
        let now = Instant::now();
        let blink = now + Duration::from_millis(500);
        assert_eq!(earliest(None, Some(blink)), Some(blink));
        assert_eq!(earliest(None, None), None);
    }

    #[test]
    fn sooner_deadline_wins() {
        let now = Instant::now();
        let frame = now + Duration::from_millis(33);
        let blink = now + Duration::from_millis(500);
        assert_eq!(earliest(Some(frame), Some(blink)), Some(frame));
        assert_eq!(earliest(Some(blink), Some(frame)), Some(frame));
        assert_eq!(earliest(Some(frame), None), Some(frame));
    }

    #[test]
    fn finished_fade_leaves_only_the_repaint_deadline() {
        let mut app = App::new(AppConfig::default()).unwrap();
        let mut now = Instant::now();
        while let Some(due) = app.frame_loop.next_deadline(now) {
            now = due;
            app.frame_loop.poll(&mut app.document, now);
        }

        let status = fade_status(&app.frame_loop);
        assert!(status.done);
        assert!(!status.frame_requested);
        assert_eq!(status.callbacks, 120);
        assert_eq!(status.target_opacity, 0.999);

        let blink = now + Duration::from_millis(530);
        assert_eq!(earliest(app.frame_loop.next_deadline(now), Some(blink)), Some(blink));
    }
}
