pub mod ring;
pub mod timer;

use instant::Instant;
use winit::window::Window;

use self::timer::{FrameTrace, TracePhase};

use crate::comment::{CommentGuard, Submit};
use crate::dom::{Document, NodeId};
use crate::render::GpuState;

/// Redraws kept for the trace chart.
const TRACE_HISTORY_LEN: usize = 90;

const PHASE_COLORS: [egui::Color32; 3] = [
    egui::Color32::from_rgb(240, 180, 60),
    egui::Color32::from_rgb(90, 160, 240),
    egui::Color32::from_rgb(110, 200, 130),
];

/// Fade and scheduler state shown next to the counter and in the trace window.
#[derive(Debug, Clone, Copy)]
pub struct FadeStatus {
    pub frame: u32,
    pub total_frames: u32,
    pub opacity: f64,
    pub target_opacity: f64,
    pub callbacks: u64,
    pub frame_requested: bool,
    pub done: bool,
}

/// The page pieces the overlay reads and edits during a UI pass.
pub struct PageView<'a> {
    pub doc: &'a mut Document,
    pub guard: &'a mut CommentGuard,
    pub counter: NodeId,
    pub fade: FadeStatus,
}

/// Tessellated egui output for one redraw.
pub struct OverlayPaint {
    pub primitives: Vec<egui::epaint::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub screen: egui_wgpu::ScreenDescriptor,
}

/// egui layer: counter readout, comment form, and an F12 trace window.
pub struct PageOverlay {
    ctx: egui::Context,
    winit_state: egui_winit::State,
    renderer: egui_wgpu::Renderer,

    pub trace: FrameTrace,
    trace_visible: bool,

    /// Result line of the last submit attempt.
    submit_status: Option<String>,
    /// When egui next wants a repaint (cursor blink, animations).
    repaint_at: Option<Instant>,
}

impl PageOverlay {
    pub fn new(window: &Window, gpu: &GpuState) -> Self {
        let ctx = egui::Context::default();
        ctx.set_visuals(egui::Visuals::light());

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );

        let renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            ctx,
            winit_state,
            renderer,
            trace: FrameTrace::new(TRACE_HISTORY_LEN),
            trace_visible: false,
            submit_status: None,
            repaint_at: None,
        }
    }

    pub fn toggle_trace(&mut self) {
        self.trace_visible = !self.trace_visible;
        log::debug!(
            "trace window {}",
            if self.trace_visible { "shown" } else { "hidden" }
        );
    }

    pub fn on_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.winit_state.on_window_event(window, event)
    }

    /// Deadline egui asked for on the last pass, if any.
    pub fn repaint_deadline(&self) -> Option<Instant> {
        self.repaint_at
    }

    /// Lay out the page UI and tessellate it.
    pub fn run_frame(
        &mut self,
        window: &Window,
        size: [u32; 2],
        mut page: PageView<'_>,
    ) -> OverlayPaint {
        let raw_input = self.winit_state.take_egui_input(window);
        let trace = &self.trace;
        let trace_visible = self.trace_visible;
        let submit_status = &mut self.submit_status;

        let output = self.ctx.run(raw_input, |ctx| {
            draw_page(ctx, &mut page, submit_status);
            if trace_visible {
                draw_trace(ctx, trace, &page.fade);
            }
        });

        // A delay of Duration::MAX (no repaint wanted) overflows to None.
        self.repaint_at = output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .and_then(|viewport| Instant::now().checked_add(viewport.repaint_delay));

        self.winit_state
            .handle_platform_output(window, output.platform_output);

        let pixels_per_point = output.pixels_per_point;
        OverlayPaint {
            primitives: self.ctx.tessellate(output.shapes, pixels_per_point),
            textures: output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: size,
                pixels_per_point,
            },
        }
    }

    /// Upload textures and vertex data. Must run before the pass that draws them.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        paint: &OverlayPaint,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, delta) in &paint.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &paint.primitives, &paint.screen)
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'static>, paint: &OverlayPaint) {
        self.renderer.render(pass, &paint.primitives, &paint.screen);
    }

    /// Drop textures egui no longer needs. Also called when the frame was skipped.
    pub fn release(&mut self, paint: &OverlayPaint) {
        for id in &paint.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Free-function draw
// ---------------------------------------------------------------------------

fn draw_page(ctx: &egui::Context, page: &mut PageView<'_>, submit_status: &mut Option<String>) {
    let text_color = egui::Color32::from_gray(30);

    // --- Counter (div #1) ---
    egui::Area::new(egui::Id::new("counter"))
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .show(ctx, |ui| {
            let counter = &page.doc.get(page.counter).inner_html;
            ui.label(
                egui::RichText::new(counter.as_str())
                    .monospace()
                    .size(18.0)
                    .color(text_color),
            );
            let f = page.fade;
            let phase = if f.done { "done" } else { "running" };
            ui.label(
                egui::RichText::new(format!(
                    "frame {}/{} | opacity {:.3} -> {:.3} | {}",
                    f.frame, f.total_frames, f.opacity, f.target_opacity, phase
                ))
                .small()
                .color(egui::Color32::from_gray(90)),
            );
        });

    // --- Comment form ---
    let Some(input) = page.guard.inputs().first().copied() else {
        return;
    };

    let form_frame = egui::Frame::NONE
        .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 235))
        .corner_radius(6.0)
        .inner_margin(10.0);

    egui::Window::new("Comment")
        .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
        .resizable(false)
        .collapsible(false)
        .frame(form_frame)
        .show(ctx, |ui| {
            let mut submit = false;
            // Red text while the form would refuse to submit.
            let input_color = if page.guard.allow_submit() {
                text_color
            } else {
                egui::Color32::from_rgb(200, 40, 40)
            };
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut page.doc.get_mut(input).value)
                        .hint_text("Leave a comment")
                        .text_color(input_color)
                        .desired_width(360.0),
                );
                if response.changed() {
                    page.guard.on_edit(page.doc, input);
                }
                let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                submit = ui.button("Submit").clicked() || enter;
            });

            if submit {
                *submit_status = Some(match page.guard.submit(page.doc) {
                    Submit::Accepted(text) => format!("Posted: {text}"),
                    Submit::Prevented => "Not posted.".to_string(),
                });
            }

            if let Ok(warning) = page.doc.require("strong", 0) {
                let warning = &page.doc.get(warning).inner_html;
                if !warning.is_empty() {
                    ui.label(
                        egui::RichText::new(warning.as_str())
                            .strong()
                            .color(egui::Color32::from_rgb(200, 40, 40)),
                    );
                }
            }
            if let Some(status) = submit_status.as_deref() {
                ui.label(egui::RichText::new(status).small().color(text_color));
            }
        });
}

/// Scheduler state plus the per-phase spans of recent redraws, stacked
/// script / ui / render.
fn draw_trace(ctx: &egui::Context, trace: &FrameTrace, fade: &FadeStatus) {
    let panel_frame = egui::Frame::NONE
        .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 220))
        .corner_radius(6.0)
        .inner_margin(10.0);

    egui::Window::new("Trace")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .frame(panel_frame)
        .show(ctx, |ui| {
            ui.style_mut().visuals.override_text_color = Some(egui::Color32::from_gray(220));

            ui.label(format!(
                "callbacks: {} | frame requested: {}",
                fade.callbacks,
                if fade.frame_requested { "yes" } else { "no" }
            ));
            ui.label(format!("redraws traced: {}", trace.redraws()));
            ui.add_space(4.0);

            let total = trace.total_us().max(1.0);
            for phase in TracePhase::ALL {
                let us = trace.smoothed_us(phase);
                ui.label(
                    egui::RichText::new(format!(
                        "{:<7}{:>7.0}us ({:>2.0}%)",
                        phase.label(),
                        us,
                        us / total * 100.0
                    ))
                    .monospace()
                    .color(PHASE_COLORS[phase as usize]),
                );
            }

            let history = trace.history();
            if !history.is_empty() {
                ui.add_space(4.0);
                let (response, painter) =
                    ui.allocate_painter(egui::vec2(270.0, 64.0), egui::Sense::hover());
                let rect = response.rect;
                let scale_us = history
                    .iter()
                    .map(|sample| sample.iter().sum::<f64>())
                    .fold(1_000.0f64, f64::max);
                let bar_width = rect.width() / history.len() as f32;

                for (i, sample) in history.iter().enumerate() {
                    let x = rect.left() + i as f32 * bar_width;
                    let mut bottom = rect.bottom();
                    for phase in TracePhase::ALL {
                        let h = (sample[phase as usize] / scale_us) as f32 * rect.height();
                        painter.rect_filled(
                            egui::Rect::from_min_max(
                                egui::pos2(x, bottom - h),
                                egui::pos2(x + (bar_width - 1.0).max(1.0), bottom),
                            ),
                            0.0,
                            PHASE_COLORS[phase as usize],
                        );
                        bottom -= h;
                    }
                }
                ui.label(egui::RichText::new(format!("scale: {:.1}ms", scale_us / 1000.0)).small());
            }

            ui.add_space(4.0);
            ui.label("F12: Toggle | ESC: Quit");
        });
}
