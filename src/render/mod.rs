pub mod pipeline;
pub mod uniform;

use std::error::Error;
use std::sync::Arc;
use winit::window::Window;

use self::pipeline::FadePipeline;
use self::uniform::FadeUniform;
use crate::overlay::{OverlayPaint, PageOverlay};

/// Page background behind the square.
const PAGE_COLOR: wgpu::Color = wgpu::Color {
    r: 0.96,
    g: 0.96,
    b: 0.94,
    a: 1.0,
};

/// The adapter offered a surface we can't draw to.
#[derive(Debug, thiserror::Error)]
#[error("surface reports no texture formats")]
pub struct NoSurfaceFormat;

/// Surface setup for the page: sRGB if offered, opaque if offered, vsync.
pub fn page_surface_config(
    caps: &wgpu::SurfaceCapabilities,
    width: u32,
    height: u32,
) -> Result<wgpu::SurfaceConfiguration, NoSurfaceFormat> {
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
        .ok_or(NoSurfaceFormat)?;

    let alpha_mode = if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        wgpu::CompositeAlphaMode::Opaque
    } else {
        caps.alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto)
    };

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        // Frame pacing comes from the scheduler; vsync just avoids tearing.
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    })
}

/// Device, queue and the window surface the page is drawn into.
pub struct GpuState {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    fade: FadePipeline,
}

impl GpuState {
    pub fn new(window: Arc<Window>) -> Result<Self, Box<dyn Error>> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fadetoy_device"),
            ..Default::default()
        }))?;

        let surface_config =
            page_surface_config(&surface.get_capabilities(&adapter), size.width, size.height)?;
        log::info!(
            "Surface: {}x{} {:?}, alpha {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            surface_config.alpha_mode,
        );
        surface.configure(&device, &surface_config);

        let fade = FadePipeline::new(&device, surface_config.format);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            fade,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Next swapchain image, or `None` if this redraw has to be skipped.
    fn acquire(&self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(texture) => Some(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                None
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("surface timed out, skipping redraw");
                None
            }
            Err(e) => {
                log::error!("surface error: {e}");
                None
            }
        }
    }

    /// Draw one page frame: clear, fading square, then the egui layer, all in
    /// a single pass. Skips the redraw if no swapchain image is available.
    pub fn render(&self, square: &FadeUniform, overlay: &mut PageOverlay, paint: &OverlayPaint) {
        let Some(texture) = self.acquire() else {
            return;
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("page_encoder"),
            });

        self.fade.update_uniform(&self.queue, square);
        let overlay_cmds = overlay.upload(&self.device, &self.queue, &mut encoder, paint);

        {
            // egui's renderer wants a 'static pass.
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("page_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        depth_slice: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(PAGE_COLOR),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.fade.draw(&mut pass);
            overlay.draw(&mut pass, paint);
        }

        self.queue
            .submit(overlay_cmds.into_iter().chain(std::iter::once(encoder.finish())));
        texture.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(
        formats: Vec<wgpu::TextureFormat>,
        alpha_modes: Vec<wgpu::CompositeAlphaMode>,
    ) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            alpha_modes,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_srgb_and_opaque() {
        let c = caps(
            vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
            ],
            vec![
                wgpu::CompositeAlphaMode::PreMultiplied,
                wgpu::CompositeAlphaMode::Opaque,
            ],
        );
        let cfg = page_surface_config(&c, 640, 480).unwrap();
        assert_eq!(cfg.format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(cfg.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
        assert_eq!((cfg.width, cfg.height), (640, 480));
    }

    #[test]
    fn falls_back_to_first_offered() {
        let c = caps(
            vec![wgpu::TextureFormat::Rgba8Unorm],
            vec![wgpu::CompositeAlphaMode::PostMultiplied],
        );
        let cfg = page_surface_config(&c, 0, 0).unwrap();
        assert_eq!(cfg.format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(cfg.alpha_mode, wgpu::CompositeAlphaMode::PostMultiplied);
        assert_eq!((cfg.width, cfg.height), (1, 1));
    }

    #[test]
    fn no_formats_is_an_error() {
        let err = page_surface_config(&caps(vec![], vec![]), 10, 10).unwrap_err();
        assert_eq!(err.to_string(), "surface reports no texture formats");
    }
}
