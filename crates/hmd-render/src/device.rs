use crate::pipeline::{
    CompositePipelines, DistortionUniforms, GridPipeline, GridUniforms, GridVertex,
    ScenePipeline, SceneUniforms,
};
use crate::target::SceneTarget;
use crate::{GridMode, PostProcess, RenderDevice};
use glam::Mat4;
use hmd_scene::Scene;
use hmd_stereo::{EyeRenderParams, Viewport};
use std::ops::Range;
use wgpu::util::DeviceExt;

/// Uploaded scene geometry: one interleaved vertex/index buffer pair with
/// per-model index ranges, re-uploaded when the scene revision changes.
struct SceneMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    draws: Vec<Range<u32>>,
    revision: u64,
}

struct FrameState {
    surface_texture: wgpu::SurfaceTexture,
    surface_view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    /// Whole scene target cleared yet this frame.
    cleared: bool,
}

/// [`RenderDevice`] over a winit surface.
pub struct WgpuRenderDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    scene_pipeline: ScenePipeline,
    grid_pipeline: GridPipeline,
    composite: CompositePipelines,
    target: SceneTarget,
    render_scale: f32,

    mesh: Option<SceneMesh>,
    frame: Option<FrameState>,
    post: PostProcess,
    depth_enabled: bool,
    current_eye: Option<EyeRenderParams>,
    pass_eyes: Vec<EyeRenderParams>,
    distortion_clear_color: [f32; 4],
}

impl WgpuRenderDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        surface_config: wgpu::SurfaceConfiguration,
    ) -> Self {
        let format = surface_config.format;
        let scene_pipeline = ScenePipeline::new(&device, format);
        let grid_pipeline = GridPipeline::new(&device, format);
        let composite = CompositePipelines::new(&device, format);
        let target = SceneTarget::new(&device, format, surface_config.width, surface_config.height);

        Self {
            device,
            queue,
            surface,
            surface_config,
            scene_pipeline,
            grid_pipeline,
            composite,
            target,
            render_scale: 1.0,
            mesh: None,
            frame: None,
            post: PostProcess::None,
            depth_enabled: true,
            current_eye: None,
            pass_eyes: Vec::new(),
            distortion_clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.rebuild_target();
    }

    fn rebuild_target(&mut self) {
        let width = (self.surface_config.width as f32 * self.render_scale).round() as u32;
        let height = (self.surface_config.height as f32 * self.render_scale).round() as u32;
        if self.target.width != width.max(1) || self.target.height != height.max(1) {
            self.target =
                SceneTarget::new(&self.device, self.surface_config.format, width, height);
            tracing::debug!(width, height, scale = self.render_scale, "scene target rebuilt");
        }
    }

    /// Scale an eye viewport from surface pixels to scene-target pixels.
    fn scaled_viewport(&self, vp: Viewport) -> (f32, f32, f32, f32) {
        let sx = self.target.width as f32 / self.surface_config.width as f32;
        let sy = self.target.height as f32 / self.surface_config.height as f32;
        (
            vp.x as f32 * sx,
            vp.y as f32 * sy,
            vp.w as f32 * sx,
            vp.h as f32 * sy,
        )
    }

    fn upload_scene(&mut self, scene: &Scene) {
        let up_to_date = self
            .mesh
            .as_ref()
            .is_some_and(|m| m.revision == scene.revision());
        if up_to_date {
            return;
        }

        let mut vertices = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut draws = Vec::new();
        for model in scene.models.iter().filter(|m| m.visible) {
            let base = vertices.len() as u32;
            let start = indices.len() as u32;
            vertices.extend_from_slice(&model.vertices);
            indices.extend(model.indices.iter().map(|&i| base + i));
            draws.push(start..indices.len() as u32);
        }

        // Degenerate but valid buffers keep the draw loop uniform.
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_vertex_buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_index_buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        tracing::debug!(
            models = draws.len(),
            vertices = vertices.len(),
            "scene mesh uploaded"
        );
        self.mesh = Some(SceneMesh {
            vertex_buffer,
            index_buffer,
            draws,
            revision: scene.revision(),
        });
    }

    fn distortion_uniforms(&self, params: &EyeRenderParams) -> DistortionUniforms {
        let surface_w = self.surface_config.width as f32;
        let surface_h = self.surface_config.height as f32;
        let vp = params.viewport;

        // Everything below is in normalized full-render-target coordinates.
        let x = vp.x as f32 / surface_w;
        let y = vp.y as f32 / surface_h;
        let w = vp.w as f32 / surface_w;
        let h = vp.h as f32 / surface_h;
        let aspect = vp.w as f32 / vp.h as f32;

        let d = params.distortion;
        let scale_factor = 1.0 / d.scale;

        DistortionUniforms {
            lens_center: [x + (w + d.x_center_offset * 0.5) * 0.5, y + h * 0.5],
            screen_center: [x + w * 0.5, y + h * 0.5],
            scale: [
                (w * 0.5) * scale_factor,
                (h * 0.5) * scale_factor * aspect,
            ],
            scale_in: [2.0 / w, (2.0 / h) / aspect],
            surface_size: [surface_w, surface_h],
            _pad: [0.0, 0.0],
            k: d.k,
            bounds: [x, y, x + w, y + h],
            clear_color: self.distortion_clear_color,
        }
    }
}

impl RenderDevice for WgpuRenderDevice {
    fn begin_pass(&mut self, post: PostProcess) -> anyhow::Result<()> {
        self.post = post;
        if self.frame.is_some() {
            return Ok(());
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e.into()),
        };
        let surface_view = surface_texture.texture.create_view(&Default::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        self.frame = Some(FrameState {
            surface_texture,
            surface_view,
            encoder,
            cleared: false,
        });
        Ok(())
    }

    fn apply_eye(&mut self, params: &EyeRenderParams) {
        self.current_eye = Some(*params);
        self.pass_eyes.push(*params);
    }

    fn clear(&mut self) {
        // The target is cleared once per frame on the first scene pass; eye
        // regions do not overlap, so later passes load and draw in place.
    }

    fn set_depth_enabled(&mut self, enabled: bool) {
        self.depth_enabled = enabled;
    }

    fn render_scene(&mut self, scene: &Scene, view: Mat4) {
        self.upload_scene(scene);
        let Some(params) = self.current_eye else {
            return;
        };
        let (vx, vy, vw, vh) = self.scaled_viewport(params.viewport);

        let uniforms = SceneUniforms::new(params.projection * view);
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scene_uniform_buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &self.scene_pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let (color_load, depth_load) = if frame.cleared {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        } else {
            (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: 0.0,
                    g: 0.0,
                    b: 0.0,
                    a: 1.0,
                }),
                wgpu::LoadOp::Clear(1.0),
            )
        };
        frame.cleared = true;

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_viewport(vx, vy, vw, vh, 0.0, 1.0);
        pass.set_pipeline(if self.depth_enabled {
            &self.scene_pipeline.with_depth
        } else {
            &self.scene_pipeline.without_depth
        });
        pass.set_bind_group(0, &bind_group, &[]);

        if let Some(mesh) = &self.mesh {
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            for range in &mesh.draws {
                pass.draw_indexed(range.clone(), 0, 0..1);
            }
        }
    }

    fn render_grid(&mut self, transform: Mat4, mode: GridMode) {
        let Some(params) = self.current_eye else {
            return;
        };
        if mode == GridMode::Off {
            return;
        }
        let (vx, vy, vw, vh) = self.scaled_viewport(params.viewport);

        // Lens mode centers the lines on the lens axis rather than the
        // viewport center.
        let center_x = match mode {
            GridMode::Lens => params.distortion.x_center_offset,
            _ => 0.0,
        };
        let mut vertices = Vec::new();
        let lines = 12i32;
        for i in -lines..=lines {
            let t = i as f32 / lines as f32;
            vertices.push(GridVertex {
                position: [center_x + t, -1.0],
            });
            vertices.push(GridVertex {
                position: [center_x + t, 1.0],
            });
            vertices.push(GridVertex {
                position: [-1.0, t],
            });
            vertices.push(GridVertex {
                position: [1.0, t],
            });
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("grid_vertex_buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let uniforms = GridUniforms {
            transform: transform.to_cols_array_2d(),
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("grid_uniform_buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grid_bind_group"),
            layout: &self.grid_pipeline.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("grid_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(vx, vy, vw, vh, 0.0, 1.0);
        pass.set_pipeline(&self.grid_pipeline.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.draw(0..vertices.len() as u32, 0..1);
    }

    fn finish_pass(&mut self) {
        self.current_eye = None;
    }

    fn present(&mut self) -> anyhow::Result<()> {
        let Some(mut frame) = self.frame.take() else {
            return Ok(());
        };

        match self.post {
            PostProcess::None => {
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("blit_bind_group"),
                    layout: &self.composite.blit_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&self.target.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.composite.sampler),
                        },
                    ],
                });
                let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("blit_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.surface_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&self.composite.blit);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
            PostProcess::Distortion => {
                // One bind group per eye; the pass clears once, then each
                // eye warps its own viewport.
                let bind_groups: Vec<wgpu::BindGroup> = self
                    .pass_eyes
                    .iter()
                    .map(|params| {
                        let uniforms = self.distortion_uniforms(params);
                        let buffer = self.device.create_buffer_init(
                            &wgpu::util::BufferInitDescriptor {
                                label: Some("distortion_uniform_buffer"),
                                contents: bytemuck::cast_slice(&[uniforms]),
                                usage: wgpu::BufferUsages::UNIFORM,
                            },
                        );
                        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("distortion_bind_group"),
                            layout: &self.composite.distortion_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: buffer.as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::TextureView(
                                        &self.target.view,
                                    ),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 2,
                                    resource: wgpu::BindingResource::Sampler(
                                        &self.composite.sampler,
                                    ),
                                },
                            ],
                        })
                    })
                    .collect();

                let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("distortion_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.surface_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&self.composite.distortion);
                for (params, bind_group) in self.pass_eyes.iter().zip(&bind_groups) {
                    let vp = params.viewport;
                    pass.set_viewport(
                        vp.x as f32,
                        vp.y as f32,
                        vp.w as f32,
                        vp.h as f32,
                        0.0,
                        1.0,
                    );
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }

        self.queue.submit(Some(frame.encoder.finish()));
        frame.surface_texture.present();
        self.pass_eyes.clear();
        Ok(())
    }

    fn force_flush(&mut self) {
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }

    fn set_distortion_clear_color(&mut self, color: [f32; 4]) {
        self.distortion_clear_color = color;
    }

    fn set_scene_render_scale(&mut self, scale: f32) {
        let scale = scale.clamp(0.5, 3.0);
        if (scale - self.render_scale).abs() > 1e-3 {
            self.render_scale = scale;
            self.rebuild_target();
        }
    }
}
