//! Turns a recorded frame into wgpu pipelines, buffers and render pass calls.

use std::collections::HashMap;
use std::mem::size_of;

use wgpu::util::DeviceExt;

use crate::device::Gpu;

use super::wgpu_context::{ProgramEntry, RecordedDraw, UniformBlock};
use super::{BufferId, Primitive, ProgramId};

const UNIFORM_BLOCK_SIZE: u64 = size_of::<UniformBlock>() as u64;

/// How a recorded primitive is rasterized by wgpu.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Topology {
    /// Triangle fan expanded through an index buffer.
    FanAsList,
    Lines,
    /// One-pixel points.
    Points,
    /// Instanced quads, one instance per point.
    PointSprites,
}

impl Topology {
    fn of(draw: &RecordedDraw) -> Self {
        match draw.primitive {
            Primitive::TriangleFan => Self::FanAsList,
            Primitive::Lines => Self::Lines,
            Primitive::Points if draw.point_sprites => Self::PointSprites,
            Primitive::Points => Self::Points,
        }
    }

    fn wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Self::FanAsList | Self::PointSprites => wgpu::PrimitiveTopology::TriangleList,
            Self::Lines => wgpu::PrimitiveTopology::LineList,
            Self::Points => wgpu::PrimitiveTopology::PointList,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StreamLayout {
    stride: u32,
    attributes: Vec<(u32, u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    program: ProgramId,
    topology: Topology,
    streams: Vec<StreamLayout>,
}

impl PipelineKey {
    fn of(draw: &RecordedDraw) -> Self {
        Self {
            program: draw.program,
            topology: Topology::of(draw),
            streams: draw
                .streams
                .iter()
                .map(|s| StreamLayout {
                    stride: s.stride,
                    attributes: s.attributes.clone(),
                })
                .collect(),
        }
    }
}

/// Per-draw uniform slots addressed with dynamic offsets.
struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    slots: usize,
    stride: u64,
}

/// GPU objects that outlive a single frame.
pub(super) struct ReplayResources {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    /// `None` records a pipeline that failed validation so it is not retried.
    pipelines: HashMap<PipelineKey, Option<wgpu::RenderPipeline>>,
    pipeline_format: Option<wgpu::TextureFormat>,
    /// `(first, count)` → index buffer and index count.
    fan_indices: HashMap<(u32, u32), (wgpu::Buffer, u32)>,
    uniforms: Option<UniformRing>,
}

impl ReplayResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tabletop uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tabletop pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        Self {
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            pipeline_format: None,
            fan_indices: HashMap::new(),
            uniforms: None,
        }
    }

    pub fn forget_program(&mut self, program: ProgramId) {
        self.pipelines.retain(|key, _| key.program != program);
    }

    /// Creates whatever the draws need and uploads their uniforms.
    ///
    /// Returns one entry per draw; `None` marks a draw that cannot be replayed.
    pub fn prepare(
        &mut self,
        gpu: &Gpu<'_>,
        programs: &HashMap<ProgramId, ProgramEntry>,
        draws: &[RecordedDraw],
        viewport: [f32; 2],
    ) -> Vec<Option<PipelineKey>> {
        let device = gpu.device();

        if self.pipeline_format != Some(gpu.surface_format()) {
            self.pipelines.clear();
            self.pipeline_format = Some(gpu.surface_format());
        }

        let keys = draws
            .iter()
            .map(|draw| {
                let Some(entry) = programs.get(&draw.program) else {
                    log::warn!("draw recorded with program {:?} that no longer exists", draw.program);
                    return None;
                };
                let key = PipelineKey::of(draw);
                if !self.pipelines.contains_key(&key) {
                    let pipeline = self.create_pipeline(device, gpu.surface_format(), entry, &key);
                    self.pipelines.insert(key.clone(), pipeline);
                }
                if key.topology == Topology::FanAsList {
                    self.ensure_fan_indices(device, draw.first, draw.count);
                }
                Some(key)
            })
            .collect();

        self.upload_uniforms(gpu, draws, viewport);
        keys
    }

    /// Encodes the prepared draws in recording order.
    pub fn encode(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        buffers: &HashMap<BufferId, Option<wgpu::Buffer>>,
        draws: &[RecordedDraw],
        keys: &[Option<PipelineKey>],
    ) {
        let Some(ring) = &self.uniforms else {
            return;
        };

        for (slot, (draw, key)) in draws.iter().zip(keys).enumerate() {
            let Some(key) = key else { continue };
            let Some(Some(pipeline)) = self.pipelines.get(key) else { continue };

            let mut sources = Vec::with_capacity(draw.streams.len());
            for stream in &draw.streams {
                match buffers.get(&stream.buffer) {
                    Some(Some(buffer)) => sources.push(buffer),
                    _ => break,
                }
            }
            if sources.len() != draw.streams.len() {
                log::warn!("draw sources a buffer deleted before present; skipped");
                continue;
            }

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &ring.bind_group, &[(slot as u64 * ring.stride) as u32]);
            for (index, buffer) in sources.into_iter().enumerate() {
                pass.set_vertex_buffer(index as u32, buffer.slice(..));
            }

            let range = draw.first..draw.first + draw.count;
            match key.topology {
                Topology::FanAsList => {
                    if let Some((indices, count)) = self.fan_indices.get(&(draw.first, draw.count)) {
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..*count, 0, 0..1);
                    }
                }
                Topology::Lines | Topology::Points => pass.draw(range, 0..1),
                Topology::PointSprites => pass.draw(0..6, range),
            }
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn create_pipeline(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        entry: &ProgramEntry,
        key: &PipelineKey,
    ) -> Option<wgpu::RenderPipeline> {
        let sprites = key.topology == Topology::PointSprites;
        let step_mode = if sprites {
            wgpu::VertexStepMode::Instance
        } else {
            wgpu::VertexStepMode::Vertex
        };

        let mut attribute_sets = Vec::with_capacity(key.streams.len());
        for stream in &key.streams {
            let mut attributes = Vec::with_capacity(stream.attributes.len());
            for &(location, components, offset) in &stream.attributes {
                let Some(format) = float_format(components) else {
                    log::warn!("attribute {location} has unsupported component count {components}");
                    return None;
                };
                attributes.push(wgpu::VertexAttribute {
                    format,
                    offset: u64::from(offset),
                    shader_location: location,
                });
            }
            attribute_sets.push(attributes);
        }

        let layouts: Vec<wgpu::VertexBufferLayout<'_>> = key
            .streams
            .iter()
            .zip(&attribute_sets)
            .map(|(stream, attributes)| wgpu::VertexBufferLayout {
                array_stride: u64::from(stream.stride),
                step_mode,
                attributes,
            })
            .collect();

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(entry.desc.label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &entry.module,
                entry_point: Some(if sprites { "vs_point" } else { "vs_main" }),
                compilation_options: Default::default(),
                buffers: &layouts,
            },
            fragment: Some(wgpu::FragmentState {
                module: &entry.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology.wgpu(),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            log::error!("pipeline for `{}` ({:?}) rejected: {err}", entry.desc.label, key.topology);
            return None;
        }

        log::debug!("created pipeline for `{}` ({:?})", entry.desc.label, key.topology);
        Some(pipeline)
    }

    fn ensure_fan_indices(&mut self, device: &wgpu::Device, first: u32, count: u32) {
        if count < 3 || self.fan_indices.contains_key(&(first, count)) {
            return;
        }

        let indices = fan_indices(first, count);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tabletop fan indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.fan_indices
            .insert((first, count), (buffer, indices.len() as u32));
    }

    fn upload_uniforms(&mut self, gpu: &Gpu<'_>, draws: &[RecordedDraw], viewport: [f32; 2]) {
        if draws.is_empty() {
            return;
        }

        let device = gpu.device();
        let needed = draws.len();
        if self.uniforms.as_ref().map_or(true, |r| r.slots < needed) {
            let slots = needed.next_power_of_two().max(8);
            let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
            let stride = UNIFORM_BLOCK_SIZE.div_ceil(alignment) * alignment;

            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tabletop uniform ring"),
                size: stride * slots as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tabletop uniforms bind group"),
                layout: &self.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE),
                    }),
                }],
            });

            self.uniforms = Some(UniformRing {
                buffer,
                bind_group,
                slots,
                stride,
            });
        }

        let Some(ring) = &self.uniforms else {
            return;
        };

        let mut bytes = vec![0u8; ring.stride as usize * needed];
        for (slot, draw) in draws.iter().enumerate() {
            let mut block = draw.uniforms;
            block.viewport[0] = viewport[0];
            block.viewport[1] = viewport[1];
            let start = slot * ring.stride as usize;
            bytes[start..start + UNIFORM_BLOCK_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&block));
        }
        gpu.queue().write_buffer(&ring.buffer, 0, &bytes);
    }
}

fn float_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Indices of the fan `first..first + count` as a triangle list.
fn fan_indices(first: u32, count: u32) -> Vec<u32> {
    (1..count.saturating_sub(1))
        .flat_map(|i| [first, first + i, first + i + 1])
        .collect()
}
