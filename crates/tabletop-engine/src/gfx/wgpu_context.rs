use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::error::RenderError;

use super::context::HandleAllocator;
use super::replay::ReplayResources;
use super::{
    AttribLocation, BufferId, Capability, GpuContext, Primitive, ProgramDesc, ProgramId,
    UniformLocation,
};

/// Uniform block layout shared by every program:
///
///  offset  0  matrix    mat4x4<f32>  (user: `u_Matrix`)
///  offset 64  color     vec4<f32>    (user: `u_Color`)
///  offset 80  viewport  vec4<f32>    (backend: xy = surface px, z = point size)
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(super) struct UniformBlock {
    pub matrix: [f32; 16],
    pub color: [f32; 4],
    pub viewport: [f32; 4],
}

/// Bytes of [`UniformBlock`] addressable through `UniformLocation`s.
const USER_UNIFORM_BYTES: usize = 80;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct AttribPointer {
    buffer: BufferId,
    components: u32,
    stride: u32,
    offset: u32,
}

/// Attributes of one draw that are sourced from the same buffer with the same
/// stride; becomes one wgpu vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct VertexStream {
    pub buffer: BufferId,
    pub stride: u32,
    /// `(shader location, components, byte offset)`.
    pub attributes: Vec<(u32, u32, u32)>,
}

pub(super) struct ProgramEntry {
    pub desc: &'static ProgramDesc,
    pub module: wgpu::ShaderModule,
}

/// One `draw_arrays` call with a snapshot of the state it depends on.
pub(super) struct RecordedDraw {
    pub program: ProgramId,
    pub primitive: Primitive,
    pub first: u32,
    pub count: u32,
    pub streams: Vec<VertexStream>,
    pub uniforms: UniformBlock,
    pub point_sprites: bool,
}

#[derive(Default)]
pub(super) struct FrameRecording {
    pub clear: Option<[f32; 4]>,
    pub draws: Vec<RecordedDraw>,
}

#[derive(Debug, Default)]
struct BoundState {
    program: Option<ProgramId>,
    buffer: Option<BufferId>,
    pointers: BTreeMap<u32, AttribPointer>,
    enabled: BTreeSet<u32>,
    uniforms: UniformBlock,
    program_point_size: bool,
    clear_color: [f32; 4],
}

impl BoundState {
    fn write_uniform(&mut self, location: UniformLocation, bytes: &[u8]) {
        let start = location.0 as usize;
        let end = start + bytes.len();
        if end > USER_UNIFORM_BYTES {
            log::warn!("uniform write at offset {start} ({} bytes) out of range", bytes.len());
            return;
        }
        bytemuck::bytes_of_mut(&mut self.uniforms)[start..end].copy_from_slice(bytes);
    }

    /// Groups the enabled attribute pointers into vertex streams and checks the
    /// vertex range fits every source buffer.
    ///
    /// `buffer_size` yields the byte size of an uploaded buffer, `None` for
    /// empty or deleted ones.
    fn collect_streams(
        &self,
        first: u32,
        count: u32,
        buffer_size: impl Fn(BufferId) -> Option<u64>,
    ) -> Option<Vec<VertexStream>> {
        let mut streams: Vec<VertexStream> = Vec::new();
        let last = u64::from(first) + u64::from(count) - 1;

        for &location in &self.enabled {
            let Some(ptr) = self.pointers.get(&location) else {
                log::warn!("attribute {location} enabled without a pointer; draw skipped");
                return None;
            };

            let Some(size) = buffer_size(ptr.buffer) else {
                log::warn!("attribute {location} sources an empty or deleted buffer; draw skipped");
                return None;
            };

            let end = last * u64::from(ptr.stride) + u64::from(ptr.offset) + u64::from(ptr.components) * 4;
            if end > size {
                log::warn!(
                    "vertex range {first}..{} exceeds buffer {:?} ({size} bytes); draw skipped",
                    last + 1,
                    ptr.buffer,
                );
                return None;
            }

            let attr = (location, ptr.components, ptr.offset);
            match streams
                .iter_mut()
                .find(|s| s.buffer == ptr.buffer && s.stride == ptr.stride)
            {
                Some(stream) => stream.attributes.push(attr),
                None => streams.push(VertexStream {
                    buffer: ptr.buffer,
                    stride: ptr.stride,
                    attributes: vec![attr],
                }),
            }
        }

        Some(streams)
    }

    /// Snapshots everything a draw of `first..first + count` depends on.
    fn record_draw(
        &self,
        primitive: Primitive,
        first: u32,
        count: u32,
        point_size: f32,
        buffer_size: impl Fn(BufferId) -> Option<u64>,
    ) -> Option<RecordedDraw> {
        if count == 0 {
            return None;
        }
        let Some(program) = self.program else {
            log::warn!("draw_arrays with no program in use; skipped");
            return None;
        };
        let streams = self.collect_streams(first, count, buffer_size)?;

        let mut uniforms = self.uniforms;
        uniforms.viewport[2] = point_size;

        Some(RecordedDraw {
            program,
            primitive,
            first,
            count,
            streams,
            uniforms,
            point_sprites: primitive == Primitive::Points && self.program_point_size,
        })
    }
}

/// [`GpuContext`] backed by wgpu.
///
/// Commands are recorded between presents and replayed into a single render
/// pass by [`present`](Self::present). Dropping the context drops every GPU
/// object it created.
pub struct WgpuContext<'w> {
    gpu: Gpu<'w>,
    ids: HandleAllocator,
    programs: HashMap<ProgramId, ProgramEntry>,
    /// `None` until data is uploaded.
    buffers: HashMap<BufferId, Option<wgpu::Buffer>>,
    state: BoundState,
    frame: FrameRecording,
    replay: ReplayResources,
}

impl<'w> WgpuContext<'w> {
    /// Creates the device and surface for `window`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new(window, init).await?;
        gpu.log_adapter_info();

        let replay = ReplayResources::new(gpu.device());

        Ok(Self {
            gpu,
            ids: HandleAllocator::default(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            state: BoundState::default(),
            frame: FrameRecording::default(),
            replay,
        })
    }

    /// Reconfigures the surface for a new drawable size.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// Replays the commands recorded since the last present onto the next
    /// surface texture and presents it.
    ///
    /// A frame with nothing recorded is not presented. On a surface error the
    /// recording is discarded and the recovery action returned.
    pub fn present(&mut self) -> std::result::Result<(), SurfaceErrorAction> {
        let recording = std::mem::take(&mut self.frame);
        if recording.clear.is_none() && recording.draws.is_empty() {
            return Ok(());
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("surface error on present: {err}");
                return Err(self.gpu.handle_surface_error(err));
            }
        };

        let size = self.gpu.size();
        let viewport = [size.width.max(1) as f32, size.height.max(1) as f32];
        let prepared = self.replay.prepare(
            &self.gpu,
            &self.programs,
            &recording.draws,
            viewport,
        );

        {
            let clear = recording.clear.map(|[r, g, b, a]| wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            });

            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tabletop scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            self.replay
                .encode(&mut pass, &self.buffers, &recording.draws, &prepared);
        }

        self.gpu.submit(frame);
        Ok(())
    }

    fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.buffers.get(&id)?.as_ref().map(wgpu::Buffer::size)
    }
}

/// Compiles `desc.source`, surfacing validation failures as a link error
/// instead of the device's uncaptured-error handler.
fn compile_module(
    device: &wgpu::Device,
    desc: &ProgramDesc,
) -> Result<wgpu::ShaderModule, RenderError> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(RenderError::ShaderLink {
            label: desc.label,
            log: err.to_string(),
        }),
        None => Ok(module),
    }
}

impl GpuContext for WgpuContext<'_> {
    fn create_program(&mut self, desc: &'static ProgramDesc) -> Result<ProgramId, RenderError> {
        let module = compile_module(self.gpu.device(), desc)?;

        let id = self.ids.program();
        self.programs.insert(id, ProgramEntry { desc, module });
        log::debug!("linked program {id:?} `{}`", desc.label);
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("delete of unknown program {program:?}");
            return;
        }
        self.replay.forget_program(program);
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        self.programs.get(&program)?.desc.attribute(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.desc.uniform(name)
    }

    fn create_buffer(&mut self) -> BufferId {
        let id = self.ids.buffer();
        self.buffers.insert(id, None);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("delete of unknown buffer {buffer:?}");
            return;
        }
        if self.state.buffer == Some(buffer) {
            self.state.buffer = None;
        }
        self.state.pointers.retain(|_, p| p.buffer != buffer);
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) {
        if let Some(id) = buffer {
            if !self.buffers.contains_key(&id) {
                log::warn!("{}: bind of unknown buffer {id:?}", RenderError::StaleContextUse);
                self.state.buffer = None;
                return;
            }
        }
        self.state.buffer = buffer;
    }

    fn buffer_data(&mut self, data: &[u8]) {
        let Some(id) = self.state.buffer else {
            log::warn!("buffer_data with no buffer bound");
            return;
        };
        if data.is_empty() {
            log::warn!("buffer_data with empty data for {id:?}");
            return;
        }

        let buffer = self
            .gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tabletop vertex buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.insert(id, Some(buffer));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.state.clear_color = rgba;
    }

    fn clear(&mut self) {
        // Clearing wipes anything drawn earlier in the frame.
        self.frame.draws.clear();
        self.frame.clear = Some(self.state.clear_color);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program {
            if !self.programs.contains_key(&id) {
                log::warn!("{}: use of unknown program {id:?}", RenderError::StaleContextUse);
                self.state.program = None;
                return;
            }
        }
        self.state.program = program;
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        components: u32,
        stride: u32,
        offset: u32,
    ) {
        let Some(buffer) = self.state.buffer else {
            log::warn!("vertex_attrib_pointer({}) with no buffer bound", location.0);
            return;
        };
        self.state.pointers.insert(
            location.0,
            AttribPointer {
                buffer,
                components,
                stride,
                offset,
            },
        );
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.state.enabled.insert(location.0);
    }

    fn disable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.state.enabled.remove(&location.0);
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, cols: &[f32; 16]) {
        self.state.write_uniform(location, bytemuck::cast_slice(cols));
    }

    fn uniform4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.state.write_uniform(location, bytemuck::cast_slice(&value));
    }

    fn enable(&mut self, capability: Capability) {
        match capability {
            Capability::ProgramPointSize => self.state.program_point_size = true,
        }
    }

    fn disable(&mut self, capability: Capability) {
        match capability {
            Capability::ProgramPointSize => self.state.program_point_size = false,
        }
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        let point_size = self
            .state
            .program
            .and_then(|id| self.programs.get(&id))
            .map_or(0.0, |entry| entry.desc.point_size);

        if let Some(draw) =
            self.state
                .record_draw(primitive, first, count, point_size, |id| self.buffer_size(id))
        {
            self.frame.draws.push(draw);
        }
    }
}
