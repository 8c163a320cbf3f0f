use crate::coords::Mat4;
use crate::error::RenderError;
use crate::gfx::{
    AttribLocation, BufferId, Capability, GpuContext, Primitive, ProgramDesc, ProgramId,
    UniformLocation,
};

use super::config::SceneConfig;
use super::geometry::{TABLE_DRAWS, VertexLayout};
use super::program::{A_COLOR, A_POSITION, U_COLOR, U_MATRIX};

/// Handles owned by an acquired [`Renderer`]. Valid only in the context they
/// were created in, until the matching release.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderResources {
    pub program: ProgramId,
    pub buffer: BufferId,
    pub position: AttribLocation,
    pub color: Option<AttribLocation>,
    pub matrix: Option<UniformLocation>,
    pub flat_color: Option<UniformLocation>,
}

/// Draws the table through a [`GpuContext`].
///
/// GPU objects exist only between [`acquire`](Self::acquire) and
/// [`release`](Self::release), and always belong to the context passed to
/// `acquire`.
#[derive(Debug)]
pub struct Renderer {
    program: &'static ProgramDesc,
    layout: VertexLayout,
    clear_color: [f32; 4],
    resources: Option<RenderResources>,
}

impl Renderer {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            program: config.shader.program(),
            layout: config.shader.layout(),
            clear_color: config.clear_color,
            resources: None,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.resources.is_some()
    }

    pub fn resources(&self) -> Option<&RenderResources> {
        self.resources.as_ref()
    }

    /// Links the program and uploads the table into a fresh buffer.
    ///
    /// On failure nothing is left allocated and the renderer stays unacquired.
    pub fn acquire<C: GpuContext>(&mut self, ctx: &mut C) -> Result<(), RenderError> {
        if self.resources.is_some() {
            log::warn!("renderer acquired twice; keeping existing resources");
            return Ok(());
        }

        let program = ctx.create_program(self.program)?;

        let Some(position) = ctx.attrib_location(program, A_POSITION) else {
            ctx.delete_program(program);
            return Err(RenderError::ShaderLink {
                label: self.program.label,
                log: format!("no active attribute `{A_POSITION}`"),
            });
        };

        let color = match self.layout.color_components {
            Some(_) => {
                let location = ctx.attrib_location(program, A_COLOR);
                if location.is_none() {
                    log::warn!("`{}` has no `{A_COLOR}`; vertex colors ignored", self.program.label);
                }
                location
            }
            None => None,
        };
        let matrix = ctx.uniform_location(program, U_MATRIX);
        let flat_color = ctx.uniform_location(program, U_COLOR);

        let buffer = ctx.create_buffer();
        ctx.bind_buffer(Some(buffer));
        ctx.buffer_data(self.layout.table_bytes());
        ctx.bind_buffer(None);

        self.resources = Some(RenderResources {
            program,
            buffer,
            position,
            color,
            matrix,
            flat_color,
        });

        log::debug!("renderer acquired: program {program:?}, buffer {buffer:?}");
        Ok(())
    }

    /// Issues one frame: clear, then fan, centerline and both mallets.
    pub fn draw_frame<C: GpuContext>(
        &self,
        ctx: &mut C,
        combined: &Mat4,
    ) -> Result<(), RenderError> {
        let res = self.resources.ok_or(RenderError::StaleContextUse)?;
        let layout = self.layout;
        let stride = layout.stride();

        ctx.clear_color(self.clear_color);
        ctx.clear();

        ctx.use_program(Some(res.program));
        ctx.bind_buffer(Some(res.buffer));

        ctx.vertex_attrib_pointer(
            res.position,
            layout.position_components,
            stride,
            layout.position_offset(),
        );
        ctx.enable_vertex_attrib_array(res.position);

        let color = match (res.color, layout.color_components, layout.color_offset()) {
            (Some(location), Some(components), Some(offset)) => {
                ctx.vertex_attrib_pointer(location, components, stride, offset);
                ctx.enable_vertex_attrib_array(location);
                Some(location)
            }
            _ => None,
        };

        if let Some(matrix) = res.matrix {
            ctx.uniform_matrix4(matrix, &combined.to_cols_array());
        }

        let mut sized_points = false;
        for range in TABLE_DRAWS {
            if range.primitive == Primitive::Points && !sized_points {
                ctx.enable(Capability::ProgramPointSize);
                sized_points = true;
            }
            if let Some(flat_color) = res.flat_color {
                ctx.uniform4(flat_color, range.color);
            }
            ctx.draw_arrays(range.primitive, range.first, range.count);
        }
        if sized_points {
            ctx.disable(Capability::ProgramPointSize);
        }

        if let Some(location) = color {
            ctx.disable_vertex_attrib_array(location);
        }
        ctx.disable_vertex_attrib_array(res.position);

        Ok(())
    }

    /// Deletes the program and buffer. No-op when not acquired.
    pub fn release<C: GpuContext>(&mut self, ctx: &mut C) {
        let Some(res) = self.resources.take() else {
            return;
        };
        ctx.delete_buffer(res.buffer);
        ctx.delete_program(res.program);
        log::debug!("renderer released: program {:?}, buffer {:?}", res.program, res.buffer);
    }
}
