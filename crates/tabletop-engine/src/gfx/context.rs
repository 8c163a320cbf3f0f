use std::num::NonZeroU32;

use crate::error::RenderError;

/// Linked shader program handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(NonZeroU32);

/// GPU buffer handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(NonZeroU32);

/// Vertex attribute slot of a program. Only valid while that program lives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttribLocation(pub u32);

/// Uniform slot of a program (byte offset into its uniform block).
/// Only valid while that program lives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Primitive assembly mode for [`GpuContext::draw_arrays`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Triangles sharing the first vertex of the range.
    TriangleFan,
    /// Independent segments, two vertices each.
    Lines,
    /// One vertex each, one pixel or a sprite of the program's point size.
    Points,
}

/// Toggleable pipeline capabilities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Rasterize points at the program's point size instead of a single pixel.
    ProgramPointSize,
}

/// Static description of a shader program plus its reflection data.
///
/// `source` is WGSL and must export `vs_main`, `vs_point` (point-sprite
/// expansion, one quad corner per `vertex_index`) and `fs_main`.
#[derive(Debug)]
pub struct ProgramDesc {
    /// Debug label for the shader module and its pipelines.
    pub label: &'static str,
    /// WGSL source.
    pub source: &'static str,
    /// Attribute name → shader location.
    pub attributes: &'static [(&'static str, u32)],
    /// Uniform name → byte offset in the program's uniform block.
    pub uniforms: &'static [(&'static str, u32)],
    /// Point size in pixels when [`Capability::ProgramPointSize`] is enabled.
    pub point_size: f32,
}

impl ProgramDesc {
    /// Location of the active attribute `name`, if the program declares it.
    pub fn attribute(&self, name: &str) -> Option<AttribLocation> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, loc)| AttribLocation(loc))
    }

    /// Location of the active uniform `name`, if the program declares it.
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, offset)| UniformLocation(offset))
    }
}

/// GL-style GPU command surface.
///
/// Object handles are never reused within a context, so a stale handle can
/// never alias a live object. State (bound program/buffer, attribute pointers,
/// uniform values, capabilities) is sticky until changed.
pub trait GpuContext {
    /// Compiles and links a program.
    fn create_program(&mut self, desc: &'static ProgramDesc) -> Result<ProgramId, RenderError>;
    /// Deletes a program. Unknown handles are ignored.
    fn delete_program(&mut self, program: ProgramId);

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Allocates an empty buffer handle.
    fn create_buffer(&mut self) -> BufferId;
    /// Deletes a buffer and any attribute pointers sourcing it.
    fn delete_buffer(&mut self, buffer: BufferId);
    /// Binds `buffer` as the target of uploads and attribute pointers.
    fn bind_buffer(&mut self, buffer: Option<BufferId>);
    /// Uploads `data` once into the bound buffer (static usage).
    fn buffer_data(&mut self, data: &[u8]);

    /// Sets the color used by [`clear`](Self::clear).
    fn clear_color(&mut self, rgba: [f32; 4]);
    /// Clears the color buffer to the current clear color.
    fn clear(&mut self);

    /// Makes `program` current for subsequent draws.
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Sources `location` from the bound buffer. `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        components: u32,
        stride: u32,
        offset: u32,
    );
    fn enable_vertex_attrib_array(&mut self, location: AttribLocation);
    fn disable_vertex_attrib_array(&mut self, location: AttribLocation);

    /// Uploads a column-major 4×4 matrix.
    fn uniform_matrix4(&mut self, location: UniformLocation, cols: &[f32; 16]);
    /// Uploads a `vec4` (e.g. `u_Color`).
    fn uniform4(&mut self, location: UniformLocation, value: [f32; 4]);

    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);

    /// Draws `count` vertices starting at `first` with the current state.
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);
}

/// Monotonic handle source shared by context implementations.
#[derive(Debug, Default)]
pub(crate) struct HandleAllocator {
    last: u32,
}

impl HandleAllocator {
    fn next(&mut self) -> NonZeroU32 {
        self.last = self.last.saturating_add(1);
        NonZeroU32::new(self.last).unwrap_or(NonZeroU32::MAX)
    }

    pub(crate) fn program(&mut self) -> ProgramId {
        ProgramId(self.next())
    }

    pub(crate) fn buffer(&mut self) -> BufferId {
        BufferId(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DESC: ProgramDesc = ProgramDesc {
        label: "test",
        source: "",
        attributes: &[("a_Position", 0), ("a_Color", 1)],
        uniforms: &[("u_Matrix", 0)],
        point_size: 1.0,
    };

    #[test]
    fn reflection_resolves_declared_names() {
        assert_eq!(DESC.attribute("a_Color"), Some(AttribLocation(1)));
        assert_eq!(DESC.uniform("u_Matrix"), Some(UniformLocation(0)));
    }

    #[test]
    fn reflection_misses_undeclared_names() {
        assert_eq!(DESC.attribute("a_Normal"), None);
        assert_eq!(DESC.uniform("u_Color"), None);
    }

    #[test]
    fn allocator_never_repeats_across_kinds() {
        let mut ids = HandleAllocator::default();
        let p = ids.program();
        let b = ids.buffer();
        let p2 = ids.program();
        assert_ne!(p, p2);
        assert_ne!(p.0, b.0);
        assert_ne!(b.0, p2.0);
    }
}
