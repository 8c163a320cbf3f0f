//! Test double for [`GpuContext`]: journals every call, validates handle use.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::RenderError;

use super::context::HandleAllocator;
use super::{
    AttribLocation, BufferId, Capability, GpuContext, Primitive, ProgramDesc, ProgramId,
    UniformLocation,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateProgram(ProgramId),
    DeleteProgram(ProgramId),
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer(Option<BufferId>),
    BufferData(usize),
    ClearColor([f32; 4]),
    Clear,
    UseProgram(Option<ProgramId>),
    AttribPointer { location: AttribLocation, components: u32, stride: u32, offset: u32 },
    EnableAttrib(AttribLocation),
    DisableAttrib(AttribLocation),
    UniformMatrix4(UniformLocation, [f32; 16]),
    Uniform4(UniformLocation, [f32; 4]),
    Enable(Capability),
    Disable(Capability),
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
}

/// Call log shared by every context built from it, so handle numbering and
/// liveness survive a context being dropped and replaced.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub calls: Vec<Call>,
    /// Uses of deleted or unknown handles.
    pub misuse: Vec<String>,
    /// When set, the next `create_program` fails to link.
    pub fail_link: bool,
    ids: HandleAllocator,
    programs: HashMap<ProgramId, &'static ProgramDesc>,
    buffers: HashSet<BufferId>,
    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
}

impl Journal {
    pub fn draws(&self) -> Vec<(Primitive, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::DrawArrays { primitive, first, count } => Some((primitive, first, count)),
                _ => None,
            })
            .collect()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn check_program(&mut self, program: ProgramId, op: &str) {
        if !self.programs.contains_key(&program) {
            self.misuse.push(format!("{op} on dead program {program:?}"));
        }
    }

    fn check_buffer(&mut self, buffer: BufferId, op: &str) {
        if !self.buffers.contains(&buffer) {
            self.misuse.push(format!("{op} on dead buffer {buffer:?}"));
        }
    }
}

pub(crate) struct RecordingContext {
    journal: Rc<RefCell<Journal>>,
}

impl RecordingContext {
    pub fn new() -> (Self, Rc<RefCell<Journal>>) {
        let journal = Rc::new(RefCell::new(Journal::default()));
        (Self::sharing(&journal), journal)
    }

    pub fn sharing(journal: &Rc<RefCell<Journal>>) -> Self {
        Self { journal: Rc::clone(journal) }
    }

    fn log(&self, call: Call) {
        self.journal.borrow_mut().calls.push(call);
    }
}

impl GpuContext for RecordingContext {
    fn create_program(&mut self, desc: &'static ProgramDesc) -> Result<ProgramId, RenderError> {
        let mut j = self.journal.borrow_mut();
        if std::mem::take(&mut j.fail_link) {
            return Err(RenderError::ShaderLink {
                label: desc.label,
                log: "forced link failure".to_string(),
            });
        }
        let id = j.ids.program();
        j.programs.insert(id, desc);
        j.calls.push(Call::CreateProgram(id));
        Ok(id)
    }

    fn delete_program(&mut self, program: ProgramId) {
        let mut j = self.journal.borrow_mut();
        if j.programs.remove(&program).is_none() {
            j.misuse.push(format!("double delete of {program:?}"));
        }
        if j.current_program == Some(program) {
            j.current_program = None;
        }
        j.calls.push(Call::DeleteProgram(program));
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let mut j = self.journal.borrow_mut();
        j.check_program(program, "attrib_location");
        j.programs.get(&program).and_then(|d| d.attribute(name))
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let mut j = self.journal.borrow_mut();
        j.check_program(program, "uniform_location");
        j.programs.get(&program).and_then(|d| d.uniform(name))
    }

    fn create_buffer(&mut self) -> BufferId {
        let mut j = self.journal.borrow_mut();
        let id = j.ids.buffer();
        j.buffers.insert(id);
        j.calls.push(Call::CreateBuffer(id));
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let mut j = self.journal.borrow_mut();
        if !j.buffers.remove(&buffer) {
            j.misuse.push(format!("double delete of {buffer:?}"));
        }
        if j.bound_buffer == Some(buffer) {
            j.bound_buffer = None;
        }
        j.calls.push(Call::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) {
        let mut j = self.journal.borrow_mut();
        if let Some(b) = buffer {
            j.check_buffer(b, "bind_buffer");
        }
        j.bound_buffer = buffer;
        j.calls.push(Call::BindBuffer(buffer));
    }

    fn buffer_data(&mut self, data: &[u8]) {
        let mut j = self.journal.borrow_mut();
        if j.bound_buffer.is_none() {
            j.misuse.push("buffer_data with no bound buffer".to_string());
        }
        j.calls.push(Call::BufferData(data.len()));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.log(Call::ClearColor(rgba));
    }

    fn clear(&mut self) {
        self.log(Call::Clear);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        let mut j = self.journal.borrow_mut();
        if let Some(p) = program {
            j.check_program(p, "use_program");
        }
        j.current_program = program;
        j.calls.push(Call::UseProgram(program));
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        components: u32,
        stride: u32,
        offset: u32,
    ) {
        let mut j = self.journal.borrow_mut();
        if j.bound_buffer.is_none() {
            j.misuse.push("vertex_attrib_pointer with no bound buffer".to_string());
        }
        j.calls.push(Call::AttribPointer { location, components, stride, offset });
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.log(Call::EnableAttrib(location));
    }

    fn disable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.log(Call::DisableAttrib(location));
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, cols: &[f32; 16]) {
        self.log(Call::UniformMatrix4(location, *cols));
    }

    fn uniform4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.log(Call::Uniform4(location, value));
    }

    fn enable(&mut self, capability: Capability) {
        self.log(Call::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.log(Call::Disable(capability));
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        let mut j = self.journal.borrow_mut();
        match (j.current_program, j.bound_buffer) {
            (Some(p), Some(b)) => {
                j.check_program(p, "draw_arrays");
                j.check_buffer(b, "draw_arrays");
            }
            _ => j.misuse.push("draw_arrays without program and buffer bound".to_string()),
        }
        j.calls.push(Call::DrawArrays { primitive, first, count });
    }
}
