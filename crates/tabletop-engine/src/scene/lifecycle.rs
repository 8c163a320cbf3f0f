//! Surface lifecycle: when GPU resources may be created, used and destroyed.

use crate::coords::SurfaceSize;
use crate::gfx::GpuContext;

use super::config::SceneConfig;
use super::renderer::Renderer;
use super::transform::{TransformPipeline, TransformState};

/// Host signal, processed to completion one at a time.
#[derive(Debug)]
pub enum Signal<C> {
    /// The surface crossed the visibility boundary. A context accompanies
    /// `visible == true`; it is owned by the controller until the matching
    /// `visible == false`.
    VisibilityChanged { visible: bool, context: Option<C> },
    /// New drawable size in pixels. Non-positive sizes are rejected.
    Resized { width: i32, height: i32 },
    /// `external` marks paints the controller did not ask for.
    PaintRequested { external: bool },
}

/// Work the controller asks the host to perform after a signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Schedule a non-external `PaintRequested`.
    RequestPaint,
    /// Present the frame that was just drawn.
    PublishFrame,
}

/// Commands emitted while handling signals, drained by the host.
#[derive(Debug, Default)]
pub struct HostRequests {
    commands: Vec<HostCommand>,
}

impl HostRequests {
    /// An empty request buffer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_paint(&mut self) {
        self.commands.push(HostCommand::RequestPaint);
    }

    pub fn publish_frame(&mut self) {
        self.commands.push(HostCommand::PublishFrame);
    }

    /// Commands emitted so far, in order.
    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Removes and yields every buffered command in order.
    pub fn drain(&mut self) -> impl Iterator<Item = HostCommand> + '_ {
        self.commands.drain(..)
    }
}

/// Where a [`SurfaceController`] is in the surface lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No context; nothing may touch the GPU.
    Dormant,
    /// Context acquired, waiting for a valid size.
    Ready,
    /// Context and transform available; paints draw.
    Rendering,
}

/// The surface as last reported by the host.
#[derive(Debug)]
pub struct SurfaceState<C> {
    /// Present between visibility gained and visibility lost.
    pub context: Option<C>,
    /// Latest valid size, kept across hide/show.
    pub size: Option<SurfaceSize>,
}

impl<C> Default for SurfaceState<C> {
    fn default() -> Self {
        Self {
            context: None,
            size: None,
        }
    }
}

/// Drives a [`Renderer`] from host signals.
///
/// Domain errors are logged and swallowed here; the worst outcome for the host
/// is a surface with nothing drawn on it.
pub struct SurfaceController<C> {
    surface: SurfaceState<C>,
    phase: Phase,
    renderer: Renderer,
    pipeline: TransformPipeline,
    /// Computed on each valid resize, in any phase.
    transform: Option<TransformState>,
    /// A self-requested paint is in flight; at most one at a time.
    paint_outstanding: bool,
    /// Self-requested paints issued before the last hide and not yet
    /// delivered. Each is dropped on arrival.
    stale_paints: u32,
    /// Frames drawn and handed to the host for publishing.
    frames_drawn: u64,
}

impl<C: GpuContext> SurfaceController<C> {
    /// A dormant controller for `config`. Nothing touches the GPU until a
    /// context arrives with visibility.
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            surface: SurfaceState::default(),
            phase: Phase::Dormant,
            renderer: Renderer::new(config),
            pipeline: TransformPipeline::new(config.transform),
            transform: None,
            paint_outstanding: false,
            stale_paints: 0,
            frames_drawn: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Transform of the latest valid resize.
    pub fn transform(&self) -> Option<&TransformState> {
        self.transform.as_ref()
    }

    /// Latest valid surface size.
    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.surface.size
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The live context, if any (the host uses it to present).
    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.surface.context.as_mut()
    }

    /// Frames drawn since creation.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Processes one signal to completion, appending any host work to `host`.
    pub fn handle(&mut self, signal: Signal<C>, host: &mut HostRequests) {
        match signal {
            Signal::VisibilityChanged {
                visible: true,
                context,
            } => self.on_visible(context, host),
            Signal::VisibilityChanged { visible: false, .. } => self.on_hidden(),
            Signal::Resized { width, height } => {
                self.on_resized(SurfaceSize::new(width, height), host)
            }
            Signal::PaintRequested { external } => self.on_paint(external, host),
        }
    }

    // ── transitions ────────────────────────────────────────────────────────

    fn on_visible(&mut self, context: Option<C>, host: &mut HostRequests) {
        if self.phase != Phase::Dormant {
            log::warn!("visibility gained while {:?}; ignored", self.phase);
            return;
        }
        let Some(mut ctx) = context else {
            log::warn!("visibility gained without a GPU context; staying dormant");
            return;
        };

        if let Err(err) = self.renderer.acquire(&mut ctx) {
            log::error!("failed to acquire render resources: {err}");
            return;
        }

        self.surface.context = Some(ctx);
        self.phase = Phase::Ready;
        log::debug!("surface Dormant -> Ready");
        self.request_paint(host);
    }

    fn on_hidden(&mut self) {
        if let Some(mut ctx) = self.surface.context.take() {
            self.renderer.release(&mut ctx);
        }
        if self.phase != Phase::Dormant {
            log::debug!("surface {:?} -> Dormant", self.phase);
        }
        self.phase = Phase::Dormant;
        if std::mem::take(&mut self.paint_outstanding) {
            self.stale_paints += 1;
        }
    }

    fn on_resized(&mut self, size: SurfaceSize, host: &mut HostRequests) {
        let transform = match self.pipeline.recompute(size) {
            Ok(transform) => transform,
            Err(err) => {
                log::warn!("{err}; keeping previous transform");
                return;
            }
        };
        self.transform = Some(transform);
        self.surface.size = Some(size);

        match self.phase {
            Phase::Dormant => {
                log::debug!("resize to {}x{} recorded while dormant", size.width, size.height);
            }
            Phase::Ready => {
                self.phase = Phase::Rendering;
                log::debug!("surface Ready -> Rendering at {}x{}", size.width, size.height);
                self.request_paint(host);
            }
            Phase::Rendering => self.request_paint(host),
        }
    }

    fn on_paint(&mut self, external: bool, host: &mut HostRequests) {
        if external {
            log::trace!("external paint ignored");
            return;
        }
        if self.stale_paints > 0 {
            self.stale_paints -= 1;
            log::trace!("paint requested before hide dropped");
            return;
        }
        self.paint_outstanding = false;

        if self.phase != Phase::Rendering {
            log::trace!("paint while {:?} dropped", self.phase);
            return;
        }

        let (Some(ctx), Some(transform)) = (self.surface.context.as_mut(), self.transform.as_ref())
        else {
            log::warn!("paint while rendering without context or transform; dropped");
            return;
        };

        match self.renderer.draw_frame(ctx, &transform.combined) {
            Ok(()) => {
                self.frames_drawn += 1;
                host.publish_frame();
                self.request_paint(host);
            }
            Err(err) => log::error!("frame not drawn: {err}"),
        }
    }

    fn request_paint(&mut self, host: &mut HostRequests) {
        if self.paint_outstanding {
            return;
        }
        self.paint_outstanding = true;
        host.request_paint();
    }
}
