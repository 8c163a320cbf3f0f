use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::{GpuInit, SurfaceErrorAction};
use crate::gfx::WgpuContext;
use crate::scene::{HostCommand, HostRequests, Phase, SceneConfig, Signal, SurfaceController};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tabletop".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives the table scene in it until the window is
    /// closed or the surface fails fatally.
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = HostState::new(config, gpu_init, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    /// Redraws asked for by the controller and not yet delivered. winit
    /// coalesces them into one `RedrawRequested`.
    self_redraws_pending: u32,

    window: Window,

    #[borrows(window)]
    #[covariant]
    controller: SurfaceController<WgpuContext<'this>>,
}

/// Platform happenings the controller cares about.
#[derive(Debug, Copy, Clone)]
enum HostEvent {
    Show,
    Hide,
    Resized(PhysicalSize<u32>),
    Redraw,
}

struct HostState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    scene: SceneConfig,

    entry: Option<WindowEntry>,
    exit_requested: bool,
}

impl HostState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, scene: SceneConfig) -> Self {
        Self {
            config,
            gpu_init,
            scene,
            entry: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let scene = self.scene;
        let entry = WindowEntryBuilder {
            self_redraws_pending: 0,
            window,
            controller_builder: |_window| SurfaceController::new(&scene),
        }
        .build();

        self.entry = Some(entry);
        Ok(())
    }

    /// Turns one platform event into controller signals, then carries out the
    /// commands the controller emitted.
    ///
    /// Returns `false` when the surface failed in a way rendering cannot
    /// recover from.
    fn drive(&mut self, event: HostEvent) -> bool {
        let (entry, gpu_init) = (&mut self.entry, &self.gpu_init);
        let Some(entry) = entry.as_mut() else {
            return true;
        };

        let mut host = HostRequests::new();
        let mut healthy = true;

        entry.with_mut(|fields| {
            let window: &Window = fields.window;
            let controller = &mut *fields.controller;

            match event {
                HostEvent::Show => {
                    if controller.phase() != Phase::Dormant {
                        return;
                    }
                    let context = match pollster::block_on(WgpuContext::new(window, gpu_init.clone())) {
                        Ok(context) => context,
                        Err(err) => {
                            log::error!("GPU initialization failed: {err:#}");
                            return;
                        }
                    };
                    controller.handle(
                        Signal::VisibilityChanged {
                            visible: true,
                            context: Some(context),
                        },
                        &mut host,
                    );
                    controller.handle(resized(window.inner_size()), &mut host);
                }
                HostEvent::Hide => controller.handle(
                    Signal::VisibilityChanged {
                        visible: false,
                        context: None,
                    },
                    &mut host,
                ),
                HostEvent::Resized(size) => {
                    if let Some(context) = controller.context_mut() {
                        context.resize(size);
                    }
                    controller.handle(resized(size), &mut host);
                }
                HostEvent::Redraw => match std::mem::take(fields.self_redraws_pending) {
                    0 => controller.handle(Signal::PaintRequested { external: true }, &mut host),
                    pending => {
                        for _ in 0..pending {
                            controller.handle(Signal::PaintRequested { external: false }, &mut host);
                        }
                    }
                },
            }

            for command in host.drain() {
                match command {
                    HostCommand::RequestPaint => {
                        *fields.self_redraws_pending += 1;
                        window.request_redraw();
                    }
                    HostCommand::PublishFrame => {
                        window.pre_present_notify();
                        let Some(context) = controller.context_mut() else {
                            continue;
                        };
                        match context.present() {
                            Ok(()) => {}
                            Err(SurfaceErrorAction::Fatal) => healthy = false,
                            Err(action) => log::debug!("frame not presented ({action:?})"),
                        }
                    }
                }
            }
        });

        healthy
    }

    fn drive_or_exit(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        if !self.drive(event) {
            log::error!("fatal surface error; exiting");
            self.request_exit();
            event_loop.exit();
        }
    }

    fn owns(&self, window_id: WindowId) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.with_window(|w| w.id()) == window_id)
    }
}

impl ApplicationHandler for HostState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_none() {
            if let Err(e) = self.create_window_entry(event_loop) {
                log::error!("failed to create window: {e:#}");
                self.request_exit();
                event_loop.exit();
                return;
            }
        }

        self.drive_or_exit(event_loop, HostEvent::Show);
    }

    fn suspended(&mut self, event_loop: &ActiveEventLoop) {
        self.drive_or_exit(event_loop, HostEvent::Hide);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Redraws are requested by the controller, never by the loop.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        if !self.owns(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.drive(HostEvent::Hide);
                self.entry = None;
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Occluded(true) => self.drive_or_exit(event_loop, HostEvent::Hide),
            WindowEvent::Occluded(false) => self.drive_or_exit(event_loop, HostEvent::Show),

            WindowEvent::Resized(new_size) => {
                self.drive_or_exit(event_loop, HostEvent::Resized(new_size));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(new_size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.drive_or_exit(event_loop, HostEvent::Resized(new_size));
                }
            }

            WindowEvent::RedrawRequested => self.drive_or_exit(event_loop, HostEvent::Redraw),

            _ => {}
        }
    }
}

fn resized<C>(size: PhysicalSize<u32>) -> Signal<C> {
    Signal::Resized {
        width: to_signed(size.width),
        height: to_signed(size.height),
    }
}

fn to_signed(px: u32) -> i32 {
    i32::try_from(px).unwrap_or(i32::MAX)
}
