use anyhow::Result;
use tabletop_engine::device::GpuInit;
use tabletop_engine::logging::{init_logging, LoggingConfig};
use tabletop_engine::scene::SceneConfig;
use tabletop_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let scene = match std::env::args().nth(1).as_deref() {
        Some("flat") => SceneConfig::flat(),
        Some("flat-uniform") => SceneConfig::flat_uniform_color(),
        Some("ortho") => SceneConfig::orthographic(),
        Some("perspective") | None => SceneConfig::perspective(),
        Some(other) => {
            log::warn!("unknown scene preset `{other}`; using perspective");
            SceneConfig::perspective()
        }
    };
    log::info!("starting tabletop studio with {:?} shading", scene.shader);

    Runtime::run(RuntimeConfig::default(), GpuInit::default(), scene)
}
