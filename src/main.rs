use exif_inspector::config::AppConfig;
use exif_inspector::ui::window::open_inspector_window;
use gpui::{App, Application};
use gpui_component_assets::Assets;
use log::{error, info, warn};

fn main() {
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    // RUST_LOG still wins over the configured level.
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .parse_default_env()
        .init();

    if let Some(err) = config_error {
        warn!("Ignoring invalid configuration, using defaults: {err}");
    }
    info!("Starting Image Metadata Inspector");

    Application::new().with_assets(Assets).run(move |cx: &mut App| {
        gpui_component::init(cx);
        if let Err(err) = open_inspector_window(config, cx) {
            error!("Failed to open window: {err}");
            cx.quit();
            return;
        }
        cx.activate(true);
    });
}
