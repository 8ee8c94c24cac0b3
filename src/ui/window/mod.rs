use std::path::PathBuf;
use std::time::Duration;

use crate::app::AppState;
use crate::config::AppConfig;
use crate::core::formats;
use crate::core::report::DEFAULT_EXPORT_NAME;
use crate::platform::open_url;
use gpui::{
    div, img, px, size, AnyElement, App, AppContext as _, Bounds, Context, ExternalPaths,
    FocusHandle, Focusable, Hsla, InteractiveElement as _, IntoElement, ObjectFit, ParentElement as _,
    Render, SharedString, Styled as _, StyledImage as _, Window,
    WindowBounds, WindowOptions,
};
use gpui_component::button::{Button, ButtonVariants as _};
use gpui_component::divider::Divider;
use gpui_component::scroll::ScrollableElement as _;
use gpui_component::theme::ActiveTheme;
use gpui_component::{h_flex, v_flex, Disableable as _, Icon, IconName, Root, Sizable as _};
use log::{error, info, warn};

mod actions;
mod render;
mod utils;

use self::utils::{image_fallback, show_error};

const PREVIEW_SIZE: f32 = 350.0;
const SEARCH_POLL_INTERVAL: Duration = Duration::from_millis(200);

struct InspectorWindow {
    state: AppState,
    focus_handle: FocusHandle,
}

impl InspectorWindow {
    fn new(config: &AppConfig, focus_handle: FocusHandle) -> Self {
        Self {
            state: AppState::new(config),
            focus_handle,
        }
    }
}

impl Focusable for InspectorWindow {
    fn focus_handle(&self, _: &App) -> FocusHandle {
        self.focus_handle.clone()
    }
}

pub fn open_inspector_window(config: AppConfig, cx: &mut App) -> anyhow::Result<()> {
    let bounds = Bounds::centered(None, size(px(1000.0), px(720.0)), cx);

    cx.open_window(
        WindowOptions {
            window_bounds: Some(WindowBounds::Windowed(bounds)),
            titlebar: Some(gpui::TitlebarOptions {
                title: Some("Image Metadata Inspector".into()),
                appears_transparent: false,
                traffic_light_position: None,
            }),
            ..Default::default()
        },
        move |window, cx| {
            let view = cx.new(|cx| InspectorWindow::new(&config, cx.focus_handle()));
            cx.new(|cx| Root::new(view, window, cx))
        },
    )?;

    Ok(())
}
