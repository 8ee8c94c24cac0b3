use super::*;

/// Placeholder shown in the preview when the picked file cannot be rendered.
pub(super) fn image_fallback(message: SharedString, background: Hsla, foreground: Hsla) -> AnyElement {
    v_flex()
        .size_full()
        .items_center()
        .justify_center()
        .gap_2()
        .bg(background)
        .text_color(foreground)
        .child(Icon::new(IconName::CircleX).large())
        .child(div().text_sm().child(message))
        .into_any_element()
}

/// Blocking error modal.
pub(super) fn show_error(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
