use super::*;

impl Render for InspectorWindow {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        v_flex()
            .id(SharedString::from("inspector-root"))
            .track_focus(&self.focus_handle(cx))
            .size_full()
            .p_3()
            .gap_3()
            .bg(cx.theme().background)
            .text_color(cx.theme().foreground)
            .child(
                h_flex()
                    .w_full()
                    .items_center()
                    .justify_between()
                    .child(
                        div()
                            .text_xl()
                            .font_weight(gpui::FontWeight::SEMIBOLD)
                            .child("Image Metadata Inspector"),
                    )
                    .child(
                        Button::new("select-image")
                            .small()
                            .primary()
                            .icon(IconName::FolderOpen)
                            .label("Select image")
                            .on_click(cx.listener(|this, _, _, cx| this.browse_image(cx))),
                    ),
            )
            .child(
                h_flex()
                    .flex_1()
                    .w_full()
                    .gap_3()
                    .items_start()
                    .child(self.render_preview(cx))
                    .child(Divider::vertical().color(cx.theme().border))
                    .child(self.render_report(cx)),
            )
            .child(self.render_action_row(cx))
            .children(self.render_search_results(cx))
            .child(
                div()
                    .w_full()
                    .text_sm()
                    .text_color(cx.theme().muted_foreground)
                    .child(self.state.status().to_string()),
            )
    }
}

impl InspectorWindow {
    fn render_preview(&self, cx: &mut Context<Self>) -> AnyElement {
        let drop_target = cx.theme().drop_target;
        let (muted, muted_foreground) = (cx.theme().muted, cx.theme().muted_foreground);
        let preview = match self.state.image_path() {
            Some(path) => img(path.to_path_buf())
                .max_w(px(PREVIEW_SIZE))
                .max_h(px(PREVIEW_SIZE))
                .object_fit(ObjectFit::Contain)
                .with_fallback(move || {
                    image_fallback("No preview available".into(), muted, muted_foreground)
                })
                .into_any_element(),
            None => v_flex()
                .items_center()
                .gap_2()
                .text_color(cx.theme().muted_foreground)
                .child(Icon::new(IconName::FolderOpen).large())
                .child(div().text_sm().child("Drop an image here"))
                .into_any_element(),
        };

        div()
            .id(SharedString::from("preview"))
            .w(px(PREVIEW_SIZE))
            .h(px(PREVIEW_SIZE))
            .flex()
            .items_center()
            .justify_center()
            .bg(cx.theme().muted)
            .border_1()
            .border_color(cx.theme().border)
            .overflow_hidden()
            .can_drop(|value, _, _| value.is::<ExternalPaths>())
            .drag_over::<ExternalPaths>(move |style, _, _, _| style.bg(drop_target))
            .on_drop(cx.listener(|this, paths: &ExternalPaths, _, cx| {
                let dropped = paths.paths();
                let path = dropped
                    .iter()
                    .find(|path| formats::has_supported_extension(path))
                    .or_else(|| dropped.first());
                if let Some(path) = path {
                    this.load_image(path.clone(), cx);
                }
            }))
            .child(preview)
            .into_any_element()
    }

    fn render_report(&self, cx: &mut Context<Self>) -> AnyElement {
        let lines: Vec<AnyElement> = if self.state.report().is_empty() {
            vec![div()
                .text_color(cx.theme().muted_foreground)
                .child("No image selected")
                .into_any_element()]
        } else {
            self.state
                .report()
                .lines()
                .map(|line| div().min_h(px(16.0)).child(line.to_string()).into_any_element())
                .collect()
        };

        div()
            .id(SharedString::from("report-scroll"))
            .flex_1()
            .h_full()
            .overflow_y_scrollbar()
            .p_2()
            .border_1()
            .border_color(cx.theme().border)
            .child(v_flex().w_full().text_sm().children(lines))
            .into_any_element()
    }

    fn render_action_row(&self, cx: &mut Context<Self>) -> AnyElement {
        let has_image = self.state.record().is_some();
        let search_label = if self.state.is_searching() {
            "Searching..."
        } else {
            "Reverse image search"
        };

        h_flex()
            .w_full()
            .items_center()
            .gap_2()
            .child(
                Button::new("open-map")
                    .small()
                    .icon(IconName::ExternalLink)
                    .label("Open in Google Maps")
                    .disabled(!self.state.can_open_map())
                    .on_click(cx.listener(|this, _, _, cx| this.open_map(cx))),
            )
            .child(
                Button::new("save-metadata")
                    .small()
                    .icon(IconName::Check)
                    .label("Save metadata")
                    .disabled(!has_image)
                    .on_click(cx.listener(|this, _, _, cx| this.save_metadata(cx))),
            )
            .child(
                Button::new("reverse-search")
                    .small()
                    .icon(IconName::Search)
                    .label(search_label)
                    .disabled(!self.state.can_start_search())
                    .on_click(cx.listener(|this, _, _, cx| this.start_search(cx))),
            )
            .into_any_element()
    }

    fn render_search_results(&self, cx: &mut Context<Self>) -> Option<AnyElement> {
        let summary = self.state.search_summary()?;

        Some(
            div()
                .id(SharedString::from("search-results"))
                .w_full()
                .max_h(px(180.0))
                .overflow_y_scrollbar()
                .p_2()
                .bg(cx.theme().secondary)
                .border_1()
                .border_color(cx.theme().border)
                .child(
                    v_flex()
                        .w_full()
                        .text_sm()
                        .children(summary.lines().map(|line| div().child(line.to_string()))),
                )
                .into_any_element(),
        )
    }
}
