use super::*;

impl InspectorWindow {
    pub(super) fn browse_image(&mut self, cx: &mut Context<Self>) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Select an image")
            .add_filter("Images", formats::SUPPORTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        self.load_image(path, cx);
    }

    pub(super) fn load_image(&mut self, path: PathBuf, cx: &mut Context<Self>) {
        match self.state.select_image(&path) {
            Ok(record) => info!(
                "Selected {} ({} EXIF entries)",
                record.file.path,
                record.exif.len()
            ),
            Err(err) => {
                error!("Failed to load {}: {err}", path.display());
                show_error("Could not load image", &err.to_string());
            }
        }

        cx.notify();
    }

    pub(super) fn open_map(&mut self, cx: &mut Context<Self>) {
        let Some(url) = self.state.map_url() else {
            return;
        };

        if let Err(err) = open_url(&url) {
            warn!("Failed to open {url}: {err}");
            show_error("Could not open map", &format!("{err}\n\n{url}"));
        }

        cx.notify();
    }

    pub(super) fn save_metadata(&mut self, cx: &mut Context<Self>) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save metadata")
            .set_file_name(DEFAULT_EXPORT_NAME)
            .add_filter("Text", &["txt"])
            .save_file()
        else {
            return;
        };

        if let Err(err) = self.state.export_report(&path) {
            error!("{err}");
            show_error("Could not save metadata", &err.to_string());
        }

        cx.notify();
    }

    pub(super) fn start_search(&mut self, cx: &mut Context<Self>) {
        if let Err(err) = self.state.start_search() {
            warn!("Reverse image search not started: {err}");
            show_error("Reverse image search", &err.to_string());
            cx.notify();
            return;
        }

        cx.spawn(async move |this, cx| {
            loop {
                cx.background_executor().timer(SEARCH_POLL_INTERVAL).await;
                let finished = this.update(cx, |this, cx| this.poll_search(cx))?;
                if finished {
                    break;
                }
            }
            anyhow::Ok(())
        })
        .detach();

        cx.notify();
    }

    /// Returns true once the outcome has been handed over.
    fn poll_search(&mut self, cx: &mut Context<Self>) -> bool {
        let outcome = self.state.poll_search();
        cx.notify();

        match outcome {
            Some(Err(failure)) => {
                show_error("Reverse image search failed", &failure.to_string());
                true
            }
            Some(Ok(_)) => true,
            None => !self.state.is_searching(),
        }
    }
}
