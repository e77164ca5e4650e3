use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config;
use crate::data::SampleLibrary;
use crate::page::ViewMode;
use crate::resize::{ResizeController, WidthBounds};
use crate::storage;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let store =
        Arc::new(storage::Store::open(storage::Options::default()).context("open storage")?);

    // Read failures for either setting degrade to the defaults; a broken
    // state database never blocks startup.
    let saved_width = store.get_setting(storage::ARTICLE_WIDTH_KEY).ok().flatten();
    let saved_view = store.get_setting(storage::VIEW_MODE_KEY).ok().flatten();

    let bounds = WidthBounds::from_config(&cfg.layout);
    let controller = ResizeController::restore(bounds, saved_width.as_deref());
    let view = ViewMode::from_setting(saved_view.as_deref());

    let library = Arc::new(SampleLibrary::new());
    let feeds = library.feed_ids();

    let options = ui::Options {
        status_message:
            "Browsing feeds. j/k to navigate, Enter to open, v to switch views, q to quit."
                .to_string(),
        feeds,
        view,
        theme: cfg.ui.theme.clone(),
        tick_rate: cfg.ui.tick_rate,
        feed_service: library.clone(),
        article_service: library,
        controller,
        store: store.clone(),
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    Ok(())
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/lector/config.yaml".to_string()
    }
}
