mod app;
mod canvas;
mod engine;
mod error;
mod export;
mod geometry;
mod mask;
mod preprocess;
mod session;
mod settings;
mod view;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui;

use crate::engine::{CommandEngine, TemplateEngine};
use crate::settings::Settings;

const USAGE: &str = "Usage: polygon-template [--config <settings.json>] [image]";

struct Args {
    config: Option<PathBuf>,
    image: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        image: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config needs a file")?;
                args.config = Some(PathBuf::from(value));
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            _ if args.image.is_none() && !arg.starts_with('-') => {
                args.image = Some(PathBuf::from(arg));
            }
            _ => return Err(format!("unexpected argument '{arg}'\n{USAGE}")),
        }
    }
    Ok(args)
}

/// Report a start-up failure and stop; nothing can run without settings and engine.
fn fatal(title: &str, message: &str) -> ! {
    log::error!("{message}");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
    std::process::exit(1);
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let loaded = Settings::discover(args.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|(settings, _)| settings.log_level)
        .unwrap_or_default();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_level_filter().as_str()),
    )
    .init();

    let settings = match loaded {
        Ok((settings, Some(path))) => {
            log::info!("settings loaded from {}", path.display());
            settings
        }
        Ok((settings, None)) => {
            log::info!("no settings file, using defaults");
            settings
        }
        Err(err) => fatal("Settings error", &err.to_string()),
    };

    let engine = match CommandEngine::negotiate(&settings) {
        Ok(engine) => {
            log::debug!(
                "engine operations: {}",
                engine.capabilities().operations.join(", ")
            );
            Arc::new(engine)
        }
        Err(err) => fatal(
            "Template engine unavailable",
            &format!("{err}\n\nCheck install_root and engine_path in the settings file."),
        ),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Polygon template maker"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "polygon-template",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::TemplateApp::new(
                cc,
                settings,
                engine,
                args.image,
            )))
        }),
    );
    if let Err(err) = result {
        log::error!("UI failed: {err}");
        std::process::exit(1);
    }
}
