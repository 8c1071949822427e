//! Application settings.
//!
//! Installation paths and the fixed calibration geometry handed to the
//! template engine live here instead of in code. Settings are read from a JSON
//! file; any field left out falls back to its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "polygon-template.json";

/// Environment variable naming a settings file.
pub const SETTINGS_ENV: &str = "POLYGON_TEMPLATE_CONFIG";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Reference circle the engine searches for, in image row/column space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCircle {
    pub row: i32,
    pub col: i32,
    pub min_radius: f64,
    pub max_radius: f64,
}

impl Default for ReferenceCircle {
    fn default() -> Self {
        Self {
            row: 172,
            col: 197,
            min_radius: 1.0,
            max_radius: 10.0,
        }
    }
}

/// A closed contour as parallel coordinate lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub x: Vec<i32>,
    pub y: Vec<i32>,
}

fn default_contours() -> Vec<Contour> {
    vec![
        Contour {
            x: vec![103, 289, 266, 139, 103],
            y: vec![88, 83, 253, 258, 88],
        },
        Contour {
            x: vec![593, 945, 948, 947, 956, 1310, 1320, 599, 597, 593, 593],
            y: vec![292, 287, 499, 517, 592, 593, 875, 882, 538, 471, 292],
        },
    ]
}

/// Everything the application needs from its environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the vision library installation
    pub install_root: PathBuf,

    /// Executable wrapping the template engine
    pub engine_path: PathBuf,

    pub reference_circle: ReferenceCircle,

    pub reference_contours: Vec<Contour>,

    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("engine"),
            engine_path: PathBuf::from("engine/bin/template-engine"),
            reference_circle: ReferenceCircle::default(),
            reference_contours: default_contours(),
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &json)
    }

    /// Load from `explicit`, else [`SETTINGS_ENV`], else [`DEFAULT_SETTINGS_FILE`]
    /// if it exists, else defaults. Returns the file used, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), SettingsError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(SETTINGS_ENV).map(PathBuf::from))
            .or_else(|| {
                let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
                fallback.exists().then_some(fallback)
            });

        match path {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let circle = &self.reference_circle;
        if !(circle.min_radius >= 0.0 && circle.min_radius <= circle.max_radius) {
            return Err(SettingsError::Invalid {
                field: "reference_circle".into(),
                message: format!(
                    "radius bounds {}..{} are not ordered",
                    circle.min_radius, circle.max_radius
                ),
            });
        }
        for (i, contour) in self.reference_contours.iter().enumerate() {
            if contour.x.len() != contour.y.len() {
                return Err(SettingsError::Invalid {
                    field: format!("reference_contours[{i}]"),
                    message: format!(
                        "{} x values but {} y values",
                        contour.x.len(),
                        contour.y.len()
                    ),
                });
            }
            if contour.x.len() < 3 {
                return Err(SettingsError::Invalid {
                    field: format!("reference_contours[{i}]"),
                    message: "a contour needs at least 3 points".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Settings, SettingsError> {
        Settings::from_json(Path::new("test.json"), json)
    }

    #[test]
    fn defaults_carry_calibration_geometry() {
        let settings = Settings::default();
        assert_eq!(settings.reference_circle.row, 172);
        assert_eq!(settings.reference_circle.col, 197);
        assert_eq!(settings.reference_contours.len(), 2);
        assert_eq!(settings.reference_contours[1].x.len(), 11);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings = parse(r#"{ "install_root": "/opt/vision", "log_level": "debug" }"#).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/opt/vision"));
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.reference_circle, ReferenceCircle::default());
        assert_eq!(settings.reference_contours, default_contours());
    }

    #[test]
    fn full_settings_parse() {
        let settings = parse(
            r#"{
                "install_root": "/opt/vision",
                "engine_path": "/opt/vision/bin/engine",
                "reference_circle": { "row": 10, "col": 20, "min_radius": 2.0, "max_radius": 4.0 },
                "reference_contours": [ { "x": [0, 10, 10], "y": [0, 0, 10] } ]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.reference_circle.max_radius, 4.0);
        assert_eq!(settings.reference_contours.len(), 1);
    }

    #[test]
    fn mismatched_contour_is_rejected() {
        let err = parse(r#"{ "reference_contours": [ { "x": [0, 1, 2], "y": [0, 1] } ] }"#)
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { ref field, .. } if field == "reference_contours[0]"));
    }

    #[test]
    fn inverted_radius_bounds_are_rejected() {
        let err = parse(
            r#"{ "reference_circle": { "row": 0, "col": 0, "min_radius": 5.0, "max_radius": 1.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { .. }));
    }

    #[test]
    fn malformed_json_reports_path() {
        let err = parse("{ not json").unwrap_err();
        assert!(err.to_string().contains("test.json"));
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn settings_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!(
            "polygon-template-{}-settings.json",
            std::process::id()
        ));
        let mut settings = Settings::default();
        settings.log_level = LogLevel::Trace;
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let (loaded, used) = Settings::discover(Some(&path)).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
        assert_eq!(used, Some(path));
    }
}
