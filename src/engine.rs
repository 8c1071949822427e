//! Binding to the external template engine.
//!
//! The engine is a black box shipped with the vision library. It is reached
//! through the [`TemplateEngine`] trait; [`CommandEngine`] is the binding used
//! by the application, which drives the engine's command-line adapter:
//!
//! - `<engine> capabilities` prints a JSON [`Capabilities`] document.
//! - `<engine> create-template` reads a JSON [`TemplateRequest`] on stdin and
//!   exits with status 0 on success. On failure the message is on stderr.
//!
//! Capabilities are checked once, in [`CommandEngine::negotiate`], so a missing
//! or mismatched engine stops the application at start-up rather than in the
//! middle of a save.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geometry::Vertex;
use crate::settings::{Contour, Settings};

/// Operation name the engine must advertise.
pub const CREATE_TEMPLATE: &str = "create_template";

/// Environment variable pointing the engine at its installation.
pub const ENGINE_ROOT_ENV: &str = "ENGINE_ROOT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub operations: Vec<String>,
}

impl Capabilities {
    pub fn supports(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == operation)
    }

    /// Fail with a diagnostic naming what the engine does offer.
    pub fn require(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(EngineError::Unsupported {
                engine: self.name.clone(),
                operation,
                offered: self.operations.join(", "),
            })
        }
    }
}

/// Everything the engine needs to build one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRequest {
    pub image_path: PathBuf,
    pub output_prefix: PathBuf,
    pub circle_row: i32,
    pub circle_col: i32,
    pub radius_min: f64,
    pub radius_max: f64,
    pub reference_contours: Vec<Contour>,
    /// Polygon rows (image y), in draw order.
    pub corner_rows: Vec<i32>,
    /// Polygon columns (image x), in draw order.
    pub corner_cols: Vec<i32>,
}

impl TemplateRequest {
    pub fn new(
        settings: &Settings,
        image_path: &Path,
        output_prefix: &Path,
        polygon: &[Vertex],
    ) -> Self {
        let circle = settings.reference_circle;
        Self {
            image_path: image_path.to_path_buf(),
            output_prefix: output_prefix.to_path_buf(),
            circle_row: circle.row,
            circle_col: circle.col,
            radius_min: circle.min_radius,
            radius_max: circle.max_radius,
            reference_contours: settings.reference_contours.clone(),
            corner_rows: polygon.iter().map(|v| v.y).collect(),
            corner_cols: polygon.iter().map(|v| v.x).collect(),
        }
    }
}

pub trait TemplateEngine: Send + Sync {
    fn capabilities(&self) -> &Capabilities;

    fn create_template(&self, request: &TemplateRequest) -> Result<(), EngineError>;
}

// ── Command-line binding ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    install_root: PathBuf,
    capabilities: Capabilities,
}

impl CommandEngine {
    /// Check the installation, query the engine and require [`CREATE_TEMPLATE`].
    pub fn negotiate(settings: &Settings) -> Result<Self, EngineError> {
        if !settings.install_root.is_dir() {
            return Err(EngineError::Missing {
                what: "engine installation",
                path: settings.install_root.clone(),
            });
        }
        if !settings.engine_path.is_file() {
            return Err(EngineError::Missing {
                what: "template engine",
                path: settings.engine_path.clone(),
            });
        }

        let mut engine = Self {
            program: settings.engine_path.clone(),
            install_root: settings.install_root.clone(),
            capabilities: Capabilities {
                name: String::new(),
                version: String::new(),
                operations: Vec::new(),
            },
        };

        let output = engine
            .command("capabilities")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| engine.spawn_error(source))?;
        if !output.status.success() {
            return Err(EngineError::Failed(failure_message(&output)));
        }

        engine.capabilities = serde_json::from_slice(&output.stdout)?;
        engine.capabilities.require(CREATE_TEMPLATE)?;
        log::info!(
            "template engine '{}' {} ready ({})",
            engine.capabilities.name,
            engine.capabilities.version,
            engine.program.display()
        );
        Ok(engine)
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(subcommand)
            .env(ENGINE_ROOT_ENV, &self.install_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut paths = vec![self.install_root.join("bin")];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        if let Ok(joined) = std::env::join_paths(paths) {
            cmd.env("PATH", joined);
        }
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl TemplateEngine for CommandEngine {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_template(&self, request: &TemplateRequest) -> Result<(), EngineError> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| EngineError::Failed(format!("cannot encode request: {err}")))?;
        log::debug!(
            "create_template: {} corners, image {}",
            request.corner_rows.len(),
            request.image_path.display()
        );

        let mut child = self
            .command("create-template")
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;
        if let Some(mut stdin) = child.stdin.take() {
            // An engine may exit without reading its input; its exit status
            // is what decides the outcome.
            match stdin.write_all(&payload) {
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    log::warn!("template engine closed its input early");
                }
                other => other.map_err(|source| self.spawn_error(source))?,
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|source| self.spawn_error(source))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed(failure_message(&output)))
        }
    }
}

fn failure_message(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("engine exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_splits_polygon_into_rows_and_columns() {
        let polygon = [Vertex::new(10, 20), Vertex::new(30, 40), Vertex::new(50, 60)];
        let request = TemplateRequest::new(
            &Settings::default(),
            Path::new("part.png"),
            Path::new("out/part"),
            &polygon,
        );
        assert_eq!(request.corner_rows, vec![20, 40, 60]);
        assert_eq!(request.corner_cols, vec![10, 30, 50]);
        assert_eq!((request.circle_row, request.circle_col), (172, 197));
        assert_eq!((request.radius_min, request.radius_max), (1.0, 10.0));
        assert_eq!(request.reference_contours.len(), 2);
    }

    #[test]
    fn capabilities_require_named_operation() {
        let caps: Capabilities = serde_json::from_str(
            r#"{ "name": "vision", "operations": ["create_template", "inspect"] }"#,
        )
        .unwrap();
        assert!(caps.require(CREATE_TEMPLATE).is_ok());
        assert_eq!(caps.version, "");

        let caps = Capabilities {
            name: "vision".into(),
            version: "2.0".into(),
            operations: vec!["inspect".into()],
        };
        let err = caps.require(CREATE_TEMPLATE).unwrap_err();
        assert!(err.to_string().contains("offers: inspect"));
    }

    #[test]
    fn negotiation_fails_fast_on_missing_install() {
        let settings = Settings {
            install_root: PathBuf::from("/nonexistent/vision-root"),
            ..Settings::default()
        };
        let err = CommandEngine::negotiate(&settings).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Missing { what: "engine installation", .. }
        ));
    }

    #[test]
    fn negotiation_fails_fast_on_missing_engine() {
        let settings = Settings {
            install_root: std::env::temp_dir(),
            engine_path: std::env::temp_dir().join("no-such-template-engine"),
            ..Settings::default()
        };
        let err = CommandEngine::negotiate(&settings).unwrap_err();
        assert!(matches!(err, EngineError::Missing { what: "template engine", .. }));
    }

    #[cfg(unix)]
    mod script {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::{Mutex, MutexGuard};

        // Writing a script while another test forks can leave the file busy
        // for exec, so script tests run one at a time.
        static SCRIPTS: Mutex<()> = Mutex::new(());

        fn serial() -> MutexGuard<'static, ()> {
            SCRIPTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        /// Write an executable shell script standing in for the engine.
        fn fake_engine(name: &str, body: &str) -> Settings {
            let dir = std::env::temp_dir().join(format!(
                "polygon-template-{}-{name}",
                std::process::id()
            ));
            std::fs::create_dir_all(&dir).unwrap();
            let program = dir.join("engine.sh");
            std::fs::write(&program, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
            Settings {
                install_root: dir,
                engine_path: program,
                ..Settings::default()
            }
        }

        #[test]
        fn negotiates_and_creates_template() {
            let _guard = serial();
            let settings = fake_engine(
                "ok",
                r#"case "$1" in
  capabilities) echo '{"name":"fake","version":"1","operations":["create_template"]}' ;;
  create-template) cat > "$ENGINE_ROOT/request.json" ;;
  *) exit 2 ;;
esac"#,
            );
            let engine = CommandEngine::negotiate(&settings).unwrap();
            assert_eq!(engine.capabilities().name, "fake");

            let request = TemplateRequest::new(
                &settings,
                Path::new("part.png"),
                Path::new("out"),
                &[Vertex::new(1, 2), Vertex::new(3, 4), Vertex::new(5, 6)],
            );
            engine.create_template(&request).unwrap();

            let written = std::fs::read(settings.install_root.join("request.json")).unwrap();
            let _ = std::fs::remove_dir_all(&settings.install_root);
            let echoed: TemplateRequest = serde_json::from_slice(&written).unwrap();
            assert_eq!(echoed, request);
        }

        #[test]
        fn engine_without_operation_is_refused() {
            let _guard = serial();
            let settings = fake_engine(
                "unsupported",
                r#"echo '{"name":"fake","operations":["inspect"]}'"#,
            );
            let err = CommandEngine::negotiate(&settings).unwrap_err();
            let _ = std::fs::remove_dir_all(&settings.install_root);
            assert!(matches!(err, EngineError::Unsupported { .. }));
        }

        #[test]
        fn engine_failure_carries_stderr() {
            let _guard = serial();
            let settings = fake_engine(
                "fails",
                r#"case "$1" in
  capabilities) echo '{"name":"fake","operations":["create_template"]}' ;;
  *) echo "license expired" >&2; exit 1 ;;
esac"#,
            );
            let engine = CommandEngine::negotiate(&settings).unwrap();
            let request =
                TemplateRequest::new(&settings, Path::new("a.png"), Path::new("out"), &[]);
            let err = engine.create_template(&request).unwrap_err();
            let _ = std::fs::remove_dir_all(&settings.install_root);
            assert_eq!(err.to_string(), "template generation failed: license expired");
        }
    }
}
