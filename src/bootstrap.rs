use std::cell::RefCell;

use cfg_if::cfg_if;
use url::Url;
use web_time::Instant;

use crate::canvas::{self, CanvasTarget};
use crate::error::BootError;
use crate::runtime::PyRuntime;
use crate::source::ScriptSource;

/// Everything the bootstrap needs to know. The defaults mirror the page
/// contract: a canvas with the fixed id, script names resolved against the
/// page, and a best-effort auxiliary import.
#[derive(Debug, Clone)]
pub struct BootConfig {
    pub canvas_id: String,
    pub base_url: Option<Url>,
    pub connector: ScriptSource,
    pub app: ScriptSource,
    pub packages: Vec<String>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            canvas_id: "kivy-canvas".to_string(),
            base_url: None,
            connector: ScriptSource::Remote("connector.py".to_string()),
            app: ScriptSource::Remote("kivy_app.py".to_string()),
            packages: vec!["math".to_string()],
        }
    }
}

pub struct Bootstrap {
    pub config: BootConfig,
    pub canvas: CanvasTarget,
}

// Keeps the interpreter alive after a successful boot; it is never torn
// down before the page (or process) goes away.
thread_local! {
    static RUNTIME: RefCell<Option<PyRuntime>> = RefCell::new(None);
}

impl Bootstrap {
    /// Runs the whole sequence once. A failure in any step short-circuits
    /// the rest and ends up in exactly one error log entry; nothing is
    /// retried or torn down.
    pub async fn run(self) {
        setup_logger();

        warn_on_local_scheme(&self.config);

        match self.boot().await {
            Ok(runtime) => {
                RUNTIME.with(|slot| slot.borrow_mut().replace(runtime));
                log::info!("Bootstrap complete");
            }
            Err(err) => {
                log::error!("Bootstrap failed: {err}");
            }
        }
    }

    async fn boot(self) -> Result<PyRuntime, BootError> {
        let Bootstrap {
            config,
            canvas: target,
        } = self;
        let start = Instant::now();

        let runtime = PyRuntime::acquire();
        log::debug!("Runtime ready after {:?}", start.elapsed());

        let (width, height) = canvas::bind(target)?;
        runtime.set_global("canvas_width", width)?;
        runtime.set_global("canvas_height", height)?;
        log::debug!("Canvas bound at {}x{}", width, height);

        for package in &config.packages {
            if let Err(err) = runtime.load_package(package) {
                log::warn!("{err}");
            }
        }

        let base = config.base_url.as_ref();

        let connector = config.connector.load(base).await?;
        runtime.run_source(&connector.name, &connector.text)?;
        runtime.bind_connector()?;
        log::debug!("Connector ready after {:?}", start.elapsed());

        let app = config.app.load(base).await?;
        runtime.run_source(&app.name, &app.text)?;
        log::debug!("Application running after {:?}", start.elapsed());

        Ok(runtime)
    }
}

// The check is advisory: fetches from a file-served page will most likely
// fail, but the sequence still gets its chance.
fn warn_on_local_scheme(config: &BootConfig) {
    if let Some(scheme) = page_scheme(config) {
        if scheme_is_local(&scheme) {
            log::warn!("Page is served from the local filesystem; script fetches will likely fail");
        }
    }
}

fn scheme_is_local(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("file:") || scheme.eq_ignore_ascii_case("file")
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        fn page_scheme(_config: &BootConfig) -> Option<String> {
            let location = web_sys::window()?.location();
            location.protocol().ok()
        }
    } else {
        fn page_scheme(config: &BootConfig) -> Option<String> {
            config.base_url.as_ref().map(|url| url.scheme().to_string())
        }
    }
}

fn setup_logger() {
    cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            console_log::init_with_level(log::Level::Debug).expect("Couldn't initialize logger");
        } else {
            env_logger::init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;

    fn inline(name: &str, text: &str) -> ScriptSource {
        ScriptSource::Inline {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    fn headless() -> CanvasTarget {
        CanvasTarget::Headless {
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn file_schemes_count_as_local() {
        assert!(scheme_is_local("file:"));
        assert!(scheme_is_local("file"));
        assert!(scheme_is_local("FILE:"));
        assert!(!scheme_is_local("http:"));
        assert!(!scheme_is_local("https"));
    }

    #[test]
    fn base_url_scheme_feeds_the_guard() {
        let config = BootConfig {
            base_url: Some(Url::parse("file:///srv/app/index.html").unwrap()),
            ..BootConfig::default()
        };
        assert_eq!(page_scheme(&config).as_deref(), Some("file"));

        let config = BootConfig {
            base_url: Some(Url::parse("http://localhost:8000/").unwrap()),
            ..BootConfig::default()
        };
        assert_eq!(page_scheme(&config).as_deref(), Some("http"));
    }

    #[test]
    fn the_sequence_runs_component_then_app_exactly_once() {
        let _ = canvas::take_ops();

        let bootstrap = Bootstrap {
            config: BootConfig {
                connector: inline(
                    "connector.py",
                    "import connector\n\ndef banner():\n    connector.fill_rect(0, 0, 20, 20, connector.color_css('primary'))\n",
                ),
                app: inline("kivy_app.py", "import connector\nbanner()\n"),
                ..BootConfig::default()
            },
            canvas: headless(),
        };

        pollster::block_on(bootstrap.boot()).unwrap();

        let ops = canvas::take_ops();
        assert_eq!(ops.len(), 1, "the banner should draw exactly once");
        assert!(matches!(ops[0], DrawOp::FillRect { .. }));
    }

    #[test]
    fn missing_canvas_is_reported_before_any_script_runs() {
        let _ = canvas::take_ops();

        let bootstrap = Bootstrap {
            config: BootConfig {
                connector: inline("connector.py", "connector_ran = True"),
                app: inline("kivy_app.py", "import connector\nconnector.clear()"),
                ..BootConfig::default()
            },
            canvas: CanvasTarget::None,
        };

        let err = pollster::block_on(bootstrap.boot()).unwrap_err();
        assert!(matches!(err, BootError::Canvas(_)));
        assert!(canvas::take_ops().is_empty());
    }

    #[test]
    fn connector_fetch_failure_skips_the_app() {
        let _ = canvas::take_ops();

        let bootstrap = Bootstrap {
            config: BootConfig {
                connector: ScriptSource::Remote("connector.py".to_string()),
                app: inline(
                    "kivy_app.py",
                    "import connector\nconnector.fill_rect(0, 0, 5, 5, 'black')",
                ),
                ..BootConfig::default()
            },
            canvas: headless(),
        };

        let err = pollster::block_on(bootstrap.boot()).unwrap_err();
        match err {
            BootError::Fetch { url, .. } => assert_eq!(url, "connector.py"),
            other => panic!("expected a fetch error, got {other:?}"),
        }

        assert!(
            canvas::take_ops().is_empty(),
            "the app must not draw after a failed connector fetch"
        );
    }

    #[test]
    fn package_failures_do_not_abort_the_boot() {
        let bootstrap = Bootstrap {
            config: BootConfig {
                packages: vec!["not_a_real_package".to_string()],
                connector: inline("connector.py", "value = 1"),
                app: inline("kivy_app.py", "assert value == 1"),
                ..BootConfig::default()
            },
            canvas: headless(),
        };

        pollster::block_on(bootstrap.boot()).unwrap();
    }

    #[test]
    fn app_errors_are_attributed_to_the_app() {
        let bootstrap = Bootstrap {
            config: BootConfig {
                connector: inline("connector.py", "ready = True"),
                app: inline("kivy_app.py", "raise RuntimeError('broken app')"),
                ..BootConfig::default()
            },
            canvas: headless(),
        };

        let err = pollster::block_on(bootstrap.boot()).unwrap_err();
        match err {
            BootError::Execution { module, message } => {
                assert_eq!(module, "kivy_app.py");
                assert!(message.contains("broken app"), "message was: {message}");
            }
            other => panic!("expected an execution error, got {other:?}"),
        }
    }

    #[test]
    fn scope_globals_expose_the_canvas_size() {
        let bootstrap = Bootstrap {
            config: BootConfig {
                connector: inline(
                    "connector.py",
                    "assert canvas_width == 800\nassert canvas_height == 600",
                ),
                app: inline("kivy_app.py", "pass"),
                ..BootConfig::default()
            },
            canvas: headless(),
        };

        pollster::block_on(bootstrap.boot()).unwrap();
    }
}
