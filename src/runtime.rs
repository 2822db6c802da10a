use std::fmt;

use rustpython_vm::builtins::PyBaseExceptionRef;
use rustpython_vm::scope::Scope;
use rustpython_vm::{Interpreter, VirtualMachine};

use crate::error::BootError;

/// The embedded Python interpreter plus the global scope every fetched
/// script executes in. Built once per boot and kept alive afterwards;
/// nothing tears it down before the page goes away.
pub struct PyRuntime {
    interp: Interpreter,
    scope: Scope,
}

// Neither Interpreter nor Scope has a Debug impl, so derive is off the table.
impl fmt::Debug for PyRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyRuntime").finish_non_exhaustive()
    }
}

impl PyRuntime {
    /// Builds the interpreter with the embedded standard modules and the
    /// `connector` module already present in the module registry.
    pub fn acquire() -> Self {
        let interp = Interpreter::with_init(Default::default(), |vm| {
            vm.add_native_modules(rustpython_stdlib::get_module_inits());
            vm.add_native_module(
                "connector".to_owned(),
                Box::new(crate::connector::make_module),
            );
        });

        let scope = interp.enter(|vm| vm.new_scope_with_builtins());

        Self { interp, scope }
    }

    /// Executes `text` in the global scope. `name` is the label any raised
    /// exception is attributed to.
    pub fn run_source(&self, name: &str, text: &str) -> Result<(), BootError> {
        self.interp.enter(|vm| {
            vm.run_code_string(self.scope.clone(), text, name.to_owned())
                .map(drop)
                .map_err(|exc| BootError::Execution {
                    module: name.to_owned(),
                    message: render_exception(vm, &exc),
                })
        })
    }

    /// Best-effort import warm-up for an auxiliary package.
    pub fn load_package(&self, name: &str) -> Result<(), BootError> {
        self.run_source("<package>", &format!("import {}", name))
            .map_err(|err| match err {
                BootError::Execution { message, .. } => BootError::Package {
                    name: name.to_owned(),
                    reason: exception_line(&message).to_owned(),
                },
                other => other,
            })
    }

    /// Makes `connector` a named binding in the global scope, so application
    /// code can rely on it being there before it runs.
    pub fn bind_connector(&self) -> Result<(), BootError> {
        self.run_source("connector", "import connector")
    }

    /// Publishes a number under `name` in the global scope.
    pub fn set_global(&self, name: &str, value: u32) -> Result<(), BootError> {
        self.interp.enter(|vm| {
            self.scope
                .globals
                .set_item(name, vm.new_pyobj(value), vm)
                .map_err(|exc| BootError::Runtime(render_exception(vm, &exc)))
        })
    }
}

fn render_exception(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    let mut message = String::new();
    if vm.write_exception(&mut message, exc).is_err() {
        message = "unrenderable exception".to_string();
    }

    message.trim_end().to_string()
}

// The last non-empty line of a rendered traceback is the exception itself.
fn exception_line(message: &str) -> &str {
    message
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{self, CanvasTarget, DrawOp};

    #[test]
    fn sources_share_one_global_scope() {
        let runtime = PyRuntime::acquire();

        runtime.run_source("first.py", "x = 40 + 2").unwrap();
        runtime.run_source("second.py", "assert x == 42").unwrap();
    }

    #[test]
    fn execution_errors_carry_the_script_name() {
        let runtime = PyRuntime::acquire();

        let err = runtime.run_source("broken.py", "1 / 0").unwrap_err();
        match err {
            BootError::Execution { module, message } => {
                assert_eq!(module, "broken.py");
                assert!(
                    message.contains("ZeroDivisionError"),
                    "message was: {message}"
                );
            }
            other => panic!("expected an execution error, got {other:?}"),
        }
    }

    #[test]
    fn missing_packages_report_their_name() {
        let runtime = PyRuntime::acquire();

        let err = runtime.load_package("definitely_not_a_module").unwrap_err();
        match err {
            BootError::Package { name, reason } => {
                assert_eq!(name, "definitely_not_a_module");
                assert!(!reason.is_empty());
            }
            other => panic!("expected a package error, got {other:?}"),
        }
    }

    #[test]
    fn bundled_math_module_imports() {
        let runtime = PyRuntime::acquire();

        runtime.load_package("math").unwrap();
        runtime
            .run_source("use.py", "import math\nassert math.floor(2.5) == 2")
            .unwrap();
    }

    #[test]
    fn globals_are_visible_to_scripts() {
        let runtime = PyRuntime::acquire();

        runtime.set_global("canvas_width", 800).unwrap();
        runtime
            .run_source("check.py", "assert canvas_width == 800")
            .unwrap();
    }

    #[test]
    fn connector_is_importable_before_any_script_runs() {
        let runtime = PyRuntime::acquire();

        runtime.bind_connector().unwrap();
        runtime
            .run_source("probe.py", "assert callable(connector.fill_rect)")
            .unwrap();
    }

    #[test]
    fn connector_draws_through_the_bound_surface() {
        canvas::bind(CanvasTarget::Headless {
            width: 320,
            height: 200,
        })
        .unwrap();
        let _ = canvas::take_ops();

        let runtime = PyRuntime::acquire();
        runtime.bind_connector().unwrap();
        runtime
            .run_source(
                "draw.py",
                "connector.fill_rect(0, 0, 10, 10, connector.color_css('primary'))",
            )
            .unwrap();

        let ops = canvas::take_ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            DrawOp::FillRect { w, color, .. } => {
                assert_eq!(*w, 10.0);
                assert_eq!(color, "#6200EE");
            }
            other => panic!("expected a fill_rect, got {other:?}"),
        }
    }

    #[test]
    fn canvas_size_reaches_scripts_as_a_tuple() {
        canvas::bind(CanvasTarget::Headless {
            width: 320,
            height: 200,
        })
        .unwrap();

        let runtime = PyRuntime::acquire();
        runtime.bind_connector().unwrap();
        runtime
            .run_source(
                "size.py",
                "width, height = connector.canvas_size()\nassert (width, height) == (320, 200)",
            )
            .unwrap();
    }

    #[test]
    fn drawing_without_a_surface_is_a_python_error() {
        canvas::unbind();

        let runtime = PyRuntime::acquire();
        runtime.bind_connector().unwrap();

        let err = runtime
            .run_source("draw.py", "connector.clear()")
            .unwrap_err();
        match err {
            BootError::Execution { message, .. } => {
                assert!(message.contains("no canvas bound"), "message was: {message}");
            }
            other => panic!("expected an execution error, got {other:?}"),
        }
    }

    #[test]
    fn debug_output_names_the_runtime() {
        let runtime = PyRuntime::acquire();
        assert!(format!("{runtime:?}").starts_with("PyRuntime"));
    }

    #[test]
    fn exception_line_skips_the_traceback() {
        let rendered = "Traceback (most recent call last):\n  File \"app.py\", line 1\nNameError: name 'x' is not defined\n";
        assert_eq!(
            exception_line(rendered),
            "NameError: name 'x' is not defined"
        );
    }
}
