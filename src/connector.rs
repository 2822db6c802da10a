pub(crate) use connector::make_module;

use rustpython_vm::builtins::PyBaseExceptionRef;
use rustpython_vm::VirtualMachine;

/// Named colors the component library understands. Unknown names fall
/// through unchanged so literal CSS colors keep working.
const COLOR_MAP: &[(&str, &str)] = &[
    ("primary", "#6200EE"),
    ("accent", "#03DAC6"),
    ("error", "#B00020"),
    ("white", "#FFFFFF"),
    ("black", "#000000"),
    ("gray", "#9E9E9E"),
    ("red", "crimson"),
    ("green", "seagreen"),
    ("blue", "steelblue"),
];

fn resolve_color(name: &str) -> &str {
    COLOR_MAP
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, css)| *css)
        .unwrap_or(name)
}

fn surface_error(vm: &VirtualMachine, message: String) -> PyBaseExceptionRef {
    vm.new_runtime_error(message)
}

/// The module scripts `import connector` against. It is registered in the
/// interpreter's module registry at construction, before any script runs;
/// every drawing export goes through the bound canvas surface.
#[rustpython_vm::pymodule]
mod connector {
    use rustpython_vm::function::ArgIntoFloat;
    use rustpython_vm::{PyResult, VirtualMachine};

    use crate::canvas;

    #[pyfunction]
    fn canvas_size(vm: &VirtualMachine) -> PyResult<(u32, u32)> {
        canvas::with_canvas(|canvas| Ok(canvas.size())).map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn clear(vm: &VirtualMachine) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.clear()).map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn fill_rect(
        x: ArgIntoFloat,
        y: ArgIntoFloat,
        w: ArgIntoFloat,
        h: ArgIntoFloat,
        color: String,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.fill_rect(*x, *y, *w, *h, &color))
            .map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn stroke_rect(
        x: ArgIntoFloat,
        y: ArgIntoFloat,
        w: ArgIntoFloat,
        h: ArgIntoFloat,
        color: String,
        line_width: ArgIntoFloat,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.stroke_rect(*x, *y, *w, *h, &color, *line_width))
            .map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn fill_text(
        text: String,
        x: ArgIntoFloat,
        y: ArgIntoFloat,
        font: String,
        color: String,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.fill_text(&text, *x, *y, &font, &color))
            .map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn measure_text(text: String, font: String, vm: &VirtualMachine) -> PyResult<f64> {
        canvas::with_canvas(|canvas| canvas.measure_text(&text, &font))
            .map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn line(
        x1: ArgIntoFloat,
        y1: ArgIntoFloat,
        x2: ArgIntoFloat,
        y2: ArgIntoFloat,
        width: ArgIntoFloat,
        color: String,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.line(*x1, *y1, *x2, *y2, *width, &color))
            .map_err(|err| super::surface_error(vm, err))
    }

    #[pyfunction]
    fn fill_circle(
        cx: ArgIntoFloat,
        cy: ArgIntoFloat,
        r: ArgIntoFloat,
        color: String,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        canvas::with_canvas(|canvas| canvas.fill_circle(*cx, *cy, *r, &color))
            .map_err(|err| super::surface_error(vm, err))
    }

    /// Density-independent pixels, rounded up to a whole pixel.
    #[pyfunction]
    fn dp(value: ArgIntoFloat) -> i64 {
        value.ceil() as i64
    }

    #[pyfunction]
    fn color_css(name: String) -> String {
        super::resolve_color(&name).to_string()
    }
}
