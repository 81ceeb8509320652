//! Python bindings: `ds9_regions.parse_regions(text)` returns one dict per
//! marker, shaped like the CLI's JSON output.

use crate::config::ParserConfig;
use crate::error::SyntaxError;
use crate::marker::MemoryFrame;
use crate::parser::parse_regions_with;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde_json::Value;

fn to_py(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    let obj = match value {
        Value::Null => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into_py(py),
            None => n.as_f64().unwrap_or_default().into_py(py),
        },
        Value::String(s) => s.into_py(py),
        Value::Array(items) => {
            let list = PyList::empty_bound(py);
            for item in items {
                list.append(to_py(py, item)?)?;
            }
            list.into_py(py)
        }
        Value::Object(map) => {
            let dict = PyDict::new_bound(py);
            for (key, item) in map {
                dict.set_item(key, to_py(py, item)?)?;
            }
            dict.into_py(py)
        }
    };
    Ok(obj)
}

// --- Python Functions ---

/// Parses region text in image-independent coordinates. Raises
/// `ValueError` listing every syntax error; with `strict` it stops at the
/// first one.
#[pyfunction]
#[pyo3(signature = (text, strict = false))]
fn parse_regions(py: Python<'_>, text: &str, strict: bool) -> PyResult<PyObject> {
    let config = ParserConfig { recover: !strict, ..ParserConfig::default() };
    let mut frame = MemoryFrame::new();
    let mut errors: Vec<SyntaxError> = Vec::new();
    let result = parse_regions_with(text, &mut frame, &config, |err| errors.push(err.clone()));

    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(PyValueError::new_err(lines.join("\n")));
    }
    result.map_err(|e| PyValueError::new_err(e.to_string()))?;

    let records = serde_json::to_value(frame.records()).map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_py(py, &records)
}

// --- Python Module Definition ---
#[pymodule]
fn ds9_regions(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_regions, m)?)?;
    Ok(())
}
