use flashpoint_core::{simulate, SimConfig};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// PyO3 module exposing flashpoint-core to Python analysis code.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Default configuration as a JSON string.
#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Run one simulation from a JSON config and return the run summary as JSON.
/// Missing config fields take their defaults.
#[pyfunction]
fn run_simulation(config_json: &str) -> PyResult<String> {
    let config: SimConfig = serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("invalid config json: {e}")))?;
    let summary = simulate(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    serde_json::to_string(&summary).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_simulation, m)?)?;
    Ok(())
}
