use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Template parameters dictionary for a Gaussian calculation
///
/// Covers every recognized key with a working single-point setup that can be
/// edited in place.
pub fn parameters_template() -> Value {
    json!({
        "functional": "PBE1PBE",
        "basis_set": "6-31g",
        "route_parameters": {
            "nosymm": null,
            "scf": {"cdiis": null, "maxcycle": 128},
            "Output": "WFX"
        },
        "input_parameters": {
            "output.wfx": null
        },
        "link0_parameters": {
            "%chk": "aiida.chk",
            "%mem": "1024MB",
            "%nprocshared": 2
        }
    })
}

/// Template settings dictionary
pub fn settings_template() -> Value {
    json!({
        "cmdline": [],
        "additional_retrieve_list": ["aiida.chk"]
    })
}

/// Write template to file
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &Value,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    // Create parent directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, serde_json::to_string_pretty(template)?)?;
    Ok(())
}
