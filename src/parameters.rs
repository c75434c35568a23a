//! Calculation parameters and job settings.
//!
//! Both arrive from the host engine as JSON objects:
//!
//! - [`Parameters`]: functional, basis set and the optional
//!   `route_parameters`, `input_parameters` and `link0_parameters` groups
//! - [`Settings`]: command-line flags and extra files to retrieve; consumed
//!   once while preparing a submission
//!
//! # Example parameters
//!
//! ```text
//! {
//!     "functional": "PBE1PBE",
//!     "basis_set": "6-31g",
//!     "route_parameters": {"nosymm": null, "opt": {"maxcycles": 50}},
//!     "link0_parameters": {"%chk": "aiida.chk", "%mem": "1024MB", "%nprocshared": 2}
//! }
//! ```

use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raised when a calculation input does not have the expected shape.
#[derive(Error, Debug, PartialEq)]
pub enum InputValidationError {
    /// A required key is absent
    #[error("Missing required input parameter: {0}")]
    MissingKey(String),
    /// A key is present with a value of the wrong type
    #[error("Invalid type for '{key}': expected {expected}")]
    InvalidType {
        /// Offending key
        key: String,
        /// Description of the accepted type
        expected: &'static str,
    },
    /// A required input port was not supplied
    #[error("Missing required input port: {0}")]
    MissingPort(String),
}

type Result<T> = std::result::Result<T, InputValidationError>;

/// One group of Gaussian keywords, e.g. the route or Link 0 section.
///
/// Keys are kept sorted so the rendered input is stable.
pub type ParamGroup = BTreeMap<String, Value>;

/// Validated calculation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Exchange-correlation functional or method, e.g. "B3LYP"
    pub functional: String,
    /// Basis set, e.g. "6-31G*"
    pub basis_set: String,
    /// Route-section keywords; `None` when not supplied
    pub route_parameters: Option<ParamGroup>,
    /// Sections written after the coordinates; `None` when not supplied
    pub input_parameters: Option<ParamGroup>,
    /// Link 0 (`%`) commands; `None` when not supplied
    pub link0_parameters: Option<ParamGroup>,
}

impl Parameters {
    /// Validates a parameter dictionary.
    ///
    /// `functional` and `basis_set` must be strings. Each optional group
    /// defaults to `None` when absent and must be an object when present.
    ///
    /// # Examples
    ///
    /// ```
    /// use gaussjob::parameters::Parameters;
    /// use serde_json::json;
    ///
    /// let dict = json!({"functional": "B3LYP", "basis_set": "6-31G*"});
    /// let params = Parameters::from_dict(dict.as_object().unwrap()).unwrap();
    /// assert_eq!(params.functional, "B3LYP");
    /// assert!(params.route_parameters.is_none());
    /// ```
    pub fn from_dict(dict: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            functional: required_string(dict, "functional")?,
            basis_set: required_string(dict, "basis_set")?,
            route_parameters: optional_group(dict, "route_parameters")?,
            input_parameters: optional_group(dict, "input_parameters")?,
            link0_parameters: optional_group(dict, "link0_parameters")?,
        })
    }
}

fn required_string(dict: &Map<String, Value>, key: &str) -> Result<String> {
    match dict.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(InputValidationError::InvalidType {
            key: key.to_string(),
            expected: "a string",
        }),
        None => Err(InputValidationError::MissingKey(key.to_string())),
    }
}

fn optional_group(dict: &Map<String, Value>, key: &str) -> Result<Option<ParamGroup>> {
    match dict.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        )),
        Some(_) => Err(InputValidationError::InvalidType {
            key: key.to_string(),
            expected: "an object",
        }),
    }
}

/// Extra job settings, consumed key by key while preparing a submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    dict: Map<String, Value>,
}

impl Settings {
    /// Wraps a settings dictionary. The map is owned, so extracting keys
    /// never touches the caller's copy.
    pub fn new(dict: Map<String, Value>) -> Self {
        Self { dict }
    }

    /// Removes `cmdline` and returns it, or an empty list when absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use gaussjob::parameters::Settings;
    /// use serde_json::json;
    ///
    /// let dict = json!({"cmdline": ["-p=4"]});
    /// let mut settings = Settings::new(dict.as_object().unwrap().clone());
    /// assert_eq!(settings.take_cmdline().unwrap(), vec!["-p=4".to_string()]);
    /// assert!(!settings.contains_key("cmdline"));
    /// ```
    pub fn take_cmdline(&mut self) -> Result<Vec<String>> {
        self.take_string_list("cmdline")
    }

    /// Removes `additional_retrieve_list` and returns it, or an empty list.
    pub fn take_additional_retrieve_list(&mut self) -> Result<Vec<String>> {
        self.take_string_list("additional_retrieve_list")
    }

    /// Whether `key` is still present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.dict.contains_key(key)
    }

    /// Keys that have not been consumed yet.
    pub fn remaining_keys(&self) -> Vec<&str> {
        self.dict.keys().map(String::as_str).collect()
    }

    /// Logs every key no consumer asked for.
    pub fn warn_unused(&self) {
        for key in self.remaining_keys() {
            warn!("Ignoring unrecognized settings key: {}", key);
        }
    }

    fn take_string_list(&mut self, key: &str) -> Result<Vec<String>> {
        let invalid = || InputValidationError::InvalidType {
            key: key.to_string(),
            expected: "a list of strings",
        };
        match self.dict.remove(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(invalid()),
                })
                .collect(),
            Some(_) => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dict(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_optional_groups_default_to_none() {
        let params = Parameters::from_dict(&dict(json!({
            "functional": "PBE1PBE",
            "basis_set": "6-31g",
        })))
        .unwrap();
        assert!(params.route_parameters.is_none());
        assert!(params.input_parameters.is_none());
        assert!(params.link0_parameters.is_none());
    }

    #[test]
    fn test_groups_are_sorted() {
        let params = Parameters::from_dict(&dict(json!({
            "functional": "PBE1PBE",
            "basis_set": "6-31g",
            "route_parameters": {"scf": {"cdiis": null}, "nosymm": null},
        })))
        .unwrap();
        let keys: Vec<&String> = params.route_parameters.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["nosymm", "scf"]);
    }

    #[test]
    fn test_missing_and_mistyped_keys() {
        let missing = Parameters::from_dict(&dict(json!({"functional": "B3LYP"})));
        assert_eq!(
            missing.unwrap_err(),
            InputValidationError::MissingKey("basis_set".to_string())
        );

        let bad_group = Parameters::from_dict(&dict(json!({
            "functional": "B3LYP",
            "basis_set": "STO-3G",
            "link0_parameters": "%mem=1GB",
        })));
        assert!(matches!(
            bad_group.unwrap_err(),
            InputValidationError::InvalidType { ref key, .. } if key == "link0_parameters"
        ));
    }

    #[test]
    fn test_cmdline_is_removed_once() {
        let mut settings = Settings::new(dict(json!({"cmdline": ["a", "b"], "other": 1})));
        assert_eq!(settings.take_cmdline().unwrap(), vec!["a", "b"]);
        assert!(!settings.contains_key("cmdline"));
        assert_eq!(settings.remaining_keys(), vec!["other"]);
        assert!(settings.take_cmdline().unwrap().is_empty());
    }

    #[test]
    fn test_cmdline_must_be_strings() {
        let mut settings = Settings::new(dict(json!({"cmdline": [4]})));
        assert!(settings.take_cmdline().is_err());
    }

    #[test]
    fn test_empty_settings() {
        let mut settings = Settings::default();
        assert!(settings.take_cmdline().unwrap().is_empty());
        assert!(settings.take_additional_retrieve_list().unwrap().is_empty());
    }
}
