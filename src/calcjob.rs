//! Calculation-job plugin contract and the Gaussian calculation.
//!
//! A workflow engine drives external programs through calculation jobs. Each
//! job implements the [`CalcJob`] trait, which has two hooks:
//!
//! - [`CalcJob::define`]: declares the accepted inputs, the produced outputs
//!   and the exit codes, as a [`ProcessSpec`]
//! - [`CalcJob::prepare_for_submission`]: writes the program input into a
//!   sandbox [`Folder`] and returns a [`CalcInfo`] job descriptor
//!
//! The engine stages the sandbox, runs the code described by the
//! [`CodeInfo`] entries, and retrieves the files named in
//! [`CalcInfo::retrieve_list`]. Scheduling, transport and retries live in the
//! engine; nothing here blocks beyond writing the input file.
//!
//! # Usage Pattern
//!
//! ```no_run
//! use gaussjob::calcjob::{CalcJob, Folder, GaussianCalculation, GaussianInputs};
//! use gaussjob::io::read_xyz;
//! use serde_json::json;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let structure = read_xyz(Path::new("water.xyz"))?;
//! let parameters = json!({"functional": "B3LYP", "basis_set": "6-31G*"});
//! let inputs = GaussianInputs::new(structure, parameters.as_object().unwrap().clone());
//!
//! let calc = GaussianCalculation::new(inputs)?;
//! let folder = Folder::create("sandbox")?;
//! let calc_info = calc.prepare_for_submission(&folder)?;
//! assert_eq!(calc_info.stdout_name, GaussianCalculation::OUTPUT_FILE);
//! # Ok(())
//! # }
//! ```

use crate::gaussian_input::{GaussianInput, GaussianInputError, RouteTag};
use crate::parameters::{InputValidationError, Parameters, Settings};
use crate::structure::{Molecule, StructureError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Error type for preparing a calculation.
#[derive(Error, Debug)]
pub enum CalcJobError {
    /// File system operation on the sandbox failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Inputs do not match the declared schema
    #[error("Input validation error: {0}")]
    InputValidation(#[from] InputValidationError),
    /// Structure is inconsistent
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),
    /// Input file could not be produced
    #[error("Gaussian input error: {0}")]
    GaussianInput(#[from] GaussianInputError),
}

/// Type alias for calculation-job results
pub type Result<T> = std::result::Result<T, CalcJobError>;

/// Data type accepted or produced by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidType {
    /// Molecular structure
    Structure,
    /// Key-value dictionary
    Dict,
    /// Executable code registered with the engine
    Code,
    /// Boolean option
    Bool,
    /// String option
    Str,
}

/// Declaration of one input or output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, namespaces separated by dots (`metadata.options.withmpi`)
    pub name: String,
    /// Accepted data type
    pub valid_type: ValidType,
    /// Whether the port must be supplied
    pub required: bool,
    /// Default value for optional ports
    pub default: Option<Value>,
    /// Human readable description
    pub help: Option<String>,
    /// Value is not stored in the provenance database
    pub non_db: bool,
}

impl PortSpec {
    /// A port with no default, no help and database storage.
    pub fn new(name: &str, valid_type: ValidType, required: bool) -> Self {
        Self {
            name: name.to_string(),
            valid_type,
            required,
            default: None,
            help: None,
            non_db: false,
        }
    }

    /// Sets the help text.
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the default value; a port with a default is never required.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }

    /// Marks the port as not stored in the database.
    pub fn non_db(mut self, non_db: bool) -> Self {
        self.non_db = non_db;
        self
    }
}

/// A named exit status reported to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCode {
    /// Numeric status; 0 means success
    pub status: u32,
    /// Stable label, e.g. `ERROR_MISSING_OUTPUT_FILES`
    pub label: String,
    /// Message shown to the user
    pub message: String,
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.label, self.message)
    }
}

/// Input/output schema of a calculation job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Accepted inputs
    pub inputs: Vec<PortSpec>,
    /// Produced outputs
    pub outputs: Vec<PortSpec>,
    /// Declared exit codes
    pub exit_codes: Vec<ExitCode>,
    /// Output returned when the job is used as a single value
    pub default_output_node: Option<String>,
}

impl ProcessSpec {
    /// Ports every calculation job accepts.
    pub fn calcjob_base() -> Self {
        let mut spec = Self::default();
        spec.input(
            PortSpec::new("code", ValidType::Code, true)
                .help("The code to use for this job"),
        );
        spec.input(
            PortSpec::new("metadata.options.withmpi", ValidType::Bool, false)
                .help("Run the code through the MPI launcher"),
        );
        spec.input(
            PortSpec::new("metadata.options.parser_name", ValidType::Str, false)
                .help("Entry point of the parser for the retrieved files"),
        );
        spec
    }

    /// Declares an input; redeclaring a name replaces the earlier port.
    pub fn input(&mut self, port: PortSpec) {
        upsert(&mut self.inputs, port);
    }

    /// Declares an output; redeclaring a name replaces the earlier port.
    pub fn output(&mut self, port: PortSpec) {
        upsert(&mut self.outputs, port);
    }

    /// Declares an exit code.
    pub fn exit_code(&mut self, status: u32, label: &str, message: &str) {
        self.exit_codes.retain(|code| code.label != label);
        self.exit_codes.push(ExitCode {
            status,
            label: label.to_string(),
            message: message.to_string(),
        });
    }

    /// Looks up an input port.
    pub fn get_input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Looks up an output port.
    pub fn get_output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Looks up an exit code by label.
    pub fn exit_code_by_label(&self, label: &str) -> Option<&ExitCode> {
        self.exit_codes.iter().find(|c| c.label == label)
    }

    /// Fails on the first required input missing from `supplied`.
    pub fn validate_inputs(&self, supplied: &[&str]) -> std::result::Result<(), InputValidationError> {
        match self
            .inputs
            .iter()
            .find(|p| p.required && !supplied.contains(&p.name.as_str()))
        {
            Some(port) => Err(InputValidationError::MissingPort(port.name.clone())),
            None => Ok(()),
        }
    }
}

fn upsert(ports: &mut Vec<PortSpec>, port: PortSpec) {
    match ports.iter_mut().find(|p| p.name == port.name) {
        Some(existing) => *existing = port,
        None => ports.push(port),
    }
}

/// Sandbox directory where a job writes its input files.
#[derive(Debug, Clone)]
pub struct Folder {
    root: PathBuf,
}

impl Folder {
    /// Creates the directory (and parents) if needed.
    pub fn create<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    /// Wraps an existing directory.
    pub fn open<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Folder not found: {}", root.display()),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Path of `name` inside the folder.
    pub fn abs_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Folder root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether `name` exists inside the folder.
    pub fn contains(&self, name: &str) -> bool {
        self.abs_path(name).exists()
    }
}

/// Executable registered with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    /// Engine identifier
    pub uuid: Uuid,
    /// Display label, e.g. `g16@cluster`
    pub label: String,
}

impl Code {
    /// A code with a fresh identifier.
    pub fn new(label: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.to_string(),
        }
    }
}

/// `metadata.options` of a calculation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcJobOptions {
    /// Run through MPI; off for Gaussian
    pub withmpi: bool,
    /// Parser entry point for the retrieved files
    pub parser_name: String,
}

impl Default for CalcJobOptions {
    fn default() -> Self {
        Self {
            withmpi: false,
            parser_name: GaussianCalculation::DEFAULT_PARSER.to_string(),
        }
    }
}

/// Instructions for one executable run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInfo {
    /// Arguments passed to the executable
    pub cmdline_params: Vec<String>,
    /// Code to run
    pub code_uuid: Uuid,
    /// File redirected to standard input
    pub stdin_name: String,
    /// File receiving standard output
    pub stdout_name: String,
    /// Run through MPI
    pub withmpi: bool,
}

/// Job descriptor returned to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcInfo {
    /// Calculation identifier
    pub uuid: Uuid,
    /// Arguments passed to the executable
    pub cmdline_params: Vec<String>,
    /// File redirected to standard input
    pub stdin_name: String,
    /// File receiving standard output
    pub stdout_name: String,
    /// One entry per executable run, in order
    pub codes_info: Vec<CodeInfo>,
    /// Files fetched back after execution
    pub retrieve_list: Vec<String>,
    /// `(source, target)` files copied from the local machine
    pub local_copy_list: Vec<(String, String)>,
    /// `(computer, source, target)` files copied on the remote machine
    pub remote_copy_list: Vec<(String, String, String)>,
}

/// Hooks a calculation plugin provides to the engine.
pub trait CalcJob {
    /// Adds this job's ports and exit codes to `spec`.
    fn define(spec: &mut ProcessSpec);

    /// Full schema: the base calc-job ports plus [`CalcJob::define`].
    fn spec() -> ProcessSpec {
        let mut spec = ProcessSpec::calcjob_base();
        Self::define(&mut spec);
        spec
    }

    /// Writes input files into `folder` and returns the job descriptor.
    fn prepare_for_submission(&self, folder: &Folder) -> Result<CalcInfo>;
}

/// Inputs of a Gaussian calculation as supplied by the engine.
#[derive(Debug, Clone)]
pub struct GaussianInputs {
    /// Molecule to compute
    pub structure: Molecule,
    /// Parameter dictionary
    pub parameters: Map<String, Value>,
    /// Optional settings dictionary
    pub settings: Option<Map<String, Value>>,
    /// Gaussian executable
    pub code: Code,
    /// `metadata.options`
    pub options: CalcJobOptions,
}

impl GaussianInputs {
    /// Inputs with no settings, default options and an unnamed `g16` code.
    pub fn new(structure: Molecule, parameters: Map<String, Value>) -> Self {
        Self {
            structure,
            parameters,
            settings: None,
            code: Code::new("g16"),
            options: CalcJobOptions::default(),
        }
    }

    /// Attaches a settings dictionary.
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replaces the code.
    pub fn with_code(mut self, code: Code) -> Self {
        self.code = code;
        self
    }

    /// Replaces `metadata.options`.
    pub fn with_options(mut self, options: CalcJobOptions) -> Self {
        self.options = options;
        self
    }

    fn supplied_ports(&self) -> Vec<&'static str> {
        let mut ports = vec!["structure", "parameters", "code"];
        if self.settings.is_some() {
            ports.push("settings");
        }
        ports
    }
}

/// Gaussian calculation job.
///
/// Writes `aiida.gjf` from the structure and parameters and describes a run
/// that feeds it to Gaussian on standard input, captures `aiida.log`, and
/// retrieves the log.
#[derive(Debug, Clone)]
pub struct GaussianCalculation {
    uuid: Uuid,
    inputs: GaussianInputs,
    parameters: Parameters,
    title: String,
    route_tag: RouteTag,
}

impl GaussianCalculation {
    /// Input file name inside the sandbox
    pub const INPUT_FILE: &'static str = "aiida.gjf";
    /// Standard output file name
    pub const OUTPUT_FILE: &'static str = "aiida.log";
    /// Checkpoint file name
    pub const CHK_FILE: &'static str = "aiida.chk";
    /// Project name
    pub const PROJECT_NAME: &'static str = "aiida";
    /// Parser used for the retrieved files unless overridden
    pub const DEFAULT_PARSER: &'static str = "gaussian_base_parser";
    /// Title card of generated inputs unless overridden
    pub const DEFAULT_TITLE: &'static str =
        "Gaussian Input File Generated by AiiDA via AiiDA-Gaussian Plugin";
    /// Exit status for missing retrieved files
    pub const ERROR_MISSING_OUTPUT_FILES: u32 = 100;

    /// Validates the inputs against the schema and the parameter dictionary.
    pub fn new(inputs: GaussianInputs) -> Result<Self> {
        Self::spec().validate_inputs(&inputs.supplied_ports())?;
        let parameters = Parameters::from_dict(&inputs.parameters)?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            inputs,
            parameters,
            title: Self::DEFAULT_TITLE.to_string(),
            route_tag: RouteTag::Print,
        })
    }

    /// Overrides the title card.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Overrides the route print level.
    pub fn with_route_tag(mut self, route_tag: RouteTag) -> Self {
        self.route_tag = route_tag;
        self
    }

    /// Calculation identifier.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Validated parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The input deck this calculation writes.
    pub fn gaussian_input(&self) -> Result<GaussianInput<'_>> {
        let structure = &self.inputs.structure;
        let params = &self.parameters;
        Ok(GaussianInput::new(
            structure,
            Some(structure.charge()),
            Some(structure.spin_multiplicity()),
            &self.title,
            &params.functional,
            &params.basis_set,
            params.route_parameters.clone(),
            params.input_parameters.clone(),
            params.link0_parameters.clone(),
            self.route_tag,
        )?)
    }

    /// Exit code reported when retrieved files are missing.
    pub fn missing_output_files() -> ExitCode {
        ExitCode {
            status: Self::ERROR_MISSING_OUTPUT_FILES,
            label: "ERROR_MISSING_OUTPUT_FILES".to_string(),
            message: "Calculation did not produce all expected output files.".to_string(),
        }
    }
}

impl CalcJob for GaussianCalculation {
    fn define(spec: &mut ProcessSpec) {
        spec.input(
            PortSpec::new("structure", ValidType::Structure, true)
                .help("Input structure with charge and spin multiplicity"),
        );
        spec.input(PortSpec::new("parameters", ValidType::Dict, true).help("Input parameters"));
        spec.input(
            PortSpec::new("settings", ValidType::Dict, false).help("additional input parameters"),
        );

        // MPI off by default
        spec.input(
            PortSpec::new("metadata.options.withmpi", ValidType::Bool, false)
                .default_value(json!(false)),
        );
        spec.input(
            PortSpec::new("metadata.options.parser_name", ValidType::Str, false)
                .default_value(json!(Self::DEFAULT_PARSER))
                .non_db(true),
        );

        spec.output(
            PortSpec::new("output_parameters", ValidType::Dict, true)
                .help("The result parameters of the calculation"),
        );
        spec.output(
            PortSpec::new("output_structure", ValidType::Structure, false)
                .help("Final optimized structure, if available"),
        );
        spec.default_output_node = Some("output_parameters".to_string());

        let missing = Self::missing_output_files();
        spec.exit_code(missing.status, &missing.label, &missing.message);
    }

    fn prepare_for_submission(&self, folder: &Folder) -> Result<CalcInfo> {
        let structure = &self.inputs.structure;
        debug!(
            "Preparing Gaussian job {}: {} atoms, charge {}, multiplicity {}",
            self.uuid,
            structure.num_atoms(),
            structure.charge(),
            structure.spin_multiplicity()
        );

        let input_path = folder.abs_path(Self::INPUT_FILE);
        self.gaussian_input()?.write_file(&input_path, true)?;
        info!("Gaussian input written to {}", input_path.display());

        let mut settings = Settings::new(self.inputs.settings.clone().unwrap_or_default());
        let cmdline_params = settings.take_cmdline()?;
        let additional_retrieve = settings.take_additional_retrieve_list()?;
        settings.warn_unused();

        let code_info = CodeInfo {
            cmdline_params: cmdline_params.clone(),
            code_uuid: self.inputs.code.uuid,
            stdin_name: Self::INPUT_FILE.to_string(),
            stdout_name: Self::OUTPUT_FILE.to_string(),
            withmpi: self.inputs.options.withmpi,
        };

        let mut retrieve_list = vec![Self::OUTPUT_FILE.to_string()];
        for name in additional_retrieve {
            if !retrieve_list.contains(&name) {
                retrieve_list.push(name);
            }
        }

        Ok(CalcInfo {
            uuid: self.uuid,
            cmdline_params,
            stdin_name: Self::INPUT_FILE.to_string(),
            stdout_name: Self::OUTPUT_FILE.to_string(),
            codes_info: vec![code_info],
            retrieve_list,
            local_copy_list: Vec::new(),
            remote_copy_list: Vec::new(),
        })
    }
}

/// Checks that every file in the retrieve list came back.
///
/// Returns the `ERROR_MISSING_OUTPUT_FILES` exit code naming the absent
/// files. No retry is attempted; the engine decides what happens next.
pub fn check_retrieved(
    calc_info: &CalcInfo,
    retrieved: &Folder,
) -> std::result::Result<(), ExitCode> {
    let missing: Vec<&str> = calc_info
        .retrieve_list
        .iter()
        .map(String::as_str)
        .filter(|name| !retrieved.contains(name))
        .collect();

    if missing.is_empty() {
        debug!("All {} retrieved files present", calc_info.retrieve_list.len());
        return Ok(());
    }

    warn!(
        "Calculation {} is missing output files: {}",
        calc_info.uuid,
        missing.join(", ")
    );
    Err(GaussianCalculation::missing_output_files())
}
