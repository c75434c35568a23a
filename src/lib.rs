#![deny(missing_docs)]

//! gaussjob - Gaussian calculation jobs for workflow engines
//!
//! gaussjob lets a workflow engine run the Gaussian quantum chemistry program
//! as a managed calculation. Given a molecule and a parameters dictionary it
//! produces:
//!
//! 1. **An input file**: `aiida.gjf` in Gaussian's native syntax
//! 2. **A job descriptor**: a [`calcjob::CalcInfo`] telling the engine which
//!    file to feed on standard input, where to capture standard output,
//!    which arguments to pass and which files to retrieve
//!
//! The engine owns scheduling, transport, retries and provenance; gaussjob
//! only validates inputs, writes one file and returns one descriptor.
//!
//! # Quick Start
//!
//! ```no_run
//! use gaussjob::calcjob::{CalcJob, Folder, GaussianCalculation, GaussianInputs};
//! use gaussjob::structure::Molecule;
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let water = Molecule::new(
//!         vec!["O".into(), "H".into(), "H".into()],
//!         vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0],
//!     )?;
//!     let parameters = json!({
//!         "functional": "B3LYP",
//!         "basis_set": "6-31G*",
//!         "route_parameters": {"opt": null},
//!     });
//!
//!     let inputs = GaussianInputs::new(water, parameters.as_object().unwrap().clone());
//!     let calc = GaussianCalculation::new(inputs)?;
//!     let calc_info = calc.prepare_for_submission(&Folder::create("sandbox")?)?;
//!     println!("{}", serde_json::to_string_pretty(&calc_info)?);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`structure`](structure/index.html) - Molecules with charge and spin multiplicity
//! - [`io`](io/index.html) - XYZ structure files
//! - [`parameters`](parameters/index.html) - Parameters and settings dictionaries
//! - [`gaussian_input`](gaussian_input/index.html) - Gaussian input rendering
//! - [`calcjob`](calcjob/index.html) - Plugin contract and the Gaussian calculation
//! - [`settings`](settings/index.html) - Program configuration files
//! - [`template_generator`](template_generator/index.html) - Dictionary templates
//! - [`help`](help/index.html) - Built-in help system

pub mod calcjob;
pub mod gaussian_input;
/// Built-in help system
pub mod help;
pub mod io;
pub mod parameters;
/// Configuration management system
pub mod settings;
pub mod structure;
/// Parameter and settings templates
pub mod template_generator;

pub use calcjob::{CalcInfo, CalcJob, GaussianCalculation};
pub use structure::Molecule;
