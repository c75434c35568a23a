//! Gaussian input (`.gjf`) generation.
//!
//! A Gaussian input file has the layout
//!
//! ```text
//! %chk=aiida.chk              <- Link 0 commands (optional)
//! #P B3LYP/6-31G* opt nosymm  <- route section
//!
//! Title card
//!
//! 0 1                         <- charge and multiplicity
//! O 0.000000 0.000000 0.000000
//! ...
//!                             <- blank line ends the molecule
//! extra input sections        <- input parameters (optional)
//! ```
//!
//! [`GaussianInput`] collects those pieces and renders them. Keyword groups
//! are rendered by [`para_dict_to_string`], which understands bare keywords
//! (`nosymm`), valued keywords (`maxdisk=2GB`) and keyword options
//! (`opt=(maxcycles=50,tight)`).

use crate::parameters::ParamGroup;
use crate::structure::{check_spin_state, Molecule, StructureError};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Error type for Gaussian input generation.
#[derive(Error, Debug)]
pub enum GaussianInputError {
    /// Writing the input file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Charge/multiplicity do not fit the molecule
    #[error("{0}")]
    Structure(#[from] StructureError),
    /// Route tag other than `#`, `#N`, `#P` or `#T`
    #[error("Invalid route tag: {0} (expected #, #N, #P or #T)")]
    InvalidRouteTag(String),
}

type Result<T> = std::result::Result<T, GaussianInputError>;

/// Print level selected by the first token of the route section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteTag {
    /// `#`: default output
    Default,
    /// `#N`: normal output
    Normal,
    /// `#P`: additional output, used for all generated jobs by default
    #[default]
    Print,
    /// `#T`: terse output
    Terse,
}

impl fmt::Display for RouteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RouteTag::Default => "#",
            RouteTag::Normal => "#N",
            RouteTag::Print => "#P",
            RouteTag::Terse => "#T",
        };
        f.write_str(tag)
    }
}

impl RouteTag {
    /// Print level letter without the leading `#`; `default` for a bare `#`.
    pub fn letter(&self) -> &'static str {
        match self {
            RouteTag::Default => "default",
            RouteTag::Normal => "N",
            RouteTag::Print => "P",
            RouteTag::Terse => "T",
        }
    }
}

/// Accepts `#P`, `P` and `p` alike; `#`, `""` and `default` select the bare tag.
impl FromStr for RouteTag {
    type Err = GaussianInputError;

    fn from_str(s: &str) -> Result<Self> {
        let level = s.trim();
        let level = level.strip_prefix('#').unwrap_or(level);
        match level.to_uppercase().as_str() {
            "" | "DEFAULT" => Ok(RouteTag::Default),
            "N" => Ok(RouteTag::Normal),
            "P" => Ok(RouteTag::Print),
            "T" => Ok(RouteTag::Terse),
            _ => Err(GaussianInputError::InvalidRouteTag(s.to_string())),
        }
    }
}

/// A complete Gaussian input deck.
#[derive(Debug, Clone)]
pub struct GaussianInput<'a> {
    molecule: &'a Molecule,
    /// Charge written on the charge/multiplicity line
    pub charge: i32,
    /// Multiplicity written on the charge/multiplicity line
    pub spin_multiplicity: u32,
    /// Title card
    pub title: String,
    /// Functional or method
    pub functional: String,
    /// Basis set
    pub basis_set: String,
    /// Route-section keywords
    pub route_parameters: ParamGroup,
    /// Sections after the molecule specification
    pub input_parameters: ParamGroup,
    /// Link 0 commands
    pub link0_parameters: ParamGroup,
    /// Route print level
    pub route_tag: RouteTag,
}

impl<'a> GaussianInput<'a> {
    /// Builds an input deck for `molecule`.
    ///
    /// `charge` and `spin_multiplicity` default to the molecule's own values.
    /// Missing keyword groups are treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`GaussianInputError::Structure`] if the charge and
    /// multiplicity cannot both hold for the molecule's electron count.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        molecule: &'a Molecule,
        charge: Option<i32>,
        spin_multiplicity: Option<u32>,
        title: &str,
        functional: &str,
        basis_set: &str,
        route_parameters: Option<ParamGroup>,
        input_parameters: Option<ParamGroup>,
        link0_parameters: Option<ParamGroup>,
        route_tag: RouteTag,
    ) -> Result<Self> {
        let charge = charge.unwrap_or_else(|| molecule.charge());
        let spin_multiplicity = spin_multiplicity.unwrap_or_else(|| molecule.spin_multiplicity());

        // Electron count shifts with any charge override
        let electrons = molecule.nelectrons() + i64::from(molecule.charge()) - i64::from(charge);
        check_spin_state(electrons, charge, spin_multiplicity)?;

        Ok(Self {
            molecule,
            charge,
            spin_multiplicity,
            title: title.to_string(),
            functional: functional.to_string(),
            basis_set: basis_set.to_string(),
            route_parameters: route_parameters.unwrap_or_default(),
            input_parameters: input_parameters.unwrap_or_default(),
            link0_parameters: link0_parameters.unwrap_or_default(),
            route_tag,
        })
    }

    /// The molecule this deck describes.
    pub fn molecule(&self) -> &Molecule {
        self.molecule
    }

    /// The route line, e.g. `#P B3LYP/6-31G* nosymm`.
    ///
    /// The route keywords always follow a single space, so an empty group
    /// leaves a trailing blank after the method.
    pub fn route_line(&self) -> String {
        let functional = self.functional.trim();
        let basis = self.basis_set.trim();
        let method = if !functional.is_empty() && !basis.is_empty() {
            format!(" {}/{}", functional, basis)
        } else {
            format!(" {}{}", functional, basis).trim_end().to_string()
        };

        let route = para_dict_to_string(&self.route_parameters, " ");
        format!("{}{} {}", self.route_tag, method, route)
    }

    /// Cartesian molecule specification, one `El x y z` line per atom.
    pub fn cart_coords(&self) -> String {
        (0..self.molecule.num_atoms())
            .map(|i| {
                let [x, y, z] = self.molecule.atom_coords(i);
                format!("{} {:.6} {:.6} {:.6}", self.molecule.elements()[i], x, y, z)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Z-matrix molecule specification followed by its variable block.
    ///
    /// Each atom is placed relative to the previously listed atoms, nearest
    /// first.
    pub fn zmatrix(&self) -> String {
        let mol = self.molecule;
        let mut rows = Vec::with_capacity(mol.num_atoms());
        let mut vars = Vec::new();

        for i in 0..mol.num_atoms() {
            let el = &mol.elements()[i];
            let nn = nearest_preceding(mol, i);
            match i {
                0 => rows.push(el.to_string()),
                1 => {
                    rows.push(format!("{} {} B{}", el, nn[0] + 1, i));
                    vars.push(format!("B{}={:.6}", i, mol.distance(i, nn[0])));
                }
                2 => {
                    rows.push(format!("{} {} B{} {} A{}", el, nn[0] + 1, i, nn[1] + 1, i));
                    vars.push(format!("B{}={:.6}", i, mol.distance(i, nn[0])));
                    vars.push(format!("A{}={:.6}", i, mol.angle(i, nn[0], nn[1])));
                }
                _ => {
                    rows.push(format!(
                        "{} {} B{} {} A{} {} D{}",
                        el,
                        nn[0] + 1,
                        i,
                        nn[1] + 1,
                        i,
                        nn[2] + 1,
                        i
                    ));
                    vars.push(format!("B{}={:.6}", i, mol.distance(i, nn[0])));
                    vars.push(format!("A{}={:.6}", i, mol.angle(i, nn[0], nn[1])));
                    vars.push(format!("D{}={:.6}", i, mol.dihedral(i, nn[0], nn[1], nn[2])));
                }
            }
        }

        format!("{}\n\n{}", rows.join("\n"), vars.join("\n"))
    }

    /// Renders the full input deck.
    ///
    /// With `cart_coords` the molecule is written in Cartesian form,
    /// otherwise as a Z-matrix.
    pub fn to_input_string(&self, cart_coords: bool) -> String {
        let mut output = Vec::new();
        if !self.link0_parameters.is_empty() {
            output.push(para_dict_to_string(&self.link0_parameters, "\n"));
        }
        output.push(self.route_line());
        output.push(String::new());
        output.push(self.title.clone());
        output.push(String::new());
        output.push(format!("{} {}", self.charge, self.spin_multiplicity));
        output.push(if cart_coords {
            self.cart_coords()
        } else {
            self.zmatrix()
        });
        output.push(String::new());
        output.push(para_dict_to_string(&self.input_parameters, "\n"));
        output.push("\n".to_string());
        output.join("\n")
    }

    /// Writes the rendered deck to `path`.
    pub fn write_file(&self, path: &Path, cart_coords: bool) -> Result<()> {
        let content = self.to_input_string(cart_coords);
        fs::write(path, &content)?;
        debug!(
            "Wrote Gaussian input ({} atoms, route '{}') to {}",
            self.molecule.num_atoms(),
            self.route_line(),
            path.display()
        );
        Ok(())
    }
}

impl fmt::Display for GaussianInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_input_string(true))
    }
}

/// Indices of the atoms before `site`, sorted by distance to it.
fn nearest_preceding(mol: &Molecule, site: usize) -> Vec<usize> {
    let mut all: Vec<(f64, usize)> = (0..site).map(|j| (mol.distance(site, j), j)).collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0));
    all.into_iter().map(|(_, j)| j).collect()
}

/// Renders a keyword group.
///
/// - `null` or `""` gives the bare keyword
/// - an object gives `key=(k1=v1,k2)` with options joined by commas
/// - an array gives `key=(a,b)`
/// - anything else gives `key=value`, booleans as `True`/`False`
///
/// # Examples
///
/// ```
/// use gaussjob::gaussian_input::para_dict_to_string;
/// use gaussjob::parameters::ParamGroup;
/// use serde_json::json;
///
/// let mut route = ParamGroup::new();
/// route.insert("nosymm".to_string(), json!(null));
/// route.insert("opt".to_string(), json!({"maxcycles": 50, "tight": null}));
/// assert_eq!(para_dict_to_string(&route, " "), "nosymm opt=(maxcycles=50,tight)");
/// ```
pub fn para_dict_to_string(group: &ParamGroup, joiner: &str) -> String {
    group
        .iter()
        .map(|(key, value)| render_parameter(key, value))
        .collect::<Vec<_>>()
        .join(joiner)
}

fn render_parameter(key: &str, value: &Value) -> String {
    match value {
        Value::Null => key.to_string(),
        Value::String(s) if s.is_empty() => key.to_string(),
        Value::Object(map) => {
            let nested: ParamGroup = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            format!("{}=({})", key, para_dict_to_string(&nested, ","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_scalar).collect();
            format!("{}=({})", key, items.join(","))
        }
        other => format!("{}={}", key, render_scalar(other)),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}
