//! XYZ file I/O for molecular structures.
//!
//! The XYZ format consists of:
//! 1. Number of atoms
//! 2. A comment line
//! 3. One `Element X Y Z` line per atom, in Angstrom
//!
//! The comment line may carry `charge=<int>` and `mult=<int>` (or
//! `multiplicity=<int>`) tags so that a charged or open-shell structure
//! round-trips through a plain text file.

use crate::structure::{Molecule, StructureError};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for structure file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// I/O error when reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed XYZ content
    #[error("Parse error: {0}")]
    Parse(String),
    /// The parsed structure is not a valid molecule
    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

/// Type alias for structure file results
type Result<T> = std::result::Result<T, IoError>;

lazy_static! {
    static ref CHARGE_RE: Regex = Regex::new(r"(?i)\bcharge\s*=\s*([-+]?\d+)").unwrap();
    static ref MULT_RE: Regex =
        Regex::new(r"(?i)\b(?:mult|multiplicity|spin_multiplicity)\s*=\s*(\d+)").unwrap();
}

/// Reads a molecule from an XYZ file.
///
/// Charge and multiplicity come from the comment-line tags when present;
/// otherwise the molecule is neutral with the parity-derived multiplicity.
pub fn read_xyz(path: &Path) -> Result<Molecule> {
    let content = fs::read_to_string(path)?;
    let molecule = parse_xyz(&content)?;
    debug!(
        "Read {} atoms from {} (charge {}, multiplicity {})",
        molecule.num_atoms(),
        path.display(),
        molecule.charge(),
        molecule.spin_multiplicity()
    );
    Ok(molecule)
}

/// Parses XYZ text into a molecule.
///
/// # Examples
///
/// ```
/// use gaussjob::io::parse_xyz;
///
/// let text = "2\ncharge=0 mult=3\nO 0.0 0.0 0.0\nO 0.0 0.0 1.21\n";
/// let o2 = parse_xyz(text).unwrap();
/// assert_eq!(o2.num_atoms(), 2);
/// assert_eq!(o2.spin_multiplicity(), 3);
/// ```
pub fn parse_xyz(content: &str) -> Result<Molecule> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 2 {
        return Err(IoError::Parse("Invalid XYZ file: not enough lines".into()));
    }

    let num_atoms = lines[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| IoError::Parse("Invalid XYZ file: cannot parse number of atoms".into()))?;
    let comment = lines[1];

    let mut elements = Vec::with_capacity(num_atoms);
    let mut coords = Vec::with_capacity(num_atoms * 3);
    for (offset, line) in lines.iter().skip(2).take(num_atoms).enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(IoError::Parse(format!(
                "Invalid XYZ file: line {} has fewer than 4 fields",
                offset + 3
            )));
        }
        elements.push(parts[0].to_string());
        for coord_str in &parts[1..4] {
            coords.push(coord_str.parse::<f64>().map_err(|_| {
                IoError::Parse(format!("Invalid coordinate in XYZ file: {}", coord_str))
            })?);
        }
    }
    if elements.len() != num_atoms {
        return Err(IoError::Parse(format!(
            "Invalid XYZ file: expected {} atoms, found {}",
            num_atoms,
            elements.len()
        )));
    }

    let charge = match CHARGE_RE.captures(comment) {
        Some(caps) => Some(
            caps[1]
                .parse::<i32>()
                .map_err(|_| IoError::Parse(format!("Invalid charge tag: {}", &caps[1])))?,
        ),
        None => None,
    };
    let mult = match MULT_RE.captures(comment) {
        Some(caps) => Some(
            caps[1]
                .parse::<u32>()
                .map_err(|_| IoError::Parse(format!("Invalid multiplicity tag: {}", &caps[1])))?,
        ),
        None => None,
    };

    let molecule = match mult {
        Some(mult) => {
            Molecule::with_charge_and_spin(elements, coords, charge.unwrap_or(0), mult)?
        }
        None => Molecule::with_charge(elements, coords, charge.unwrap_or(0))?,
    };
    Ok(molecule)
}

/// Writes a molecule to an XYZ file, tagging the comment line with its
/// charge and multiplicity.
pub fn write_xyz(molecule: &Molecule, path: &Path) -> Result<()> {
    let mut content = format!(
        "{}\ncharge={} mult={}\n",
        molecule.num_atoms(),
        molecule.charge(),
        molecule.spin_multiplicity()
    );

    for i in 0..molecule.num_atoms() {
        let coords = molecule.atom_coords(i);
        content.push_str(&format!(
            "{}  {:.8}  {:.8}  {:.8}\n",
            molecule.elements()[i], coords[0], coords[1], coords[2]
        ));
    }

    fs::write(path, content)?;
    Ok(())
}
