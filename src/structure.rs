//! Molecular structure records handed to a Gaussian calculation.
//!
//! This module provides the [`Molecule`] type, the structure record the host
//! engine passes to a calculation. A molecule carries:
//!
//! - Element symbols for each site
//! - Flattened Cartesian coordinates `[x1, y1, z1, x2, y2, z2, ...]`
//! - Total charge and spin multiplicity
//!
//! All coordinates are in Angstrom, all angles are reported in degrees.

use nalgebra::{DVector, Vector3};
use thiserror::Error;

/// Error type for building or querying a molecule.
#[derive(Error, Debug, PartialEq)]
pub enum StructureError {
    /// Element symbol not found in the periodic table
    #[error("Unknown element symbol: {0}")]
    UnknownElement(String),
    /// Coordinate vector has the wrong length for the number of sites
    #[error("Expected {expected} coordinates for {atoms} atoms, got {got}")]
    CoordinateMismatch {
        /// Number of sites
        atoms: usize,
        /// Required number of coordinate components
        expected: usize,
        /// Supplied number of coordinate components
        got: usize,
    },
    /// Charge and spin multiplicity cannot both hold for this electron count
    #[error(
        "Charge of {charge} and spin multiplicity of {mult} is not possible for this molecule ({electrons} electrons)"
    )]
    ImpossibleSpinState {
        /// Total charge
        charge: i32,
        /// Spin multiplicity
        mult: u32,
        /// Electron count after applying the charge
        electrons: i64,
    },
}

/// Type alias for structure operation results
type Result<T> = std::result::Result<T, StructureError>;

const ELEMENTS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the atomic number of an element symbol, ignoring case.
///
/// # Examples
///
/// ```
/// use gaussjob::structure::atomic_number;
///
/// assert_eq!(atomic_number("C"), Some(6));
/// assert_eq!(atomic_number("cl"), Some(17));
/// assert_eq!(atomic_number("Xx"), None);
/// ```
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|el| el.eq_ignore_ascii_case(symbol.trim()))
        .map(|idx| idx as u32 + 1)
}

/// Returns the canonical symbol ("Cl", not "CL") for an atomic number.
pub fn element_symbol(z: u32) -> Option<&'static str> {
    ELEMENTS.get((z as usize).checked_sub(1)?).copied()
}

/// Normalizes a user supplied element symbol to its canonical spelling.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    atomic_number(symbol)
        .and_then(element_symbol)
        .map(str::to_string)
        .ok_or_else(|| StructureError::UnknownElement(symbol.to_string()))
}

/// A molecular geometry with total charge and spin multiplicity.
///
/// `Molecule` is the structure record consumed by a calculation. It is
/// immutable once built: charge and multiplicity are checked against the
/// electron count on construction, so every `Molecule` describes a
/// realisable spin state.
///
/// # Examples
///
/// ```
/// use gaussjob::structure::Molecule;
///
/// let water = Molecule::new(
///     vec!["O".to_string(), "H".to_string(), "H".to_string()],
///     vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0],
/// )
/// .unwrap();
///
/// assert_eq!(water.num_atoms(), 3);
/// assert_eq!(water.charge(), 0);
/// assert_eq!(water.spin_multiplicity(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    elements: Vec<String>,
    coords: DVector<f64>,
    num_atoms: usize,
    charge: i32,
    spin_multiplicity: u32,
}

impl Molecule {
    /// Creates a neutral molecule whose spin multiplicity follows the
    /// electron count: singlet for an even count, doublet for an odd one.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Result<Self> {
        Self::with_charge(elements, coords, 0)
    }

    /// Creates a molecule with the given charge and the lowest multiplicity
    /// compatible with the remaining electrons.
    pub fn with_charge(elements: Vec<String>, coords: Vec<f64>, charge: i32) -> Result<Self> {
        let electrons = Self::count_electrons(&elements, charge)?;
        let mult = if electrons % 2 == 0 { 1 } else { 2 };
        Self::with_charge_and_spin(elements, coords, charge, mult)
    }

    /// Creates a molecule with an explicit charge and spin multiplicity.
    ///
    /// # Errors
    ///
    /// - [`StructureError::UnknownElement`] for a symbol outside H..Og
    /// - [`StructureError::CoordinateMismatch`] if `coords.len() != 3 * elements.len()`
    /// - [`StructureError::ImpossibleSpinState`] if the multiplicity is zero or has
    ///   the wrong parity for the electron count
    ///
    /// # Examples
    ///
    /// ```
    /// use gaussjob::structure::Molecule;
    ///
    /// // Triplet O2 is fine, a doublet O2 is not
    /// let elements = vec!["O".to_string(), "O".to_string()];
    /// let coords = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.21];
    /// assert!(Molecule::with_charge_and_spin(elements.clone(), coords.clone(), 0, 3).is_ok());
    /// assert!(Molecule::with_charge_and_spin(elements, coords, 0, 2).is_err());
    /// ```
    pub fn with_charge_and_spin(
        elements: Vec<String>,
        coords: Vec<f64>,
        charge: i32,
        spin_multiplicity: u32,
    ) -> Result<Self> {
        let elements = elements
            .iter()
            .map(|el| normalize_symbol(el))
            .collect::<Result<Vec<_>>>()?;
        let num_atoms = elements.len();
        if coords.len() != num_atoms * 3 {
            return Err(StructureError::CoordinateMismatch {
                atoms: num_atoms,
                expected: num_atoms * 3,
                got: coords.len(),
            });
        }

        let electrons = Self::count_electrons(&elements, charge)?;
        check_spin_state(electrons, charge, spin_multiplicity)?;

        Ok(Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
            charge,
            spin_multiplicity,
        })
    }

    fn count_electrons(elements: &[String], charge: i32) -> Result<i64> {
        let mut total: i64 = 0;
        for el in elements {
            let z = atomic_number(el).ok_or_else(|| StructureError::UnknownElement(el.clone()))?;
            total += i64::from(z);
        }
        Ok(total - i64::from(charge))
    }

    /// Canonical element symbols for each site in order.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Flattened Cartesian coordinates `[x1, y1, z1, x2, ...]` in Angstrom.
    pub fn coords(&self) -> &DVector<f64> {
        &self.coords
    }

    /// Number of sites in the molecule.
    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// Total charge of the molecule.
    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// Spin multiplicity (2S + 1).
    pub fn spin_multiplicity(&self) -> u32 {
        self.spin_multiplicity
    }

    /// Number of electrons after applying the charge.
    pub fn nelectrons(&self) -> i64 {
        let nuclear: i64 = self
            .elements
            .iter()
            .filter_map(|el| atomic_number(el))
            .map(i64::from)
            .sum();
        nuclear - i64::from(self.charge)
    }

    /// Cartesian coordinates of site `atom_idx` (zero-based).
    pub fn atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    fn position(&self, atom_idx: usize) -> Vector3<f64> {
        let [x, y, z] = self.atom_coords(atom_idx);
        Vector3::new(x, y, z)
    }

    /// Distance between sites `i` and `j` in Angstrom.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        (self.position(i) - self.position(j)).norm()
    }

    /// Angle `i-j-k` in degrees with `j` at the vertex.
    pub fn angle(&self, i: usize, j: usize, k: usize) -> f64 {
        let v1 = self.position(i) - self.position(j);
        let v2 = self.position(k) - self.position(j);
        let cos = (v1.dot(&v2) / (v1.norm() * v2.norm())).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// Signed dihedral angle `i-j-k-l` in degrees.
    pub fn dihedral(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        let v1 = self.position(k) - self.position(l);
        let v2 = self.position(j) - self.position(k);
        let v3 = self.position(i) - self.position(j);
        let v23 = v2.cross(&v3);
        let v12 = v1.cross(&v2);
        (v2.norm() * v1.dot(&v23)).atan2(v12.dot(&v23)).to_degrees()
    }
}

/// Checks that `mult` is reachable with `electrons` electrons.
pub(crate) fn check_spin_state(electrons: i64, charge: i32, mult: u32) -> Result<()> {
    if mult == 0 || electrons < 0 || (electrons + i64::from(mult)) % 2 != 1 {
        return Err(StructureError::ImpossibleSpinState {
            charge,
            mult,
            electrons,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        Molecule::new(
            vec!["O".to_string(), "H".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_default_multiplicity_follows_parity() {
        assert_eq!(water().spin_multiplicity(), 1);

        let oh = Molecule::new(
            vec!["O".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.97, 0.0, 0.0],
        )
        .unwrap();
        assert_eq!(oh.nelectrons(), 9);
        assert_eq!(oh.spin_multiplicity(), 2);

        let hydroxide = Molecule::with_charge(
            vec!["O".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.97, 0.0, 0.0],
            -1,
        )
        .unwrap();
        assert_eq!(hydroxide.nelectrons(), 10);
        assert_eq!(hydroxide.spin_multiplicity(), 1);
    }

    #[test]
    fn test_impossible_spin_state() {
        let result = Molecule::with_charge_and_spin(
            vec!["H".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.74, 0.0, 0.0],
            0,
            2,
        );
        assert_eq!(
            result.unwrap_err(),
            StructureError::ImpossibleSpinState {
                charge: 0,
                mult: 2,
                electrons: 2
            }
        );
    }

    #[test]
    fn test_zero_multiplicity_rejected() {
        let result = Molecule::with_charge_and_spin(
            vec!["He".to_string()],
            vec![0.0, 0.0, 0.0],
            0,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_symbols_are_normalized() {
        let mol = Molecule::new(
            vec!["CL".to_string(), "h".to_string()],
            vec![0.0, 0.0, 0.0, 1.27, 0.0, 0.0],
        )
        .unwrap();
        assert_eq!(mol.elements(), vec!["Cl", "H"]);
    }

    #[test]
    fn test_site_accessors_agree() {
        let mol = water();
        assert_eq!(mol.num_atoms(), mol.elements().len());
        assert_eq!(mol.coords().len(), 3 * mol.num_atoms());
        assert_eq!(mol.atom_coords(2), [-0.757, 0.586, 0.0]);
        assert_eq!(mol.coords()[3], 0.757);
    }

    #[test]
    fn test_unknown_element_and_length_mismatch() {
        let unknown = Molecule::new(vec!["Qq".to_string()], vec![0.0, 0.0, 0.0]);
        assert_eq!(
            unknown.unwrap_err(),
            StructureError::UnknownElement("Qq".to_string())
        );

        let short = Molecule::new(vec!["H".to_string()], vec![0.0, 0.0]);
        assert!(matches!(
            short.unwrap_err(),
            StructureError::CoordinateMismatch { expected: 3, got: 2, .. }
        ));
    }

    #[test]
    fn test_internal_coordinates() {
        let mol = water();
        assert!((mol.distance(0, 1) - (0.757f64.powi(2) + 0.586f64.powi(2)).sqrt()).abs() < 1e-12);

        let half = (0.757f64 / 0.586).atan().to_degrees();
        assert!((mol.angle(1, 0, 2) - 2.0 * half).abs() < 1e-9);

        let chain = Molecule::new(
            vec!["H".to_string(), "C".to_string(), "C".to_string(), "H".to_string()],
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
        )
        .unwrap();
        assert!((chain.dihedral(0, 1, 2, 3).abs() - 90.0).abs() < 1e-9);

        let trans = Molecule::new(
            vec!["H".to_string(), "C".to_string(), "C".to_string(), "H".to_string()],
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, -1.0, 0.0],
        )
        .unwrap();
        assert!((trans.dihedral(0, 1, 2, 3).abs() - 180.0).abs() < 1e-9);
    }
}
