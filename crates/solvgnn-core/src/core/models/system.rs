use super::atom::{AtomRecord, GB_PARAMETER_WIDTH, GbParameters};
use nalgebra::Point3;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Atom set is empty; at least one atom is required")]
    EmptyInput,
    #[error("Batch id {batch_id} references no atoms (batch ids must be dense from 0)")]
    EmptyMolecule { batch_id: usize },
    #[error("Atom {atom} has neither GB parameters nor a raw feature row")]
    MissingParameters { atom: usize },
    #[error("Atom {atom} has a raw feature row of width {found}, expected at least {expected}")]
    InvalidFeatureWidth {
        atom: usize,
        expected: usize,
        found: usize,
    },
    #[error("Expected {expected} positions, found {found}")]
    PositionCountMismatch { expected: usize, found: usize },
    #[error("Expected one lambda pair per molecule ({expected}), found {found}")]
    LambdaCountMismatch { expected: usize, found: usize },
    #[error("Lambda '{kind}' of molecule {molecule} is {value}, expected a value in [0, 1]")]
    LambdaOutOfRange {
        molecule: usize,
        kind: &'static str,
        value: f64,
    },
}

/// Which per-atom field feeds the model.
///
/// The model prefers the selected source and falls back to the other one for atoms that
/// lack it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureSelector {
    #[default]
    GbParameters,
    RawFeatures,
}

/// An ordered, validated collection of atoms, possibly spanning several molecules.
///
/// Construction guarantees that the set is non-empty, that batch ids are dense
/// (`0..molecule_count`, every id used by at least one atom) and that every atom carries at
/// least one parameter representation.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSet {
    atoms: Vec<AtomRecord>,
    molecule_count: usize,
}

impl AtomSet {
    pub fn new(atoms: Vec<AtomRecord>) -> Result<Self, InputError> {
        if atoms.is_empty() {
            return Err(InputError::EmptyInput);
        }

        for (index, atom) in atoms.iter().enumerate() {
            if atom.gb_parameters.is_none() && atom.raw_features.is_none() {
                return Err(InputError::MissingParameters { atom: index });
            }
        }

        let molecule_count = atoms.iter().map(|a| a.batch_id).max().unwrap_or(0) + 1;
        let mut populated = vec![false; molecule_count];
        for atom in &atoms {
            populated[atom.batch_id] = true;
        }
        if let Some(batch_id) = populated.iter().position(|&p| !p) {
            return Err(InputError::EmptyMolecule { batch_id });
        }

        Ok(Self {
            atoms,
            molecule_count,
        })
    }

    /// Concatenates independent molecules into one batch.
    ///
    /// Each input set keeps its internal batch structure; its batch ids are shifted past the
    /// molecules of the preceding sets. Atom order is preserved.
    pub fn batch(sets: &[AtomSet]) -> Result<Self, InputError> {
        let mut atoms = Vec::with_capacity(sets.iter().map(AtomSet::len).sum());
        let mut offset = 0;
        for set in sets {
            atoms.extend(set.atoms.iter().cloned().map(|mut atom| {
                atom.batch_id += offset;
                atom
            }));
            offset += set.molecule_count;
        }
        Self::new(atoms)
    }

    /// Returns a copy of this set with new coordinates and all other fields unchanged.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Result<Self, InputError> {
        if positions.len() != self.atoms.len() {
            return Err(InputError::PositionCountMismatch {
                expected: self.atoms.len(),
                found: positions.len(),
            });
        }
        let atoms = self
            .atoms
            .iter()
            .zip(positions)
            .map(|(atom, &position)| AtomRecord {
                position,
                ..atom.clone()
            })
            .collect();
        Ok(Self {
            atoms,
            molecule_count: self.molecule_count,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Always `false`; an empty set cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[inline]
    pub fn molecule_count(&self) -> usize {
        self.molecule_count
    }

    pub fn atoms(&self) -> &[AtomRecord] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&AtomRecord> {
        self.atoms.get(index)
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn batch_ids(&self) -> Vec<usize> {
        self.atoms.iter().map(|a| a.batch_id).collect()
    }

    /// Indices of the atoms belonging to one molecule, in set order.
    pub fn molecule_atoms(&self, batch_id: usize) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.batch_id == batch_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Resolves the GB parameter row of every atom according to `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidFeatureWidth`] if a raw feature row that has to be used is
    /// shorter than [`GB_PARAMETER_WIDTH`].
    pub fn gb_parameters(&self, selector: FeatureSelector) -> Result<Vec<GbParameters>, InputError> {
        self.atoms
            .iter()
            .enumerate()
            .map(|(index, atom)| Self::select_parameters(index, atom, selector))
            .collect()
    }

    fn select_parameters(
        index: usize,
        atom: &AtomRecord,
        selector: FeatureSelector,
    ) -> Result<GbParameters, InputError> {
        let from_raw = |row: &Vec<f64>| {
            GbParameters::from_row(row).ok_or(InputError::InvalidFeatureWidth {
                atom: index,
                expected: GB_PARAMETER_WIDTH,
                found: row.len(),
            })
        };

        match (selector, &atom.gb_parameters, &atom.raw_features) {
            (FeatureSelector::GbParameters, Some(params), _) => Ok(*params),
            (FeatureSelector::RawFeatures, _, Some(row)) => from_raw(row),
            (_, Some(params), None) => Ok(*params),
            (_, _, Some(row)) => from_raw(row),
            (_, None, None) => Err(InputError::MissingParameters { atom: index }),
        }
    }
}
