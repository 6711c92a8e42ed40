//! Cells, relations and the validated table model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{SuppressError, SuppressResult};
use crate::model::SuppressionOutcome;

/// Publication status of a cell before suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    /// Structural zero; can never be suppressed.
    MustBeZero,

    /// Primary suppression; must always be suppressed.
    Sensitive,

    /// May be chosen as a secondary suppression.
    Suppressible,
}

impl CellStatus {
    /// Parse the single-letter status code used in cell files
    /// (`z`, `u`, `s`).
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'z' => Some(CellStatus::MustBeZero),
            'u' => Some(CellStatus::Sensitive),
            's' => Some(CellStatus::Suppressible),
            _ => None,
        }
    }

    /// Single-letter status code.
    pub fn code(self) -> char {
        match self {
            CellStatus::MustBeZero => 'z',
            CellStatus::Sensitive => 'u',
            CellStatus::Suppressible => 's',
        }
    }
}

/// One table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Unique identifier.
    pub id: String,

    /// True value.
    pub nominal: f64,

    /// Cost of suppressing this cell.
    pub weight: f64,

    /// Publication status.
    pub status: CellStatus,

    /// Smallest value the cell could take.
    pub lower_bound: f64,

    /// Largest value the cell could take.
    pub upper_bound: f64,

    /// Required gap below the nominal value in any derived range.
    pub lower_protection: f64,

    /// Required gap above the nominal value in any derived range.
    pub upper_protection: f64,

    /// Final publication decision.
    #[serde(default)]
    pub suppressed: bool,
}

impl Cell {
    /// Create a cell with weight 1, no protection and the degenerate range
    /// `[nominal, nominal]`; widen it with [`Self::with_bounds`].
    pub fn new(id: impl Into<String>, nominal: f64, status: CellStatus) -> Self {
        Self {
            id: id.into(),
            nominal,
            weight: 1.0,
            status,
            lower_bound: nominal,
            upper_bound: nominal,
            lower_protection: 0.0,
            upper_protection: 0.0,
            suppressed: false,
        }
    }

    /// Set the suppression weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the feasible value range.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    /// Set the lower and upper protection levels.
    pub fn with_protection(mut self, lower: f64, upper: f64) -> Self {
        self.lower_protection = lower;
        self.upper_protection = upper;
        self
    }

    /// Room above the nominal value.
    pub fn up_slack(&self) -> f64 {
        self.upper_bound - self.nominal
    }

    /// Room below the nominal value.
    pub fn down_slack(&self) -> f64 {
        self.nominal - self.lower_bound
    }

    /// Primary suppression.
    pub fn is_sensitive(&self) -> bool {
        self.status == CellStatus::Sensitive
    }

    /// Structural zero or unmarked zero: never suppressed.
    pub fn is_pinned_zero(&self) -> bool {
        self.status == CellStatus::MustBeZero || (self.nominal == 0.0 && !self.is_sensitive())
    }
}

/// A linear equation `sum(coef * cell) = rhs` over cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Signed terms as `(cell id, +1 | -1)` pairs.
    pub terms: Vec<(String, f64)>,

    /// Right-hand side (marginal); zero for plain additivity.
    #[serde(default)]
    pub rhs: f64,
}

impl Relation {
    /// Create a relation with zero right-hand side.
    pub fn new<S: Into<String>>(terms: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            terms: terms.into_iter().map(|(id, c)| (id.into(), c)).collect(),
            rhs: 0.0,
        }
    }

    /// Relation stating that `parts` add up to `total`.
    pub fn total<S: Into<String>>(total: impl Into<String>, parts: impl IntoIterator<Item = S>) -> Self {
        let mut terms: Vec<(String, f64)> = parts.into_iter().map(|p| (p.into(), 1.0)).collect();
        terms.push((total.into(), -1.0));
        Self { terms, rhs: 0.0 }
    }

    /// Set the right-hand side.
    pub fn with_rhs(mut self, rhs: f64) -> Self {
        self.rhs = rhs;
        self
    }
}

/// A relation with cell ids resolved to indices.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRow {
    /// `(cell index, coefficient)` pairs.
    pub terms: Vec<(usize, f64)>,

    /// Right-hand side.
    pub rhs: f64,
}

/// Validated, immutable table: cells, relations and their index.
#[derive(Debug, Clone)]
pub struct TableModel {
    cells: Vec<Cell>,
    rows: Vec<RelationRow>,
    index: HashMap<String, usize>,
    matrix: CsMat<f64>,
}

impl TableModel {
    /// Validate and index a table.
    pub fn new(cells: Vec<Cell>, relations: Vec<Relation>) -> SuppressResult<Self> {
        let mut index = HashMap::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            validate_cell(cell)?;
            if index.insert(cell.id.clone(), i).is_some() {
                return Err(SuppressError::InvalidModel(format!(
                    "duplicate cell id {}",
                    cell.id
                )));
            }
        }

        let mut rows = Vec::with_capacity(relations.len());
        for (r, relation) in relations.iter().enumerate() {
            rows.push(resolve_relation(r, relation, &cells, &index)?);
        }

        let mut tri = TriMat::new((rows.len(), cells.len()));
        for (r, row) in rows.iter().enumerate() {
            for &(j, a) in &row.terms {
                tri.add_triplet(r, j, a);
            }
        }

        for cell in &cells {
            if cell.status == CellStatus::Suppressible && cell.nominal == 0.0 {
                log::warn!(
                    "cell {} has zero value but is not marked as a structural zero; it will never be suppressed",
                    cell.id
                );
            }
        }

        Ok(Self {
            cells,
            rows,
            index,
            matrix: tri.to_csr(),
        })
    }

    /// All cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell by index.
    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Relations with resolved cell indices.
    pub fn relation_rows(&self) -> &[RelationRow] {
        &self.rows
    }

    /// Relation matrix (relations x cells) in CSR format.
    pub fn relation_matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Index of the cell with the given id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Indices of the sensitive cells.
    pub fn sensitive_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_sensitive())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of cells that may be suppressed at all.
    pub fn num_suppressible(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_pinned_zero()).count()
    }

    /// Record the final publication decision on every cell.
    pub fn apply_outcome(&mut self, outcome: &SuppressionOutcome) {
        for (cell, &flag) in self.cells.iter_mut().zip(outcome.pattern.as_slice()) {
            cell.suppressed = flag;
        }
    }
}

fn validate_cell(cell: &Cell) -> SuppressResult<()> {
    let values = [
        cell.nominal,
        cell.weight,
        cell.lower_bound,
        cell.upper_bound,
        cell.lower_protection,
        cell.upper_protection,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(SuppressError::InvalidModel(format!(
            "cell {} has non-finite data",
            cell.id
        )));
    }
    if cell.lower_bound > cell.upper_bound {
        return Err(SuppressError::InvalidModel(format!(
            "cell {} has lower bound {} above upper bound {}",
            cell.id, cell.lower_bound, cell.upper_bound
        )));
    }
    if cell.nominal < cell.lower_bound || cell.nominal > cell.upper_bound {
        return Err(SuppressError::InvalidModel(format!(
            "cell {} has nominal value {} outside [{}, {}]",
            cell.id, cell.nominal, cell.lower_bound, cell.upper_bound
        )));
    }
    if cell.weight < 0.0 || cell.lower_protection < 0.0 || cell.upper_protection < 0.0 {
        return Err(SuppressError::InvalidModel(format!(
            "cell {} has a negative weight or protection level",
            cell.id
        )));
    }
    match cell.status {
        CellStatus::MustBeZero if cell.nominal != 0.0 => Err(SuppressError::InvalidModel(format!(
            "structural zero {} has nominal value {}",
            cell.id, cell.nominal
        ))),
        CellStatus::Sensitive if cell.nominal == 0.0 => Err(SuppressError::InvalidModel(format!(
            "sensitive cell {} has zero nominal value",
            cell.id
        ))),
        _ => Ok(()),
    }
}

fn resolve_relation(
    r: usize,
    relation: &Relation,
    cells: &[Cell],
    index: &HashMap<String, usize>,
) -> SuppressResult<RelationRow> {
    if relation.terms.is_empty() {
        return Err(SuppressError::InvalidModel(format!("relation {} is empty", r)));
    }
    if !relation.rhs.is_finite() {
        return Err(SuppressError::InvalidModel(format!(
            "relation {} has non-finite right-hand side",
            r
        )));
    }

    let mut terms = Vec::with_capacity(relation.terms.len());
    for (id, coef) in &relation.terms {
        let j = *index.get(id).ok_or_else(|| {
            SuppressError::InvalidModel(format!("relation {} refers to unknown cell {}", r, id))
        })?;
        if *coef != 1.0 && *coef != -1.0 {
            return Err(SuppressError::InvalidModel(format!(
                "relation {} has coefficient {} on cell {}; only +1 and -1 are allowed",
                r, coef, id
            )));
        }
        if terms.iter().any(|&(k, _)| k == j) {
            return Err(SuppressError::InvalidModel(format!(
                "relation {} mentions cell {} twice",
                r, id
            )));
        }
        terms.push((j, *coef));
    }

    let sum: f64 = terms.iter().map(|&(j, a)| a * cells[j].nominal).sum();
    let scale: f64 = terms.iter().map(|&(j, _)| cells[j].nominal.abs()).sum::<f64>() + 1.0;
    if (sum - relation.rhs).abs() > 1e-9 * scale {
        return Err(SuppressError::InvalidModel(format!(
            "relation {} does not hold for the nominal values ({} != {})",
            r, sum, relation.rhs
        )));
    }

    Ok(RelationRow {
        terms,
        rhs: relation.rhs,
    })
}
