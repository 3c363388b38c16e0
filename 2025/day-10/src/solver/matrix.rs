//! Exact linear algebra over the rationals.
//!
//! Everything here works on [`BigRational`], so a value that should be an
//! integer press count either is one exactly or is rejected. Floating point
//! never enters the picture.

use num::{BigRational, Signed, ToPrimitive, Zero};

use crate::error::MachineError;
use crate::machine::Machine;

/// Press counts are capped well below `i64::MAX` so sums of a few of them stay in range.
const MAX_PRESS_BITS: u64 = 62;

/// `A[i][j]` is how much one press of button `j` adds to counter `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<i64>,
}

impl CoefficientMatrix {
    pub fn from_machine(machine: &Machine) -> Self {
        let rows = machine.counters();
        let cols = machine.buttons().len();
        let mut entries = vec![0; rows * cols];
        for (col, button) in machine.buttons().iter().enumerate() {
            for inc in button.increments() {
                entries[inc.counter * cols + col] = i64::from(inc.amount);
            }
        }
        Self {
            rows,
            cols,
            entries,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.entries[row * self.cols + col]
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = i64> + '_ {
        (0..self.rows).map(move |row| self.get(row, col))
    }

    pub fn row(&self, row: usize) -> &[i64] {
        &self.entries[row * self.cols..(row + 1) * self.cols]
    }

    /// Most presses each button can take on its own without pushing a touched
    /// counter past its target. A column touching nothing gets 0.
    pub fn upper_bounds(&self, targets: &[u16]) -> Vec<u64> {
        (0..self.cols)
            .map(|col| {
                self.column(col)
                    .zip(targets)
                    .filter(|&(a, _)| a != 0)
                    .map(|(a, &t)| u64::from(t) / a as u64)
                    .min()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Square (or narrower) integer matrix made of the given columns, in order.
    pub fn submatrix(&self, cols: &[usize]) -> Vec<Vec<i64>> {
        (0..self.rows)
            .map(|row| cols.iter().map(|&col| self.get(row, col)).collect())
            .collect()
    }
}

/// Gauss-Jordan elimination over the first `cols` columns of `rows`.
/// Returns the pivot column of each leading row, in row order.
fn gauss_jordan(rows: &mut [Vec<BigRational>], cols: usize) -> Vec<usize> {
    let mut pivots = Vec::new();

    for col in 0..cols {
        let row = pivots.len();
        if row == rows.len() {
            break;
        }

        let Some(found) = (row..rows.len()).find(|&r| !rows[r][col].is_zero()) else {
            continue;
        };
        rows.swap(row, found);

        let pivot = rows[row][col].clone();
        for value in rows[row][col..].iter_mut() {
            *value /= &pivot;
        }

        // Clone pivot row to avoid multiple mutable borrows
        let pivot_row = rows[row].clone();
        for (r, other) in rows.iter_mut().enumerate() {
            if r == row || other[col].is_zero() {
                continue;
            }
            let factor = other[col].clone();
            for (value, p) in other[col..].iter_mut().zip(&pivot_row[col..]) {
                *value -= &factor * p;
            }
        }

        pivots.push(col);
    }

    pivots
}

/// Exact inverse of a square integer matrix.
///
/// A singular matrix is reported as [`MachineError::Unsolvable`]; callers on
/// the enumeration path treat that as "this basis does not work".
pub fn invert(square: &[Vec<i64>]) -> Result<Vec<Vec<BigRational>>, MachineError> {
    let n = square.len();
    if square.iter().any(|row| row.len() != n) {
        return Err(MachineError::invalid("cannot invert a non-square matrix"));
    }

    let mut aug: Vec<Vec<BigRational>> = square
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .map(|&v| BigRational::from_integer(v.into()))
                .chain((0..n).map(|j| BigRational::from_integer(i64::from(i == j).into())))
                .collect()
        })
        .collect();

    if gauss_jordan(&mut aug, n).len() < n {
        return Err(MachineError::Unsolvable);
    }

    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Reduced row echelon form of the augmented system `[A | targets]`.
#[derive(Debug, Clone)]
pub struct Rref {
    rows: Vec<Vec<BigRational>>,
    pivots: Vec<usize>,
    cols: usize,
}

impl Rref {
    /// Reduces `[A | targets]`.
    ///
    /// A row that ends up as `0 = nonzero` proves there is no real solution,
    /// let alone a non-negative integer one, and fails with
    /// [`MachineError::Unsolvable`].
    pub fn new(matrix: &CoefficientMatrix, targets: &[u16]) -> Result<Self, MachineError> {
        let cols = matrix.cols();
        let mut rows: Vec<Vec<BigRational>> = (0..matrix.rows())
            .map(|row| {
                matrix
                    .row(row)
                    .iter()
                    .map(|&v| BigRational::from_integer(v.into()))
                    .chain(std::iter::once(BigRational::from_integer(
                        i64::from(targets[row]).into(),
                    )))
                    .collect()
            })
            .collect();

        let pivots = gauss_jordan(&mut rows, cols);

        if rows[pivots.len()..].iter().any(|row| !row[cols].is_zero()) {
            return Err(MachineError::Unsolvable);
        }

        Ok(Self { rows, pivots, cols })
    }

    /// Pivot column of each leading row; `pivot_columns()[r]` is solved by row `r`.
    pub fn pivot_columns(&self) -> &[usize] {
        &self.pivots
    }

    pub fn rank(&self) -> usize {
        self.pivots.len()
    }

    pub fn coefficient(&self, row: usize, col: usize) -> &BigRational {
        &self.rows[row][col]
    }

    pub fn rhs(&self, row: usize) -> &BigRational {
        &self.rows[row][self.cols]
    }
}

/// Accepts `value` as a press count only if it is a non-negative integer of at most 62 bits.
pub fn as_press_count(value: &BigRational) -> Option<u64> {
    if !value.is_integer() || value.is_negative() {
        return None;
    }
    let int = value.to_integer();
    if int.bits() > MAX_PRESS_BITS {
        return None;
    }
    int.to_u64()
}
