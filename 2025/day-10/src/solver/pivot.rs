use std::cmp::Reverse;

use itertools::Itertools;
use num_integer::Integer;

use super::matrix::CoefficientMatrix;
use super::Limits;

/// Invertibility is checked modulo each of these. A determinant that happens
/// to be a multiple of one of them still shows up under the other.
const PRIMES: [u64; 2] = [1_000_000_007, 1_000_000_009];

/// Split of the button columns into an invertible square basis and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSelection {
    /// Basis columns; the `r`-th one is solved by row `r` of the inverted submatrix.
    pub pivots: Vec<usize>,
    /// Remaining columns, ascending.
    pub free: Vec<usize>,
}

impl PivotSelection {
    fn from_pivots(cols: usize, pivots: Vec<usize>) -> Self {
        let free = (0..cols).filter(|c| !pivots.contains(c)).collect();
        Self { pivots, free }
    }
}

/// Number of assignments the free columns can take, saturating at `u64::MAX`.
pub fn enumeration_size(free: &[usize], upper_bounds: &[u64]) -> u64 {
    free.iter()
        .try_fold(1u64, |acc, &col| acc.checked_mul(upper_bounds[col].checked_add(1)?))
        .unwrap_or(u64::MAX)
}

/// Picks `rows` columns forming an invertible submatrix, trying to leave the
/// cheapest possible set of free columns to enumerate.
///
/// Small instances try every subset; larger ones run a single greedy pass
/// that prefers wide-range columns as pivots. The greedy pass may miss a
/// basis that exists, in which case this returns `None`.
pub fn choose_pivot_columns(
    matrix: &CoefficientMatrix,
    upper_bounds: &[u64],
    limits: &Limits,
) -> Option<PivotSelection> {
    if matrix.cols() < matrix.rows() {
        return None;
    }

    if matrix.cols() <= limits.exhaustive_pivot_max_buttons
        && matrix.rows() <= limits.exhaustive_pivot_max_counters
    {
        exhaustive(matrix, upper_bounds)
    } else {
        greedy(matrix, upper_bounds)
    }
}

fn exhaustive(matrix: &CoefficientMatrix, upper_bounds: &[u64]) -> Option<PivotSelection> {
    (0..matrix.cols())
        .combinations(matrix.rows())
        .filter(|cols| {
            PRIMES
                .iter()
                .any(|&p| is_invertible_mod(matrix, cols, p))
        })
        .map(|cols| PivotSelection::from_pivots(matrix.cols(), cols))
        .min_by_key(|selection| enumeration_size(&selection.free, upper_bounds))
}

fn greedy(matrix: &CoefficientMatrix, upper_bounds: &[u64]) -> Option<PivotSelection> {
    let mut order: Vec<usize> = (0..matrix.cols()).collect();
    order.sort_by_key(|&col| Reverse(upper_bounds[col]));

    PRIMES
        .iter()
        .map(|&p| select_pivots_mod(matrix, &order, p))
        .find(|pivots| pivots.len() == matrix.rows())
        .map(|pivots| PivotSelection::from_pivots(matrix.cols(), pivots))
}

fn is_invertible_mod(matrix: &CoefficientMatrix, cols: &[usize], p: u64) -> bool {
    reduce_mod(residues(matrix, cols, p), p).len() == cols.len()
}

/// Pivot columns found by one elimination pass visiting columns in `order`.
fn select_pivots_mod(matrix: &CoefficientMatrix, order: &[usize], p: u64) -> Vec<usize> {
    reduce_mod(residues(matrix, order, p), p)
        .into_iter()
        .map(|i| order[i])
        .collect()
}

fn residues(matrix: &CoefficientMatrix, cols: &[usize], p: u64) -> Vec<Vec<u64>> {
    matrix
        .submatrix(cols)
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.rem_euclid(p as i64) as u64).collect())
        .collect()
}

/// Forward elimination mod `p`; returns the positions of the pivot columns.
fn reduce_mod(mut rows: Vec<Vec<u64>>, p: u64) -> Vec<usize> {
    let cols = rows.first().map_or(0, Vec::len);
    let mut pivots = Vec::new();

    for col in 0..cols {
        let row = pivots.len();
        if row == rows.len() {
            break;
        }

        let Some(found) = (row..rows.len()).find(|&r| rows[r][col] != 0) else {
            continue;
        };
        rows.swap(row, found);

        let inv = mod_inverse(rows[row][col], p);
        let (head, tail) = rows.split_at_mut(row + 1);
        let pivot_row = &head[row];
        for other in tail.iter_mut().filter(|other| other[col] != 0) {
            let factor = other[col] * inv % p;
            for (value, &pv) in other[col..].iter_mut().zip(&pivot_row[col..]) {
                *value = (*value + p - factor * pv % p) % p;
            }
        }

        pivots.push(col);
    }

    pivots
}

/// Inverse of a non-zero residue modulo the prime `p`.
fn mod_inverse(a: u64, p: u64) -> u64 {
    let egcd = (a as i64).extended_gcd(&(p as i64));
    egcd.x.rem_euclid(p as i64) as u64
}
