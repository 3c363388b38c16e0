//! Branch-and-bound over free variables.
//!
//! The button columns are split into a basis solved exactly and a handful of
//! free columns whose press counts are enumerated. Every free assignment
//! fixes the basis presses; the assignment is kept only when those come out
//! as non-negative integers within their own bounds.

use num::{BigRational, Zero};

use super::matrix::{as_press_count, invert, CoefficientMatrix, Rref};
use super::pivot::{choose_pivot_columns, enumeration_size};
use super::{settle, Limits, Outcome, System};
use crate::error::MachineError;

/// Role of one button column during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Solved from this row of the basis.
    Pivot(usize),
    /// Enumerated over `0..=bound`.
    Free(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    columns: Vec<Column>,
}

impl Partition {
    /// `pivots[r]` is the column solved by basis row `r`; every other column is free.
    pub fn new(pivots: &[usize], upper_bounds: &[u64]) -> Self {
        let mut columns: Vec<Column> = upper_bounds.iter().map(|&b| Column::Free(b)).collect();
        for (row, &col) in pivots.iter().enumerate() {
            columns[col] = Column::Pivot(row);
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Free columns with their bounds, narrowest range first so pruning kicks in early.
    pub fn free(&self) -> Vec<(usize, u64)> {
        let mut free: Vec<(usize, u64)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(col, column)| match *column {
                Column::Free(bound) => Some((col, bound)),
                Column::Pivot(_) => None,
            })
            .collect();
        free.sort_by_key(|&(_, bound)| bound);
        free
    }

    /// Bound of the column solved by each basis row, indexed by row.
    fn pivot_bounds(&self, upper_bounds: &[u64]) -> Vec<u64> {
        let mut bounds = Vec::new();
        for (col, column) in self.columns.iter().enumerate() {
            if let Column::Pivot(row) = *column {
                if bounds.len() <= row {
                    bounds.resize(row + 1, 0);
                }
                bounds[row] = upper_bounds[col];
            }
        }
        bounds
    }

    fn search<R: Basis>(&self, system: &System, basis: &R) -> Result<Outcome, MachineError> {
        let mut search = Search {
            matrix: system.matrix(),
            basis,
            free: self.free(),
            pivot_bounds: self.pivot_bounds(system.upper_bounds()),
            best: None,
        };
        let residual = system.targets().iter().map(|&t| i64::from(t)).collect();
        let assignment = vec![0; system.matrix().cols()];
        search.descend(0, residual, assignment, 0);
        settle(search.best)
    }
}

/// Recovers the basis presses once every free column has a value.
trait Basis {
    /// `residual` is the targets minus what the free presses contributed;
    /// `assignment` holds the free presses by column (zero for pivots).
    fn resolve(&self, residual: &[i64], assignment: &[u64]) -> Vec<BigRational>;
}

/// Inverse of the square pivot submatrix.
struct InverseBasis {
    inverse: Vec<Vec<BigRational>>,
}

impl Basis for InverseBasis {
    fn resolve(&self, residual: &[i64], _assignment: &[u64]) -> Vec<BigRational> {
        self.inverse
            .iter()
            .map(|row| {
                row.iter()
                    .zip(residual)
                    .filter(|&(_, &r)| r != 0)
                    .fold(BigRational::zero(), |acc, (inv, &r)| {
                        acc + inv * BigRational::from_integer(r.into())
                    })
            })
            .collect()
    }
}

impl Basis for Rref {
    fn resolve(&self, _residual: &[i64], assignment: &[u64]) -> Vec<BigRational> {
        (0..self.rank())
            .map(|row| {
                assignment
                    .iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != 0)
                    .fold(self.rhs(row).clone(), |acc, (col, &v)| {
                        acc - self.coefficient(row, col) * BigRational::from_integer(v.into())
                    })
            })
            .collect()
    }
}

struct Search<'a, R> {
    matrix: &'a CoefficientMatrix,
    basis: &'a R,
    free: Vec<(usize, u64)>,
    pivot_bounds: Vec<u64>,
    best: Option<u64>,
}

impl<R: Basis> Search<'_, R> {
    fn descend(&mut self, depth: usize, residual: Vec<i64>, assignment: Vec<u64>, presses: u64) {
        if self.best.is_some_and(|best| presses >= best) {
            return;
        }

        let Some(&(col, bound)) = self.free.get(depth) else {
            self.settle_leaf(&residual, &assignment, presses);
            return;
        };

        for value in 0..=bound {
            if self.best.is_some_and(|best| presses + value >= best) {
                break;
            }

            let next: Vec<i64> = residual
                .iter()
                .zip(self.matrix.column(col))
                .map(|(&r, a)| r - a * value as i64)
                .collect();
            // Pressing more only lowers the residual further.
            if next.iter().any(|&r| r < 0) {
                break;
            }

            let mut assignment = assignment.clone();
            assignment[col] = value;
            self.descend(depth + 1, next, assignment, presses + value);
        }
    }

    fn settle_leaf(&mut self, residual: &[i64], assignment: &[u64], presses: u64) {
        let values = self.basis.resolve(residual, assignment);

        let mut total = presses;
        for (value, &bound) in values.iter().zip(&self.pivot_bounds) {
            let Some(pressed) = as_press_count(value).filter(|&v| v <= bound) else {
                return;
            };
            let Some(sum) = total.checked_add(pressed) else {
                return;
            };
            total = sum;
        }

        if self.best.map_or(true, |best| total < best) {
            self.best = Some(total);
        }
    }
}

/// Picks a square basis with [`choose_pivot_columns`], inverts it exactly and
/// enumerates the remaining columns.
#[tracing::instrument(level = "trace", skip_all)]
pub fn by_pivot_inverse(system: &System, limits: &Limits) -> Result<Outcome, MachineError> {
    let matrix = system.matrix();
    let (rows, cols) = (matrix.rows(), matrix.cols());
    if rows == 0 || cols < rows || cols - rows > limits.max_free_dimension {
        return Ok(Outcome::NotApplicable);
    }

    let Some(selection) = choose_pivot_columns(matrix, system.upper_bounds(), limits) else {
        return Ok(Outcome::NotApplicable);
    };

    let estimate = enumeration_size(&selection.free, system.upper_bounds());
    if estimate > limits.linear_solve_max_enumeration {
        tracing::trace!(estimate, "free enumeration too large");
        return Ok(Outcome::NotApplicable);
    }

    let Ok(inverse) = invert(&matrix.submatrix(&selection.pivots)) else {
        return Ok(Outcome::NotApplicable);
    };

    Partition::new(&selection.pivots, system.upper_bounds())
        .search(system, &InverseBasis { inverse })
}

/// Lets elimination decide the pivots, then enumerates the columns without one.
///
/// An inconsistent system is a definitive [`MachineError::Unsolvable`].
#[tracing::instrument(level = "trace", skip_all)]
pub fn by_rref(system: &System, limits: &Limits) -> Result<Outcome, MachineError> {
    if system.matrix().rows() == 0 {
        return Ok(Outcome::NotApplicable);
    }

    let rref = Rref::new(system.matrix(), system.targets())?;
    let partition = Partition::new(rref.pivot_columns(), system.upper_bounds());

    let free: Vec<usize> = partition.free().into_iter().map(|(col, _)| col).collect();
    if free.len() > limits.max_free_dimension {
        return Ok(Outcome::NotApplicable);
    }
    let estimate = enumeration_size(&free, system.upper_bounds());
    if estimate > limits.rref_max_enumeration {
        tracing::trace!(estimate, "free enumeration too large");
        return Ok(Outcome::NotApplicable);
    }

    partition.search(system, &rref)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::machine::{Button, Machine};
    use crate::solver::Strategy;
    use rstest::rstest;

    fn weighted(targets: &[u16], buttons: &[&[(usize, u16)]]) -> Machine {
        Machine::new(
            targets.to_vec(),
            buttons
                .iter()
                .map(|b| Button::new(b.iter().copied()).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn partition_tags_every_column() {
        let partition = Partition::new(&[2, 0], &[5, 1, 7, 0]);
        assert_eq!(
            partition.columns(),
            &[
                Column::Pivot(1),
                Column::Free(1),
                Column::Pivot(0),
                Column::Free(0),
            ]
        );
        assert_eq!(partition.free(), vec![(3, 0), (1, 1)]);
        assert_eq!(partition.pivot_bounds(&[5, 1, 7, 0]), vec![7, 5]);
    }

    #[rstest]
    #[case::pivot_inverse(Strategy::LinearSolve)]
    #[case::rref(Strategy::RrefEnumeration)]
    fn prefers_the_bigger_step(#[case] strategy: Strategy) {
        // 6 = 3 + 3 beats 2 + 2 + 2.
        let machine = weighted(&[6], &[&[(0, 2)], &[(0, 3)]]);
        assert_eq!(run(strategy, &machine), Ok(Outcome::Solved(2)));
    }

    #[rstest]
    #[case::pivot_inverse(Strategy::LinearSolve)]
    #[case::rref(Strategy::RrefEnumeration)]
    fn square_system_has_a_unique_answer(#[case] strategy: Strategy) {
        let machine = weighted(&[4, 4], &[&[(0, 1), (1, 1)], &[(0, 2)]]);
        assert_eq!(run(strategy, &machine), Ok(Outcome::Solved(4)));
    }

    #[rstest]
    #[case::pivot_inverse(Strategy::LinearSolve)]
    #[case::rref(Strategy::RrefEnumeration)]
    fn fractional_presses_decline(#[case] strategy: Strategy) {
        let machine = weighted(&[5], &[&[(0, 2)]]);
        assert_eq!(run(strategy, &machine), Ok(Outcome::NotApplicable));
    }

    #[test]
    fn inconsistent_rref_is_unsolvable() {
        let machine = weighted(&[1, 2], &[&[(0, 1), (1, 1)]]);
        assert_eq!(
            run(Strategy::RrefEnumeration, &machine),
            Err(MachineError::Unsolvable)
        );
        // The square-basis variant cannot even pick a basis here.
        assert_eq!(
            run(Strategy::LinearSolve, &machine),
            Ok(Outcome::NotApplicable)
        );
    }

    #[test]
    fn singular_square_machine_falls_back_to_rref() {
        let machine: Machine = "(0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}"
            .parse()
            .unwrap();
        assert_eq!(
            run(Strategy::LinearSolve, &machine),
            Ok(Outcome::NotApplicable)
        );
        assert_eq!(
            run(Strategy::RrefEnumeration, &machine),
            Ok(Outcome::Solved(12))
        );
    }

    #[rstest]
    #[case("[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}", 10)]
    #[case("[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}", 12)]
    #[case("[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}", 11)]
    fn rref_solves_sample(#[case] line: &str, #[case] expected: u64) {
        let machine: Machine = line.parse().unwrap();
        assert_eq!(
            run(Strategy::RrefEnumeration, &machine),
            Ok(Outcome::Solved(expected))
        );
    }

    #[test]
    fn pivot_inverse_solves_first_sample() {
        let machine: Machine = "[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}"
            .parse()
            .unwrap();
        assert_eq!(
            run(Strategy::LinearSolve, &machine),
            Ok(Outcome::Solved(10))
        );
    }

    #[test]
    fn declines_above_enumeration_ceiling() {
        let machine: Machine = "(0) (0) (0) {200}".parse().unwrap();
        let limits = Limits {
            linear_solve_max_enumeration: 100,
            rref_max_enumeration: 100,
            ..Limits::default()
        };
        let system = System::new(&machine);

        assert_eq!(by_pivot_inverse(&system, &limits), Ok(Outcome::NotApplicable));
        assert_eq!(by_rref(&system, &limits), Ok(Outcome::NotApplicable));
        assert_eq!(
            by_rref(&system, &Limits::default()),
            Ok(Outcome::Solved(200))
        );
    }

    #[test]
    fn declines_above_free_dimension() {
        let machine: Machine = "(0) (0) (0) (0) (0) (0) (0) (0) {3}".parse().unwrap();
        let system = System::new(&machine);

        assert_eq!(
            by_pivot_inverse(&system, &Limits::default()),
            Ok(Outcome::NotApplicable)
        );
        assert_eq!(
            by_rref(&system, &Limits::default()),
            Ok(Outcome::NotApplicable)
        );
    }

    fn run(strategy: Strategy, machine: &Machine) -> Result<Outcome, MachineError> {
        let system = System::new(machine);
        let limits = Limits::default();
        match strategy {
            Strategy::LinearSolve => by_pivot_inverse(&system, &limits),
            Strategy::RrefEnumeration => by_rref(&system, &limits),
            other => unreachable!("{other:?} is not an enumeration stage"),
        }
    }
}
