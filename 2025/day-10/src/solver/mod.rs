//! Minimum button presses for a joltage machine.
//!
//! No single technique covers every machine shape, so [`Solver`] runs a
//! cascade of stages. Each stage either answers definitively or declines
//! with [`Outcome::NotApplicable`] and lets the next one try:
//!
//! 1. [`Strategy::LinearSolve`]: invert a square basis, enumerate the rest.
//! 2. [`Strategy::RrefEnumeration`]: same idea on the reduced row echelon form.
//! 3. [`Strategy::DenseBfs`]: BFS over a mixed-radix state array.
//! 4. [`Strategy::SparseBidirectionalBfs`]: meet-in-the-middle BFS over hash maps.

pub mod dense;
pub mod enumerate;
pub mod matrix;
pub mod pivot;
pub mod radix;
pub mod sparse;

use crate::error::MachineError;
use crate::machine::Machine;
use matrix::CoefficientMatrix;

/// What a single stage concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Solved(u64),
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    LinearSolve,
    RrefEnumeration,
    DenseBfs,
    SparseBidirectionalBfs,
}

impl Strategy {
    pub const CASCADE: [Strategy; 4] = [
        Strategy::LinearSolve,
        Strategy::RrefEnumeration,
        Strategy::DenseBfs,
        Strategy::SparseBidirectionalBfs,
    ];
}

/// Static size ceilings. A stage whose instance exceeds its ceiling declines
/// without doing the work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub linear_solve_max_enumeration: u64,
    pub rref_max_enumeration: u64,
    pub max_free_dimension: usize,
    pub exhaustive_pivot_max_buttons: usize,
    pub exhaustive_pivot_max_counters: usize,
    pub dense_max_states: u64,
    pub sparse_max_visited: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            linear_solve_max_enumeration: 5_000_000,
            rref_max_enumeration: 10_000_000,
            max_free_dimension: 6,
            exhaustive_pivot_max_buttons: 20,
            exhaustive_pivot_max_counters: 16,
            dense_max_states: 30_000_000,
            sparse_max_visited: 30_000_000,
        }
    }
}

/// Per-call view of a machine shared by every stage: the coefficient matrix
/// and per-button press bounds are computed once.
#[derive(Debug)]
pub struct System<'m> {
    machine: &'m Machine,
    matrix: CoefficientMatrix,
    upper_bounds: Vec<u64>,
}

impl<'m> System<'m> {
    pub fn new(machine: &'m Machine) -> Self {
        let matrix = CoefficientMatrix::from_machine(machine);
        let upper_bounds = matrix.upper_bounds(machine.targets());
        Self {
            machine,
            matrix,
            upper_bounds,
        }
    }

    pub fn machine(&self) -> &Machine {
        self.machine
    }

    pub fn targets(&self) -> &[u16] {
        self.machine.targets()
    }

    pub fn matrix(&self) -> &CoefficientMatrix {
        &self.matrix
    }

    pub fn upper_bounds(&self) -> &[u64] {
        &self.upper_bounds
    }
}

#[derive(Debug, Clone)]
pub struct Solver {
    limits: Limits,
    strategies: Vec<Strategy>,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Solver {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            strategies: Strategy::CASCADE.to_vec(),
        }
    }

    /// Restricts the cascade to the given stages, run in the given order.
    pub fn with_strategies(mut self, strategies: &[Strategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Fewest total presses that bring every counter exactly to its target.
    #[tracing::instrument(level = "debug", skip_all, fields(counters = machine.counters(), buttons = machine.buttons().len()))]
    pub fn minimize(&self, machine: &Machine) -> Result<u64, MachineError> {
        if machine.is_trivial() {
            return Ok(0);
        }
        if machine.buttons().is_empty() {
            return Err(MachineError::Unsolvable);
        }

        let system = System::new(machine);
        for &strategy in &self.strategies {
            match self.run(strategy, &system)? {
                Outcome::Solved(presses) => {
                    tracing::debug!(?strategy, presses, "stage solved machine");
                    return Ok(presses);
                }
                Outcome::NotApplicable => {
                    tracing::debug!(?strategy, "stage declined");
                }
            }
        }

        Err(MachineError::ProblemTooLarge)
    }

    fn run(&self, strategy: Strategy, system: &System) -> Result<Outcome, MachineError> {
        match strategy {
            Strategy::LinearSolve => enumerate::by_pivot_inverse(system, &self.limits),
            Strategy::RrefEnumeration => enumerate::by_rref(system, &self.limits),
            Strategy::DenseBfs => dense::search(system, &self.limits),
            Strategy::SparseBidirectionalBfs => sparse::search(system, &self.limits),
        }
    }
}

/// [`Solver::minimize`] with the default limits and the full cascade.
pub fn min_presses(machine: &Machine) -> Result<u64, MachineError> {
    Solver::default().minimize(machine)
}

/// Shared by the enumeration stages: declines when nothing feasible turned up.
fn settle(best: Option<u64>) -> Result<Outcome, MachineError> {
    match best {
        None => Ok(Outcome::NotApplicable),
        Some(presses) if presses > i64::MAX as u64 => Err(MachineError::Overflow),
        Some(presses) => Ok(Outcome::Solved(presses)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::machine::Button;
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

    /// Machine whose targets are reached by pressing `buttons[j]` exactly `presses[j]` times.
    fn pressed(counters: usize, buttons: &[&[usize]], presses: &[u16]) -> Machine {
        let mut targets = vec![0u16; counters];
        for (button, &times) in buttons.iter().zip(presses) {
            for &counter in button.iter() {
                targets[counter] += times;
            }
        }
        Machine::new(
            targets,
            buttons
                .iter()
                .map(|b| Button::from_counters(b).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[rstest]
    #[case::no_buttons("{0,0,0}")]
    #[case::with_buttons("(0,1) (2) {0,0,0}")]
    #[case::single("(0) {0}")]
    fn zero_target_needs_no_presses(#[case] line: &str) {
        let machine: Machine = line.parse().unwrap();
        assert_eq!(min_presses(&machine), Ok(0));
    }

    #[test]
    fn empty_target_vector_is_trivial() {
        let machine = Machine::new(vec![], vec![]).unwrap();
        assert_eq!(min_presses(&machine), Ok(0));
    }

    #[test]
    fn no_usable_buttons_is_unsolvable() {
        let machine: Machine = "[..] {1,0}".parse().unwrap();
        assert_eq!(min_presses(&machine), Err(MachineError::Unsolvable));

        let machine = weighted(&[3], &[&[(0, 0)], &[]]);
        assert!(machine.buttons().is_empty());
        assert_eq!(min_presses(&machine), Err(MachineError::Unsolvable));
    }

    #[test]
    fn odd_target_even_steps() {
        let machine = weighted(&[5], &[&[(0, 2)]]);
        assert_eq!(min_presses(&machine), Err(MachineError::Unsolvable));
    }

    #[test]
    fn cheapest_mix_of_step_sizes() {
        let machine = weighted(&[6], &[&[(0, 2)], &[(0, 3)]]);
        assert_eq!(min_presses(&machine), Ok(2));
    }

    #[test]
    fn shared_button_beats_double_step() {
        let machine = weighted(&[4, 4], &[&[(0, 1), (1, 1)], &[(0, 2)]]);
        assert_eq!(min_presses(&machine), Ok(4));
    }

    #[test]
    fn target_outside_column_span() {
        let machine = weighted(&[3, 4], &[&[(0, 1), (1, 1)], &[(0, 2), (1, 2)]]);
        assert_eq!(min_presses(&machine), Err(MachineError::Unsolvable));
    }

    #[rstest]
    #[case("[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}")]
    #[case("[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}")]
    #[case("[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}")]
    #[case("(0,1) (0,0) {4,4}")]
    #[case("(0,0) (0,0,0) {6}")]
    #[case("(0,0) {5}")]
    #[case("(0,1,2) (0) (1,2) (2) {5,7,9}")]
    #[case("(0,1) (1,2) (0,2) {4,6,4}")]
    #[case("(0,1) (1,2) (0,2) {3,3,3}")]
    fn stages_agree(#[case] line: &str) {
        let machine: Machine = line.parse().unwrap();
        let only = |strategy| Solver::default().with_strategies(&[strategy]).minimize(&machine);

        let dense = only(Strategy::DenseBfs);
        assert_eq!(only(Strategy::SparseBidirectionalBfs), dense);
        assert_eq!(min_presses(&machine), dense);

        // The algebraic stages may decline, but never disagree.
        for strategy in [Strategy::LinearSolve, Strategy::RrefEnumeration] {
            match only(strategy) {
                Err(MachineError::ProblemTooLarge) => {}
                other => assert_eq!(other, dense, "{strategy:?}"),
            }
        }
    }

    #[test]
    fn repeated_runs_agree() {
        let machine: Machine = "(0,1,2) (0) (1,2) (2) (0,2) {15,17,29}".parse().unwrap();
        let first = min_presses(&machine);
        for _ in 0..5 {
            assert_eq!(min_presses(&machine), first);
        }
    }

    #[test]
    fn combined_button_never_hurts() {
        let buttons: &[&[usize]] = &[&[0, 1], &[1, 2], &[2, 3], &[0, 3]];
        let base = pressed(4, buttons, &[3, 5, 2, 4]);
        let before = min_presses(&base).unwrap();

        let mut with_combo = buttons.to_vec();
        with_combo.push(&[0, 1, 1, 2]);
        let combo = Machine::new(
            base.targets().to_vec(),
            with_combo
                .iter()
                .map(|b| Button::from_counters(b).unwrap())
                .collect(),
        )
        .unwrap();

        assert!(min_presses(&combo).unwrap() <= before);
    }

    #[rstest]
    #[case(&[2, 0, 1, 3])]
    #[case(&[0, 0, 0, 7])]
    #[case(&[4, 4, 4, 4])]
    #[case(&[9, 1, 0, 2])]
    fn constructed_presses_bound_the_optimum(#[case] presses: &[u16]) {
        let buttons: &[&[usize]] = &[&[0, 1, 2], &[1], &[0, 2], &[2, 3]];
        let machine = pressed(4, buttons, presses);
        let total: u64 = presses.iter().map(|&p| u64::from(p)).sum();

        assert!(min_presses(&machine).unwrap() <= total);
    }

    #[test]
    fn every_stage_declining_is_too_large() {
        let machine: Machine = "(0) (1) {99,99}".parse().unwrap();
        let solver = Solver::new(Limits {
            dense_max_states: 10,
            ..Limits::default()
        })
        .with_strategies(&[Strategy::DenseBfs]);

        assert_eq!(solver.minimize(&machine), Err(MachineError::ProblemTooLarge));
    }

    #[test]
    fn sparse_fallback_when_dense_declines() {
        let machine: Machine = "(0) (1) (0,1) {30,20}".parse().unwrap();
        let solver = Solver::new(Limits {
            dense_max_states: 10,
            ..Limits::default()
        })
        .with_strategies(&[Strategy::DenseBfs, Strategy::SparseBidirectionalBfs]);

        assert_eq!(solver.minimize(&machine), Ok(30));
    }
}
