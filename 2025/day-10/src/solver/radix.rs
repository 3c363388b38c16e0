use crate::machine::{Button, Increment};

/// Mixed-radix numbering of every counter state between zero and the targets.
///
/// Counter `i` is a digit in base `target[i] + 1` with place value equal to the
/// product of all earlier bases, so each state maps to one id in `0..states`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Radix {
    bases: Vec<u64>,
    multipliers: Vec<u64>,
    states: u64,
}

/// A button folded into a single id offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledButton {
    increments: Vec<Increment>,
    delta: u64,
}

impl CompiledButton {
    pub fn delta(&self) -> u64 {
        self.delta
    }
}

impl Radix {
    /// `None` when the state count exceeds `max_states` or `u64`.
    pub fn new(targets: &[u16], max_states: u64) -> Option<Self> {
        let bases: Vec<u64> = targets.iter().map(|&t| u64::from(t) + 1).collect();

        let mut multipliers = Vec::with_capacity(bases.len());
        let mut states = 1u64;
        for &base in &bases {
            multipliers.push(states);
            states = states.checked_mul(base)?;
            if states > max_states {
                return None;
            }
        }

        Some(Self {
            bases,
            multipliers,
            states,
        })
    }

    pub fn states(&self) -> u64 {
        self.states
    }

    pub fn encode(&self, values: &[u16]) -> u64 {
        values
            .iter()
            .zip(&self.multipliers)
            .map(|(&v, &mult)| u64::from(v) * mult)
            .sum()
    }

    pub fn decode(&self, id: u64) -> Vec<u16> {
        (0..self.bases.len())
            .map(|counter| self.digit(id, counter) as u16)
            .collect()
    }

    pub fn digit(&self, id: u64, counter: usize) -> u64 {
        id / self.multipliers[counter] % self.bases[counter]
    }

    /// `None` for a button that overshoots some target on its very first press.
    pub fn compile(&self, button: &Button) -> Option<CompiledButton> {
        let mut delta = 0;
        for inc in button.increments() {
            let amount = u64::from(inc.amount);
            if amount >= self.bases[inc.counter] {
                return None;
            }
            delta += amount * self.multipliers[inc.counter];
        }

        Some(CompiledButton {
            increments: button.increments().to_vec(),
            delta,
        })
    }

    /// Presses `button` once from state `id`.
    ///
    /// Each touched digit is checked individually: adding the delta to an id
    /// whose digit would roll over carries into the next counter and lands on
    /// a different, valid-looking state.
    pub fn apply(&self, id: u64, button: &CompiledButton) -> Option<u64> {
        for inc in &button.increments {
            if self.digit(id, inc.counter) + u64::from(inc.amount) >= self.bases[inc.counter] {
                return None;
            }
        }
        Some(id + button.delta)
    }
}
