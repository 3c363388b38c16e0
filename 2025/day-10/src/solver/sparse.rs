use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::{Limits, Outcome, System};
use crate::error::MachineError;
use crate::machine::Button;

const DIGIT_BITS: usize = 16;
const DIGITS_PER_WORD: usize = 64 / DIGIT_BITS;
const WORDS: usize = 4;
const DIGIT_MASK: u64 = (1 << DIGIT_BITS) - 1;

/// Most counters a [`StateKey`] can hold.
pub const MAX_COUNTERS: usize = WORDS * DIGITS_PER_WORD;

/// Counter values packed 16 bits apiece into four words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateKey([u64; WORDS]);

impl StateKey {
    pub fn pack(values: &[u16]) -> Option<Self> {
        if values.len() > MAX_COUNTERS {
            return None;
        }
        let mut key = Self::default();
        for (idx, &value) in values.iter().enumerate() {
            key.set_digit(idx, value);
        }
        Some(key)
    }

    pub fn digit(&self, idx: usize) -> u16 {
        let shift = (idx % DIGITS_PER_WORD) * DIGIT_BITS;
        ((self.0[idx / DIGITS_PER_WORD] >> shift) & DIGIT_MASK) as u16
    }

    fn set_digit(&mut self, idx: usize, value: u16) {
        let shift = (idx % DIGITS_PER_WORD) * DIGIT_BITS;
        let word = &mut self.0[idx / DIGITS_PER_WORD];
        *word = (*word & !(DIGIT_MASK << shift)) | (u64::from(value) << shift);
    }

    /// One press forward; `None` if any counter would pass its target.
    fn increment(self, button: &Button, targets: &[u16]) -> Option<Self> {
        let mut next = self;
        for inc in button.increments() {
            let value = next
                .digit(inc.counter)
                .checked_add(inc.amount)
                .filter(|&v| v <= targets[inc.counter])?;
            next.set_digit(inc.counter, value);
        }
        Some(next)
    }

    /// One press undone; `None` if any counter would drop below zero.
    fn decrement(self, button: &Button) -> Option<Self> {
        let mut next = self;
        for inc in button.increments() {
            let value = next.digit(inc.counter).checked_sub(inc.amount)?;
            next.set_digit(inc.counter, value);
        }
        Some(next)
    }
}

/// One side of the search: distances of everything reached so far plus the
/// newest complete layer.
struct Frontier {
    dist: HashMap<StateKey, u32>,
    layer: Vec<StateKey>,
    depth: u32,
}

impl Frontier {
    fn new(origin: StateKey) -> Self {
        Self {
            dist: HashMap::from([(origin, 0)]),
            layer: vec![origin],
            depth: 0,
        }
    }

    /// Advances exactly one layer, recording every meeting with `opposite`
    /// in `best`.
    fn expand(
        &mut self,
        opposite: &Frontier,
        buttons: &[Button],
        best: &mut Option<u32>,
        step: impl Fn(StateKey, &Button) -> Option<StateKey>,
    ) {
        let next_depth = self.depth + 1;
        let layer = std::mem::take(&mut self.layer);
        self.depth = next_depth;

        // Nothing at this depth or beyond can beat a known meeting.
        if best.is_some_and(|b| next_depth >= b) {
            return;
        }

        for state in layer {
            for button in buttons {
                let Some(next) = step(state, button) else {
                    continue;
                };
                if let Some(&other) = opposite.dist.get(&next) {
                    let candidate = next_depth + other;
                    if best.map_or(true, |b| candidate < b) {
                        *best = Some(candidate);
                    }
                }
                if let Entry::Vacant(slot) = self.dist.entry(next) {
                    slot.insert(next_depth);
                    self.layer.push(next);
                }
            }
        }
    }
}

/// Meet-in-the-middle BFS between the all-zero state and the targets.
///
/// Always expands the smaller frontier by one layer and stops once the two
/// depths together cannot beat the best meeting seen. Declines past
/// [`Limits::sparse_max_visited`] states or [`MAX_COUNTERS`] counters.
#[tracing::instrument(level = "trace", skip_all)]
pub fn search(system: &System, limits: &Limits) -> Result<Outcome, MachineError> {
    let targets = system.targets();
    let Some(goal) = StateKey::pack(targets) else {
        return Ok(Outcome::NotApplicable);
    };
    let start = StateKey::default();
    if start == goal {
        return Ok(Outcome::Solved(0));
    }

    let buttons = system.machine().buttons();
    let mut forward = Frontier::new(start);
    let mut backward = Frontier::new(goal);
    let mut best = None;

    while !forward.layer.is_empty() && !backward.layer.is_empty() {
        if forward.layer.len() <= backward.layer.len() {
            forward.expand(&backward, buttons, &mut best, |state, button| {
                state.increment(button, targets)
            });
        } else {
            backward.expand(&forward, buttons, &mut best, |state, button| {
                state.decrement(button)
            });
        }

        if best.is_some_and(|b| forward.depth + backward.depth >= b) {
            break;
        }

        let visited = forward.dist.len() + backward.dist.len();
        if visited > limits.sparse_max_visited {
            tracing::trace!(visited, "visited-state ceiling reached");
            return Ok(Outcome::NotApplicable);
        }
    }

    best.map(|presses| Outcome::Solved(u64::from(presses)))
        .ok_or(MachineError::Unsolvable)
}
