use std::collections::VecDeque;

use super::radix::{CompiledButton, Radix};
use super::{Limits, Outcome, System};
use crate::error::MachineError;

const UNSEEN: u32 = u32::MAX;

/// Breadth-first search over every counter state, indexed by mixed-radix id.
///
/// Declines when the state space does not fit under
/// [`Limits::dense_max_states`]; otherwise the answer is definitive.
#[tracing::instrument(level = "trace", skip_all)]
pub fn search(system: &System, limits: &Limits) -> Result<Outcome, MachineError> {
    let Some(radix) = Radix::new(system.targets(), limits.dense_max_states) else {
        return Ok(Outcome::NotApplicable);
    };
    // Ids are queued as u32.
    let Ok(states) = u32::try_from(radix.states()) else {
        return Ok(Outcome::NotApplicable);
    };

    let buttons: Vec<CompiledButton> = system
        .machine()
        .buttons()
        .iter()
        .filter_map(|button| radix.compile(button))
        .collect();
    let goal = radix.encode(system.targets());

    let mut dist = vec![UNSEEN; states as usize];
    dist[0] = 0;
    let mut queue = VecDeque::from([0u32]);

    while let Some(state) = queue.pop_front() {
        let presses = dist[state as usize];
        if u64::from(state) == goal {
            return Ok(Outcome::Solved(u64::from(presses)));
        }

        for button in &buttons {
            let Some(next) = radix.apply(u64::from(state), button) else {
                continue;
            };
            let slot = &mut dist[next as usize];
            if *slot != UNSEEN {
                continue;
            }
            *slot = presses + 1;
            queue.push_back(next as u32);
        }
    }

    Err(MachineError::Unsolvable)
}
