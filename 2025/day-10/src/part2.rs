use indicatif::{ParallelProgressIterator, ProgressBar};
use miette::Result;
use rayon::prelude::*;

use crate::error::{BatchError, MachineError};
use crate::machine::Machine;
use crate::solver::min_presses;

fn presses_for_line(line: &str) -> Result<u64, MachineError> {
    let machine: Machine = line.parse()?;
    min_presses(&machine)
}

/// Sums the minimum presses of every machine in `input`, one per non-blank line.
///
/// Machines are solved in parallel. If any fail, the failure with the lowest
/// line number (1-based) is reported.
pub fn solve_batch(input: &str, progress: &ProgressBar) -> Result<u64, BatchError> {
    let jobs: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();
    if jobs.is_empty() {
        return Err(BatchError::NoMachines);
    }
    progress.set_length(jobs.len() as u64);

    let results: Vec<(usize, Result<u64, MachineError>)> = jobs
        .par_iter()
        .progress_with(progress.clone())
        .map(|&(line, text)| (line, presses_for_line(text)))
        .collect();

    results
        .into_iter()
        .try_fold(0u64, |total, (line, result)| {
            let presses = result.map_err(|source| BatchError::Line { line, source })?;
            total
                .checked_add(presses)
                .filter(|&sum| sum <= i64::MAX as u64)
                .ok_or(BatchError::Overflow)
        })
}

#[tracing::instrument]
pub fn process(input: &str) -> Result<String> {
    let total = solve_batch(input, &ProgressBar::hidden())?;
    Ok(total.to_string())
}
