use miette::Diagnostic;
use thiserror::Error;

/// Everything that can go wrong while reading or solving a single machine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum MachineError {
    #[error("invalid machine description: {reason}")]
    #[diagnostic(code(day10::invalid_machine))]
    InvalidMachineDescription { reason: String },

    #[error("no joltage requirements")]
    #[diagnostic(code(day10::no_requirements))]
    NoRequirements,

    #[error("machine cannot be configured with the given buttons")]
    #[diagnostic(code(day10::unsolvable))]
    Unsolvable,

    #[error("problem too large for the available algorithms")]
    #[diagnostic(
        code(day10::too_large),
        help("every solving stage hit its size ceiling; see `solver::Limits`")
    )]
    ProblemTooLarge,

    #[error("press count does not fit in a 64-bit signed integer")]
    #[diagnostic(code(day10::overflow))]
    Overflow,
}

impl MachineError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMachineDescription {
            reason: reason.into(),
        }
    }
}

/// Failures of a whole puzzle input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BatchError {
    #[error("no machines provided")]
    #[diagnostic(code(day10::no_machines))]
    NoMachines,

    #[error("line {line}: {source}")]
    #[diagnostic(code(day10::line))]
    Line {
        line: usize,
        #[source]
        source: MachineError,
    },

    #[error("total press count does not fit in a 64-bit signed integer")]
    #[diagnostic(code(day10::overflow))]
    Overflow,
}
