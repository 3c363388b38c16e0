use std::collections::BTreeMap;
use std::str::FromStr;

use chumsky::prelude::*;
use itertools::Itertools;

use crate::error::MachineError;

/// Amount a single press adds to one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    pub counter: usize,
    pub amount: u16,
}

/// A button as a sparse column: the counters it touches, sorted by index,
/// each appearing once with a strictly positive amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    increments: Vec<Increment>,
}

impl Button {
    /// Builds a button from `(counter, amount)` pairs.
    /// Repeated counters accumulate and zero amounts are dropped.
    pub fn new(pairs: impl IntoIterator<Item = (usize, u16)>) -> Result<Self, MachineError> {
        let mut per_counter: BTreeMap<usize, u16> = BTreeMap::new();
        for (counter, amount) in pairs {
            let slot = per_counter.entry(counter).or_default();
            *slot = slot.checked_add(amount).ok_or_else(|| {
                MachineError::invalid(format!(
                    "increment for counter {counter} exceeds {}",
                    u16::MAX
                ))
            })?;
        }

        let increments = per_counter
            .into_iter()
            .filter(|&(_, amount)| amount > 0)
            .map(|(counter, amount)| Increment { counter, amount })
            .collect();

        Ok(Self { increments })
    }

    /// Puzzle notation: every listed counter goes up by one per press.
    pub fn from_counters(counters: &[usize]) -> Result<Self, MachineError> {
        Self::new(counters.iter().map(|&counter| (counter, 1)))
    }

    pub fn increments(&self) -> &[Increment] {
        &self.increments
    }

    pub fn is_noop(&self) -> bool {
        self.increments.is_empty()
    }
}

/// The problem instance: joltage targets plus the buttons that can be pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    targets: Vec<u16>,
    buttons: Vec<Button>,
}

impl Machine {
    /// Validates counter indices and drops buttons that do nothing.
    pub fn new(targets: Vec<u16>, buttons: Vec<Button>) -> Result<Self, MachineError> {
        let counters = targets.len();
        if let Some(inc) = buttons
            .iter()
            .flat_map(Button::increments)
            .find(|inc| inc.counter >= counters)
        {
            return Err(MachineError::invalid(format!(
                "button touches counter {} but the machine has {counters} counters",
                inc.counter
            )));
        }

        let buttons = buttons.into_iter().filter(|b| !b.is_noop()).collect();
        Ok(Self { targets, buttons })
    }

    pub fn targets(&self) -> &[u16] {
        &self.targets
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn counters(&self) -> usize {
        self.targets.len()
    }

    /// True when the counters already sit at their targets before any press.
    pub fn is_trivial(&self) -> bool {
        self.targets.iter().all(|&t| t == 0)
    }
}

// -----------------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Section {
    Annotation,
    Button(Vec<u32>),
    Targets(Vec<u32>),
}

fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Section>, extra::Err<Rich<'a, char>>> {
    let hspace = one_of(" \t").repeated();

    let number = text::int(10)
        .from_str::<u32>()
        .try_map(|n, span| n.map_err(|e| Rich::custom(span, e.to_string())))
        .padded_by(hspace.clone());

    // [.##.] (Ignored)
    let annotation = none_of("]")
        .repeated()
        .delimited_by(just('['), just(']'))
        .to(Section::Annotation);

    // (0,2,3)
    let button = number
        .clone()
        .separated_by(just(','))
        .at_least(1)
        .collect::<Vec<u32>>()
        .delimited_by(just('('), just(')'))
        .map(Section::Button);

    // {3,5,4,7}
    let targets = number
        .separated_by(just(','))
        .collect::<Vec<u32>>()
        .padded_by(hspace.clone())
        .delimited_by(just('{'), just('}'))
        .map(Section::Targets);

    choice((annotation, button, targets))
        .padded_by(hspace)
        .repeated()
        .collect()
}

impl FromStr for Machine {
    type Err = MachineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let sections = parser().parse(line).into_result().map_err(|errs| {
            MachineError::invalid(errs.iter().map(ToString::to_string).join("; "))
        })?;

        let mut targets = None;
        let mut raw_buttons = Vec::new();
        for section in sections {
            match section {
                Section::Annotation => {}
                Section::Button(counters) => raw_buttons.push(counters),
                Section::Targets(values) => {
                    if targets.replace(values).is_some() {
                        return Err(MachineError::invalid(
                            "more than one joltage requirement group",
                        ));
                    }
                }
            }
        }

        let targets = targets.ok_or_else(|| MachineError::invalid("missing joltage requirements"))?;
        if targets.is_empty() {
            return Err(MachineError::NoRequirements);
        }

        let targets = targets
            .into_iter()
            .map(|t| {
                u16::try_from(t).map_err(|_| {
                    MachineError::invalid(format!("target {t} exceeds {}", u16::MAX))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let buttons = raw_buttons
            .iter()
            .map(|counters| Button::new(counters.iter().map(|&c| (c as usize, 1))))
            .collect::<Result<Vec<_>, _>>()?;

        Machine::new(targets, buttons)
    }
}
