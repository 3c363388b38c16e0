use indicatif::{ProgressBar, ProgressStyle};
use miette::*;

use aoc2025_day_10::part2;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let input = include_str!("../../input2.txt");
    let progress = ProgressBar::new(0).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} machines [{elapsed_precise}]")
            .into_diagnostic()?,
    );
    let result = part2::solve_batch(input, &progress)?;
    progress.finish_and_clear();
    println!("Result: {}", result);
    Ok(())
}
