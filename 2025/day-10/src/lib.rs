pub mod error;
pub mod machine;
pub mod part2;
pub mod solver;
