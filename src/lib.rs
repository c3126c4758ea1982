#[macro_use]
extern crate tracing;

pub mod animation;
pub mod bubbles;
pub mod cli;
pub mod scheduler;
pub mod simulation;
