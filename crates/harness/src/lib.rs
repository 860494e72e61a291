//! Test support: an engine wired to an in-memory store and a recording sink.

mod scorer;
mod sink;

pub use scorer::{TestScorer, standard_setup, team_setup};
pub use sink::RecordingSink;
