//! Scene playback
//!
//! [`RunState`] tracks one playthrough, [`Scene`] turns it into a state
//! machine, and [`AudioCache`] keeps synthesized lines around between turns.

mod cache;
mod machine;
mod state;

pub use cache::{AudioCache, DEFAULT_CONCURRENCY, PregenerateReport};
pub use machine::{
    Command, Event, Feedback, Mode, Scene, SceneSettings, SceneState, SceneSummary, Step,
};
pub use state::RunState;
