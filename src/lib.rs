//! Rehearsal Partner - a scene partner for actors learning their lines
//!
//! The system voices every character except the actor's, listens to the
//! actor's lines and scores them against the script.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    rehearse CLI                     │
//! │   run  │  characters  │  score  │  pregenerate  │ … │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Rehearsal driver                     │
//! │   Scene state machine  │  Audio cache  │  Observer  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   Script model  │  Turn evaluator  │  Voice (I/O)   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod matching;
pub mod rehearsal;
pub mod scene;
pub mod script;
pub mod setup;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use matching::{Comparison, Validation};
pub use rehearsal::{Rehearsal, RehearsalOptions, SceneObserver};
pub use scene::{
    AudioCache, Command, Event, Feedback, Mode, PregenerateReport, RunState, Scene,
    SceneSettings, SceneState, SceneSummary, Step,
};
pub use script::{Line, RawLine, RawScript, Script};
