//! Real-time playback of conversation scripts.
//!
//! [`PlaybackSession`] is driven by the host once per frame through
//! [`PlaybackSession::update`]. It walks the selected topic with a stack of
//! cursors, holds actions back until the actors they wait for are done
//! talking, and hands each due action to an [`ActionExecutor`].

pub mod actor;
pub mod camera;
pub mod choice;
pub mod executor;
pub mod options;
pub mod session;
pub mod stack;
pub mod world;

pub use actor::ActorPlaybackState;
pub use camera::CameraState;
pub use choice::{ChoiceEntry, PlayerChoiceBox};
pub use executor::{ActionContext, ActionExecutor, RecordingExecutor, ScriptedExecutor};
pub use options::{OptionsError, PlaybackOptions};
pub use session::{LastPlayed, PlaybackSession, StackHandle};
pub use stack::{ActionRef, ActionStack, ListRef, StackEntry};
pub use world::{ConversationActor, TriggerTable, WorldState};
