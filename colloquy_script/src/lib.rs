//! Authored conversation scripts.
//!
//! A conversation is a set of files, each holding named topics. Every topic
//! owns a root action list; branch, loop and choice actions own child lists.
//! All lists live in one arena inside [`Conversation`] and are addressed by
//! [`ListId`], so playback cursors only ever hold indices.

pub mod action;
pub mod condition;
pub mod conversation;
pub mod document;
pub mod error;

pub use action::{
    ActionKind, ActionNode, ChoiceOption, IfCase, ListId, SetOperator, SpeechStrip, TriggerAction,
};
pub use condition::{
    evaluate, CompareOperator, ConditionNode, ConditionSource, LogicOperator, TriggerMode,
    TriggerState,
};
pub use conversation::{ActorDef, Conversation, Topic, TopicId};
pub use document::{ActionDef, ActionTree, ConversationDocument, FileDocument, TopicDocument};
pub use error::ScriptError;
