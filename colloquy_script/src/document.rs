//! JSON authoring format for conversations.
//!
//! Documents keep action lists nested the way they are written; loading
//! interns them into a [`crate::Conversation`] arena.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::ActionNode;
use crate::conversation::ActorDef;

/// Action as written in a document, with nested child lists.
pub type ActionDef = ActionNode<ActionTree>;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTree(pub Vec<ActionDef>);

impl ActionTree {
    pub fn new(actions: Vec<ActionDef>) -> Self {
        Self(actions)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ActionDef>> for ActionTree {
    fn from(actions: Vec<ActionDef>) -> Self {
        Self(actions)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDocument {
    #[serde(default)]
    pub actors: Vec<ActorDef>,
    #[serde(default)]
    pub variables: BTreeMap<String, i32>,
    #[serde(default)]
    pub game_commands: BTreeMap<String, bool>,
    #[serde(default)]
    pub files: Vec<FileDocument>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDocument {
    pub id: String,
    #[serde(default)]
    pub topics: Vec<TopicDocument>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDocument {
    pub id: String,
    #[serde(default)]
    pub actions: ActionTree,
}

impl TopicDocument {
    pub fn new(id: impl Into<String>, actions: Vec<ActionDef>) -> Self {
        Self {
            id: id.into(),
            actions: ActionTree(actions),
        }
    }
}

impl FileDocument {
    pub fn new(id: impl Into<String>, topics: Vec<TopicDocument>) -> Self {
        Self {
            id: id.into(),
            topics,
        }
    }
}
