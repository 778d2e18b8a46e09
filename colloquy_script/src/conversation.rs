use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::{ActionNode, ListId};
use crate::document::{ActionTree, ConversationDocument};
use crate::error::ScriptError;

/// Index of a topic inside a [`Conversation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TopicId(usize);

impl TopicId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub file: String,
    pub id: String,
    pub actions: ListId,
}

impl Topic {
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.file, self.id)
    }
}

/// Actor as authored, with initial parameter and command tables.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDef {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, i32>,
    #[serde(default)]
    pub commands: BTreeMap<String, bool>,
}

impl ActorDef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Loaded conversation: topics plus the arena owning every action list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Conversation {
    topics: Vec<Topic>,
    lists: Vec<Vec<ActionNode>>,
    actors: Vec<ActorDef>,
    variables: BTreeMap<String, i32>,
    game_commands: BTreeMap<String, bool>,
}

impl Conversation {
    pub fn from_json_file(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ScriptError> {
        let document: ConversationDocument = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    pub fn from_document(document: ConversationDocument) -> Result<Self, ScriptError> {
        let ConversationDocument {
            actors,
            variables,
            game_commands,
            files,
        } = document;

        let mut actor_ids = BTreeSet::new();
        for actor in &actors {
            if actor.id.is_empty() {
                return Err(ScriptError::EmptyIdentifier("actor"));
            }
            if !actor_ids.insert(actor.id.clone()) {
                return Err(ScriptError::DuplicateActor(actor.id.clone()));
            }
        }

        let mut conversation = Conversation {
            actors,
            variables,
            game_commands,
            ..Conversation::default()
        };

        let mut seen = BTreeSet::new();
        for file in files {
            if file.id.is_empty() {
                return Err(ScriptError::EmptyIdentifier("file"));
            }
            for topic in file.topics {
                if topic.id.is_empty() {
                    return Err(ScriptError::EmptyIdentifier("topic"));
                }
                if !seen.insert((file.id.clone(), topic.id.clone())) {
                    return Err(ScriptError::DuplicateTopic {
                        file: file.id.clone(),
                        topic: topic.id,
                    });
                }
                let actions = conversation.intern(topic.actions);
                conversation.topics.push(Topic {
                    file: file.id.clone(),
                    id: topic.id,
                    actions,
                });
            }
        }

        log::debug!(
            "loaded conversation with {} topics and {} action lists",
            conversation.topics.len(),
            conversation.lists.len()
        );
        Ok(conversation)
    }

    fn intern(&mut self, tree: ActionTree) -> ListId {
        let mut nodes = Vec::with_capacity(tree.0.len());
        for node in tree.0 {
            nodes.push(node.map_lists(&mut |child| self.intern(child)));
        }
        self.lists.push(nodes);
        ListId(self.lists.len() - 1)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(id.0)
    }

    /// Finds a topic by id. Without a file id (or with an empty one) the first
    /// topic carrying `topic` in any file wins.
    pub fn find_topic(&self, file: Option<&str>, topic: &str) -> Option<TopicId> {
        let file = file.filter(|value| !value.is_empty());
        self.topics
            .iter()
            .position(|candidate| {
                candidate.id == topic && file.map_or(true, |file| candidate.file == file)
            })
            .map(TopicId)
    }

    /// Action list by arena id; unknown ids resolve to an empty list.
    pub fn list(&self, id: ListId) -> &[ActionNode] {
        self.lists.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn action(&self, list: ListId, index: usize) -> Option<&ActionNode> {
        self.list(list).get(index)
    }

    pub fn actors(&self) -> &[ActorDef] {
        &self.actors
    }

    pub fn variables(&self) -> &BTreeMap<String, i32> {
        &self.variables
    }

    pub fn game_commands(&self) -> &BTreeMap<String, bool> {
        &self.game_commands
    }
}
