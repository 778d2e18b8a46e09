//! Live game state read by conditions and written by actions.

use std::collections::BTreeMap;

use colloquy_script::{ActorDef, ConditionSource, Conversation, TriggerState};
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ConversationActor {
    pub id: String,
    pub alias: Option<String>,
    pub parameters: BTreeMap<String, i32>,
    pub commands: BTreeMap<String, bool>,
    /// Set by the host while the actor is busy (gesture, walk, ...).
    pub waiting: bool,
}

impl ConversationActor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        self.id == id || self.alias.as_deref() == Some(id)
    }
}

impl From<&ActorDef> for ConversationActor {
    fn from(def: &ActorDef) -> Self {
        Self {
            id: def.id.clone(),
            alias: def.alias.clone(),
            parameters: def.parameters.clone(),
            commands: def.commands.clone(),
            waiting: false,
        }
    }
}

/// Named triggers; targets are created on first use.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TriggerTable {
    targets: BTreeMap<String, TriggerState>,
}

impl TriggerTable {
    pub fn get(&self, name: &str) -> Option<TriggerState> {
        self.targets.get(name).copied()
    }

    fn target_mut(&mut self, name: &str) -> &mut TriggerState {
        self.targets.entry(name.to_string()).or_default()
    }

    pub fn fire(&mut self, name: &str) {
        let target = self.target_mut(name);
        target.fired = true;
        target.has_fired = true;
    }

    pub fn reset(&mut self, name: &str) {
        self.target_mut(name).fired = false;
    }

    pub fn pulse(&mut self, name: &str) {
        self.fire(name);
        self.reset(name);
    }

    pub fn full_reset(&mut self, name: &str) {
        *self.target_mut(name) = TriggerState::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TriggerState)> {
        self.targets.iter()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct WorldState {
    actors: Vec<ConversationActor>,
    pub variables: BTreeMap<String, i32>,
    pub game_commands: BTreeMap<String, bool>,
    pub triggers: TriggerTable,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            actors: conversation
                .actors()
                .iter()
                .map(ConversationActor::from)
                .collect(),
            variables: conversation.variables().clone(),
            game_commands: conversation.game_commands().clone(),
            triggers: TriggerTable::default(),
        }
    }

    pub fn actors(&self) -> &[ConversationActor] {
        &self.actors
    }

    /// Slot index of the actor with this id or alias.
    pub fn actor_index(&self, id: &str) -> Option<usize> {
        self.actors.iter().position(|actor| actor.matches(id))
    }

    pub fn actor(&self, id: &str) -> Option<&ConversationActor> {
        self.actors.iter().find(|actor| actor.matches(id))
    }

    pub fn actor_mut(&mut self, id: &str) -> Option<&mut ConversationActor> {
        self.actors.iter_mut().find(|actor| actor.matches(id))
    }

    pub fn add_actor(&mut self, actor: ConversationActor) -> usize {
        self.actors.push(actor);
        self.actors.len() - 1
    }

    pub fn remove_actor(&mut self, id: &str) -> Option<ConversationActor> {
        let index = self.actor_index(id)?;
        Some(self.actors.remove(index))
    }

    /// Variable value, zero when unset.
    pub fn variable_value(&self, name: &str) -> i32 {
        self.variables.get(name).copied().unwrap_or(0)
    }

    pub fn set_variable(&mut self, name: &str, value: i32) {
        self.variables.insert(name.to_string(), value);
    }
}

impl ConditionSource for WorldState {
    fn has_actor(&self, id: &str) -> bool {
        self.actor_index(id).is_some()
    }

    fn variable(&self, name: &str) -> Option<i32> {
        self.variables.get(name).copied()
    }

    fn actor_parameter(&self, actor: &str, name: &str) -> Option<i32> {
        self.actor(actor)?.parameters.get(name).copied()
    }

    fn actor_command(&self, actor: &str, command: &str) -> Option<bool> {
        self.actor(actor)?.commands.get(command).copied()
    }

    fn game_command(&self, command: &str) -> Option<bool> {
        self.game_commands.get(command).copied()
    }

    fn trigger(&self, name: &str) -> Option<TriggerState> {
        self.triggers.get(name)
    }
}
