use serde::{Deserialize, Serialize};

use crate::condition::ConditionNode;

/// Index of an action list inside a [`crate::Conversation`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ListId(pub(crate) usize);

impl ListId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One scripted instruction.
///
/// `L` is the representation of child action lists: nested trees while a
/// document is being authored or loaded, arena [`ListId`]s once interned into
/// a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "L: Serialize",
    deserialize = "L: Deserialize<'de> + Default"
))]
pub struct ActionNode<L = ListId> {
    /// Seconds to wait after the wait-gate clears before the action runs.
    #[serde(default)]
    pub delay: f32,
    #[serde(default = "default_wait_for_actor")]
    pub wait_for_actor: bool,
    /// Actor id or alias to wait for; `None` waits for every actor.
    #[serde(default)]
    pub wait_for_actor_id: Option<String>,
    /// Only speech blocks the gate; an actor's external waiting flag is ignored.
    #[serde(default)]
    pub wait_speak_only: bool,
    #[serde(flatten)]
    pub kind: ActionKind<L>,
}

fn default_wait_for_actor() -> bool {
    true
}

impl<L> ActionNode<L> {
    pub fn new(kind: ActionKind<L>) -> Self {
        Self {
            delay: 0.0,
            wait_for_actor: default_wait_for_actor(),
            wait_for_actor_id: None,
            wait_speak_only: false,
            kind,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_wait_for_actor(mut self, wait: bool) -> Self {
        self.wait_for_actor = wait;
        self
    }

    pub fn with_wait_target(mut self, actor: impl Into<String>) -> Self {
        self.wait_for_actor = true;
        self.wait_for_actor_id = Some(actor.into());
        self
    }

    pub fn with_wait_speak_only(mut self, speak_only: bool) -> Self {
        self.wait_speak_only = speak_only;
        self
    }

    /// Rebuilds the node with every child list converted through `convert`.
    pub fn map_lists<M, F>(self, convert: &mut F) -> ActionNode<M>
    where
        F: FnMut(L) -> M,
    {
        ActionNode {
            delay: self.delay,
            wait_for_actor: self.wait_for_actor,
            wait_for_actor_id: self.wait_for_actor_id,
            wait_speak_only: self.wait_speak_only,
            kind: self.kind.map_lists(convert),
        }
    }
}

impl ActionNode<ListId> {
    /// Guard condition that keeps a loop entry spawned by this action alive.
    pub fn loop_guard(&self) -> Option<&ConditionNode> {
        match &self.kind {
            ActionKind::Wait { condition, .. } => condition.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperator {
    #[default]
    Set,
    Increment,
    Decrement,
    /// Uniform random value between zero and the operand, inclusive.
    Random,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    #[default]
    Fire,
    Reset,
    Pulse,
    FullReset,
}

/// Timed word or pause inside a spoken line.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechStrip {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pause: f32,
    #[serde(default)]
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "L: Serialize",
    deserialize = "L: Deserialize<'de> + Default"
))]
pub struct IfCase<L> {
    #[serde(default)]
    pub condition: Option<ConditionNode>,
    #[serde(default)]
    pub actions: L,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "L: Serialize",
    deserialize = "L: Deserialize<'de> + Default"
))]
pub struct ChoiceOption<L> {
    pub text: String,
    #[serde(default)]
    pub condition: Option<ConditionNode>,
    #[serde(default)]
    pub actions: L,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    bound(
        serialize = "L: Serialize",
        deserialize = "L: Deserialize<'de> + Default"
    )
)]
pub enum ActionKind<L> {
    CameraShot {
        name: String,
        #[serde(default)]
        duration: f32,
    },
    ActorSpeak {
        actor: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        min_speech_time: f32,
        #[serde(default)]
        words: Vec<SpeechStrip>,
    },
    Snippet {
        #[serde(default)]
        file: Option<String>,
        topic: String,
        #[serde(default)]
        create_side_lane: bool,
    },
    StopConversation,
    StopTopic,
    IfElse {
        #[serde(default)]
        cases: Vec<IfCase<L>>,
        #[serde(default)]
        else_actions: L,
    },
    PlayerChoice {
        #[serde(default)]
        options: Vec<ChoiceOption<L>>,
        /// Played in a loop while the choice box is shown.
        #[serde(default)]
        actions: L,
        /// Receives the index of the selected option.
        #[serde(default)]
        variable: Option<String>,
    },
    SetVariable {
        name: String,
        #[serde(default)]
        operator: SetOperator,
        #[serde(default)]
        value: i32,
        #[serde(default)]
        value_variable: Option<String>,
    },
    SetActorParameter {
        actor: String,
        name: String,
        #[serde(default)]
        operator: SetOperator,
        #[serde(default)]
        value: i32,
        #[serde(default)]
        value_variable: Option<String>,
    },
    ActorCommand {
        actor: String,
        command: String,
    },
    GameCommand {
        command: String,
    },
    Wait {
        #[serde(default)]
        condition: Option<ConditionNode>,
        #[serde(default)]
        actions: L,
    },
    Trigger {
        name: String,
        #[serde(default)]
        action: TriggerAction,
    },
    ActorAdd {
        id: String,
        #[serde(default)]
        alias: Option<String>,
    },
    ActorRemove {
        actor: String,
    },
    Comment {
        #[serde(default)]
        text: String,
    },
}

impl<L> ActionKind<L> {
    /// Short snake_case label used in playback event logs.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::CameraShot { .. } => "camera_shot",
            ActionKind::ActorSpeak { .. } => "actor_speak",
            ActionKind::Snippet { .. } => "snippet",
            ActionKind::StopConversation => "stop_conversation",
            ActionKind::StopTopic => "stop_topic",
            ActionKind::IfElse { .. } => "if_else",
            ActionKind::PlayerChoice { .. } => "player_choice",
            ActionKind::SetVariable { .. } => "set_variable",
            ActionKind::SetActorParameter { .. } => "set_actor_parameter",
            ActionKind::ActorCommand { .. } => "actor_command",
            ActionKind::GameCommand { .. } => "game_command",
            ActionKind::Wait { .. } => "wait",
            ActionKind::Trigger { .. } => "trigger",
            ActionKind::ActorAdd { .. } => "actor_add",
            ActionKind::ActorRemove { .. } => "actor_remove",
            ActionKind::Comment { .. } => "comment",
        }
    }

    pub fn map_lists<M, F>(self, convert: &mut F) -> ActionKind<M>
    where
        F: FnMut(L) -> M,
    {
        match self {
            ActionKind::CameraShot { name, duration } => ActionKind::CameraShot { name, duration },
            ActionKind::ActorSpeak {
                actor,
                text,
                min_speech_time,
                words,
            } => ActionKind::ActorSpeak {
                actor,
                text,
                min_speech_time,
                words,
            },
            ActionKind::Snippet {
                file,
                topic,
                create_side_lane,
            } => ActionKind::Snippet {
                file,
                topic,
                create_side_lane,
            },
            ActionKind::StopConversation => ActionKind::StopConversation,
            ActionKind::StopTopic => ActionKind::StopTopic,
            ActionKind::IfElse {
                cases,
                else_actions,
            } => {
                let mut mapped = Vec::with_capacity(cases.len());
                for case in cases {
                    mapped.push(IfCase {
                        condition: case.condition,
                        actions: convert(case.actions),
                    });
                }
                ActionKind::IfElse {
                    cases: mapped,
                    else_actions: convert(else_actions),
                }
            }
            ActionKind::PlayerChoice {
                options,
                actions,
                variable,
            } => {
                let mut mapped = Vec::with_capacity(options.len());
                for option in options {
                    mapped.push(ChoiceOption {
                        text: option.text,
                        condition: option.condition,
                        actions: convert(option.actions),
                    });
                }
                ActionKind::PlayerChoice {
                    options: mapped,
                    actions: convert(actions),
                    variable,
                }
            }
            ActionKind::SetVariable {
                name,
                operator,
                value,
                value_variable,
            } => ActionKind::SetVariable {
                name,
                operator,
                value,
                value_variable,
            },
            ActionKind::SetActorParameter {
                actor,
                name,
                operator,
                value,
                value_variable,
            } => ActionKind::SetActorParameter {
                actor,
                name,
                operator,
                value,
                value_variable,
            },
            ActionKind::ActorCommand { actor, command } => {
                ActionKind::ActorCommand { actor, command }
            }
            ActionKind::GameCommand { command } => ActionKind::GameCommand { command },
            ActionKind::Wait { condition, actions } => ActionKind::Wait {
                condition,
                actions: convert(actions),
            },
            ActionKind::Trigger { name, action } => ActionKind::Trigger { name, action },
            ActionKind::ActorAdd { id, alias } => ActionKind::ActorAdd { id, alias },
            ActionKind::ActorRemove { actor } => ActionKind::ActorRemove { actor },
            ActionKind::Comment { text } => ActionKind::Comment { text },
        }
    }
}
