//! Side effects of individual actions.
//!
//! The session only decides *when* an action runs; what it does is delegated
//! to an [`ActionExecutor`]. Executors are shared as `Rc<dyn ActionExecutor>`
//! and take `&self`, so an action may start a side lane (which runs one
//! processing pass immediately) without any re-borrow of the executor.

use std::cell::RefCell;
use std::rc::Rc;

use colloquy_script::{
    ActionKind, ActionNode, ConditionNode, Conversation, ListId, SetOperator, TopicId,
    TriggerAction,
};
use rand::Rng;

use crate::actor::ActorPlaybackState;
use crate::camera::CameraState;
use crate::choice::{ChoiceEntry, PlayerChoiceBox};
use crate::session::{PlaybackSession, StackHandle};
use crate::stack::{ActionRef, ActionStack, ListRef, StackEntry};
use crate::world::{ConversationActor, WorldState};

pub trait ActionExecutor {
    /// Applies `action`. Implementations advance the active stack through
    /// [`ActionContext::advance_to_next_action`] once the action is complete;
    /// an action that never advances is dispatched again on the next frame.
    fn execute(&self, ctx: &mut ActionContext<'_>, action: &ActionNode);
}

/// Session view handed to an executor while one action is dispatched.
pub struct ActionContext<'a> {
    session: &'a mut PlaybackSession,
    handle: StackHandle,
    action: ActionRef,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        session: &'a mut PlaybackSession,
        handle: StackHandle,
        action: ActionRef,
    ) -> Self {
        Self {
            session,
            handle,
            action,
        }
    }

    /// Stack the action was taken from.
    pub fn handle(&self) -> StackHandle {
        self.handle
    }

    pub fn action_ref(&self) -> ActionRef {
        self.action
    }

    pub fn conversation(&self) -> &Conversation {
        self.session.conversation()
    }

    pub fn world(&self) -> &WorldState {
        self.session.world()
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        self.session.world_mut()
    }

    pub fn evaluate(&self, condition: &ConditionNode) -> bool {
        colloquy_script::evaluate(condition, self.session.world())
    }

    pub fn advance_to_next_action(&mut self) {
        self.session.advance_stack(self.handle);
    }

    /// Active stack, `None` once it has been removed.
    pub fn active_stack_mut(&mut self) -> Option<&mut ActionStack> {
        self.session.stack_mut(self.handle)
    }

    /// Pushes `list` onto the active stack as a child of the current action.
    pub fn push(&mut self, parent_topic: Option<TopicId>, list: ListRef) -> Option<&mut StackEntry> {
        self.session
            .push_list(self.handle, parent_topic, Some(self.action), list)
    }

    pub fn topic_stack(&self, topic: TopicId) -> ActionStack {
        self.session.topic_stack(topic, Some(self.action))
    }

    pub fn add_side_action_stack(&mut self, stack: ActionStack) -> u32 {
        self.session.add_side_action_stack(stack)
    }

    pub fn actor_state_mut(&mut self, index: usize) -> Option<&mut ActorPlaybackState> {
        self.session.actor_state_mut(index)
    }

    pub fn add_actor(&mut self, actor: ConversationActor) -> usize {
        self.session.add_actor(actor)
    }

    pub fn remove_actor(&mut self, id: &str) -> Option<ConversationActor> {
        self.session.remove_actor(id)
    }

    pub fn camera_mut(&mut self) -> &mut CameraState {
        self.session.camera_mut()
    }

    pub fn choice_box_mut(&mut self) -> &mut PlayerChoiceBox {
        self.session.choice_box_mut()
    }

    pub fn set_info_text(&mut self, text: impl Into<String>) {
        self.session.set_info_text(Some(text.into()));
    }

    pub fn set_running(&mut self, running: bool) {
        self.session.set_running(running);
    }

    pub fn auto_advance_commands(&self) -> bool {
        self.session.auto_advance_commands()
    }

    pub fn record_event(&mut self, event: impl Into<String>) {
        self.session.record_event(event.into());
    }
}

/// Built-in interpretation of every action kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedExecutor;

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ActionExecutor for ScriptedExecutor {
    fn execute(&self, ctx: &mut ActionContext<'_>, action: &ActionNode) {
        match &action.kind {
            ActionKind::CameraShot { name, duration } => {
                ctx.camera_mut().start_shot(name.as_str(), *duration);
                ctx.advance_to_next_action();
            }
            ActionKind::ActorSpeak {
                actor,
                text,
                min_speech_time,
                words,
            } => {
                let Some(index) = ctx.world().actor_index(actor) else {
                    no_actor(ctx, actor);
                    return;
                };
                let spoken: f32 = words.iter().map(|word| word.pause + word.duration).sum();
                let length = min_speech_time.max(spoken);
                if length > 0.0 {
                    if let Some(state) = ctx.actor_state_mut(index) {
                        state.begin_speech(length, text.clone());
                    }
                }
                ctx.advance_to_next_action();
            }
            ActionKind::Snippet {
                file,
                topic,
                create_side_lane,
            } => {
                let Some(found) = ctx.conversation().find_topic(file.as_deref(), topic) else {
                    log::warn!("snippet topic {topic} not found");
                    ctx.advance_to_next_action();
                    return;
                };
                if *create_side_lane {
                    let stack = ctx.topic_stack(found);
                    ctx.add_side_action_stack(stack);
                    ctx.advance_to_next_action();
                } else {
                    let list = ctx.conversation().topic(found).map(|found| found.actions);
                    if let Some(list) = list {
                        ctx.push(Some(found), ListRef::Script(list));
                    }
                }
            }
            ActionKind::StopConversation => {
                if let Some(stack) = ctx.active_stack_mut() {
                    stack.truncate(1);
                    if let Some(root) = stack.top_mut() {
                        root.forward_end();
                    }
                }
                ctx.set_info_text("Conversation Stop");
            }
            ActionKind::StopTopic => stop_topic(ctx),
            ActionKind::IfElse {
                cases,
                else_actions,
            } => {
                let chosen = cases
                    .iter()
                    .find(|case| {
                        case.condition
                            .as_ref()
                            .map_or(false, |condition| ctx.evaluate(condition))
                    })
                    .map(|case| case.actions)
                    .unwrap_or(*else_actions);
                push_or_advance(ctx, chosen);
            }
            ActionKind::PlayerChoice {
                options, actions, ..
            } => {
                match ctx.push(None, ListRef::Script(*actions)) {
                    Some(entry) => entry.set_looping(true),
                    None => return,
                }
                let stack_depth = ctx.active_stack_mut().map_or(0, |stack| stack.len());
                let entries: Vec<ChoiceEntry> = options
                    .iter()
                    .enumerate()
                    .filter(|(_, option)| {
                        option
                            .condition
                            .as_ref()
                            .map_or(true, |condition| ctx.evaluate(condition))
                    })
                    .map(|(index, option)| ChoiceEntry {
                        text: option.text.clone(),
                        option: index,
                    })
                    .collect();
                if entries.is_empty() {
                    ctx.choice_box_mut().clear();
                    ctx.advance_to_next_action();
                    return;
                }
                let (handle, action) = (ctx.handle(), ctx.action_ref());
                ctx.choice_box_mut()
                    .present(handle, stack_depth, action, entries);
            }
            ActionKind::SetVariable {
                name,
                operator,
                value,
                value_variable,
            } => {
                if !name.is_empty() {
                    let operand = operand(ctx.world(), *value, value_variable.as_deref());
                    let current = ctx.world().variable_value(name);
                    let result = apply(*operator, current, operand);
                    ctx.world_mut().set_variable(name, result);
                }
                ctx.advance_to_next_action();
            }
            ActionKind::SetActorParameter {
                actor,
                name,
                operator,
                value,
                value_variable,
            } => {
                let operand = operand(ctx.world(), *value, value_variable.as_deref());
                match ctx.world_mut().actor_mut(actor) {
                    Some(target) if !name.is_empty() => {
                        let current = target.parameters.get(name).copied().unwrap_or(0);
                        target
                            .parameters
                            .insert(name.clone(), apply(*operator, current, operand));
                    }
                    Some(_) => {}
                    None => log::warn!("set_actor_parameter: no actor with id {actor}"),
                }
                ctx.advance_to_next_action();
            }
            ActionKind::ActorCommand { actor, command } => {
                hold_or_advance(ctx, format!("Actor Command: {actor} => {command}"));
            }
            ActionKind::GameCommand { command } => {
                hold_or_advance(ctx, format!("Game Command: {command}"));
            }
            ActionKind::Wait { condition, actions } => match condition {
                Some(_) => {
                    let guard = ctx.action_ref();
                    if let Some(entry) = ctx.push(None, ListRef::Script(*actions)) {
                        entry.set_looping(true);
                        entry.set_loop_condition(Some(guard));
                    }
                }
                None => ctx.advance_to_next_action(),
            },
            ActionKind::Trigger { name, action } => {
                let triggers = &mut ctx.world_mut().triggers;
                match action {
                    TriggerAction::Fire => triggers.fire(name),
                    TriggerAction::Reset => triggers.reset(name),
                    TriggerAction::Pulse => triggers.pulse(name),
                    TriggerAction::FullReset => triggers.full_reset(name),
                }
                hold_or_advance(ctx, format!("Trigger: {name} ({action:?})"));
            }
            ActionKind::ActorAdd { id, alias } => {
                if ctx.world().actor(id).is_none() {
                    let mut actor = ConversationActor::new(id.as_str());
                    actor.alias = alias.clone();
                    ctx.add_actor(actor);
                }
                hold_or_advance(ctx, format!("Actor Add: {id}"));
            }
            ActionKind::ActorRemove { actor } => {
                ctx.remove_actor(actor);
                hold_or_advance(ctx, format!("Actor Remove: {actor}"));
            }
            ActionKind::Comment { .. } => ctx.advance_to_next_action(),
        }
    }
}

/// Executor that only records what was dispatched and moves on. Clones share
/// one log, so a test can keep a handle while the session owns another.
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    dispatched: Rc<RefCell<Vec<(ActionRef, &'static str)>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<(ActionRef, &'static str)> {
        self.dispatched.borrow().clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.dispatched
            .borrow()
            .iter()
            .map(|(_, label)| *label)
            .collect()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&self, ctx: &mut ActionContext<'_>, action: &ActionNode) {
        self.dispatched
            .borrow_mut()
            .push((ctx.action_ref(), action.kind.label()));
        ctx.advance_to_next_action();
    }
}

fn no_actor(ctx: &mut ActionContext<'_>, actor: &str) {
    log::warn!("no actor with id {actor}");
    ctx.set_info_text(format!("No actor with ID '{actor}' exists."));
    ctx.set_running(false);
}

fn stop_topic(ctx: &mut ActionContext<'_>) {
    let Some(stack) = ctx.active_stack_mut() else {
        return;
    };
    while stack.top().map_or(false, |entry| entry.parent_topic().is_none()) {
        if stack.pop().is_none() {
            break;
        }
    }
    if stack.is_empty() {
        return;
    }
    if let Some(top) = stack.top_mut() {
        top.forward_last();
    }
    ctx.advance_to_next_action();
}

fn push_or_advance(ctx: &mut ActionContext<'_>, list: ListId) {
    if ctx.conversation().list(list).is_empty() {
        ctx.advance_to_next_action();
    } else {
        ctx.push(None, ListRef::Script(list));
    }
}

fn hold_or_advance(ctx: &mut ActionContext<'_>, info: String) {
    if ctx.auto_advance_commands() {
        ctx.advance_to_next_action();
    } else {
        ctx.set_info_text(info);
    }
}

/// Literal operand, replaced by the named variable when that one is set.
fn operand(world: &WorldState, value: i32, variable: Option<&str>) -> i32 {
    variable
        .filter(|name| !name.is_empty())
        .and_then(|name| world.variables.get(name).copied())
        .unwrap_or(value)
}

fn apply(operator: SetOperator, current: i32, operand: i32) -> i32 {
    match operator {
        SetOperator::Set => operand,
        SetOperator::Increment => current.saturating_add(operand),
        SetOperator::Decrement => current.saturating_sub(operand),
        SetOperator::Random => {
            let (low, high) = if operand < 0 { (operand, 0) } else { (0, operand) };
            rand::thread_rng().gen_range(low..=high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operators_combine_values() {
        assert_eq!(apply(SetOperator::Set, 4, 9), 9);
        assert_eq!(apply(SetOperator::Increment, 4, 9), 13);
        assert_eq!(apply(SetOperator::Decrement, 4, 9), -5);
        assert_eq!(apply(SetOperator::Increment, i32::MAX, 1), i32::MAX);
    }

    #[test]
    fn random_stays_in_range() {
        for _ in 0..50 {
            let value = apply(SetOperator::Random, 0, 3);
            assert!((0..=3).contains(&value));
            let value = apply(SetOperator::Random, 0, -2);
            assert!((-2..=0).contains(&value));
        }
        assert_eq!(apply(SetOperator::Random, 7, 0), 0);
    }

    #[test]
    fn operand_prefers_named_variable() {
        let mut world = WorldState::new();
        world.set_variable("coins", 5);
        assert_eq!(operand(&world, 2, Some("coins")), 5);
        assert_eq!(operand(&world, 2, Some("missing")), 2);
        assert_eq!(operand(&world, 2, Some("")), 2);
        assert_eq!(operand(&world, 2, None), 2);
    }
}
