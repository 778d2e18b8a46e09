//! Frame-driven conversation playback.
//!
//! A session owns one main action stack and any number of side stacks (side
//! lanes started by snippets). Every [`PlaybackSession::update`] processes each
//! side stack once, then the main stack, dispatching at most one action per
//! stack. The stack being processed is passed down explicitly as a
//! [`StackHandle`]; there is no swapped "active stack" pointer.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use colloquy_script::{ActionKind, ActionNode, Conversation, TopicId};
use serde::Serialize;

use crate::actor::ActorPlaybackState;
use crate::camera::CameraState;
use crate::choice::PlayerChoiceBox;
use crate::executor::{ActionContext, ActionExecutor, ScriptedExecutor};
use crate::options::PlaybackOptions;
use crate::stack::{ActionRef, ActionStack, ListRef, StackEntry};
use crate::world::{ConversationActor, WorldState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StackHandle {
    Main,
    Side(u32),
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackHandle::Main => write!(f, "main"),
            StackHandle::Side(id) => write!(f, "side#{id}"),
        }
    }
}

/// Most recently dispatched action and the topic it ran under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastPlayed {
    pub topic: Option<TopicId>,
    pub action: ActionRef,
}

pub struct PlaybackSession {
    conversation: Rc<Conversation>,
    executor: Rc<dyn ActionExecutor>,
    options: PlaybackOptions,
    topic: Option<TopicId>,
    preview: Rc<[ActionNode]>,
    main_stack: ActionStack,
    side_stacks: BTreeMap<u32, ActionStack>,
    next_side_handle: u32,
    actors: Vec<ActorPlaybackState>,
    world: WorldState,
    camera: CameraState,
    choice_box: PlayerChoiceBox,
    running: bool,
    paused: bool,
    last_played: Option<LastPlayed>,
    info_text: Option<String>,
    events: Vec<String>,
}

fn lookup<'a>(
    conversation: &'a Conversation,
    preview: &'a [ActionNode],
    action: ActionRef,
) -> Option<&'a ActionNode> {
    match action.list {
        ListRef::Script(list) => conversation.action(list, action.index),
        ListRef::Preview => preview.get(action.index),
    }
}

impl PlaybackSession {
    pub fn new(
        conversation: Rc<Conversation>,
        executor: Rc<dyn ActionExecutor>,
        options: PlaybackOptions,
    ) -> Self {
        let world = WorldState::from_conversation(&conversation);
        let actors = vec![ActorPlaybackState::new(); world.actors().len()];
        Self {
            conversation,
            executor,
            options,
            topic: None,
            preview: Rc::from(Vec::new()),
            main_stack: ActionStack::new(),
            side_stacks: BTreeMap::new(),
            next_side_handle: 1,
            actors,
            world,
            camera: CameraState::default(),
            choice_box: PlayerChoiceBox::default(),
            running: false,
            paused: false,
            last_played: None,
            info_text: None,
            events: Vec::new(),
        }
    }

    pub fn with_scripted_executor(conversation: Rc<Conversation>, options: PlaybackOptions) -> Self {
        Self::new(conversation, Rc::new(ScriptedExecutor::new()), options)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    pub fn topic(&self) -> Option<TopicId> {
        self.topic
    }

    /// Selects the topic to play. Changing the selection rewinds playback.
    pub fn set_topic(&mut self, topic: Option<TopicId>) {
        if self.topic == topic && self.preview.is_empty() {
            return;
        }
        self.topic = topic;
        self.preview = Rc::from(Vec::new());
        self.rewind();
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn auto_advance_commands(&self) -> bool {
        self.options.auto_advance_commands
    }

    pub fn set_auto_advance_commands(&mut self, auto_advance: bool) {
        self.options.auto_advance_commands = auto_advance;
    }

    pub fn last_played(&self) -> Option<LastPlayed> {
        self.last_played
    }

    pub fn last_played_action(&self) -> Option<&ActionNode> {
        let last = self.last_played?;
        lookup(&self.conversation, &self.preview, last.action)
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn record_event(&mut self, event: String) {
        log::trace!("{event}");
        self.events.push(event);
    }

    pub fn info_text(&self) -> Option<&str> {
        self.info_text.as_deref()
    }

    pub fn take_info_text(&mut self) -> Option<String> {
        self.info_text.take()
    }

    pub(crate) fn set_info_text(&mut self, text: Option<String>) {
        self.info_text = text;
    }

    /// Playback state per world actor slot.
    pub fn actors(&self) -> &[ActorPlaybackState] {
        &self.actors
    }

    pub fn actor_state_mut(&mut self, index: usize) -> Option<&mut ActorPlaybackState> {
        self.sync_actor_count();
        self.actors.get_mut(index)
    }

    /// Adds an actor together with an idle playback slot.
    pub fn add_actor(&mut self, actor: ConversationActor) -> usize {
        self.sync_actor_count();
        let index = self.world.add_actor(actor);
        self.actors.push(ActorPlaybackState::new());
        index
    }

    /// Removes an actor and its playback slot, keeping the remaining slots
    /// paired with their world actors.
    pub fn remove_actor(&mut self, id: &str) -> Option<ConversationActor> {
        self.sync_actor_count();
        let index = self.world.actor_index(id)?;
        if index < self.actors.len() {
            self.actors.remove(index);
        }
        self.record_event(format!("actor.remove {id}"));
        self.world.remove_actor(id)
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub(crate) fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn choice_box(&self) -> &PlayerChoiceBox {
        &self.choice_box
    }

    pub(crate) fn choice_box_mut(&mut self) -> &mut PlayerChoiceBox {
        &mut self.choice_box
    }

    pub fn main_stack(&self) -> &ActionStack {
        &self.main_stack
    }

    pub fn side_stacks(&self) -> &BTreeMap<u32, ActionStack> {
        &self.side_stacks
    }

    pub fn stack(&self, handle: StackHandle) -> Option<&ActionStack> {
        match handle {
            StackHandle::Main => Some(&self.main_stack),
            StackHandle::Side(id) => self.side_stacks.get(&id),
        }
    }

    pub(crate) fn stack_mut(&mut self, handle: StackHandle) -> Option<&mut ActionStack> {
        match handle {
            StackHandle::Main => Some(&mut self.main_stack),
            StackHandle::Side(id) => self.side_stacks.get_mut(&id),
        }
    }

    fn list_len(&self, list: ListRef) -> usize {
        match list {
            ListRef::Script(id) => self.conversation.list(id).len(),
            ListRef::Preview => self.preview.len(),
        }
    }

    /// New stack rooted at the start of `topic`.
    pub fn topic_stack(&self, topic: TopicId, parent_action: Option<ActionRef>) -> ActionStack {
        let mut stack = ActionStack::new();
        if let Some(found) = self.conversation.topic(topic) {
            let list = ListRef::Script(found.actions);
            stack.push(Some(topic), parent_action, list, self.list_len(list), 0);
        }
        stack
    }

    fn root_entry(&self) -> Option<StackEntry> {
        if !self.preview.is_empty() {
            return Some(StackEntry::new(
                None,
                None,
                ListRef::Preview,
                self.preview.len(),
                0,
            ));
        }
        let topic = self.topic?;
        let list = ListRef::Script(self.conversation.topic(topic)?.actions);
        Some(StackEntry::new(
            Some(topic),
            None,
            list,
            self.list_len(list),
            0,
        ))
    }

    pub(crate) fn push_list(
        &mut self,
        handle: StackHandle,
        parent_topic: Option<TopicId>,
        parent_action: Option<ActionRef>,
        list: ListRef,
    ) -> Option<&mut StackEntry> {
        let len = self.list_len(list);
        if self.stack(handle).is_none() {
            return None;
        }
        self.record_event(format!("stack.push {handle} {}", list_name(list)));
        let stack = self.stack_mut(handle)?;
        stack.prime();
        Some(stack.push(parent_topic, parent_action, list, len, 0))
    }

    /// Only appends or truncates slots; actors leaving from the middle go
    /// through [`PlaybackSession::remove_actor`].
    fn sync_actor_count(&mut self) {
        let count = self.world.actors().len();
        if self.actors.len() != count {
            self.actors.resize_with(count, ActorPlaybackState::new);
        }
    }

    fn all_speech_done(&self) -> bool {
        self.actors.iter().all(ActorPlaybackState::is_speech_done)
    }

    /// Clears every stack and restarts at the root of the selected topic (or
    /// the preview action).
    pub fn rewind(&mut self) {
        self.main_stack.clear();
        self.side_stacks.clear();
        self.sync_actor_count();
        for actor in &mut self.actors {
            actor.reset();
        }
        self.info_text = None;
        self.choice_box.clear();
        self.camera.reset();
        self.last_played = None;
        self.record_event("playback.rewind".to_string());
        self.advance_stack(StackHandle::Main);
    }

    /// Moves the main stack to its next action. Hosts call this to continue
    /// past a command that is held because auto-advance is off.
    pub fn advance_to_next_action(&mut self) {
        self.advance_stack(StackHandle::Main);
    }

    pub(crate) fn advance_stack(&mut self, handle: StackHandle) {
        if self.topic.is_none() && self.preview.is_empty() {
            self.running = false;
            return;
        }
        let root = self.root_entry();
        let Some(stack) = self.stack_mut(handle) else {
            return;
        };

        if stack.is_empty() {
            if let Some(root) = root {
                stack.push_entry(root);
            }
            stack.prime();
            return;
        }

        let Some(top) = stack.top_mut() else {
            return;
        };
        top.advance_index();
        if top.has_next_action() {
            stack.prime();
            return;
        }

        if stack.len() > 1 {
            stack.pop();
            if let Some(parent) = stack.top_mut() {
                parent.advance_index();
            }
            stack.prime();
            self.record_event(format!("stack.pop {handle}"));
        }
    }

    /// Plays one action outside of any topic, optionally running it for
    /// `preview_seconds` straight away.
    pub fn play_single_action(&mut self, action: ActionNode, preview_seconds: f32) {
        self.preview = Rc::from(vec![action]);
        self.rewind();
        self.running = true;
        self.paused = false;
        if preview_seconds > 0.0 {
            self.update(preview_seconds);
        }
    }

    /// Steps playback in small fixed increments until no actor is speaking.
    /// Returns the number of steps taken.
    pub fn fast_forward_speaking(&mut self) -> u32 {
        let step = self.options.fast_forward_step;
        let mut steps = 0;
        while self.running
            && !self.paused
            && !self.all_speech_done()
            && steps < self.options.fast_forward_limit
        {
            self.update(step);
            steps += 1;
        }
        steps
    }

    /// Unwinds the main stack to `depth` and stops that level from looping.
    pub fn cancel_looping_layer(&mut self, depth: usize) {
        self.cancel_looping_layer_on(StackHandle::Main, depth);
    }

    fn cancel_looping_layer_on(&mut self, handle: StackHandle, depth: usize) -> bool {
        let Some(stack) = self.stack_mut(handle) else {
            return false;
        };
        if depth >= stack.len() {
            return false;
        }
        stack.truncate(depth + 1);
        if let Some(entry) = stack.entry_mut(depth) {
            entry.cancel_looping();
        }
        stack.prime();
        self.record_event(format!("loop.cancel {handle} {depth}"));
        true
    }

    /// Picks entry `index` of the choice box: the waiting choice layer stops
    /// looping and the chosen option's actions run in its place.
    pub fn select_choice(&mut self, index: usize) -> bool {
        let Some(selection) = self.choice_box.take_selection(index) else {
            return false;
        };
        let layer = selection.stack_depth.saturating_sub(1);
        if !self.cancel_looping_layer_on(selection.stack, layer) {
            return false;
        }
        if let Some(entry) = self
            .stack_mut(selection.stack)
            .and_then(|stack| stack.entry_mut(layer))
        {
            entry.forward_end();
        }
        self.record_event(format!("choice.select {}", selection.option));

        let conversation = Rc::clone(&self.conversation);
        let preview = Rc::clone(&self.preview);
        let Some(ActionKind::PlayerChoice {
            options, variable, ..
        }) = lookup(&conversation, &preview, selection.action).map(|node| &node.kind)
        else {
            return true;
        };
        if let Some(variable) = variable.as_deref().filter(|name| !name.is_empty()) {
            let value = i32::try_from(selection.option).unwrap_or(i32::MAX);
            self.world.set_variable(variable, value);
        }
        if let Some(option) = options.get(selection.option) {
            if !conversation.list(option.actions).is_empty() {
                self.push_list(
                    selection.stack,
                    None,
                    Some(selection.action),
                    ListRef::Script(option.actions),
                );
            }
        }
        true
    }

    /// Registers a side stack and runs its first processing pass right away.
    pub fn add_side_action_stack(&mut self, stack: ActionStack) -> u32 {
        let id = self.next_side_handle;
        self.next_side_handle += 1;
        self.side_stacks.insert(id, stack);
        let handle = StackHandle::Side(id);
        self.record_event(format!("side.add {handle}"));
        self.process_one_stack(handle, 0.0);
        id
    }

    pub fn update(&mut self, elapsed: f32) {
        let has_script = self.topic.is_some() || !self.preview.is_empty();
        if has_script && self.running && !self.paused {
            self.sync_actor_count();
            for actor in &mut self.actors {
                actor.update(elapsed);
            }
            self.process_actions(elapsed);
        }
        self.camera.update(elapsed);
    }

    fn process_actions(&mut self, elapsed: f32) {
        let handles: Vec<u32> = self.side_stacks.keys().copied().collect();
        for id in handles {
            if self.side_stacks.contains_key(&id) {
                self.process_one_stack(StackHandle::Side(id), elapsed);
            }
        }
        self.process_one_stack(StackHandle::Main, elapsed);
    }

    fn process_one_stack(&mut self, handle: StackHandle, elapsed: f32) {
        if handle == StackHandle::Main && self.main_stack.is_empty() {
            self.advance_stack(handle);
        }

        self.check_loop_guards(handle);

        let Some(stack) = self.stack(handle) else {
            return;
        };
        let (candidate, looping) = match stack.top() {
            Some(top) => (top.next_action(), top.looping()),
            None => (None, false),
        };
        let depth = stack.len();

        match candidate {
            Some(action) => self.process_candidate(handle, action, elapsed),
            None if looping => {}
            None if depth > 1 => self.advance_stack(handle),
            None => match handle {
                StackHandle::Main => {
                    if self.all_speech_done() {
                        self.running = false;
                        self.record_event("playback.end".to_string());
                    }
                }
                StackHandle::Side(id) => {
                    self.side_stacks.remove(&id);
                    self.record_event(format!("side.remove {handle}"));
                }
            },
        }
    }

    /// Aborts the outermost loop whose guard no longer holds, along with
    /// everything nested inside it.
    fn check_loop_guards(&mut self, handle: StackHandle) {
        let conversation = Rc::clone(&self.conversation);
        let preview = Rc::clone(&self.preview);
        let Some(stack) = self.stack(handle) else {
            return;
        };
        let failed = stack.entries().iter().position(|entry| {
            entry.looping()
                && entry
                    .loop_condition()
                    .and_then(|guard| lookup(&conversation, &preview, guard))
                    .and_then(ActionNode::loop_guard)
                    .map_or(false, |condition| {
                        !colloquy_script::evaluate(condition, &self.world)
                    })
        });
        let Some(depth) = failed else {
            return;
        };
        if let Some(stack) = self.stack_mut(handle) {
            stack.truncate(depth + 1);
            if let Some(entry) = stack.entry_mut(depth) {
                entry.cancel_looping();
                entry.forward_end();
            }
            stack.prime();
        }
        self.record_event(format!("loop.end {handle} {depth}"));
    }

    fn process_candidate(&mut self, handle: StackHandle, action_ref: ActionRef, elapsed: f32) {
        let conversation = Rc::clone(&self.conversation);
        let preview = Rc::clone(&self.preview);
        let Some(action) = lookup(&conversation, &preview, action_ref) else {
            return;
        };
        let Some(stack) = self.stack(handle) else {
            return;
        };

        if stack.action_waiting() {
            if self.wait_gate_blocked(action) {
                return;
            }
            if let Some(stack) = self.stack_mut(handle) {
                stack.set_action_waiting(false);
            }
        }

        let Some(stack) = self.stack_mut(handle) else {
            return;
        };
        let action_time = stack.action_time() + elapsed;
        stack.set_action_time(action_time);
        if action_time < action.delay {
            return;
        }

        let topic = stack.current_topic();
        self.last_played = Some(LastPlayed {
            topic,
            action: action_ref,
        });
        self.record_event(format!(
            "action.dispatch {handle} {action_ref} {}",
            action.kind.label()
        ));
        log::debug!("dispatching {} at {action_ref} on {handle}", action.kind.label());

        let executor = Rc::clone(&self.executor);
        executor.execute(&mut ActionContext::new(self, handle, action_ref), action);

        if let Some(stack) = self.stack_mut(handle) {
            stack.prime();
        }
    }

    fn wait_gate_blocked(&self, action: &ActionNode) -> bool {
        if !action.wait_for_actor {
            return false;
        }
        match action.wait_for_actor_id.as_deref() {
            Some(id) if !id.is_empty() => self
                .world
                .actor_index(id)
                .map_or(false, |index| self.actor_blocks(index, action.wait_speak_only)),
            _ => (0..self.actors.len()).any(|index| self.actor_blocks(index, action.wait_speak_only)),
        }
    }

    fn actor_blocks(&self, index: usize, speak_only: bool) -> bool {
        let speaking = self
            .actors
            .get(index)
            .map_or(false, |actor| !actor.is_speech_done());
        let busy = !speak_only
            && self
                .world
                .actors()
                .get(index)
                .map_or(false, |actor| actor.waiting);
        speaking || busy
    }
}

fn list_name(list: ListRef) -> String {
    match list {
        ListRef::Script(id) => format!("list{}", id.index()),
        ListRef::Preview => "preview".to_string(),
    }
}
