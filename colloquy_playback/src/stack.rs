//! Execution cursors over nested action lists.

use std::fmt;

use colloquy_script::{ListId, TopicId};
use serde::Serialize;

/// Action list addressed by a cursor: an arena list of the conversation or
/// the session's ad-hoc preview list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListRef {
    Script(ListId),
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActionRef {
    pub list: ListRef,
    pub index: usize,
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.list {
            ListRef::Script(list) => write!(f, "list{}[{}]", list.index(), self.index),
            ListRef::Preview => write!(f, "preview[{}]", self.index),
        }
    }
}

/// One active position inside one action list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackEntry {
    parent_topic: Option<TopicId>,
    parent_action: Option<ActionRef>,
    list: ListRef,
    list_len: usize,
    loop_condition: Option<ActionRef>,
    looping: bool,
    next_index: usize,
    next_action: Option<ActionRef>,
}

impl StackEntry {
    /// `list_len` is the length of `list`; lists never change while a cursor
    /// points into them.
    pub fn new(
        parent_topic: Option<TopicId>,
        parent_action: Option<ActionRef>,
        list: ListRef,
        list_len: usize,
        start_index: usize,
    ) -> Self {
        let mut entry = Self {
            parent_topic,
            parent_action,
            list,
            list_len,
            loop_condition: None,
            looping: false,
            next_index: start_index.min(list_len),
            next_action: None,
        };
        entry.update_next_action();
        entry
    }

    pub fn parent_topic(&self) -> Option<TopicId> {
        self.parent_topic
    }

    pub fn parent_action(&self) -> Option<ActionRef> {
        self.parent_action
    }

    pub fn list(&self) -> ListRef {
        self.list
    }

    pub fn list_len(&self) -> usize {
        self.list_len
    }

    /// Action whose guard condition keeps this entry looping.
    pub fn loop_condition(&self) -> Option<ActionRef> {
        self.loop_condition
    }

    pub fn set_loop_condition(&mut self, guard: Option<ActionRef>) {
        self.loop_condition = guard;
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn cancel_looping(&mut self) {
        self.looping = false;
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn next_action(&self) -> Option<ActionRef> {
        self.next_action
    }

    pub fn has_next_action(&self) -> bool {
        self.next_action.is_some()
    }

    /// Moves the cursor one action forward. Looping entries over a non-empty
    /// list wrap back to the first action.
    pub fn advance_index(&mut self) {
        self.next_index = (self.next_index + 1).min(self.list_len);
        if self.looping && self.list_len > 0 && self.next_index >= self.list_len {
            self.next_index = 0;
        }
        self.update_next_action();
    }

    /// Places the cursor past the last action.
    pub fn forward_end(&mut self) {
        self.next_index = self.list_len;
        self.update_next_action();
    }

    /// Places the cursor on the last action.
    pub fn forward_last(&mut self) {
        self.next_index = self.list_len.saturating_sub(1);
        self.update_next_action();
    }

    fn update_next_action(&mut self) {
        self.next_action = (self.next_index < self.list_len).then_some(ActionRef {
            list: self.list,
            index: self.next_index,
        });
    }
}

/// Call stack of cursors plus the timing state of the current candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStack {
    entries: Vec<StackEntry>,
    action_waiting: bool,
    action_time: f32,
}

impl Default for ActionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionStack {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            action_waiting: true,
            action_time: 0.0,
        }
    }

    pub fn push(
        &mut self,
        parent_topic: Option<TopicId>,
        parent_action: Option<ActionRef>,
        list: ListRef,
        list_len: usize,
        start_index: usize,
    ) -> &mut StackEntry {
        self.push_entry(StackEntry::new(
            parent_topic,
            parent_action,
            list,
            list_len,
            start_index,
        ))
    }

    pub fn push_entry(&mut self, entry: StackEntry) -> &mut StackEntry {
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Removes the top entry. The last remaining entry is never removed.
    pub fn pop(&mut self) -> Option<StackEntry> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop()
    }

    /// Pops entries until at most `depth` remain (never below one).
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth.max(1));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.prime();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut StackEntry> {
        self.entries.last_mut()
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    pub fn entry_mut(&mut self, depth: usize) -> Option<&mut StackEntry> {
        self.entries.get_mut(depth)
    }

    /// Topic of the innermost entry that was started from a topic.
    pub fn current_topic(&self) -> Option<TopicId> {
        self.entries
            .iter()
            .rev()
            .find_map(StackEntry::parent_topic)
    }

    pub fn action_waiting(&self) -> bool {
        self.action_waiting
    }

    pub fn set_action_waiting(&mut self, waiting: bool) {
        self.action_waiting = waiting;
    }

    pub fn action_time(&self) -> f32 {
        self.action_time
    }

    pub fn set_action_time(&mut self, time: f32) {
        self.action_time = time;
    }

    /// Re-arms the wait-gate and clears accumulated time for a new candidate.
    pub fn prime(&mut self) {
        self.action_waiting = true;
        self.action_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(len: usize, start: usize) -> StackEntry {
        StackEntry::new(None, None, ListRef::Preview, len, start)
    }

    #[test]
    fn cursor_caches_next_action() {
        let mut cursor = entry(2, 0);
        assert_eq!(
            cursor.next_action(),
            Some(ActionRef {
                list: ListRef::Preview,
                index: 0
            })
        );
        cursor.advance_index();
        assert_eq!(cursor.next_index(), 1);
        assert!(cursor.has_next_action());
        cursor.advance_index();
        assert!(!cursor.has_next_action());
        cursor.advance_index();
        assert_eq!(cursor.next_index(), 2);
    }

    #[test]
    fn start_index_out_of_range_has_no_action() {
        assert!(!entry(3, 7).has_next_action());
        assert!(!entry(0, 0).has_next_action());
    }

    #[test]
    fn looping_cursor_wraps_until_cancelled() {
        let mut cursor = entry(2, 1);
        cursor.set_looping(true);
        cursor.advance_index();
        assert_eq!(cursor.next_index(), 0);
        cursor.cancel_looping();
        cursor.advance_index();
        cursor.advance_index();
        assert!(!cursor.has_next_action());
    }

    #[test]
    fn empty_looping_cursor_stays_exhausted() {
        let mut cursor = entry(0, 0);
        cursor.set_looping(true);
        cursor.advance_index();
        assert!(!cursor.has_next_action());
    }

    #[test]
    fn forward_helpers_move_cursor() {
        let mut cursor = entry(3, 0);
        cursor.forward_last();
        assert_eq!(cursor.next_index(), 2);
        cursor.forward_end();
        assert!(!cursor.has_next_action());
    }

    #[test]
    fn pop_keeps_the_root_entry() {
        let mut stack = ActionStack::new();
        stack.push_entry(entry(1, 0));
        assert!(stack.pop().is_none());
        stack.push_entry(entry(1, 0));
        stack.push_entry(entry(1, 0));
        assert!(stack.pop().is_some());
        assert_eq!(stack.len(), 2);
        stack.truncate(0);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn current_topic_uses_innermost_topic_entry() {
        let mut stack = ActionStack::new();
        assert!(stack.current_topic().is_none());
        stack.push_entry(entry(1, 0));
        stack.push(None, None, ListRef::Preview, 1, 0);
        assert!(stack.current_topic().is_none());
    }

    #[test]
    fn prime_resets_timing() {
        let mut stack = ActionStack::new();
        stack.set_action_waiting(false);
        stack.set_action_time(1.5);
        stack.prime();
        assert!(stack.action_waiting());
        assert_eq!(stack.action_time(), 0.0);
    }
}
