use serde::Serialize;

use crate::session::StackHandle;
use crate::stack::ActionRef;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceEntry {
    pub text: String,
    /// Index into the player-choice action's option list.
    pub option: usize,
}

/// Options currently offered to the player, plus where the waiting choice
/// layer sits so a selection can unwind to it.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct PlayerChoiceBox {
    stack: Option<StackHandle>,
    stack_depth: usize,
    action: Option<ActionRef>,
    entries: Vec<ChoiceEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChoiceSelection {
    pub(crate) stack: StackHandle,
    pub(crate) stack_depth: usize,
    pub(crate) action: ActionRef,
    pub(crate) option: usize,
}

impl PlayerChoiceBox {
    pub fn present(
        &mut self,
        stack: StackHandle,
        stack_depth: usize,
        action: ActionRef,
        entries: Vec<ChoiceEntry>,
    ) {
        self.stack = Some(stack);
        self.stack_depth = stack_depth;
        self.action = Some(action);
        self.entries = entries;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn entries(&self) -> &[ChoiceEntry] {
        &self.entries
    }

    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Depth of the stack once the choice layer was pushed.
    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    pub(crate) fn take_selection(&mut self, index: usize) -> Option<ChoiceSelection> {
        let entry = self.entries.get(index)?;
        let selection = ChoiceSelection {
            stack: self.stack?,
            stack_depth: self.stack_depth,
            action: self.action?,
            option: entry.option,
        };
        self.clear();
        Some(selection)
    }
}
