//! Human-in-the-loop decisions.
//!
//! The core never talks to a terminal. Whenever a save needs a person to pick a
//! side or confirm something destructive, it asks the [`Prompter`] it was
//! handed. The CLI implements it with `console`; tests script the answers.

use std::cell::RefCell;
use std::collections::VecDeque;

/// What the conflict check found just before a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    pub local_items: usize,
    pub remote_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Overwrite the remote with the local copy.
    KeepLocal,
    /// Drop local changes and adopt the remote document.
    TakeRemote,
}

pub trait Prompter {
    /// The remote holds more items than the local copy about to be written.
    fn resolve_conflict(&self, report: &ConflictReport) -> ConflictChoice;

    /// An empty catalogue is about to be written and no backup exists.
    fn confirm_empty_write(&self) -> bool;

    fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way.
pub struct FixedPrompter {
    pub conflict: ConflictChoice,
    pub confirm: bool,
}

impl FixedPrompter {
    /// Keeps local data and confirms everything.
    pub fn yes() -> Self {
        Self {
            conflict: ConflictChoice::KeepLocal,
            confirm: true,
        }
    }

    /// Takes the remote side and declines everything.
    pub fn no() -> Self {
        Self {
            conflict: ConflictChoice::TakeRemote,
            confirm: false,
        }
    }
}

impl Prompter for FixedPrompter {
    fn resolve_conflict(&self, _report: &ConflictReport) -> ConflictChoice {
        self.conflict
    }

    fn confirm_empty_write(&self) -> bool {
        self.confirm
    }

    fn confirm(&self, _question: &str) -> bool {
        self.confirm
    }
}

/// Replays queued answers and records what was asked. Unqueued questions
/// get the safe answer (take remote, decline).
#[derive(Default)]
pub struct ScriptedPrompter {
    conflicts: RefCell<VecDeque<ConflictChoice>>,
    confirmations: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_conflict(self, choice: ConflictChoice) -> Self {
        self.conflicts.borrow_mut().push_back(choice);
        self
    }

    pub fn answer(self, yes: bool) -> Self {
        self.confirmations.borrow_mut().push_back(yes);
        self
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next_confirmation(&self) -> bool {
        self.confirmations.borrow_mut().pop_front().unwrap_or(false)
    }
}

impl Prompter for ScriptedPrompter {
    fn resolve_conflict(&self, report: &ConflictReport) -> ConflictChoice {
        self.asked.borrow_mut().push(format!(
            "conflict: local {} / remote {}",
            report.local_items, report.remote_items
        ));
        self.conflicts
            .borrow_mut()
            .pop_front()
            .unwrap_or(ConflictChoice::TakeRemote)
    }

    fn confirm_empty_write(&self) -> bool {
        self.asked.borrow_mut().push("empty write".to_string());
        self.next_confirmation()
    }

    fn confirm(&self, question: &str) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.next_confirmation()
    }
}
