use crate::types::{Reaction, Role, Turn, TurnId};
use anyhow::{bail, Result};
use chrono::Utc;

/// Field-level patch applied by [`Transcript::update_last`]. Absent fields
/// leave the turn untouched.
#[derive(Debug, Clone, Default)]
pub struct TurnPatch {
    pub content: Option<String>,
    pub streaming: Option<bool>,
}

impl TurnPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            streaming: None,
        }
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }
}

/// Ordered, mutable conversation transcript. Insertion order is display
/// order. Ids are allocated once and never reused, so deleting a turn
/// shifts positions but never renumbers identities.
#[derive(Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn find(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn index_of(&self, id: TurnId) -> Option<usize> {
        self.turns.iter().position(|turn| turn.id == id)
    }

    fn alloc_id(&mut self) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a completed user turn.
    pub fn push_user(&mut self, content: impl Into<String>, image: Option<String>) -> TurnId {
        let id = self.alloc_id();
        self.turns.push(Turn {
            id,
            role: Role::User,
            content: content.into(),
            image,
            streaming: false,
            reaction: None,
            created_at: Utc::now(),
        });
        id
    }

    /// Append the empty assistant placeholder that pairs with the user turn
    /// just sent. Fails if another turn is still streaming: at most one
    /// streaming turn may exist at any instant.
    pub fn push_assistant_placeholder(&mut self) -> Result<TurnId> {
        if self.turns.iter().any(|turn| turn.streaming) {
            bail!("a streaming turn is already active");
        }
        let id = self.alloc_id();
        self.turns.push(Turn {
            id,
            role: Role::Assistant,
            content: String::new(),
            image: None,
            streaming: true,
            reaction: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    /// Locate the most recent turn matching `pred` and apply `patch`.
    /// Returns false when no turn matches.
    pub fn update_last(&mut self, pred: impl Fn(&Turn) -> bool, patch: TurnPatch) -> bool {
        let Some(turn) = self.turns.iter_mut().rev().find(|turn| pred(turn)) else {
            return false;
        };
        if let Some(content) = patch.content {
            turn.content = content;
        }
        if let Some(streaming) = patch.streaming {
            turn.streaming = streaming;
        }
        true
    }

    /// Replace a turn's content. Streaming turns belong to their session and
    /// cannot be edited from outside.
    pub fn edit(&mut self, id: TurnId, new_content: impl Into<String>) -> Result<()> {
        let Some(turn) = self.turns.iter_mut().find(|turn| turn.id == id) else {
            bail!("no turn with id {}", id.0);
        };
        if turn.streaming {
            bail!("turn {} is still streaming and cannot be edited", id.0);
        }
        turn.content = new_content.into();
        Ok(())
    }

    /// Remove a turn. Returns false when the id is unknown.
    pub fn remove(&mut self, id: TurnId) -> bool {
        let before = self.turns.len();
        self.turns.retain(|turn| turn.id != id);
        self.turns.len() != before
    }

    /// Set, change, or toggle a reaction. Reacting with the current reaction
    /// clears it.
    pub fn set_reaction(&mut self, id: TurnId, reaction: Reaction) -> Result<()> {
        let Some(turn) = self.turns.iter_mut().find(|turn| turn.id == id) else {
            bail!("no turn with id {}", id.0);
        };
        if turn.reaction == Some(reaction) {
            turn.reaction = None;
        } else {
            turn.reaction = Some(reaction);
        }
        Ok(())
    }

    /// Scan backward from an assistant turn's position to the user turn that
    /// prompted it. Pairing is positional, not a stored reference, so this
    /// must be re-resolved after any delete.
    pub fn preceding_user(&self, assistant_index: usize) -> Option<&Turn> {
        self.turns
            .get(..assistant_index)?
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_exchange(transcript: &mut Transcript) -> (TurnId, TurnId) {
        let user = transcript.push_user("what is in this image?", None);
        let assistant = transcript.push_assistant_placeholder().unwrap();
        (user, assistant)
    }

    #[test]
    fn test_placeholder_follows_user_turn_and_streams() {
        let mut transcript = Transcript::new();
        let (user, assistant) = store_with_exchange(&mut transcript);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(0).unwrap().id, user);
        let placeholder = transcript.get(1).unwrap();
        assert_eq!(placeholder.id, assistant);
        assert_eq!(placeholder.role, Role::Assistant);
        assert!(placeholder.content.is_empty());
        assert!(placeholder.streaming);
    }

    #[test]
    fn test_second_placeholder_rejected_while_streaming() {
        let mut transcript = Transcript::new();
        store_with_exchange(&mut transcript);
        assert!(transcript.push_assistant_placeholder().is_err());
    }

    #[test]
    fn test_update_last_targets_most_recent_match() {
        let mut transcript = Transcript::new();
        let (_, assistant) = store_with_exchange(&mut transcript);

        let updated = transcript.update_last(
            Turn::is_assistant_streaming,
            TurnPatch::content("Hello").streaming(true),
        );
        assert!(updated);
        assert_eq!(transcript.find(assistant).unwrap().content, "Hello");
        assert!(transcript.find(assistant).unwrap().streaming);

        transcript.update_last(
            Turn::is_assistant_streaming,
            TurnPatch::content("Hello!").streaming(false),
        );
        assert!(!transcript.find(assistant).unwrap().streaming);

        // Nothing is streaming anymore; the predicate no longer matches.
        assert!(!transcript.update_last(Turn::is_assistant_streaming, TurnPatch::content("x")));
        assert_eq!(transcript.find(assistant).unwrap().content, "Hello!");
    }

    #[test]
    fn test_edit_rejects_streaming_turn() {
        let mut transcript = Transcript::new();
        let (user, assistant) = store_with_exchange(&mut transcript);

        assert!(transcript.edit(assistant, "rewritten").is_err());
        assert!(transcript.edit(user, "rewritten prompt").is_ok());
        assert_eq!(transcript.find(user).unwrap().content, "rewritten prompt");
    }

    #[test]
    fn test_remove_keeps_ids_stable_but_shifts_positions() {
        let mut transcript = Transcript::new();
        let first = transcript.push_user("one", None);
        let second = transcript.push_user("two", None);
        let third = transcript.push_user("three", None);

        assert!(transcript.remove(second));
        assert!(!transcript.remove(second));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.get(0).unwrap().id, first);
        assert_eq!(transcript.get(1).unwrap().id, third);
        assert_eq!(transcript.index_of(third), Some(1));
    }

    #[test]
    fn test_reaction_toggles_and_switches() {
        let mut transcript = Transcript::new();
        let id = transcript.push_user("hi", None);

        transcript.set_reaction(id, Reaction::Like).unwrap();
        assert_eq!(transcript.find(id).unwrap().reaction, Some(Reaction::Like));

        transcript.set_reaction(id, Reaction::Dislike).unwrap();
        assert_eq!(
            transcript.find(id).unwrap().reaction,
            Some(Reaction::Dislike)
        );

        transcript.set_reaction(id, Reaction::Dislike).unwrap();
        assert_eq!(transcript.find(id).unwrap().reaction, None);
    }

    #[test]
    fn test_preceding_user_scans_backward() {
        let mut transcript = Transcript::new();
        let first_user = transcript.push_user("first", None);
        let first_assistant = transcript.push_assistant_placeholder().unwrap();
        transcript.update_last(
            Turn::is_assistant_streaming,
            TurnPatch::content("answer").streaming(false),
        );
        let second_user = transcript.push_user("second", None);
        transcript.push_assistant_placeholder().unwrap();

        assert_eq!(transcript.preceding_user(3).unwrap().id, second_user);
        assert_eq!(transcript.preceding_user(1).unwrap().id, first_user);
        assert!(transcript.preceding_user(0).is_none());

        // After deleting the second user turn, position 2 now pairs back to
        // the first user turn.
        let _ = first_assistant;
        assert!(transcript.remove(second_user));
        assert_eq!(transcript.preceding_user(2).unwrap().id, first_user);
    }

    #[test]
    fn test_clear_empties_store() {
        let mut transcript = Transcript::new();
        store_with_exchange(&mut transcript);
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
