//! Two-list editor for the membership of a zone or scan list.
//!
//! The editor shows the aggregate's members next to every item of the
//! universe that is not yet a member. An action is performed in two steps:
//! an item is selected on one side, then `add`, `remove`, `move_up` or
//! `move_down` is applied to that selection.
//!
//! Changes are staged locally. Nothing leaves the editor until [`save`] is
//! called, which hands the updated aggregate to the `on_change` callback.
//!
//! [`save`]: MembershipEditor::save

use tracing::debug;

use crate::group::Aggregate;
use crate::membership;
use crate::{Id, Member};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Available,
    Members,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Selection {
    #[default]
    Idle,
    Selected {
        side: Side,
        id: Id,
    },
}

type ChangeHandler<A> = Box<dyn FnMut(&A) + Send>;

pub struct MembershipEditor<A: Aggregate> {
    subject: A,
    universe: Vec<A::Member>,
    committed: Vec<A::Member>,
    selection: Selection,
    on_change: Option<ChangeHandler<A>>,
}

impl<A: Aggregate> MembershipEditor<A> {
    pub fn new(subject: A, universe: Vec<A::Member>) -> Self {
        let committed = subject.members().to_vec();

        Self {
            subject,
            universe,
            committed,
            selection: Selection::Idle,
            on_change: None,
        }
    }

    /// Registers the callback invoked with the updated aggregate on save.
    pub fn on_change(mut self, handler: impl FnMut(&A) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(handler));
        self
    }

    pub fn subject(&self) -> &A {
        &self.subject
    }

    pub fn into_subject(self) -> A {
        self.subject
    }

    pub fn members(&self) -> &[A::Member] {
        self.subject.members()
    }

    pub fn available(&self) -> Vec<A::Member> {
        membership::partition(&self.universe, self.subject.members())
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Replaces the universe, e.g. after the host refetched its channels.
    pub fn set_universe(&mut self, universe: Vec<A::Member>) {
        self.universe = universe;

        if let Selection::Selected { side, id } = self.selection
            && !self.is_listed(side, id)
        {
            self.selection = Selection::Idle;
        }
    }

    /// Selects an item on one side. Ids not listed on that side are ignored.
    pub fn select(&mut self, side: Side, id: Id) -> bool {
        if !self.is_listed(side, id) {
            return false;
        }

        self.selection = Selection::Selected { side, id };
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::Idle;
    }

    /// Moves the selected available item to the end of the membership and
    /// selects it there.
    pub fn add(&mut self) -> bool {
        let Selection::Selected {
            side: Side::Available,
            id,
        } = self.selection
        else {
            return false;
        };

        let Some(item) = self.universe.iter().find(|item| item.id() == id).cloned() else {
            return false;
        };

        self.replace(membership::add(self.subject.members(), &item));
        self.selection = Selection::Selected {
            side: Side::Members,
            id,
        };

        true
    }

    pub fn remove(&mut self) -> bool {
        let Some(id) = self.selected_member() else {
            return false;
        };

        self.replace(membership::remove(self.subject.members(), id));
        self.selection = Selection::Idle;

        true
    }

    pub fn move_up(&mut self) -> bool {
        let Some(id) = self.selected_member() else {
            return false;
        };

        self.replace(membership::move_up(self.subject.members(), id))
    }

    pub fn move_down(&mut self) -> bool {
        let Some(id) = self.selected_member() else {
            return false;
        };

        self.replace(membership::move_down(self.subject.members(), id))
    }

    /// Whether the membership differs from what was last saved.
    pub fn is_dirty(&self) -> bool {
        membership::ids(self.subject.members()) != membership::ids(&self.committed)
    }

    /// Commits staged changes and notifies the host. Returns the updated
    /// aggregate, or `None` when nothing changed since the last save.
    pub fn save(&mut self) -> Option<A> {
        if !self.is_dirty() {
            return None;
        }

        self.committed = self.subject.members().to_vec();

        debug!(
            aggregate_id = self.subject.id(),
            members = self.committed.len(),
            "Saved membership"
        );

        if let Some(handler) = self.on_change.as_mut() {
            handler(&self.subject);
        }

        Some(self.subject.clone())
    }

    /// Drops staged changes.
    pub fn revert(&mut self) {
        self.subject.set_members(self.committed.clone());
        self.selection = Selection::Idle;
    }

    fn selected_member(&self) -> Option<Id> {
        match self.selection {
            Selection::Selected {
                side: Side::Members,
                id,
            } => Some(id),
            _ => None,
        }
    }

    fn is_listed(&self, side: Side, id: Id) -> bool {
        let members = self.subject.members();

        match side {
            Side::Members => membership::contains(members, id),
            Side::Available => {
                !membership::contains(members, id)
                    && membership::contains(&self.universe, id)
            }
        }
    }

    fn replace(&mut self, members: Vec<A::Member>) -> bool {
        let changed = membership::ids(&members) != membership::ids(self.subject.members());
        self.subject.set_members(members);
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::channel::Channel;
    use crate::group::Zone;

    fn channel(id: Id, name: &str) -> Channel {
        Channel {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn universe() -> Vec<Channel> {
        vec![
            channel(1, "Channel A"),
            channel(2, "Channel B"),
            channel(3, "Channel C"),
        ]
    }

    fn zone(channels: Vec<Channel>) -> Zone {
        Zone {
            id: 1,
            name: "Test Zone".to_string(),
            channels,
        }
    }

    fn names(channels: &[Channel]) -> Vec<&str> {
        channels.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_lists_available_and_members() {
        let editor = MembershipEditor::new(zone(vec![channel(2, "Channel B")]), universe());

        assert_eq!(names(&editor.available()), ["Channel A", "Channel C"]);
        assert_eq!(names(editor.members()), ["Channel B"]);
        assert_eq!(editor.selection(), Selection::Idle);
    }

    #[test]
    fn test_add_selected_channel() {
        let mut editor = MembershipEditor::new(zone(vec![]), universe());

        assert!(editor.select(Side::Available, 1));
        assert!(editor.add());

        assert_eq!(names(editor.members()), ["Channel A"]);
        assert_eq!(names(&editor.available()), ["Channel B", "Channel C"]);
        assert_eq!(
            editor.selection(),
            Selection::Selected {
                side: Side::Members,
                id: 1
            }
        );
    }

    #[test]
    fn test_add_requires_available_selection() {
        let mut editor = MembershipEditor::new(zone(vec![channel(2, "Channel B")]), universe());

        assert!(!editor.add());
        assert!(editor.select(Side::Members, 2));
        assert!(!editor.add());
        assert_eq!(names(editor.members()), ["Channel B"]);
    }

    #[test]
    fn test_select_rejects_wrong_side() {
        let mut editor = MembershipEditor::new(zone(vec![channel(2, "Channel B")]), universe());

        assert!(!editor.select(Side::Available, 2));
        assert!(!editor.select(Side::Members, 1));
        assert!(!editor.select(Side::Available, 9));
        assert_eq!(editor.selection(), Selection::Idle);
    }

    #[test]
    fn test_reorder_selected_member() {
        let mut editor = MembershipEditor::new(
            zone(vec![channel(1, "A"), channel(2, "B")]),
            universe(),
        );

        editor.select(Side::Members, 2);
        assert!(editor.move_up());
        assert_eq!(names(editor.members()), ["B", "A"]);

        // Already first.
        assert!(!editor.move_up());

        assert!(editor.move_down());
        assert_eq!(names(editor.members()), ["A", "B"]);
    }

    #[test]
    fn test_remove_returns_to_idle() {
        let mut editor = MembershipEditor::new(
            zone(vec![channel(1, "Channel A"), channel(3, "Channel C")]),
            universe(),
        );

        editor.select(Side::Members, 1);
        assert!(editor.remove());

        assert_eq!(names(editor.members()), ["Channel C"]);
        assert_eq!(names(&editor.available()), ["Channel A", "Channel B"]);
        assert_eq!(editor.selection(), Selection::Idle);
        assert!(!editor.remove());
    }

    #[test]
    fn test_save_notifies_once_per_change() {
        let saved = Arc::new(Mutex::new(vec![]));
        let sink = saved.clone();

        let notify = move |zone: &Zone| sink.lock().unwrap().push(membership::ids(&zone.channels));
        let mut editor = MembershipEditor::new(zone(vec![]), universe()).on_change(notify);

        assert_eq!(editor.save(), None);

        editor.select(Side::Available, 3);
        editor.add();
        editor.select(Side::Available, 1);
        editor.add();
        assert!(editor.is_dirty());

        let zone = editor.save().unwrap();
        assert_eq!(membership::ids(&zone.channels), [3, 1]);
        assert!(!editor.is_dirty());
        assert_eq!(editor.save(), None);

        assert_eq!(*saved.lock().unwrap(), vec![vec![3, 1]]);
    }

    #[test]
    fn test_revert_discards_staged_changes() {
        let mut editor = MembershipEditor::new(zone(vec![channel(2, "Channel B")]), universe());

        editor.select(Side::Available, 1);
        editor.add();
        editor.revert();

        assert_eq!(names(editor.members()), ["Channel B"]);
        assert!(!editor.is_dirty());
        assert_eq!(editor.selection(), Selection::Idle);
    }

    #[test]
    fn test_shrinking_universe_clears_stale_selection() {
        let mut editor = MembershipEditor::new(zone(vec![]), universe());

        editor.select(Side::Available, 3);
        editor.set_universe(vec![channel(1, "Channel A")]);

        assert_eq!(editor.selection(), Selection::Idle);
        assert_eq!(names(&editor.available()), ["Channel A"]);
    }
}
