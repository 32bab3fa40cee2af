//! Ordered membership of zones and scan lists.
//!
//! A membership is an ordered sequence of members without duplicate ids. The
//! set of members that could still be added is never stored; it is derived
//! from the universe with [`partition`]. Every mutation returns a fresh
//! sequence and leaves its input untouched, so callers can compare the old
//! and new membership to detect changes.

use std::collections::HashSet;

use crate::{Id, Member};

/// Returns the members of `universe` that are not part of `membership`, in
/// the order of `universe`.
///
/// Ids in `membership` that do not exist in `universe` are ignored.
pub fn partition<T: Member + Clone, M: Member>(universe: &[T], membership: &[M]) -> Vec<T> {
    let members = membership.iter().map(Member::id).collect::<HashSet<_>>();

    universe
        .iter()
        .filter(|item| !members.contains(&item.id()))
        .cloned()
        .collect()
}

pub fn contains<T: Member>(membership: &[T], id: Id) -> bool {
    position(membership, id).is_some()
}

fn position<T: Member>(membership: &[T], id: Id) -> Option<usize> {
    membership.iter().position(|member| member.id() == id)
}

/// Appends `item` unless a member with the same id is already present.
pub fn add<T: Member + Clone>(membership: &[T], item: &T) -> Vec<T> {
    let mut members = membership.to_vec();

    if !contains(membership, item.id()) {
        members.push(item.clone());
    }

    members
}

pub fn remove<T: Member + Clone>(membership: &[T], id: Id) -> Vec<T> {
    membership
        .iter()
        .filter(|member| member.id() != id)
        .cloned()
        .collect()
}

/// Swaps the member with its predecessor. The first member stays in place.
pub fn move_up<T: Member + Clone>(membership: &[T], id: Id) -> Vec<T> {
    let mut members = membership.to_vec();

    if let Some(index) = position(membership, id).filter(|index| *index > 0) {
        members.swap(index - 1, index);
    }

    members
}

/// Swaps the member with its successor. The last member stays in place.
pub fn move_down<T: Member + Clone>(membership: &[T], id: Id) -> Vec<T> {
    let mut members = membership.to_vec();

    if let Some(index) = position(membership, id).filter(|index| index + 1 < membership.len()) {
        members.swap(index, index + 1);
    }

    members
}

/// Builds a membership from a requested id order, resolving each id against
/// `universe`. Duplicates collapse onto their first occurrence; unknown ids
/// are returned separately.
pub fn resolve<T: Member + Clone>(universe: &[T], ids: &[Id]) -> (Vec<T>, Vec<Id>) {
    ids.iter()
        .fold((vec![], vec![]), |(members, mut unknown), id| {
            match universe.iter().find(|item| item.id() == *id) {
                Some(item) => (add(&members, item), unknown),
                None => {
                    unknown.push(*id);
                    (members, unknown)
                }
            }
        })
}

pub fn ids<T: Member>(membership: &[T]) -> Vec<Id> {
    membership.iter().map(Member::id).collect()
}
