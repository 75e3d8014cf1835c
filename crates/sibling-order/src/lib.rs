//! Sibling Order
//!
//! Position arithmetic for one sibling group.
//! Positions are 1-based and dense: a group of N members holds exactly 1..=N.

use thiserror::Error;

/// Anything that carries a position inside its sibling group
pub trait Positioned {
    fn position(&self) -> i32;
    fn set_position(&mut self, position: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    /// Insert target outside 1..=N+1
    #[error("position {position} is outside 1..={max}")]
    InvalidPosition { position: i32, max: i32 },
}

/// Check that `at` is a valid insert slot for a group of `len` members.
pub fn check_insert_position(len: usize, at: i32) -> Result<(), PositionError> {
    let max = len as i32 + 1;
    if at < 1 || at > max {
        return Err(PositionError::InvalidPosition { position: at, max });
    }
    Ok(())
}

/// Make room for a new member at `at`: every position >= `at` moves down by one.
pub fn shift_for_insert<T: Positioned>(group: &mut [T], at: i32) -> Result<(), PositionError> {
    check_insert_position(group.len(), at)?;
    for member in group.iter_mut().filter(|m| m.position() >= at) {
        let next = member.position() + 1;
        member.set_position(next);
    }
    Ok(())
}

/// Close the gap left at `removed`: every position > `removed` moves up by one.
pub fn shift_for_remove<T: Positioned>(group: &mut [T], removed: i32) {
    for member in group.iter_mut().filter(|m| m.position() > removed) {
        let prev = member.position() - 1;
        member.set_position(prev);
    }
}

/// Assign position = index + 1 in the given order.
pub fn renumber<T: Positioned>(group: &mut [T]) {
    for (index, member) in group.iter_mut().enumerate() {
        member.set_position(index as i32 + 1);
    }
}

/// Remove the element at `from` and reinsert it at `to`.
///
/// Returns `false` and leaves `items` untouched when either index is out of range.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let moved = items.remove(from);
        items.insert(to, moved);
    }
    true
}

/// True when the group's positions are exactly {1..N}, in any order.
pub fn is_dense<T: Positioned>(group: &[T]) -> bool {
    let mut seen = vec![false; group.len()];
    for member in group {
        let pos = member.position();
        if pos < 1 || pos as usize > group.len() {
            return false;
        }
        let slot = &mut seen[pos as usize - 1];
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}
