//! Rollback of partially appended decoder output.

use std::ops::{Deref, DerefMut};

/// Borrow of an output vector that truncates it back to its starting length
/// when dropped, unless [`AppendGuard::commit`] was called.
///
/// Decoders append straight into the shared arenas; an early `?` return
/// leaves the arena exactly as it was before the call.
pub struct AppendGuard<'a, T> {
    items: &'a mut Vec<T>,
    start: usize,
    committed: bool,
}

impl<'a, T> AppendGuard<'a, T> {
    pub fn new(items: &'a mut Vec<T>) -> Self {
        let start = items.len();
        Self {
            items,
            start,
            committed: false,
        }
    }

    /// Length of the vector when the guard was created.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Items appended since the guard was created.
    pub fn appended(&self) -> &[T] {
        &self.items[self.start..]
    }

    /// Same as [`AppendGuard::appended`], mutably.
    pub fn appended_mut(&mut self) -> &mut [T] {
        &mut self.items[self.start..]
    }

    /// Keep the appended items.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<T> Deref for AppendGuard<'_, T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        self.items
    }
}

impl<T> DerefMut for AppendGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        self.items
    }
}

impl<T> Drop for AppendGuard<'_, T> {
    fn drop(&mut self) {
        if !self.committed {
            self.items.truncate(self.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append_then_fail(out: &mut Vec<u32>, fail: bool) -> Result<(), ()> {
        let mut guard = AppendGuard::new(out);
        guard.push(10);
        guard.push(11);
        if fail {
            return Err(());
        }
        guard.commit();
        Ok(())
    }

    #[test]
    fn test_guard_rolls_back_on_error() {
        let mut out = vec![1, 2];
        assert!(append_then_fail(&mut out, true).is_err());
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn test_guard_keeps_committed_items() {
        let mut out = vec![1];
        assert!(append_then_fail(&mut out, false).is_ok());
        assert_eq!(out, [1, 10, 11]);
    }

    #[test]
    fn test_guard_appended_slice() {
        let mut out = vec![1, 2];
        let mut guard = AppendGuard::new(&mut out);
        guard.push(3);
        assert_eq!(guard.start(), 2);
        assert_eq!(guard.appended(), [3]);
        guard.appended_mut()[0] = 4;
        guard.commit();
        assert_eq!(out, [1, 2, 4]);
    }
}
