//! Lock-step state shared by lockable components.

/// Participant in a tree-wide lock-step batch that lives outside this crate,
/// such as a text layout that remeasures once its matrix is final.
pub trait LockStep: Send + Sync {
    fn lock(&mut self);
    fn prepare_for_unlock(&mut self);
    fn unlock(&mut self);
}

/// Outcome of releasing one lock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// No lock was held.
    Unbalanced,
    /// An outer lock is still held.
    Nested,
    /// The outermost lock was released.
    Final { changed: bool },
}

/// Reentrant lock counter with an optional pre-lock snapshot.
#[derive(Debug)]
pub struct LockState<T> {
    pending: u32,
    changed: bool,
    snapshot: Option<T>,
}

impl<T> Default for LockState<T> {
    fn default() -> Self {
        Self {
            pending: 0,
            changed: false,
            snapshot: None,
        }
    }
}

impl<T> LockState<T> {
    pub fn is_locked(&self) -> bool {
        self.pending > 0
    }

    /// Number of locks currently held.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Whether a change was recorded since the outermost lock.
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn snapshot(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }

    /// Take one lock level. Returns true for the outermost lock.
    pub(crate) fn acquire(&mut self) -> bool {
        self.pending += 1;
        self.pending == 1
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: T) {
        self.snapshot = Some(snapshot);
    }

    /// Record a change. Returns false when not locked so the caller notifies
    /// immediately.
    pub(crate) fn record_change(&mut self) -> bool {
        if self.pending > 0 {
            self.changed = true;
            true
        } else {
            false
        }
    }

    pub(crate) fn release(&mut self) -> Release {
        match self.pending {
            0 => Release::Unbalanced,
            1 => {
                self.pending = 0;
                self.snapshot = None;
                Release::Final {
                    changed: std::mem::take(&mut self.changed),
                }
            }
            _ => {
                self.pending -= 1;
                Release::Nested
            }
        }
    }
}
