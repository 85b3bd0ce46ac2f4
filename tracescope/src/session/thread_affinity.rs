//! Single-owner-thread capability token
//!
//! The data manager does no locking. Instead it is bound to one thread when
//! created and every entry point checks that it is still being called there.
//! The check is a `debug_assert!`: a wrong-thread call panics in debug builds
//! and is an undiagnosed precondition violation in release builds.

use std::thread::{self, ThreadId};

/// Identity of the one thread allowed to use a session object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread
    #[must_use]
    pub fn current() -> Self {
        Self { owner: thread::current().id() }
    }

    /// Bind to a thread captured elsewhere (e.g. the UI thread's id handed to
    /// a constructor running on a loader thread)
    #[must_use]
    pub fn for_thread(owner: ThreadId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    #[track_caller]
    pub fn check(&self) {
        debug_assert!(
            self.is_owner_thread(),
            "session state accessed from {:?} but owned by {:?}",
            thread::current().id(),
            self.owner
        );
    }
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_thread_passes() {
        let affinity = ThreadAffinity::current();
        assert!(affinity.is_owner_thread());
        affinity.check();
    }

    #[test]
    fn test_other_thread_is_not_owner() {
        let affinity = ThreadAffinity::current();
        let seen_as_owner = thread::spawn(move || affinity.is_owner_thread()).join().unwrap();
        assert!(!seen_as_owner);
    }

    #[test]
    fn test_bound_to_foreign_thread() {
        let foreign = thread::spawn(|| thread::current().id()).join().unwrap();
        let affinity = ThreadAffinity::for_thread(foreign);
        assert_eq!(affinity.owner(), foreign);
        assert!(!affinity.is_owner_thread());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "session state accessed from")]
    fn test_check_panics_off_thread() {
        let foreign = thread::spawn(|| thread::current().id()).join().unwrap();
        ThreadAffinity::for_thread(foreign).check();
    }
}
