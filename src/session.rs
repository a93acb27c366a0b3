//! Access sessions
//!
//! One session spans one top-level `get`/`call`. It carries the binding context stack
//! (which component's dependencies are being resolved right now) and the visit counters
//! used for circular dependency detection. Sessions are passed explicitly through the
//! resolver, so a factory that calls back into the container starts its own session
//! instead of sharing state with the caller.

use crate::{DiError, Result};
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::trace;

/// Unique access session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    #[inline]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// State of one access session.
#[derive(Debug)]
pub(crate) struct Session {
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    id: SessionId,
    /// Binding context stack; the top frame names the component whose dependencies are
    /// being resolved, `None` outside any component.
    frames: Vec<Option<String>>,
    /// Identification string -> number of resolutions in progress
    visits: AHashMap<String, u32>,
}

impl Session {
    /// Start a session with an empty binding context.
    #[inline]
    pub fn new() -> Self {
        Self::seeded(None)
    }

    /// Start a session whose bottom frame is `frame`.
    ///
    /// Lazy proxies use this to resume in the context they were requested from.
    pub fn seeded(frame: Option<String>) -> Self {
        let id = SessionId::next();

        #[cfg(feature = "logging")]
        trace!(
            target: "norma_di",
            session = id.id(),
            frame = frame.as_deref(),
            "Opening access session"
        );

        Self {
            id,
            frames: vec![frame],
            visits: AHashMap::new(),
        }
    }

    /// The binding context currently in effect
    #[inline]
    pub fn frame(&self) -> Option<&str> {
        self.frames.last().and_then(|frame| frame.as_deref())
    }

    #[inline]
    pub fn push(&mut self, frame: Option<String>) {
        self.frames.push(frame);
    }

    /// Replace the top frame
    #[inline]
    pub fn set_frame(&mut self, frame: Option<String>) {
        match self.frames.last_mut() {
            Some(top) => *top = frame,
            None => self.frames.push(frame),
        }
    }

    #[inline]
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Record that resolution of `identification` starts.
    ///
    /// Fails if the same identification is already being resolved in this session.
    pub fn enter(&mut self, identification: &str, component: &str) -> Result<()> {
        let visits = self.visits.entry(identification.to_string()).or_insert(0);
        *visits += 1;
        if *visits > 1 {
            *visits -= 1;
            return Err(DiError::circular(component));
        }
        Ok(())
    }

    /// Record that resolution of `identification` finished.
    pub fn leave(&mut self, identification: &str) {
        if let Some(visits) = self.visits.get_mut(identification) {
            *visits -= 1;
            if *visits == 0 {
                self.visits.remove(identification);
            }
        }
    }

    #[cfg(test)]
    fn visits(&self, identification: &str) -> u32 {
        self.visits.get(identification).copied().unwrap_or(0)
    }
}

#[cfg(feature = "logging")]
impl Drop for Session {
    fn drop(&mut self) {
        trace!(
            target: "norma_di",
            session = self.id.id(),
            "Closing access session"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_unique() {
        let s1 = SessionId::next();
        let s2 = SessionId::next();
        assert_ne!(s1.id(), s2.id());
        assert!(format!("{s1}").starts_with("session-"));
    }

    #[test]
    fn test_frames() {
        let mut session = Session::new();
        assert_eq!(session.frame(), None);

        session.push(None);
        session.set_frame(Some("App|Client".into()));
        assert_eq!(session.frame(), Some("App|Client"));
        assert_eq!(session.depth(), 2);

        session.pop();
        assert_eq!(session.frame(), None);
    }

    #[test]
    fn test_seeded_session_starts_in_frame() {
        let session = Session::seeded(Some("App|Client".into()));
        assert_eq!(session.frame(), Some("App|Client"));
    }

    #[test]
    fn test_reentry_is_circular() {
        let mut session = Session::new();
        session.enter("App|A", "App|A").unwrap();
        session.enter("App|B", "App|B").unwrap();

        let err = session.enter("App|A", "App|A").unwrap_err();
        assert_eq!(err, DiError::circular("App|A"));
        assert_eq!(session.visits("App|A"), 1);
    }

    #[test]
    fn test_sequential_visits_are_not_circular() {
        let mut session = Session::new();
        session.enter("App|D", "App|D").unwrap();
        session.leave("App|D");
        session.enter("App|D", "App|D").unwrap();
        session.leave("App|D");
        assert_eq!(session.visits("App|D"), 0);
    }
}
