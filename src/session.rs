// 🎞️ Animation Sessions
// One animation controller per viewer, keyed by UUID

use crate::animation::{AnimationController, AnimationFrame};
use crate::config::ServerSettings;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

struct Session {
    controller: AnimationController,
    last_seen: DateTime<Utc>,
}

/// Play state is per viewer; two browsers on the same server must not
/// pause each other.
///
/// Idle sessions are dropped when new ones are registered, and the registry
/// never holds more than `max_sessions`: the least recently seen session is
/// evicted first. A viewer whose session went away can resume it with
/// [`with_session_or_resume`].
///
/// [`with_session_or_resume`]: SessionRegistry::with_session_or_resume
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Session>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, max_sessions: usize) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        Ok(Self::new(settings.session_idle_ttl()?, settings.max_sessions))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        // controllers stay valid across a panic
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `controller` under a fresh id
    pub fn create(&self, controller: AnimationController) -> (Uuid, AnimationFrame) {
        self.create_at(controller, Utc::now())
    }

    fn create_at(&self, controller: AnimationController, now: DateTime<Utc>) -> (Uuid, AnimationFrame) {
        let id = Uuid::new_v4();
        let frame = controller.frame();

        let mut sessions = self.lock();
        self.insert(&mut sessions, id, controller, now);
        debug!(session = %id, "animation session created");
        (id, frame)
    }

    fn insert(
        &self,
        sessions: &mut HashMap<Uuid, Session>,
        id: Uuid,
        controller: AnimationController,
        now: DateTime<Utc>,
    ) {
        self.make_room(sessions, now);
        sessions.insert(
            id,
            Session {
                controller,
                last_seen: now,
            },
        );
    }

    /// Drop idle sessions, then evict the least recently seen ones until
    /// one more fits
    fn make_room(&self, sessions: &mut HashMap<Uuid, Session>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| now - s.last_seen <= self.idle_ttl);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "idle animation sessions dropped");
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            debug!(session = %oldest, "session limit reached; evicted least recently seen");
        }
    }

    /// Run `f` against the session's controller; `None` if the id is unknown
    pub fn with_session<T>(&self, id: &Uuid, f: impl FnOnce(&mut AnimationController) -> T) -> Option<T> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(id)?;
        session.last_seen = Utc::now();
        Some(f(&mut session.controller))
    }

    /// Like [`with_session`], but an unknown id is re-registered with the
    /// controller from `resume` before `f` runs.
    ///
    /// [`with_session`]: SessionRegistry::with_session
    pub fn with_session_or_resume<T>(
        &self,
        id: Uuid,
        resume: impl FnOnce() -> AnimationController,
        f: impl FnOnce(&mut AnimationController) -> T,
    ) -> T {
        let now = Utc::now();
        let mut sessions = self.lock();
        if !sessions.contains_key(&id) {
            self.make_room(&mut sessions, now);
            debug!(session = %id, "animation session resumed");
        }

        let session = sessions.entry(id).or_insert_with(|| Session {
            controller: resume(),
            last_seen: now,
        });
        session.last_seen = now;
        f(&mut session.controller)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::YearRange;

    fn range() -> YearRange {
        YearRange::new((2016..=2022).collect()).unwrap()
    }

    fn controller() -> AnimationController {
        AnimationController::new(range())
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new(Duration::hours(1), 10);
        let (a, _) = registry.create(controller());
        let (b, _) = registry.create(controller());

        registry.with_session(&a, |c| c.toggle(Some(1))).unwrap();
        let a_frame = registry.with_session(&a, |c| c.tick(2016)).unwrap();
        let b_frame = registry.with_session(&b, |c| c.tick(2016)).unwrap();

        assert_eq!(a_frame, AnimationFrame { year: 2017, playing: true });
        assert_eq!(b_frame, AnimationFrame { year: 2016, playing: false });
    }

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::new(Duration::hours(1), 10);
        assert!(registry.with_session(&Uuid::new_v4(), |c| c.frame()).is_none());
    }

    #[test]
    fn test_idle_sessions_expire_on_create() {
        let registry = SessionRegistry::new(Duration::minutes(30), 10);
        let start = Utc::now();

        let (old, _) = registry.create_at(controller(), start);
        let (_fresh, frame) = registry.create_at(controller(), start + Duration::hours(2));

        assert_eq!(frame.year, 2016);
        assert_eq!(registry.len(), 1);
        assert!(registry.with_session(&old, |c| c.frame()).is_none());
    }

    #[test]
    fn test_expired_session_resumes_with_play_flag() {
        let registry = SessionRegistry::new(Duration::minutes(60), 10);
        let start = Utc::now() - Duration::hours(3);

        let (old, _) = registry.create_at(controller(), start);
        registry.create(controller());
        assert!(registry.with_session(&old, |c| c.toggle(Some(1))).is_none());

        let frame = registry.with_session_or_resume(
            old,
            || AnimationController::resumed(range(), true),
            |c| c.tick(2018),
        );
        assert_eq!(frame, AnimationFrame { year: 2019, playing: true });

        // resumed under the same id; later calls find it
        let frame = registry.with_session(&old, |c| c.toggle(Some(2))).unwrap();
        assert!(!frame.playing);
    }

    #[test]
    fn test_live_session_ignores_resume() {
        let registry = SessionRegistry::new(Duration::hours(1), 10);
        let (id, _) = registry.create(controller());
        registry.with_session(&id, |c| c.toggle(Some(1)));

        let frame = registry.with_session_or_resume(
            id,
            || AnimationController::resumed(range(), false),
            |c| c.frame(),
        );
        assert!(frame.playing);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_count_is_capped() {
        let registry = SessionRegistry::new(Duration::hours(1), 3);
        let start = Utc::now();

        let (first, _) = registry.create_at(controller(), start);
        let (second, _) = registry.create_at(controller(), start + Duration::seconds(1));
        registry.create_at(controller(), start + Duration::seconds(2));
        registry.create_at(controller(), start + Duration::seconds(3));

        assert_eq!(registry.len(), 3);
        assert!(registry.with_session(&first, |c| c.frame()).is_none());
        assert!(registry.with_session(&second, |c| c.frame()).is_some());

        for i in 0..50 {
            registry.create_at(controller(), start + Duration::seconds(10 + i));
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_from_settings() {
        let settings = ServerSettings {
            max_sessions: 2,
            ..ServerSettings::default()
        };
        let registry = SessionRegistry::from_settings(&settings).unwrap();
        assert_eq!(registry.idle_ttl, Duration::hours(1));
        assert_eq!(registry.max_sessions, 2);
    }
}
