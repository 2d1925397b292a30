//! Room Manager
//!
//! Authoritative table of active rooms. A room exists while it has at least
//! one member: the first successful `create_room` for a name brings it into
//! existence and the last member leaving destroys it.
//!
//! # Locking
//!
//! Each room name owns a slot behind its own mutex, so operations on one name
//! are serialized while operations on different names never contend. The
//! name → slot table has its own mutex, held only long enough to find, insert
//! or prune a slot. Lock order is always table, then slot.
//!
//! A slot is pruned from the table once it is vacant and no in-flight
//! operation holds a reference to it. Two operations on the same name
//! therefore always meet on the same slot.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use easel_core::{RoomName, SessionId, env::Environment};

/// Metadata about a room
#[derive(Debug, Clone)]
pub struct RoomMetadata<I> {
    /// Session that created the room
    pub creator: SessionId,
    /// When the room was created
    pub created_at: I,
}

/// An active room.
#[derive(Debug)]
struct Room<I> {
    members: HashSet<SessionId>,
    metadata: RoomMetadata<I>,
}

type Slot<I> = Arc<Mutex<Option<Room<I>>>>;

/// Outcome of a successful leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Members remaining after the leave
    pub remaining: usize,
    /// The leaving session was the last member and the room is gone
    pub destroyed: bool,
}

/// Why a create or join was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// An active room already holds the name
    #[error("room name taken: {0}")]
    RoomNameTaken(RoomName),

    /// No active room holds the name
    #[error("room not found: {0}")]
    RoomNotFound(RoomName),
}

/// Why a leave was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaveError {
    /// No active room holds the name
    #[error("room not found: {0}")]
    RoomNotFound(RoomName),

    /// Session is not a member of the room
    #[error("session {session_id} is not a member of room {room}")]
    NotAMember {
        /// Room the operation named
        room: RoomName,
        /// Session that attempted it
        session_id: SessionId,
    },
}

/// Active rooms keyed by name, serialized per name.
///
/// Generic over `I` (Instant type) to support virtual time in tests.
pub struct RoomManager<I = std::time::Instant> {
    slots: Mutex<HashMap<RoomName, Slot<I>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<I: Copy> RoomManager<I> {
    /// Create an empty RoomManager
    pub fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    /// Slot for `name`, inserting a vacant one if missing.
    fn slot_or_insert(&self, name: &RoomName) -> Slot<I> {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(name.clone()).or_insert_with(|| Arc::new(Mutex::new(None))))
    }

    /// Slot for `name`, if one is in the table.
    fn slot(&self, name: &RoomName) -> Option<Slot<I>> {
        lock(&self.slots).get(name).map(Arc::clone)
    }

    /// Remove the slot for `name` if it is vacant and nobody else holds it.
    ///
    /// Callers must drop their own slot reference first.
    fn prune(&self, name: &RoomName) {
        let mut slots = lock(&self.slots);
        let vacant = slots
            .get(name)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && lock(slot).is_none());
        if vacant {
            slots.remove(name);
        }
    }

    /// Create a room with `creator` as its sole member.
    ///
    /// Fails with [`RoomError::RoomNameTaken`] if an active room holds the
    /// name. A name whose room was destroyed can be created again.
    pub fn create_room<E: Environment<Instant = I>>(
        &self,
        name: &RoomName,
        creator: SessionId,
        env: &E,
    ) -> Result<(), RoomError> {
        let slot = self.slot_or_insert(name);
        let mut room = lock(&slot);

        if room.is_some() {
            return Err(RoomError::RoomNameTaken(name.clone()));
        }

        *room = Some(Room {
            members: HashSet::from([creator]),
            metadata: RoomMetadata { creator, created_at: env.now() },
        });

        Ok(())
    }

    /// Add `session_id` to an active room.
    ///
    /// Joining a room the session is already in succeeds without change.
    /// Returns the member count after the join.
    pub fn join_room(&self, name: &RoomName, session_id: SessionId) -> Result<usize, RoomError> {
        let Some(slot) = self.slot(name) else {
            return Err(RoomError::RoomNotFound(name.clone()));
        };

        let result = {
            let mut room = lock(&slot);
            match room.as_mut() {
                Some(room) => {
                    room.members.insert(session_id);
                    Ok(room.members.len())
                },
                None => Err(RoomError::RoomNotFound(name.clone())),
            }
        };

        if result.is_err() {
            drop(slot);
            self.prune(name);
        }

        result
    }

    /// Remove `session_id` from a room, destroying the room if it empties.
    pub fn leave_room(
        &self,
        name: &RoomName,
        session_id: SessionId,
    ) -> Result<LeaveOutcome, LeaveError> {
        let Some(slot) = self.slot(name) else {
            return Err(LeaveError::RoomNotFound(name.clone()));
        };

        let result = {
            let mut guard = lock(&slot);
            match guard.as_mut() {
                None => Err(LeaveError::RoomNotFound(name.clone())),
                Some(room) => {
                    if room.members.remove(&session_id) {
                        let remaining = room.members.len();
                        if remaining == 0 {
                            *guard = None;
                        }
                        Ok(LeaveOutcome { remaining, destroyed: remaining == 0 })
                    } else {
                        Err(LeaveError::NotAMember { room: name.clone(), session_id })
                    }
                },
            }
        };

        if !matches!(result, Ok(LeaveOutcome { destroyed: false, .. })) {
            drop(slot);
            self.prune(name);
        }

        result
    }

    fn with_room<T>(&self, name: &RoomName, f: impl FnOnce(&Room<I>) -> T) -> Option<T> {
        let slot = self.slot(name)?;
        let room = lock(&slot);
        room.as_ref().map(f)
    }

    /// Check if an active room holds `name`
    pub fn has_room(&self, name: &RoomName) -> bool {
        self.with_room(name, |_| ()).is_some()
    }

    /// Members of a room, sorted. Empty if the room does not exist.
    pub fn members(&self, name: &RoomName) -> Vec<SessionId> {
        let mut members =
            self.with_room(name, |room| room.members.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Number of members in a room. Zero if the room does not exist.
    pub fn member_count(&self, name: &RoomName) -> usize {
        self.with_room(name, |room| room.members.len()).unwrap_or(0)
    }

    /// Check if `session_id` is a member of the room
    pub fn is_member(&self, name: &RoomName, session_id: SessionId) -> bool {
        self.with_room(name, |room| room.members.contains(&session_id)).unwrap_or(false)
    }

    /// Creation metadata of an active room.
    pub fn metadata(&self, name: &RoomName) -> Option<RoomMetadata<I>> {
        self.with_room(name, |room| room.metadata.clone())
    }

    /// Active rooms with their member counts, sorted by name.
    pub fn list_rooms(&self) -> Vec<(RoomName, usize)> {
        let slots = lock(&self.slots);
        let mut rooms: Vec<_> = slots
            .iter()
            .filter_map(|(name, slot)| {
                lock(slot).as_ref().map(|room| (name.clone(), room.members.len()))
            })
            .collect();
        drop(slots);

        rooms.sort_by(|a, b| a.0.cmp(&b.0));
        rooms
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        let slots = lock(&self.slots);
        slots.values().filter(|slot| lock(slot).is_some()).count()
    }

    /// Number of slots in the name table, vacant or not.
    ///
    /// A vacant slot can outlive its room while a concurrent reader holds it.
    /// The next failed join or leave on that name prunes it.
    pub fn slot_count(&self) -> usize {
        lock(&self.slots).len()
    }
}

impl<I: Copy> Default for RoomManager<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> std::fmt::Debug for RoomManager<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager").field("slots", &lock(&self.slots).len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use easel_core::test_env::ManualEnv;

    use super::*;

    fn room(name: &str) -> RoomName {
        RoomName::new(name).expect("valid room name")
    }

    #[test]
    fn create_then_duplicate_is_taken() {
        let env = ManualEnv::default();
        let rooms = RoomManager::new();

        rooms.create_room(&room("lobby"), 1, &env).expect("first create succeeds");
        let err = rooms.create_room(&room("lobby"), 2, &env).expect_err("second create fails");

        assert_eq!(err, RoomError::RoomNameTaken(room("lobby")));
        assert_eq!(rooms.members(&room("lobby")), vec![1]);
    }

    #[test]
    fn last_leave_prunes_slot() {
        let env = ManualEnv::default();
        let rooms = RoomManager::new();

        rooms.create_room(&room("lobby"), 1, &env).expect("create");
        rooms.leave_room(&room("lobby"), 1).expect("leave");

        assert_eq!(rooms.slot_count(), 0);
        assert!(!rooms.has_room(&room("lobby")));
    }

    #[test]
    fn join_missing_room_does_not_create_it() {
        let rooms: RoomManager = RoomManager::new();

        let err = rooms.join_room(&room("lounge"), 1).expect_err("no such room");
        assert_eq!(err, RoomError::RoomNotFound(room("lounge")));
        assert_eq!(rooms.slot_count(), 0);
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn names_are_case_sensitive() {
        let env = ManualEnv::default();
        let rooms = RoomManager::new();

        rooms.create_room(&room("Lobby"), 1, &env).expect("create");
        assert!(rooms.create_room(&room("lobby"), 2, &env).is_ok());
        assert_eq!(rooms.room_count(), 2);
    }

    #[test]
    fn leave_by_non_member_is_rejected() {
        let env = ManualEnv::default();
        let rooms = RoomManager::new();

        rooms.create_room(&room("lobby"), 1, &env).expect("create");
        let err = rooms.leave_room(&room("lobby"), 9).expect_err("not a member");

        assert!(matches!(err, LeaveError::NotAMember { session_id: 9, .. }));
        assert_eq!(rooms.member_count(&room("lobby")), 1);
    }

    #[test]
    fn metadata_records_creator_and_time() {
        let env = ManualEnv::default();
        let rooms = RoomManager::new();

        let before = env.now();
        rooms.create_room(&room("lobby"), 7, &env).expect("create");
        let meta = rooms.metadata(&room("lobby")).expect("room exists");

        assert_eq!(meta.creator, 7);
        assert_eq!(meta.created_at, before);
    }
}
