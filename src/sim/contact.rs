//! Ball/peg contact tracking
//!
//! The collector drains rapier's event channel for one world; the tracker is the
//! long-lived touching set the renderer reads for peg glow.

use std::collections::{BTreeMap, BTreeSet};

use rapier2d::crossbeam::channel::{Receiver, unbounded};
use rapier2d::prelude::*;
use serde::Serialize;

use super::world::BodyTag;

/// Begin/end of contact between the ball and one peg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegContact {
    Began(u32),
    Ended(u32),
}

impl PegContact {
    pub fn peg_id(&self) -> u32 {
        match *self {
            PegContact::Began(id) | PegContact::Ended(id) => id,
        }
    }
}

/// Receives rapier's collision events for one world and keeps the ball/peg ones
pub struct ContactCollector {
    events: ChannelEventCollector,
    collisions: Receiver<CollisionEvent>,
    // Contact force events are never enabled; the receiver only keeps the channel open
    _forces: Receiver<ContactForceEvent>,
}

impl Default for ContactCollector {
    fn default() -> Self {
        let (collision_send, collisions) = unbounded();
        let (force_send, forces) = unbounded();
        Self {
            events: ChannelEventCollector::new(collision_send, force_send),
            collisions,
            _forces: forces,
        }
    }
}

impl ContactCollector {
    /// Event handler to pass to the physics step
    pub fn handler(&self) -> &ChannelEventCollector {
        &self.events
    }

    /// Peg id when one collider is the ball and the other a peg
    fn peg_pair(colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle) -> Option<u32> {
        let tag = |h: ColliderHandle| {
            colliders
                .get(h)
                .and_then(|c| BodyTag::from_user_data(c.user_data))
        };
        match (tag(a)?, tag(b)?) {
            (BodyTag::Ball, BodyTag::Peg(id)) | (BodyTag::Peg(id), BodyTag::Ball) => Some(id),
            _ => None,
        }
    }

    /// Ball/peg contact changes since the last drain, in event order
    pub fn drain(&self, colliders: &ColliderSet) -> Vec<PegContact> {
        self.collisions
            .try_iter()
            .filter_map(|event| match event {
                CollisionEvent::Started(a, b, _) => {
                    Self::peg_pair(colliders, a, b).map(PegContact::Began)
                }
                CollisionEvent::Stopped(a, b, _) => {
                    Self::peg_pair(colliders, a, b).map(PegContact::Ended)
                }
            })
            .collect()
    }
}

/// Pegs currently touching the ball and when each was last hit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactTracker {
    touching: BTreeSet<u32>,
    /// Host clock (ms) of the latest contact start per peg
    last_touch: BTreeMap<u32, f64>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, contact: PegContact, now_ms: f64) {
        match contact {
            PegContact::Began(id) => {
                self.touching.insert(id);
                self.last_touch.insert(id, now_ms);
            }
            PegContact::Ended(id) => {
                self.touching.remove(&id);
            }
        }
    }

    pub fn record_all(&mut self, contacts: impl IntoIterator<Item = PegContact>, now_ms: f64) {
        for contact in contacts {
            self.record(contact, now_ms);
        }
    }

    /// Forget live contacts (the world is gone); keep timestamps for fade-out
    pub fn release_all(&mut self) {
        self.touching.clear();
    }

    pub fn touching(&self) -> &BTreeSet<u32> {
        &self.touching
    }

    pub fn is_touching(&self, id: u32) -> bool {
        self.touching.contains(&id)
    }

    pub fn last_touch(&self, id: u32) -> Option<f64> {
        self.last_touch.get(&id).copied()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
