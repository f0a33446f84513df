//! In-process transport
//!
//! A broker of named endpoints living on one thread. Stands in for the
//! signaling server + data channels in the native demo and in tests, with
//! optional packet loss to exercise the loose delivery model.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::transport::{Transport, TransportError, TransportEvent};
use crate::PeerId;

/// Impairment applied to every data payload
#[derive(Debug, Clone, Default)]
pub struct LinkConditions {
    /// Percentage of payloads silently dropped (0-100)
    pub loss_percent: f32,
    /// Seed for the loss dice
    pub seed: u64,
}

impl LinkConditions {
    pub fn lossy(loss_percent: f32, seed: u64) -> Self {
        Self { loss_percent, seed }
    }
}

#[derive(Debug)]
struct Broker {
    inboxes: HashMap<PeerId, VecDeque<TransportEvent>>,
    /// Open links as ordered id pairs
    links: BTreeSet<(PeerId, PeerId)>,
    conditions: LinkConditions,
    rng: Pcg32,
    dropped: u64,
}

fn link_key(a: &PeerId, b: &PeerId) -> (PeerId, PeerId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl Broker {
    fn deliver(&mut self, to: &PeerId, event: TransportEvent) {
        if let Some(inbox) = self.inboxes.get_mut(to) {
            inbox.push_back(event);
        }
    }

    fn should_drop(&mut self) -> bool {
        self.conditions.loss_percent > 0.0
            && self.rng.random::<f32>() * 100.0 < self.conditions.loss_percent
    }
}

/// Shared handle to the in-process broker
#[derive(Debug, Clone)]
pub struct LocalNetwork {
    broker: Rc<RefCell<Broker>>,
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::with_conditions(LinkConditions::default())
    }

    pub fn with_conditions(conditions: LinkConditions) -> Self {
        let rng = Pcg32::seed_from_u64(conditions.seed);
        Self {
            broker: Rc::new(RefCell::new(Broker {
                inboxes: HashMap::new(),
                links: BTreeSet::new(),
                conditions,
                rng,
                dropped: 0,
            })),
        }
    }

    /// Register an identity. Fails if it is already taken.
    pub fn endpoint(&self, id: impl Into<PeerId>) -> Result<LocalEndpoint, TransportError> {
        let id = id.into();
        let mut broker = self.broker.borrow_mut();
        if broker.inboxes.contains_key(&id) {
            return Err(TransportError::Backend(format!("id {id} is taken")));
        }
        let mut inbox = VecDeque::new();
        inbox.push_back(TransportEvent::Ready(id.clone()));
        broker.inboxes.insert(id.clone(), inbox);
        log::debug!("Local endpoint {id} registered");
        Ok(LocalEndpoint {
            id,
            broker: Rc::clone(&self.broker),
            shut: false,
        })
    }

    pub fn is_registered(&self, id: &PeerId) -> bool {
        self.broker.borrow().inboxes.contains_key(id)
    }

    /// Payloads lost to simulated impairment so far
    pub fn dropped(&self) -> u64 {
        self.broker.borrow().dropped
    }
}

/// One registered identity on a [`LocalNetwork`]
#[derive(Debug)]
pub struct LocalEndpoint {
    id: PeerId,
    broker: Rc<RefCell<Broker>>,
    shut: bool,
}

impl Transport for LocalEndpoint {
    fn local_id(&self) -> Option<&PeerId> {
        if self.shut { None } else { Some(&self.id) }
    }

    fn connect(&mut self, remote: &PeerId) {
        if self.shut {
            log::warn!("connect({remote}) after shutdown ignored");
            return;
        }
        let mut broker = self.broker.borrow_mut();
        let key = link_key(&self.id, remote);
        if broker.links.contains(&key) {
            return;
        }
        if remote == &self.id || !broker.inboxes.contains_key(remote) {
            broker.deliver(
                &self.id,
                TransportEvent::Error {
                    peer: Some(remote.clone()),
                    message: format!("could not connect to peer {remote}"),
                },
            );
            broker.deliver(&self.id, TransportEvent::Closed { peer: remote.clone() });
            return;
        }
        broker.links.insert(key);
        broker.deliver(
            &self.id,
            TransportEvent::Opened {
                peer: remote.clone(),
                inbound: false,
            },
        );
        broker.deliver(
            remote,
            TransportEvent::Opened {
                peer: self.id.clone(),
                inbound: true,
            },
        );
    }

    fn send(&mut self, remote: &PeerId, payload: &str) -> Result<(), TransportError> {
        if self.shut {
            return Err(TransportError::Shutdown);
        }
        let mut broker = self.broker.borrow_mut();
        if !broker.links.contains(&link_key(&self.id, remote)) {
            return Err(TransportError::NotConnected(remote.clone()));
        }
        if broker.should_drop() {
            broker.dropped += 1;
            return Ok(());
        }
        broker.deliver(
            remote,
            TransportEvent::Data {
                peer: self.id.clone(),
                payload: payload.to_string(),
            },
        );
        Ok(())
    }

    fn close(&mut self, remote: &PeerId) {
        let mut broker = self.broker.borrow_mut();
        if broker.links.remove(&link_key(&self.id, remote)) {
            broker.deliver(&self.id, TransportEvent::Closed { peer: remote.clone() });
            broker.deliver(remote, TransportEvent::Closed { peer: self.id.clone() });
        }
    }

    fn shutdown(&mut self) {
        if self.shut {
            return;
        }
        self.shut = true;
        let mut broker = self.broker.borrow_mut();
        let mine: Vec<_> = broker
            .links
            .iter()
            .filter(|(a, b)| a == &self.id || b == &self.id)
            .cloned()
            .collect();
        for key in mine {
            broker.links.remove(&key);
            let other = if key.0 == self.id { key.1 } else { key.0 };
            broker.deliver(&other, TransportEvent::Closed { peer: self.id.clone() });
        }
        broker.inboxes.remove(&self.id);
        log::debug!("Local endpoint {} released", self.id);
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        if self.shut {
            return Vec::new();
        }
        self.broker
            .borrow_mut()
            .inboxes
            .get_mut(&self.id)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}
