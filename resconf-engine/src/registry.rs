use std::{ops::Deref, sync::Arc};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use resconf_schema::{Reference, Resource, ResourceId, Schema};

/// Every committed resource, one chain per resource type
///
/// Chains are indexed by `rcode` and keep resources in commit order.
#[derive(Debug, Clone)]
pub struct Snapshot {
    chains: Vec<Vec<Resource>>,
    created: DateTime<Local>,
    next_serial: u32,
}

impl Snapshot {
    /// An empty snapshot with one chain for each type in the schema
    pub fn new(schema: &Schema) -> Self {
        Snapshot {
            chains: vec![vec![]; schema.types.len()],
            created: Local::now(),
            next_serial: 0,
        }
    }

    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    /// The resources of one type, in commit order
    pub fn chain(&self, rcode: u32) -> &[Resource] {
        self.chains
            .get(rcode as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every resource, type by type
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.chains.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.iter().all(Vec::is_empty)
    }

    pub fn find_by_name(&self, rcode: u32, name: &str) -> Option<&Resource> {
        self.chain(rcode).iter().find(|r| r.name() == Some(name))
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        let chain = self.chain(id.rcode);
        let position = chain.binary_search_by_key(&id, Resource::id).ok()?;
        chain.get(position)
    }

    /// The resource a resolved reference points at
    pub fn resolve(&self, reference: &Reference) -> Option<&Resource> {
        self.get(reference.target?)
    }

    pub(crate) fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        let chain = self.chains.get_mut(id.rcode as usize)?;
        let position = chain.binary_search_by_key(&id, Resource::id).ok()?;
        chain.get_mut(position)
    }

    /// Reserves the identity of a resource about to be parsed
    pub fn allocate_id(&mut self, rcode: u32) -> ResourceId {
        let serial = self.next_serial;
        self.next_serial += 1;
        ResourceId { rcode, serial }
    }

    /// Appends a named resource to the tail of its chain
    pub fn commit(&mut self, resource: Resource) -> Result<()> {
        let rtype = resource.resource_type();
        let Some(name) = resource.name() else {
            bail!("Name item is required in {} resource, but not found.", rtype.name);
        };
        let Some(chain) = self.chains.get_mut(rtype.rcode as usize) else {
            bail!("Resource type {} is not part of this snapshot", rtype.name);
        };
        if chain.iter().any(|r| r.name() == Some(name)) {
            bail!(
                "Attempt to define second {} resource named \"{}\" is not permitted.",
                rtype.name,
                name
            );
        }
        if chain.last().map_or(false, |last| last.id() >= resource.id()) {
            bail!("Resource {} committed out of order", name);
        }
        tracing::debug!("Committed {} \"{}\"", rtype.name, name);
        chain.push(resource);
        Ok(())
    }

    /// Removes a resource by name, returning whether one was found
    pub fn remove(&mut self, rcode: u32, name: &str) -> bool {
        let Some(chain) = self.chains.get_mut(rcode as usize) else {
            return false;
        };
        let before = chain.len();
        chain.retain(|r| r.name() != Some(name));
        chain.len() != before
    }
}

/// The live snapshot, shared between readers and the thread that reloads it
///
/// Readers take a cheap reference to the whole snapshot, so a reload never changes what an
/// in-flight reader sees.
#[derive(Debug)]
pub struct Registry {
    live: RwLock<Arc<Snapshot>>,
}

impl Registry {
    pub fn new(snapshot: Snapshot) -> Self {
        Registry {
            live: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The live snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.live.read().clone()
    }

    /// Makes a snapshot live, returning the one it replaces
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        std::mem::replace(&mut *self.live.write(), Arc::new(snapshot))
    }

    /// Detaches the live snapshot, leaving `empty` live in its place
    pub fn backup(&self, empty: Snapshot) -> Arc<Snapshot> {
        self.publish(empty)
    }

    /// Makes a previously detached snapshot live again, discarding the current one
    pub fn restore(&self, snapshot: Arc<Snapshot>) {
        *self.live.write() = snapshot;
    }

    /// Resources of one type in chain order; `None` starts at the head
    pub fn get_next(&self, rcode: u32, previous: Option<ResourceId>) -> Option<ResourceHandle> {
        let snapshot = self.snapshot();
        let chain = snapshot.chain(rcode);
        let position = match previous {
            None => 0,
            Some(id) => match chain.binary_search_by_key(&id, Resource::id) {
                Ok(position) => position + 1,
                // Removed since; carry on from where it was
                Err(position) => position,
            },
        };
        (position < chain.len()).then(|| ResourceHandle {
            snapshot: snapshot.clone(),
            rcode,
            position,
        })
    }

    pub fn get_by_name(&self, rcode: u32, name: &str) -> Option<ResourceHandle> {
        let snapshot = self.snapshot();
        let position = snapshot
            .chain(rcode)
            .iter()
            .position(|r| r.name() == Some(name))?;
        Some(ResourceHandle {
            snapshot,
            rcode,
            position,
        })
    }

    /// Removes one resource from the live snapshot
    ///
    /// Readers still holding the previous snapshot keep seeing the resource.
    pub fn remove(&self, rcode: u32, name: &str) -> bool {
        let mut live = self.live.write();
        if live.find_by_name(rcode, name).is_none() {
            return false;
        }
        let removed = Arc::make_mut(&mut *live).remove(rcode, name);
        if removed {
            tracing::debug!("Removed resource \"{}\"", name);
        }
        removed
    }
}

/// A resource together with the snapshot that holds it
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    snapshot: Arc<Snapshot>,
    rcode: u32,
    position: usize,
}

impl ResourceHandle {
    /// The snapshot this resource belongs to, for following its references
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn resolve(&self, reference: &Reference) -> Option<&Resource> {
        self.snapshot.resolve(reference)
    }
}

impl Deref for ResourceHandle {
    type Target = Resource;

    fn deref(&self) -> &Resource {
        &self.snapshot.chains[self.rcode as usize][self.position]
    }
}
