//! Shared handle enforcing a single writer with concurrent readers.
//!
//! Ingestion takes the write lock once per record batch; queries, audits
//! and serialization take the read lock, so a snapshot can be taken while
//! a pipeline is still running.

use crate::annotation::Annotation;
use crate::errors::Result;
use crate::types::InsertTally;
use crate::PrefixTree;
use ipnet::IpNet;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SharedTree {
    inner: Arc<RwLock<PrefixTree>>,
}

impl SharedTree {
    pub fn new(tree: PrefixTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn with_precision(precision: usize) -> Result<Self> {
        PrefixTree::new(precision).map(Self::new)
    }

    pub fn insert_all(&self, networks: &[IpNet], annotation: &Annotation) -> Result<InsertTally> {
        self.inner.write().insert_all(networks, annotation)
    }

    /// Most specific covering network and its annotation.
    pub fn find_network(&self, addr: IpAddr) -> Option<(IpNet, Annotation)> {
        let tree = self.inner.read();
        tree.find_network(addr)
            .map(|n| (n.network(), n.annotation().clone()))
    }

    pub fn closest_supernet(&self, network: &IpNet) -> Option<(IpNet, Annotation)> {
        let tree = self.inner.read();
        tree.closest_supernet(network)
            .map(|n| (n.network(), n.annotation().clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.inner.read().validate()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PrefixTree> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PrefixTree> {
        self.inner.write()
    }

    /// The tree itself, if this is the last handle.
    pub fn try_unwrap(self) -> std::result::Result<PrefixTree, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
