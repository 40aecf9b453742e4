//! Fixed set of links managed together.
//!
//! Members are index-addressed in construction order and never added or
//! removed afterwards. Aggregate operations walk the members in order and
//! report per-index results.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parklink_core::DeviceEndpoint;
use parklink_core::constants::DEFAULT_ACTIVATION_PAUSE_MS;
use parklink_protocol::StatusSnapshot;
use tracing::info;

use crate::events::LinkEventSink;
use crate::link::{DeviceLink, LinkConfig};

/// Configuration for a pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pause between consecutive activations in [`LinkPool::activate_all`]
    pub activation_pause: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            activation_pause: Duration::from_millis(DEFAULT_ACTIVATION_PAUSE_MS),
        }
    }
}

/// Ordered, fixed-size collection of links.
#[derive(Debug)]
pub struct LinkPool {
    links: Vec<DeviceLink>,
    config: PoolConfig,
}

impl LinkPool {
    pub fn new(links: Vec<DeviceLink>, config: PoolConfig) -> Self {
        Self { links, config }
    }

    /// One link per endpoint, all sharing `link_config` and `events`.
    pub fn from_endpoints(
        endpoints: impl IntoIterator<Item = DeviceEndpoint>,
        link_config: LinkConfig,
        config: PoolConfig,
        events: Option<Arc<dyn LinkEventSink>>,
    ) -> Self {
        let links = endpoints
            .into_iter()
            .map(|endpoint| {
                let link = DeviceLink::with_config(endpoint, link_config.clone());
                match &events {
                    Some(events) => link.with_events(Arc::clone(events)),
                    None => link,
                }
            })
            .collect();
        Self::new(links, config)
    }

    /// Activate every member in index order, pausing between members.
    pub async fn activate_all(&mut self) -> BTreeMap<usize, bool> {
        let mut results = BTreeMap::new();
        let count = self.links.len();
        for (index, link) in self.links.iter_mut().enumerate() {
            results.insert(index, link.activate().await);
            if index + 1 < count {
                tokio::time::sleep(self.config.activation_pause).await;
            }
        }
        info!(
            connected = results.values().filter(|&&ok| ok).count(),
            total = count,
            "Pool activated"
        );
        results
    }

    pub fn deactivate_all(&mut self) {
        for link in &mut self.links {
            link.deactivate();
        }
    }

    /// Check every active member; inactive members report `false` without a
    /// network call.
    pub async fn check_all(&mut self) -> BTreeMap<usize, bool> {
        let mut results = BTreeMap::new();
        for (index, link) in self.links.iter_mut().enumerate() {
            let ok = if link.is_active() {
                link.check_connection().await
            } else {
                false
            };
            results.insert(index, ok);
        }
        results
    }

    pub async fn fetch_all_statuses(&mut self) -> BTreeMap<usize, Option<StatusSnapshot>> {
        let mut results = BTreeMap::new();
        for (index, link) in self.links.iter_mut().enumerate() {
            results.insert(index, link.fetch_status().await);
        }
        results
    }

    /// Bounds-checked lookup. Negative and out-of-range indices yield `None`.
    ///
    /// ```
    /// use parklink_network::{LinkPool, PoolConfig};
    ///
    /// let pool = LinkPool::new(Vec::new(), PoolConfig::default());
    /// assert!(pool.get(-1).is_none());
    /// assert!(pool.get(0).is_none());
    /// ```
    pub fn get<I: TryInto<usize>>(&self, index: I) -> Option<&DeviceLink> {
        self.links.get(index.try_into().ok()?)
    }

    pub fn get_mut<I: TryInto<usize>>(&mut self, index: I) -> Option<&mut DeviceLink> {
        self.links.get_mut(index.try_into().ok()?)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceLink> {
        self.links.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceLink> {
        self.links.iter_mut()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}
