// Copyright 2024 Dell DRAC driver contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Periodic task reconciling outstanding RAID configuration jobs.
//!
//! Generalizes the teacher's single-resource `Waiter` poll loop (see
//! `common/waiter.rs`) into a fan-out over every node with tracked jobs.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::error::{ErrorKind, Result};
use crate::job;
use crate::node::{NodeFilter, NodeLocker, NodeMutator, NodeSource};
use crate::raid::list_virtual_disks;
use crate::wsman::{Client, Transport};

/// Name fragment identifying a DRAC-family driver in `NodeSummary::driver`.
const DRAC_DRIVER_MARKER: &str = "drac";

/// Builds a WS-MAN `Client` for a node, given its id. Production code backs
/// this with a lookup into the node's stored credentials; tests inject a
/// fixed client.
#[async_trait::async_trait]
pub trait ClientFactory<T: Transport>: Send + Sync {
    /// Produce a client for `node_id`.
    async fn client_for(&self, node_id: &str) -> Result<Client<T>>;
}

/// Builds a `NodeMutator` handle for a node, given its id.
#[async_trait::async_trait]
pub trait NodeMutatorFactory<N: NodeMutator>: Send + Sync {
    /// Produce a mutator handle for `node_id`.
    async fn mutator_for(&self, node_id: &str) -> Result<N>;
}

/// Run a single reconciliation tick over every eligible node.
pub async fn tick<T, N, CF, MF>(
    source: &dyn NodeSource,
    locker: &dyn NodeLocker,
    clients: &CF,
    mutators: &MF,
) where
    T: Transport,
    N: NodeMutator,
    CF: ClientFactory<T>,
    MF: NodeMutatorFactory<N>,
{
    let candidates = match source
        .list_candidates(NodeFilter {
            reserved: Some(false),
            maintenance: Some(false),
        })
        .await
    {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("Reconciler could not list candidate nodes: {}", e);
            return;
        }
    };

    // Nodes are reconciled independently of one another, so fan the tick out
    // across all eligible candidates rather than waiting on them in sequence.
    let reconciliations = candidates.into_iter().filter_map(|summary| {
        if !summary.driver.to_lowercase().contains(DRAC_DRIVER_MARKER) {
            return None;
        }

        let job_ids = summary.driver_internal_info.raid_config_job_ids();
        if job_ids.is_empty() {
            return None;
        }

        Some(async move {
            let result = reconcile_one(&summary.id, &job_ids, locker, clients, mutators).await;
            (summary.id, result)
        })
    });

    for (node_id, result) in join_all(reconciliations).await {
        if let Err(e) = result {
            match e.kind() {
                ErrorKind::NodeNotFound => {
                    info!("Node {} was not found during reconciliation, presumed deleted", node_id);
                }
                ErrorKind::NodeLocked => {
                    info!("Node {} was locked during reconciliation, skipping this tick", node_id);
                }
                _ => {
                    warn!("Reconciliation failed for node {}: {}", node_id, e);
                }
            }
        }
    }
}

async fn reconcile_one<T, N, CF, MF>(
    node_id: &str,
    job_ids: &[String],
    locker: &dyn NodeLocker,
    clients: &CF,
    mutators: &MF,
) -> Result<()>
where
    T: Transport,
    N: NodeMutator,
    CF: ClientFactory<T>,
    MF: NodeMutatorFactory<N>,
{
    let _guard = locker.acquire_exclusive(node_id).await?;

    let client = clients.client_for(node_id).await?;
    let mut node = mutators.mutator_for(node_id).await?;

    for job_id in job_ids {
        let fetched = match job::get_job(&client, job_id).await {
            Ok(j) => j,
            Err(e) => {
                warn!("Could not fetch job {} for node {}: {}", job_id, node_id, e);
                continue;
            }
        };

        match fetched.state.as_str() {
            "Completed" => {
                let disks = list_virtual_disks(&client).await?;
                let mut properties = node.properties();
                properties.set_logical_disks(&disks)?;
                node.set_properties(properties);

                let mut info = node.driver_internal_info();
                info.remove_raid_config_job_id(job_id);
                node.set_driver_internal_info(info);

                node.save().await?;
                debug!("Job {} completed for node {}, inventory refreshed", job_id, node_id);
            }
            "Failed" => {
                // The job id is deliberately NOT removed here, preserving
                // the observed upstream behavior (see DESIGN.md).
                node.set_maintenance(true, Some(fetched.message.clone()));
                node.save().await?;
                warn!(
                    "RAID configuration job {} failed for node {}: {}. Node set to maintenance.",
                    job_id, node_id, fetched.message
                );
            }
            _ => {}
        }
    }

    Ok(())
}

/// A running reconciler loop; dropping the handle stops the loop.
pub struct Reconciler {
    handle: JoinHandle<()>,
}

impl Reconciler {
    /// Spawn a reconciler ticking every `interval`, using the given
    /// collaborators. Stops when the returned handle is dropped.
    pub fn spawn<T, N, CF, MF>(
        interval: Duration,
        source: Arc<dyn NodeSource>,
        locker: Arc<dyn NodeLocker>,
        clients: Arc<CF>,
        mutators: Arc<MF>,
    ) -> Reconciler
    where
        T: Transport + 'static,
        N: NodeMutator + 'static,
        CF: ClientFactory<T> + 'static,
        MF: NodeMutatorFactory<N> + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                tick(source.as_ref(), locker.as_ref(), clients.as_ref(), mutators.as_ref()).await;
            }
        });
        Reconciler { handle }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::test::{MemoryLocker, MemoryNode};
    use crate::node::NodeSummary;
    use crate::wsman::client::test::FakeTransport;
    use crate::wsman::Endpoint;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn endpoint() -> Endpoint {
        Endpoint {
            url: "https://drac.example.test/wsman".into(),
            username: "root".into(),
            password: "calvin".into(),
            verify_ca: false,
        }
    }

    struct FixedSource(Vec<NodeSummary>);

    #[async_trait::async_trait]
    impl NodeSource for FixedSource {
        async fn list_candidates(&self, _filter: NodeFilter) -> Result<Vec<NodeSummary>> {
            Ok(self
                .0
                .iter()
                .map(|n| NodeSummary {
                    id: n.id.clone(),
                    driver: n.driver.clone(),
                    driver_internal_info: n.driver_internal_info.clone(),
                })
                .collect())
        }
    }

    struct FixedClients(Mutex<Option<Client<FakeTransport>>>);

    #[async_trait::async_trait]
    impl ClientFactory<FakeTransport> for FixedClients {
        async fn client_for(&self, _node_id: &str) -> Result<Client<FakeTransport>> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| crate::error::Error::bare(ErrorKind::ClientError))
        }
    }

    struct FixedMutators(HashMap<String, MemoryNode>);

    #[async_trait::async_trait]
    impl NodeMutatorFactory<MemoryNode> for FixedMutators {
        async fn mutator_for(&self, node_id: &str) -> Result<MemoryNode> {
            Ok(self.0.get(node_id).unwrap().clone())
        }
    }

    const JOB_COMPLETED: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item><InstanceID>J1</InstanceID><Name>RAID.Integrated.1-1</Name><JobStatus>Completed</JobStatus><Message>done</Message></Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const EMPTY: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y"></wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const JOB_FAILED: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item><InstanceID>J1</InstanceID><Name>RAID.Integrated.1-1</Name><JobStatus>Failed</JobStatus><Message>boom</Message></Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    fn summary(id: &str, job_ids: &[&str]) -> NodeSummary {
        let mut info = crate::node::DriverInternalInfo::default();
        for j in job_ids {
            info.push_raid_config_job_id(*j);
        }
        NodeSummary {
            id: id.to_string(),
            driver: "pxe_drac".to_string(),
            driver_internal_info: info,
        }
    }

    #[tokio::test]
    async fn test_tick_completed_job_removes_id_and_saves_once() {
        let transport = FakeTransport::new(vec![JOB_COMPLETED, EMPTY]);
        let client = Client::with_transport(endpoint(), transport);

        let source = FixedSource(vec![summary("n1", &["J1"])]);
        let locker = MemoryLocker::new(vec![]);
        let clients = FixedClients(Mutex::new(Some(client)));
        let mut nodes = HashMap::new();
        nodes.insert("n1".to_string(), MemoryNode::new("n1").with_job_ids(&["J1"]));
        let mutators = FixedMutators(nodes);

        tick(&source, &locker, &clients, &mutators).await;

        let node = mutators.0.get("n1").unwrap();
        assert!(node.driver_internal_info().raid_config_job_ids().is_empty());
        assert_eq!(node.save_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_failed_job_sets_maintenance_and_keeps_id() {
        let transport = FakeTransport::new(vec![JOB_FAILED]);
        let client = Client::with_transport(endpoint(), transport);

        let source = FixedSource(vec![summary("n1", &["J1"])]);
        let locker = MemoryLocker::new(vec![]);
        let clients = FixedClients(Mutex::new(Some(client)));
        let mut nodes = HashMap::new();
        nodes.insert("n1".to_string(), MemoryNode::new("n1").with_job_ids(&["J1"]));
        let mutators = FixedMutators(nodes);

        tick(&source, &locker, &clients, &mutators).await;

        let node = mutators.0.get("n1").unwrap();
        assert_eq!(node.last_error(), Some("boom".to_string()));
        assert_eq!(node.driver_internal_info().raid_config_job_ids(), vec!["J1".to_string()]);
    }

    #[tokio::test]
    async fn test_tick_skips_locked_node_without_mutation() {
        let source = FixedSource(vec![summary("n1", &["J1"])]);
        let locker = MemoryLocker::new(vec!["n1".to_string()]);
        let clients = FixedClients(Mutex::new(None));
        let mut nodes = HashMap::new();
        nodes.insert("n1".to_string(), MemoryNode::new("n1").with_job_ids(&["J1"]));
        let mutators = FixedMutators(nodes);

        tick(&source, &locker, &clients, &mutators).await;

        let node = mutators.0.get("n1").unwrap();
        assert_eq!(node.save_count(), 0);
        assert_eq!(node.driver_internal_info().raid_config_job_ids(), vec!["J1".to_string()]);
    }

    #[tokio::test]
    async fn test_tick_skips_non_drac_driver() {
        let mut s = summary("n1", &["J1"]);
        s.driver = "agent".to_string();
        let source = FixedSource(vec![s]);
        let locker = MemoryLocker::new(vec![]);
        let clients = FixedClients(Mutex::new(None));
        let mut nodes = HashMap::new();
        nodes.insert("n1".to_string(), MemoryNode::new("n1").with_job_ids(&["J1"]));
        let mutators = FixedMutators(nodes);

        tick(&source, &locker, &clients, &mutators).await;

        let node = mutators.0.get("n1").unwrap();
        assert_eq!(node.save_count(), 0);
    }
}
