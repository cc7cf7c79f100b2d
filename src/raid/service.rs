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

//! RAID virtual-disk mutators and the `create_configuration` planner driver.

use log::{debug, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::job;
use crate::node::{NodeLocker, NodeMutator};
use crate::wsman::constants::{resource_uri, DCIM_RAID_SERVICE, RET_CREATED, RET_SUCCESS};
use crate::wsman::{Client, Property, Selector, Transport};

use super::inventory;
use super::planner::{plan, PlannedVirtualDisk};

/// Required/optional keys for `create_virtual_disk`, as invoked directly
/// (outside of the planner) by a vendor-passthru caller.
#[derive(Debug, Clone)]
pub struct CreateVirtualDiskArgs {
    /// Target controller FQDD.
    pub raid_controller: String,
    /// Backing physical disk FQDDs.
    pub physical_disks: Vec<String>,
    /// Size in MB.
    pub size_mb: i64,
    /// RAID level string.
    pub raid_level: String,
    /// Optional volume name.
    pub disk_name: Option<String>,
    /// Optional span depth override.
    pub span_depth: Option<u32>,
    /// Optional span length override.
    pub span_length: Option<u32>,
}

fn validate_create_args(args: &CreateVirtualDiskArgs) -> Result<()> {
    let mut errors = Vec::new();
    if args.raid_controller.is_empty() {
        errors.push("raid_controller is required".to_string());
    }
    if args.physical_disks.is_empty() {
        errors.push("physical_disks is required".to_string());
    }
    if args.size_mb <= 0 {
        errors.push("size_mb must be positive".to_string());
    }
    if super::types::encode_raid_level(&args.raid_level).is_none() {
        errors.push(format!("unsupported raid_level {}", args.raid_level));
    }
    if !errors.is_empty() {
        return Err(Error::new(ErrorKind::InvalidParameterValue, errors.join("; ")));
    }
    Ok(())
}

/// Invoke `CreateVirtualDisk` on `DCIM_RAIDService`.
///
/// Acquires the node's exclusive lock.
pub async fn create_virtual_disk<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    args: &CreateVirtualDiskArgs,
) -> Result<()> {
    let _guard = locker.acquire_exclusive(node_id).await?;
    create_virtual_disk_impl(client, args).await
}

async fn create_virtual_disk_impl<T: Transport>(client: &Client<T>, args: &CreateVirtualDiskArgs) -> Result<()> {
    validate_create_args(args)?;

    let level_code = super::types::encode_raid_level(&args.raid_level).expect("validated above");

    let mut names = vec!["Target", "PDArray", "VirtualDiskName", "RAIDLevel", "Size"];
    let mut values = vec![
        args.raid_controller.clone(),
        args.physical_disks.join(","),
        args.disk_name.clone().unwrap_or_default(),
        level_code.to_string(),
        args.size_mb.to_string(),
    ];

    if let Some(depth) = args.span_depth {
        names.push("SpanDepth");
        values.push(depth.to_string());
    }
    if let Some(length) = args.span_length {
        names.push("SpanLength");
        values.push(length.to_string());
    }

    let mut properties = Vec::with_capacity(names.len() * 2);
    for (name, value) in names.iter().zip(values.into_iter()) {
        properties.push(Property::new("VDPropNameArray", *name));
        properties.push(Property::new("VDPropValueArray", value));
    }

    client
        .invoke(
            &resource_uri(DCIM_RAID_SERVICE),
            "CreateVirtualDisk",
            &[],
            &properties,
            &[RET_SUCCESS, RET_CREATED],
        )
        .await?;
    Ok(())
}

/// Invoke `DeleteVirtualDisk`.
///
/// Acquires the node's exclusive lock.
pub async fn delete_virtual_disk<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    virtual_disk_fqdd: &str,
) -> Result<()> {
    let _guard = locker.acquire_exclusive(node_id).await?;
    delete_virtual_disk_impl(client, virtual_disk_fqdd).await
}

async fn delete_virtual_disk_impl<T: Transport>(client: &Client<T>, virtual_disk_fqdd: &str) -> Result<()> {
    let selectors = vec![Selector::new("Target", virtual_disk_fqdd)];
    client
        .invoke(
            &resource_uri(DCIM_RAID_SERVICE),
            "DeleteVirtualDisk",
            &selectors,
            &[],
            &[RET_SUCCESS],
        )
        .await?;
    Ok(())
}

/// Commit the pending configuration on `raid_controller`, returning the new job id.
///
/// Acquires the node's exclusive lock.
pub async fn apply_pending_config<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    raid_controller: &str,
    reboot: bool,
) -> Result<String> {
    let _guard = locker.acquire_exclusive(node_id).await?;
    apply_pending_config_impl(client, raid_controller, reboot).await
}

async fn apply_pending_config_impl<T: Transport>(
    client: &Client<T>,
    raid_controller: &str,
    reboot: bool,
) -> Result<String> {
    let mut properties = vec![
        Property::new("Target", raid_controller),
        Property::new("ScheduledStartTime", "TIME_NOW"),
    ];
    if reboot {
        properties.push(Property::new("RebootJobType", "3"));
    }

    let output = client
        .invoke(
            &resource_uri(DCIM_RAID_SERVICE),
            "CreateTargetedConfigJob",
            &[],
            &properties,
            &[RET_CREATED],
        )
        .await?;

    job::extract_job_id(&output)
}

/// Discard any staged RAID configuration changes on `raid_controller`.
///
/// Acquires the node's exclusive lock.
pub async fn delete_pending_config<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    raid_controller: &str,
) -> Result<()> {
    let _guard = locker.acquire_exclusive(node_id).await?;
    delete_pending_config_impl(client, raid_controller).await
}

async fn delete_pending_config_impl<T: Transport>(client: &Client<T>, raid_controller: &str) -> Result<()> {
    let selectors = vec![Selector::new("Target", raid_controller)];
    client
        .invoke(
            &resource_uri(DCIM_RAID_SERVICE),
            "DeletePendingConfiguration",
            &selectors,
            &[],
            &[RET_SUCCESS],
        )
        .await?;
    Ok(())
}

/// Plan and execute `node.extra.target_raid_configuration` against the RAC.
///
/// Acquires the node's exclusive lock for the whole operation (planning,
/// every virtual-disk creation, and every controller commit). On any
/// WS-MAN failure while building the configuration, the node is placed into
/// maintenance mode with `last_error` recorded before the error is re-raised.
pub async fn create_configuration<T: Transport, N: NodeMutator>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node: &mut N,
    create_root_volume: bool,
    create_nonroot_volumes: bool,
    reboot: bool,
) -> Result<()> {
    let node_id = node.id().to_string();
    let _guard = locker.acquire_exclusive(&node_id).await?;

    let target = match node.target_raid_configuration() {
        Some(result) => result?,
        None => {
            debug!("Node {} has no target_raid_configuration, nothing to do", node.id());
            return Ok(());
        }
    };

    let result = run_configuration(client, &target.logical_disks, create_root_volume, create_nonroot_volumes, reboot).await;

    match result {
        Ok(job_ids) => {
            let mut info = node.driver_internal_info();
            for job_id in job_ids {
                info.push_raid_config_job_id(job_id);
            }
            node.set_driver_internal_info(info);
            node.save().await
        }
        Err(e) => {
            warn!("RAID configuration failed for node {}: {}", node.id(), e);
            node.set_maintenance(true, Some(e.to_string()));
            node.save().await?;
            Err(e)
        }
    }
}

async fn run_configuration<T: Transport>(
    client: &Client<T>,
    logical_disks: &[crate::node::LogicalDiskTarget],
    create_root_volume: bool,
    create_nonroot_volumes: bool,
    reboot: bool,
) -> Result<Vec<String>> {
    let available = inventory::list_physical_disks(client).await?;
    let (planned, controllers) = plan(logical_disks, create_root_volume, create_nonroot_volumes, &available)?;

    if planned.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "planner overwrote raid_controller to {} for all logical disks (observed upstream behavior)",
        super::planner::PLANNER_CONTROLLER_OVERWRITE
    );

    for vd in &planned {
        create_virtual_disk_from_plan(client, vd).await?;
    }

    let mut job_ids = Vec::with_capacity(controllers.len());
    for (idx, controller) in controllers.iter().enumerate() {
        let is_last = idx + 1 == controllers.len();
        let job_id = apply_pending_config_impl(client, controller, is_last && reboot).await?;
        job_ids.push(job_id);
    }

    Ok(job_ids)
}

async fn create_virtual_disk_from_plan<T: Transport>(client: &Client<T>, vd: &PlannedVirtualDisk) -> Result<()> {
    let args = CreateVirtualDiskArgs {
        raid_controller: vd.raid_controller.clone(),
        physical_disks: vd.physical_disks.clone(),
        size_mb: vd.size_mb,
        raid_level: vd.raid_level.clone(),
        disk_name: vd.volume_name.clone(),
        span_depth: Some(vd.span_depth),
        span_length: Some(vd.span_length),
    };
    create_virtual_disk_impl(client, &args).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::test::{MemoryLocker, MemoryNode};
    use crate::node::{LogicalDiskTarget, TargetRaidConfiguration};
    use crate::wsman::client::test::FakeTransport;
    use crate::wsman::Endpoint;

    fn endpoint() -> Endpoint {
        Endpoint {
            url: "https://drac.example.test/wsman".into(),
            username: "root".into(),
            password: "calvin".into(),
            verify_ca: false,
        }
    }

    const PHYSICAL_DISKS_8_READY: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item><FQDD>D0</FQDD><RAIDController>RAID.Integrated.1-1</RAIDController><MediaType>0</MediaType><BusProtocol>6</BusProtocol><SizeInBytes>536870912000</SizeInBytes><FreeSizeInBytes>536870912000</FreeSizeInBytes><Manufacturer>X</Manufacturer><Model>Y</Model><SerialNumber>S0</SerialNumber><Revision>R</Revision><PrimaryStatus>1</PrimaryStatus><RaidStatus>0</RaidStatus></Item>
          <Item><FQDD>D1</FQDD><RAIDController>RAID.Integrated.1-1</RAIDController><MediaType>0</MediaType><BusProtocol>6</BusProtocol><SizeInBytes>536870912000</SizeInBytes><FreeSizeInBytes>536870912000</FreeSizeInBytes><Manufacturer>X</Manufacturer><Model>Y</Model><SerialNumber>S1</SerialNumber><Revision>R</Revision><PrimaryStatus>1</PrimaryStatus><RaidStatus>0</RaidStatus></Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const CREATE_VD_SUCCESS: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><n:CreateVirtualDisk_OUTPUT xmlns:n="uri"><n:ReturnValue>0</n:ReturnValue></n:CreateVirtualDisk_OUTPUT></s:Body>
    </s:Envelope>"#;

    const CREATE_JOB_SUCCESS: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><n:CreateTargetedConfigJob_OUTPUT xmlns:n="uri">
        <n:ReturnValue>4096</n:ReturnValue>
        <w:Selector xmlns:w="wsman-ns" Name="InstanceID">JID_RAID_1</w:Selector>
      </n:CreateTargetedConfigJob_OUTPUT></s:Body>
    </s:Envelope>"#;

    #[tokio::test]
    async fn test_create_configuration_happy_path_appends_job_id() {
        let transport = FakeTransport::new(vec![PHYSICAL_DISKS_8_READY, CREATE_VD_SUCCESS, CREATE_JOB_SUCCESS]);
        let client = Client::with_transport(endpoint(), transport);

        let target = TargetRaidConfiguration {
            logical_disks: vec![LogicalDiskTarget {
                controller: "RAID.Integrated.1-1".into(),
                size_gb: Some(50),
                size_mb: None,
                raid_level: "1".into(),
                physical_disks: None,
                number_of_physical_disks: Some(2),
                disk_type: None,
                interface_type: None,
                volume_name: None,
                disk_name: None,
                is_root_volume: Some(true),
                span_depth: None,
                span_length: None,
            }],
        };
        let mut node = MemoryNode::new("node-1").with_target(target);
        let locker = MemoryLocker::new(vec![]);

        create_configuration(&client, &locker, &mut node, true, false, true).await.unwrap();

        assert_eq!(node.driver_internal_info().raid_config_job_ids(), vec!["JID_RAID_1"]);
        assert_eq!(node.save_count(), 1);
    }

    #[tokio::test]
    async fn test_create_configuration_absent_target_is_noop() {
        let transport = FakeTransport::new(vec![]);
        let client = Client::with_transport(endpoint(), transport);
        let mut node = MemoryNode::new("node-1");
        let locker = MemoryLocker::new(vec![]);
        create_configuration(&client, &locker, &mut node, true, true, false).await.unwrap();
        assert_eq!(node.save_count(), 0);
    }
}
