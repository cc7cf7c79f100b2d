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

//! Boot-device management: reading and changing the next-boot device.

use log::debug;

use crate::bios;
use crate::error::Result;
use crate::node::NodeLocker;
use crate::wsman::constants::{resource_uri, DCIM_BOOT_CONFIG_SETTING, DCIM_BOOT_SOURCE_SETTING, RET_SUCCESS};
use crate::wsman::{Client, Property, Selector, Transport};

/// A logical boot device, independent of the RAC's own device naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    /// Local disk.
    Disk,
    /// Network boot.
    Pxe,
    /// Optical media.
    Cdrom,
}

impl BootDevice {
    /// The substring of a `BootSourceSetting` `InstanceID` that identifies
    /// this device (e.g. `...#NIC.Integrated...`).
    fn source_marker(self) -> &'static str {
        match self {
            BootDevice::Disk => "HardDisk",
            BootDevice::Pxe => "NIC",
            BootDevice::Cdrom => "Optical",
        }
    }

    fn from_instance_id(instance_id: &str) -> Option<BootDevice> {
        if instance_id.contains("HardDisk") {
            Some(BootDevice::Disk)
        } else if instance_id.contains("NIC") {
            Some(BootDevice::Pxe)
        } else if instance_id.contains("Optical") {
            Some(BootDevice::Cdrom)
        } else {
            None
        }
    }
}

/// Current next-boot device and whether it is persistent.
#[derive(Debug, Clone)]
pub struct BootDeviceState {
    /// The logical device, or `None` if the RAC reports an unrecognized one.
    pub device: Option<BootDevice>,
    /// Whether the setting persists across one boot (`true`) or is one-time.
    pub persistent: bool,
}

const IS_NEXT_PERSISTENT: &str = "1";
const IS_NEXT_ONE_TIME: &str = "3";

/// Read the current next-boot device.
pub async fn get_boot_device<T: Transport>(client: &Client<T>) -> Result<BootDeviceState> {
    let configs = client.enumerate(&resource_uri(DCIM_BOOT_CONFIG_SETTING)).await?;

    let one_time = configs.iter().find(|c| c.find_text("IsNext") == Some(IS_NEXT_ONE_TIME));
    let persistent_entry = configs.iter().find(|c| c.find_text("IsNext") == Some(IS_NEXT_PERSISTENT));

    let (selected, persistent) = match one_time.or(persistent_entry) {
        Some(entry) => (entry, one_time.is_none()),
        None => {
            return Ok(BootDeviceState {
                device: None,
                persistent: true,
            })
        }
    };

    let instance_id = selected.find_text("InstanceID").unwrap_or_default();

    let sources = client.enumerate(&resource_uri(DCIM_BOOT_SOURCE_SETTING)).await?;
    let device = sources
        .iter()
        .find(|s| {
            s.find_text("PendingAssignedSequence") == Some("0")
                && s.find_text("BootSourceType") == Some(instance_id)
        })
        .and_then(|s| s.find_text("InstanceID"))
        .and_then(BootDevice::from_instance_id);

    Ok(BootDeviceState { device, persistent })
}

/// Change the next-boot device, if it differs from the current one.
///
/// Acquires the node's exclusive lock for the check-then-mutate sequence.
pub async fn set_boot_device<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    device: BootDevice,
    persistent: bool,
) -> Result<()> {
    let _guard = locker.acquire_exclusive(node_id).await?;

    let current = get_boot_device(client).await?;
    if current.device == Some(device) && current.persistent == persistent {
        debug!("Boot device already set to {:?} (persistent={})", device, persistent);
        return Ok(());
    }

    bios::service::check_for_config_job(client).await?;

    let marker = device.source_marker();
    let sources = client.enumerate(&resource_uri(DCIM_BOOT_SOURCE_SETTING)).await?;
    let matched = sources
        .iter()
        .find(|s| s.find_text("InstanceID").map(|id| id.contains(marker)).unwrap_or(false))
        .and_then(|s| s.find_text("InstanceID"))
        .map(str::to_string);
    let matched = matched.ok_or_else(|| {
        crate::error::Error::new(
            crate::error::ErrorKind::OperationFailed,
            format!("no boot source matches device marker {}", marker),
        )
    })?;

    let selector_value = if persistent {
        sources
            .iter()
            .find(|s| s.find_text("InstanceID") == Some(matched.as_str()))
            .and_then(|s| s.find_text("BootSourceType"))
            .unwrap_or("OneTime")
            .to_string()
    } else {
        "OneTime".to_string()
    };

    let selectors = vec![Selector::new("InstanceID", selector_value)];
    let properties = vec![Property::new("source", matched)];

    client
        .invoke(
            &resource_uri(DCIM_BOOT_CONFIG_SETTING),
            "ChangeBootOrderByInstanceID",
            &selectors,
            &properties,
            &[RET_SUCCESS],
        )
        .await?;

    bios::service::create_config_job(client, false).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::test::MemoryLocker;
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

    const BOOT_CONFIG_PERSISTENT: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item><InstanceID>IPL</InstanceID><IsNext>1</IsNext></Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const BOOT_SOURCES_PXE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item>
            <InstanceID>IPL#NIC.Integrated.1-1</InstanceID>
            <PendingAssignedSequence>0</PendingAssignedSequence>
            <BootSourceType>IPL</BootSourceType>
          </Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    #[tokio::test]
    async fn test_get_boot_device_persistent_pxe() {
        let transport = FakeTransport::new(vec![BOOT_CONFIG_PERSISTENT, BOOT_SOURCES_PXE]);
        let client = Client::with_transport(endpoint(), transport);
        let state = get_boot_device(&client).await.unwrap();
        assert_eq!(state.device, Some(BootDevice::Pxe));
        assert!(state.persistent);
    }

    #[tokio::test]
    async fn test_set_boot_device_noop_issues_no_invocation() {
        let transport = FakeTransport::new(vec![BOOT_CONFIG_PERSISTENT, BOOT_SOURCES_PXE]);
        let client = Client::with_transport(endpoint(), transport);
        let locker = MemoryLocker::new(vec![]);
        set_boot_device(&client, &locker, "node-1", BootDevice::Pxe, true).await.unwrap();
        assert_eq!(
            client
                .enumerate(&resource_uri(DCIM_BOOT_CONFIG_SETTING))
                .await
                .is_err(),
            true,
            "fake transport should be exhausted after the noop path"
        );
    }
}
