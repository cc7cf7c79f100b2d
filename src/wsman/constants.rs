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

//! Well-known DCIM resource URIs, namespaces and WS-MAN return codes.

/// Base for all DCIM resource URIs exposed by the Lifecycle Controller.
pub const DCIM_NAMESPACE: &str = "http://schemas.dell.com/wbem/wscim/1/cim-schema/2/";

/// BIOS attribute enumeration view (string, integer and enumeration attrs).
pub const DCIM_BIOS_ENUMERATION: &str = "DCIM_BIOSEnumeration";
/// BIOS string attribute view.
pub const DCIM_BIOS_STRING: &str = "DCIM_BIOSString";
/// BIOS integer attribute view.
pub const DCIM_BIOS_INTEGER: &str = "DCIM_BIOSInteger";
/// BIOS configuration service (SetAttribute(s), CreateTargetedConfigJob).
pub const DCIM_BIOS_SERVICE: &str = "DCIM_BIOSService";
/// Boot configuration setting (list/change the active boot mode).
pub const DCIM_BOOT_CONFIG_SETTING: &str = "DCIM_BootConfigSetting";
/// Individual boot source entries within a `DCIM_BootConfigSetting`.
pub const DCIM_BOOT_SOURCE_SETTING: &str = "DCIM_BootSourceSetting";
/// Lifecycle Controller job status view.
pub const DCIM_LIFECYCLE_JOB: &str = "DCIM_LifecycleJob";
/// RAID controller view.
pub const DCIM_CONTROLLER_VIEW: &str = "DCIM_ControllerView";
/// Virtual disk (logical disk) view.
pub const DCIM_VIRTUAL_DISK_VIEW: &str = "DCIM_VirtualDiskView";
/// Physical disk view.
pub const DCIM_PHYSICAL_DISK_VIEW: &str = "DCIM_PhysicalDiskView";
/// RAID configuration service (CreateVirtualDisk, DeleteVirtualDisk, ...).
pub const DCIM_RAID_SERVICE: &str = "DCIM_RAIDService";

/// WS-Addressing namespace.
pub const NS_WSA: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
/// WS-Management namespace.
pub const NS_WSMAN: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
/// SOAP 1.2 envelope namespace.
pub const NS_SOAP: &str = "http://www.w3.org/2003/05/soap-envelope";
/// WS-Enumeration namespace.
pub const NS_WSEN: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";
/// XML Schema Instance namespace (used for `xsi:nil`).
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Anonymous WS-Addressing reply-to address used on every request.
pub const ANONYMOUS_ADDRESS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// `ReturnValue` reported when an `Invoke` completed synchronously.
pub const RET_SUCCESS: i64 = 0;
/// `ReturnValue` reported when an `Invoke` queued an asynchronous job.
pub const RET_CREATED: i64 = 4096;
/// `ReturnValue` reported when an `Invoke` failed outright.
pub const RET_ERROR: i64 = 2;

/// Return the resource URI for a DCIM class name, e.g. `DCIM_BIOSService`.
pub fn resource_uri(class_name: &str) -> String {
    format!("{}{}", DCIM_NAMESPACE, class_name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resource_uri() {
        assert_eq!(
            resource_uri(DCIM_BIOS_SERVICE),
            "http://schemas.dell.com/wbem/wscim/1/cim-schema/2/DCIM_BIOSService"
        );
    }
}
