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

//! BIOS attribute get/set and config-job lifecycle.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{Error, ErrorKind, Result};
use crate::job;
use crate::node::NodeLocker;
use crate::wsman::constants::{
    resource_uri, DCIM_BIOS_ENUMERATION, DCIM_BIOS_INTEGER, DCIM_BIOS_SERVICE, DCIM_BIOS_STRING,
    RET_CREATED,
};
use crate::wsman::{Client, Node, Property, Selector, Transport};

use super::types::{Attribute, AttributeKind, AttributeValue, BIOS_TARGET};

fn parse_value(node: &Node, tag: &str, is_integer: bool) -> Result<AttributeValue> {
    let child = match node.find(tag) {
        Some(child) => child,
        None => return Ok(AttributeValue::Nil),
    };
    if child.is_nil() {
        return Ok(AttributeValue::Nil);
    }
    let text = child.text().to_string();
    if is_integer {
        let parsed: i64 = text
            .parse()
            .map_err(|_| Error::new(ErrorKind::OperationFailed, format!("{} is not an integer: {}", tag, text)))?;
        Ok(AttributeValue::Integer(parsed))
    } else {
        Ok(AttributeValue::Text(text))
    }
}

fn parse_attribute(item: &Node, is_integer: bool, kind: AttributeKind) -> Result<Attribute> {
    let name = item
        .find_text("AttributeName")
        .ok_or_else(|| Error::new(ErrorKind::OperationFailed, "Item has no name"))?
        .to_string();
    let current_value = parse_value(item, "CurrentValue", is_integer)?;
    let pending_value = parse_value(item, "PendingValue", is_integer)?;
    let read_only = item.find_text("IsReadOnly") == Some("true");

    Ok(Attribute {
        name,
        current_value,
        pending_value,
        read_only,
        kind,
    })
}

fn patch_asset_tag_regex(name: &str, regex: Option<String>, max_length: u32) -> Option<String> {
    regex.map(|pattern| {
        if name == "AssetTag" && pattern.contains(Attribute::ASSET_TAG_TOKEN) {
            pattern.replace(Attribute::ASSET_TAG_TOKEN, &max_length.to_string())
        } else {
            pattern
        }
    })
}

/// Fetch the full BIOS attribute set from all three DCIM namespaces.
pub async fn get_config<T: Transport>(client: &Client<T>) -> Result<HashMap<String, Attribute>> {
    let mut attributes = HashMap::new();

    for item in client.enumerate(&resource_uri(DCIM_BIOS_ENUMERATION)).await? {
        let mut possible_values: Vec<String> = item
            .find_all("PossibleValues")
            .into_iter()
            .map(|n| n.text().to_string())
            .collect();
        possible_values.sort();
        let attr = parse_attribute(&item, false, AttributeKind::Enumeration { possible_values })?;
        insert_unique(&mut attributes, attr)?;
    }

    for item in client.enumerate(&resource_uri(DCIM_BIOS_INTEGER)).await? {
        let lower_bound: i64 = item.find_text("LowerBound").unwrap_or("0").parse().unwrap_or(0);
        let upper_bound: i64 = item.find_text("UpperBound").unwrap_or("0").parse().unwrap_or(0);
        let attr = parse_attribute(
            &item,
            true,
            AttributeKind::Integer {
                lower_bound,
                upper_bound,
            },
        )?;
        insert_unique(&mut attributes, attr)?;
    }

    for item in client.enumerate(&resource_uri(DCIM_BIOS_STRING)).await? {
        let min_length: u32 = item.find_text("MinLength").unwrap_or("0").parse().unwrap_or(0);
        let max_length: u32 = item.find_text("MaxLength").unwrap_or("0").parse().unwrap_or(0);
        let name = item
            .find_text("AttributeName")
            .ok_or_else(|| Error::new(ErrorKind::OperationFailed, "Item has no name"))?
            .to_string();
        let regex = patch_asset_tag_regex(&name, item.find_text("ValueExpression").map(str::to_string), max_length);
        let attr = parse_attribute(
            &item,
            false,
            AttributeKind::String {
                min_length,
                max_length,
                regex,
            },
        )?;
        insert_unique(&mut attributes, attr)?;
    }

    Ok(attributes)
}

fn insert_unique(attributes: &mut HashMap<String, Attribute>, attr: Attribute) -> Result<()> {
    if attributes.contains_key(&attr.name) {
        return Err(Error::new(ErrorKind::OperationFailed, "Colliding attributes"));
    }
    attributes.insert(attr.name.clone(), attr);
    Ok(())
}

/// Fail if a BIOS config job targeting `BIOS.Setup.1-1` is already unfinished.
pub async fn check_for_config_job<T: Transport>(client: &Client<T>) -> Result<()> {
    for j in job::list_unfinished_jobs(client).await? {
        if j.name.contains(BIOS_TARGET) {
            return Err(Error::pending_config_job_exists(j.id, BIOS_TARGET.to_string()));
        }
    }
    Ok(())
}

/// Stage a `CreateTargetedConfigJob` against the BIOS service.
pub async fn create_config_job<T: Transport>(client: &Client<T>, reboot: bool) -> Result<String> {
    let mut properties = vec![
        Property::new("Target", BIOS_TARGET),
        Property::new("ScheduledStartTime", "TIME_NOW"),
    ];
    if reboot {
        properties.push(Property::new("RebootJobType", "3"));
    }

    let output = client
        .invoke(
            &resource_uri(DCIM_BIOS_SERVICE),
            "CreateTargetedConfigJob",
            &[],
            &properties,
            &[RET_CREATED],
        )
        .await?;

    job::extract_job_id(&output)
}

/// Set BIOS attributes, returning whether a reboot/commit job is required.
///
/// Acquires the node's exclusive lock for the check-then-mutate sequence.
pub async fn set_config<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    requested: &HashMap<String, String>,
) -> Result<bool> {
    let _guard = locker.acquire_exclusive(node_id).await?;

    check_for_config_job(client).await?;

    let current = get_config(client).await?;
    let mut to_set: Vec<(String, String)> = Vec::new();
    let mut read_only_violations: Vec<String> = Vec::new();
    let mut validation_errors: Vec<String> = Vec::new();

    for (name, value) in requested {
        let attr = match current.get(name) {
            Some(attr) => attr,
            None => {
                info!("Ignoring unknown BIOS attribute {}", name);
                continue;
            }
        };

        if attr.current_value.as_display().as_deref() == Some(value.as_str()) {
            continue;
        }

        if attr.read_only {
            read_only_violations.push(name.clone());
            continue;
        }

        if let Err(e) = attr.validate(value) {
            validation_errors.push(e);
            continue;
        }

        to_set.push((name.clone(), value.clone()));
    }

    if !read_only_violations.is_empty() {
        return Err(Error::new(
            ErrorKind::OperationFailed,
            format!("cannot set read-only attribute(s): {}", read_only_violations.join(", ")),
        ));
    }

    if !validation_errors.is_empty() {
        return Err(Error::new(ErrorKind::OperationFailed, validation_errors.join("; ")));
    }

    if to_set.is_empty() {
        return Ok(false);
    }

    let mut properties = Vec::with_capacity(to_set.len() * 2);
    for (name, value) in &to_set {
        properties.push(Property::new("AttributeName", name.clone()));
        properties.push(Property::new("AttributeValue", value.clone()));
    }

    let output = client
        .invoke(
            &resource_uri(DCIM_BIOS_SERVICE),
            "SetAttributes",
            &[],
            &properties,
            &[crate::wsman::constants::RET_SUCCESS],
        )
        .await?;

    Ok(output.find_text("RebootRequired") == Some("Yes"))
}

/// Create a config job for the currently staged attribute changes.
///
/// Acquires the node's exclusive lock for the check-then-mutate sequence.
pub async fn commit_config<T: Transport>(
    client: &Client<T>,
    locker: &dyn NodeLocker,
    node_id: &str,
    reboot: bool,
) -> Result<String> {
    let _guard = locker.acquire_exclusive(node_id).await?;

    check_for_config_job(client).await?;
    create_config_job(client, reboot).await
}

/// Discard any staged-but-uncommitted attribute changes.
///
/// Acquires the node's exclusive lock.
pub async fn abandon_config<T: Transport>(client: &Client<T>, locker: &dyn NodeLocker, node_id: &str) -> Result<()> {
    let _guard = locker.acquire_exclusive(node_id).await?;

    let selectors = vec![Selector::new("Target", BIOS_TARGET)];
    client
        .invoke(
            &resource_uri(DCIM_BIOS_SERVICE),
            "DeletePendingConfiguration",
            &selectors,
            &[],
            &[crate::wsman::constants::RET_SUCCESS],
        )
        .await?;
    debug!("Abandoned pending BIOS configuration");
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

    const ENUMERATION_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y">
          <Item>
            <AttributeName>BootMode</AttributeName>
            <CurrentValue>Bios</CurrentValue>
            <PendingValue xsi:nil="true" xmlns:xsi="z"/>
            <IsReadOnly>false</IsReadOnly>
            <PossibleValues>Uefi</PossibleValues>
            <PossibleValues>Bios</PossibleValues>
          </Item>
        </wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const EMPTY_ENUMERATION_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body><wsen:EnumerateResponse xmlns:wsen="x">
        <wsman:Items xmlns:wsman="y"></wsman:Items>
        <wsen:EnumerationContext></wsen:EnumerationContext>
      </wsen:EnumerateResponse></s:Body>
    </s:Envelope>"#;

    const EMPTY_JOBS_RESPONSE: &str = EMPTY_ENUMERATION_RESPONSE;

    #[tokio::test]
    async fn test_get_config_parses_enumeration_and_sorts_possible_values() {
        let transport = FakeTransport::new(vec![
            ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
        ]);
        let client = Client::with_transport(endpoint(), transport);
        let config = get_config(&client).await.unwrap();
        let boot_mode = config.get("BootMode").unwrap();
        match &boot_mode.kind {
            AttributeKind::Enumeration { possible_values } => {
                assert_eq!(possible_values, &vec!["Bios".to_string(), "Uefi".to_string()]);
            }
            _ => panic!("expected enumeration"),
        }
        assert_eq!(boot_mode.current_value, AttributeValue::Text("Bios".into()));
        assert_eq!(boot_mode.pending_value, AttributeValue::Nil);
    }

    #[tokio::test]
    async fn test_set_config_dry_set_returns_false_without_invocation() {
        let transport = FakeTransport::new(vec![
            EMPTY_JOBS_RESPONSE,
            ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
        ]);
        let client = Client::with_transport(endpoint(), transport);
        let mut requested = HashMap::new();
        requested.insert("BootMode".to_string(), "Bios".to_string());
        let locker = MemoryLocker::new(vec![]);
        let reboot = set_config(&client, &locker, "node-1", &requested).await.unwrap();
        assert!(!reboot);
    }

    #[tokio::test]
    async fn test_set_config_rejects_unknown_enum_value() {
        let transport = FakeTransport::new(vec![
            EMPTY_JOBS_RESPONSE,
            ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
            EMPTY_ENUMERATION_RESPONSE,
        ]);
        let client = Client::with_transport(endpoint(), transport);
        let mut requested = HashMap::new();
        requested.insert("BootMode".to_string(), "Legacy".to_string());
        let locker = MemoryLocker::new(vec![]);
        let err = set_config(&client, &locker, "node-1", &requested).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
    }
}
