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

//! Builds the SOAP/WS-Management request bodies the client sends.

use super::constants::{ANONYMOUS_ADDRESS, NS_SOAP, NS_WSA, NS_WSEN, NS_WSMAN};

/// A single selector used to address a WS-MAN resource instance.
#[derive(Debug, Clone)]
pub struct Selector {
    /// Selector name, e.g. `InstanceID`.
    pub name: String,
    /// Selector value.
    pub value: String,
}

impl Selector {
    /// Build a new selector.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Selector {
        Selector {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A property to pass to an `Invoke` call. Some methods repeat the same
/// element name for array-valued properties (e.g. `AttributeName`/`AttributeValue`
/// pairs in `SetAttributes`), so this keeps the raw element/value pairs in order.
#[derive(Debug, Clone)]
pub struct Property {
    /// Element (local) name.
    pub name: String,
    /// Element text content.
    pub value: String,
}

impl Property {
    /// Build a new property.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Property {
        Property {
            name: name.into(),
            value: value.into(),
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn header(action: &str, resource_uri: &str, message_id: &str, selectors: &[Selector]) -> String {
    let selector_set = if selectors.is_empty() {
        String::new()
    } else {
        let items: String = selectors
            .iter()
            .map(|s| {
                format!(
                    "<w:Selector Name=\"{}\">{}</w:Selector>",
                    escape(&s.name),
                    escape(&s.value)
                )
            })
            .collect();
        format!("<w:SelectorSet>{}</w:SelectorSet>", items)
    };

    format!(
        "<s:Header>\
           <wsa:To>{anon}</wsa:To>\
           <wsman:ResourceURI>{uri}</wsman:ResourceURI>\
           <wsa:ReplyTo><wsa:Address>{anon}</wsa:Address></wsa:ReplyTo>\
           <wsa:Action>{action}</wsa:Action>\
           <wsa:MessageID>{mid}</wsa:MessageID>\
           {selectors}\
         </s:Header>",
        anon = ANONYMOUS_ADDRESS,
        uri = escape(resource_uri),
        action = escape(action),
        mid = escape(message_id),
        selectors = selector_set,
    )
}

/// Build an `Enumerate` request body for a resource URI, with an optional
/// WQL-ish filter (DCIM resources mostly ignore filters and return everything).
pub fn build_enumerate(resource_uri: &str, message_id: &str) -> String {
    let action = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Enumerate";
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <s:Envelope xmlns:s=\"{soap}\" xmlns:wsa=\"{wsa}\" xmlns:wsman=\"{wsman}\" xmlns:wsen=\"{wsen}\">\
           {header}\
           <s:Body><wsen:Enumerate/></s:Body>\
         </s:Envelope>",
        soap = NS_SOAP,
        wsa = NS_WSA,
        wsman = NS_WSMAN,
        wsen = NS_WSEN,
        header = header(action, resource_uri, message_id, &[]),
    )
}

/// Build a `Pull` request body continuing an enumeration context.
pub fn build_pull(resource_uri: &str, message_id: &str, context: &str) -> String {
    let action = "http://schemas.xmlsoap.org/ws/2004/09/enumeration/Pull";
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <s:Envelope xmlns:s=\"{soap}\" xmlns:wsa=\"{wsa}\" xmlns:wsman=\"{wsman}\" xmlns:wsen=\"{wsen}\">\
           {header}\
           <s:Body><wsen:Pull><wsen:EnumerationContext>{ctx}</wsen:EnumerationContext></wsen:Pull></s:Body>\
         </s:Envelope>",
        soap = NS_SOAP,
        wsa = NS_WSA,
        wsman = NS_WSMAN,
        wsen = NS_WSEN,
        header = header(action, resource_uri, message_id, &[]),
        ctx = escape(context),
    )
}

/// Build an `Invoke` request body for a method on a resource instance,
/// addressed by `selectors`, passing `properties` as the method's input parameters.
pub fn build_invoke(
    resource_uri: &str,
    method: &str,
    message_id: &str,
    selectors: &[Selector],
    properties: &[Property],
) -> String {
    let action = format!("{}/{}", resource_uri, method);
    let body_props: String = properties
        .iter()
        .map(|p| format!("<p:{name}>{value}</p:{name}>", name = p.name, value = escape(&p.value)))
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <s:Envelope xmlns:s=\"{soap}\" xmlns:wsa=\"{wsa}\" xmlns:wsman=\"{wsman}\">\
           {header}\
           <s:Body><p:{method} xmlns:p=\"{uri}\">{props}</p:{method}></s:Body>\
         </s:Envelope>",
        soap = NS_SOAP,
        wsa = NS_WSA,
        wsman = NS_WSMAN,
        header = header(&action, resource_uri, message_id, selectors),
        method = method,
        uri = escape(resource_uri),
        props = body_props,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_enumerate_contains_resource_uri() {
        let body = build_enumerate("http://schemas.dell.com/.../DCIM_BIOSEnumeration", "uuid-1");
        assert!(body.contains("<wsman:ResourceURI>http://schemas.dell.com"));
        assert!(body.contains("<wsen:Enumerate/>"));
    }

    #[test]
    fn test_build_invoke_with_selectors_and_properties() {
        let selectors = vec![Selector::new("InstanceID", "iDRAC.Embedded.1#BIOS.Setup.1-1")];
        let properties = vec![
            Property::new("AttributeName", "ProcVirtualization"),
            Property::new("AttributeValue", "Enabled"),
        ];
        let body = build_invoke(
            "http://schemas.dell.com/.../DCIM_BIOSService",
            "SetAttribute",
            "uuid-2",
            &selectors,
            &properties,
        );
        assert!(body.contains("<w:Selector Name=\"InstanceID\">iDRAC.Embedded.1#BIOS.Setup.1-1</w:Selector>"));
        assert!(body.contains("<p:AttributeName>ProcVirtualization</p:AttributeName>"));
        assert!(body.contains("<p:SetAttribute "));
    }

    #[test]
    fn test_escape_special_characters() {
        let props = vec![Property::new("AttributeValue", "A & B < C")];
        let body = build_invoke("uri", "Method", "id", &[], &props);
        assert!(body.contains("A &amp; B &lt; C"));
    }
}
