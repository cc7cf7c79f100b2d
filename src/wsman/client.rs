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

//! The WS-MAN client: `Enumerate`/`Pull` for inventory, `Invoke` for methods.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};

use crate::error::{Error, ErrorKind, Result};

use super::envelope::{build_enumerate, build_invoke, build_pull, Property, Selector};
use super::xml::{Document, Node};

/// Credentials and address of a single iDRAC endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// `https://host:port/wsman` style base URL.
    pub url: String,
    /// RAC username.
    pub username: String,
    /// RAC password.
    pub password: String,
    /// Whether to validate the RAC's TLS certificate.
    pub verify_ca: bool,
}

/// Abstraction over the HTTP transport, so the client can be exercised
/// against a fake transport in tests without a real iDRAC.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to the endpoint and return the raw response bytes.
    async fn post(&self, endpoint: &Endpoint, body: String) -> Result<Vec<u8>>;
}

/// A `Transport` backed by `reqwest`, using HTTP Basic auth as iDRAC expects.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given request timeout. `verify_ca` is
    /// taken per-request since different endpoints in a fleet may have
    /// different certificate policies, but the underlying `reqwest::Client`
    /// is shared and built to accept both.
    pub fn new(request_timeout: Duration) -> Result<ReqwestTransport> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(request_timeout)
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, endpoint: &Endpoint, body: String) -> Result<Vec<u8>> {
        if !endpoint.verify_ca {
            debug!("TLS verification disabled for {}", endpoint.url);
        }
        let response = self
            .client
            .post(&endpoint.url)
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .header("Content-Type", "application/soap+xml;charset=UTF-8")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::ClientError,
                format!("WS-MAN endpoint returned HTTP {}", response.status()),
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// The WS-MAN client used by every domain module to talk to a RAC.
pub struct Client<T: Transport = ReqwestTransport> {
    endpoint: Endpoint,
    transport: T,
    next_message_id: std::sync::atomic::AtomicU64,
}

impl Client<ReqwestTransport> {
    /// Build a client backed by the real `reqwest` transport, honoring
    /// `DriverConfig::request_timeout`. Fails with `DriverLoadError` if the
    /// underlying transport cannot be constructed, rather than panicking.
    pub fn new(endpoint: Endpoint, request_timeout: Duration) -> Result<Client<ReqwestTransport>> {
        let transport = ReqwestTransport::new(request_timeout).map_err(|e| {
            Error::new(
                ErrorKind::DriverLoadError,
                format!("cannot initialize WS-MAN transport: {}", e),
            )
        })?;
        Ok(Client::with_transport(endpoint, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Build a client with a custom transport (used by tests).
    pub fn with_transport(endpoint: Endpoint, transport: T) -> Client<T> {
        Client {
            endpoint,
            transport,
            next_message_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    fn message_id(&self) -> String {
        let n = self
            .next_message_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("uuid:drac-rs-{}", n)
    }

    /// Enumerate every instance of `resource_uri`, following `Pull` requests
    /// until the enumeration context is exhausted. Returns the raw `Item`
    /// elements in document order.
    pub async fn enumerate(&self, resource_uri: &str) -> Result<Vec<Node>> {
        trace!("Enumerating {}", resource_uri);
        let body = build_enumerate(resource_uri, &self.message_id());
        let response = self.transport.post(&self.endpoint, body).await?;
        let doc = Document::parse(&response)?;

        let mut items = collect_items(&doc.root);

        if let Some(context) = doc.root.find_text("EnumerationContext") {
            let context = context.to_string();
            if !context.is_empty() {
                let mut ctx = Some(context);
                while let Some(current) = ctx.take() {
                    let body = build_pull(resource_uri, &self.message_id(), &current);
                    let response = self.transport.post(&self.endpoint, body).await?;
                    let doc = Document::parse(&response)?;
                    items.extend(collect_items(&doc.root));
                    ctx = doc
                        .root
                        .find_text("EnumerationContext")
                        .filter(|c| !c.is_empty())
                        .map(|c| c.to_string());
                }
            }
        }

        Ok(items)
    }

    /// Invoke `method` on `resource_uri`, addressed by `selectors`, and
    /// validate that `ReturnValue` is one of `expected`. Returns the parsed
    /// response body (`Invoke`'s output parameters) for the caller to read
    /// `Job`/`MessageID`/etc. out of.
    pub async fn invoke(
        &self,
        resource_uri: &str,
        method: &str,
        selectors: &[Selector],
        properties: &[Property],
        expected: &[i64],
    ) -> Result<Node> {
        trace!("Invoking {} on {}", method, resource_uri);
        let body = build_invoke(
            resource_uri,
            method,
            &self.message_id(),
            selectors,
            properties,
        );
        let response = self.transport.post(&self.endpoint, body).await?;
        let doc = Document::parse(&response)?;

        let output = doc
            .root
            .find(&format!("{}_OUTPUT", method))
            .cloned()
            .unwrap_or_else(|| doc.root.clone());

        let return_value: i64 = output
            .find_text("ReturnValue")
            .ok_or_else(|| Error::new(ErrorKind::ClientError, "Invoke response has no ReturnValue"))?
            .parse()
            .map_err(|_| Error::new(ErrorKind::ClientError, "ReturnValue is not an integer"))?;

        if expected.contains(&return_value) {
            return Ok(output);
        }

        let message = output
            .find_text("Message")
            .unwrap_or("no message returned by RAC")
            .to_string();

        if super::constants::RET_SUCCESS == return_value
            || super::constants::RET_CREATED == return_value
        {
            return Err(Error::new(
                ErrorKind::UnexpectedReturnValue,
                format!(
                    "{} returned {} which was not one of the expected values: {}",
                    method, return_value, message
                ),
            ));
        }

        Err(Error::new(
            ErrorKind::OperationFailed,
            format!("{} failed with ReturnValue {}: {}", method, return_value, message),
        ))
    }
}

fn collect_items(root: &Node) -> Vec<Node> {
    root.find_all("Item").into_iter().cloned().collect()
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::sync::Mutex;

    /// A scripted transport returning canned responses in order, recording
    /// every request body it was asked to send.
    pub struct FakeTransport {
        responses: Mutex<Vec<Vec<u8>>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new(responses: Vec<&str>) -> FakeTransport {
            FakeTransport {
                responses: Mutex::new(responses.into_iter().map(|s| s.as_bytes().to_vec()).rev().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn post(&self, _endpoint: &Endpoint, body: String) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(body);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| Error::new(ErrorKind::ClientError, "fake transport exhausted"))
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            url: "https://drac.example.test/wsman".into(),
            username: "root".into(),
            password: "calvin".into(),
            verify_ca: false,
        }
    }

    const ENUMERATE_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
        xmlns:wsen="http://schemas.xmlsoap.org/ws/2004/09/enumeration">
      <s:Body>
        <wsen:EnumerateResponse>
          <wsman:Items xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd">
            <Item><AttributeName>ProcVirtualization</AttributeName><CurrentValue>Enabled</CurrentValue></Item>
          </wsman:Items>
          <wsen:EnumerationContext></wsen:EnumerationContext>
        </wsen:EnumerateResponse>
      </s:Body>
    </s:Envelope>"#;

    const INVOKE_SUCCESS_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body>
        <n:SetAttribute_OUTPUT xmlns:n="http://schemas.dell.com/.../DCIM_BIOSService">
          <n:ReturnValue>0</n:ReturnValue>
          <n:Message>Success</n:Message>
        </n:SetAttribute_OUTPUT>
      </s:Body>
    </s:Envelope>"#;

    const INVOKE_FAILURE_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
      <s:Body>
        <n:SetAttribute_OUTPUT xmlns:n="http://schemas.dell.com/.../DCIM_BIOSService">
          <n:ReturnValue>2</n:ReturnValue>
          <n:Message>Invalid attribute value</n:Message>
        </n:SetAttribute_OUTPUT>
      </s:Body>
    </s:Envelope>"#;

    #[tokio::test]
    async fn test_enumerate_returns_items() {
        let transport = FakeTransport::new(vec![ENUMERATE_RESPONSE]);
        let client = Client::with_transport(endpoint(), transport);
        let items = client.enumerate("DCIM_BIOSEnumeration").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].find_text("AttributeName"), Some("ProcVirtualization"));
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let transport = FakeTransport::new(vec![INVOKE_SUCCESS_RESPONSE]);
        let client = Client::with_transport(endpoint(), transport);
        let out = client
            .invoke("DCIM_BIOSService", "SetAttribute", &[], &[], &[0])
            .await
            .unwrap();
        assert_eq!(out.find_text("ReturnValue"), Some("0"));
    }

    #[test]
    fn test_client_new_builds_reqwest_backed_client() {
        let client = Client::new(endpoint(), std::time::Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_invoke_unexpected_return_value_reports_operation_failed() {
        let transport = FakeTransport::new(vec![INVOKE_FAILURE_RESPONSE]);
        let client = Client::with_transport(endpoint(), transport);
        let err = client
            .invoke("DCIM_BIOSService", "SetAttribute", &[], &[], &[0])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
    }
}
