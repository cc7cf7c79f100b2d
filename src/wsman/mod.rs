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

//! The WS-Management transport layer: SOAP envelopes, a tiny XML tree and
//! the `Enumerate`/`Invoke` client every domain module builds on.

pub mod client;
pub mod constants;
pub mod envelope;
pub mod xml;

pub use client::{Client, Endpoint, ReqwestTransport, Transport};
pub use envelope::{Property, Selector};
pub use xml::{Document, Node};
