/*! The lossy message channel used for telemetry and lifecycle control.

This is a parallel, out-of-band channel alongside sample streams: rate
telemetry, packet counters, and lifecycle commands travel as [`Message`]
values over [`crate::stream::NCWriteStream`]/[`crate::stream::NCReadStream`],
the same bounded-queue primitive the stream module already uses for PDUs.
*/
use std::collections::BTreeMap;

use crate::Value;

/// Well-known lifecycle command carried by a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmd {
    /// Informational or application-defined payload; see `data`.
    Data,
    /// Request that the graph stop running.
    RequestedStop,
}

/// A single telemetry/control message.
///
/// Mirrors the shape from the streaming runtime design: a command
/// discriminant, a named service/endpoint pair identifying the source, and a
/// heterogeneous data map.
#[derive(Clone, Debug)]
pub struct Message {
    cmd: Cmd,
    service: String,
    endpoint: String,
    data: BTreeMap<String, Value>,
    client_id: u64,
}

impl Message {
    /// Build a data message from a single key/value pair. Most blocks only
    /// ever need one field (`packet_length`, `rate_now`, ...).
    #[must_use]
    pub fn data(service: &str, endpoint: &str, key: &str, val: Value) -> Self {
        let mut data = BTreeMap::new();
        data.insert(key.to_string(), val);
        Self {
            cmd: Cmd::Data,
            service: service.to_string(),
            endpoint: endpoint.to_string(),
            data,
            client_id: 0,
        }
    }

    /// Build a data message from a full map.
    #[must_use]
    pub fn with_map(service: &str, endpoint: &str, data: BTreeMap<String, Value>) -> Self {
        Self {
            cmd: Cmd::Data,
            service: service.to_string(),
            endpoint: endpoint.to_string(),
            data,
            client_id: 0,
        }
    }

    /// Build a `REQUESTED_STOP` lifecycle message.
    #[must_use]
    pub fn requested_stop(service: &str) -> Self {
        Self {
            cmd: Cmd::RequestedStop,
            service: service.to_string(),
            endpoint: String::new(),
            data: BTreeMap::new(),
            client_id: 0,
        }
    }

    /// Command discriminant.
    #[must_use]
    pub fn cmd(&self) -> Cmd {
        self.cmd
    }

    /// Originating service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Look up a field in the data map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether the key is present, regardless of value (used for marker
    /// fields like `invalid_header`).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// The full data map.
    #[must_use]
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}
