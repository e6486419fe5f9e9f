//! Minimal Chrome net-log structures: only what locates playlist requests.

use serde::Deserialize;
use serde_json::Value;

/// Root net-log document (`--log-net-log` output).
#[derive(Debug, Deserialize)]
pub struct NetLog {
    #[serde(default)]
    pub events: Vec<NetLogEvent>,
}

#[derive(Debug, Deserialize)]
pub struct NetLogEvent {
    #[serde(default)]
    pub params: Option<EventParams>,
}

/// Event parameters. Both fields vary in type across event kinds, so they
/// stay untyped and are read as strings when possible.
#[derive(Debug, Deserialize)]
pub struct EventParams {
    #[serde(default)]
    pub network_isolation_key: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
}

impl EventParams {
    pub fn isolation_key(&self) -> Option<&str> {
        self.network_isolation_key.as_ref().and_then(Value::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().and_then(Value::as_str)
    }
}
