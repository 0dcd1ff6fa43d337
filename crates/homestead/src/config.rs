//! Server and client configuration.
//!
//! Both load from JSON with camelCase keys. Every field has a default, so
//! a config file only needs the values it changes:
//!
//! ```json
//! {
//!   "tcpAddr": "0.0.0.0:7777",
//!   "udpAddr": "0.0.0.0:7778",
//!   "startingWorld": "farm",
//!   "worlds": [ { "name": "farm", "islands": [ { "width": 64, "height": 64 } ] } ]
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use homestead_session::ManagerConfig;
use homestead_tick::TickConfig;
use homestead_world::{SyncConfig, WorldConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::HomesteadError;

fn read_config(path: &Path) -> Result<String, HomesteadError> {
    std::fs::read_to_string(path).map_err(|source| HomesteadError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

fn validated_poll_timeout(poll_timeout_ms: u64) -> u64 {
    if poll_timeout_ms == 0 {
        warn!("pollTimeoutMs is 0, using 1");
        return 1;
    }
    poll_timeout_ms
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Address of the reliable (TCP) listener.
    pub tcp_addr: String,
    /// Address of the best-effort (UDP) socket.
    pub udp_addr: String,
    /// World new players are placed in.
    pub starting_world: String,
    /// Longest the network thread waits for activity before sweeping.
    pub poll_timeout_ms: u64,
    pub tick_rate_hz: u32,
    /// Delay before the duplicate RemoveEntityFromWorld goes out.
    pub remove_resend_delay_ms: u64,
    pub worlds: Vec<WorldConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_addr: "0.0.0.0:7777".into(),
            udp_addr: "0.0.0.0:7778".into(),
            starting_world: "farm".into(),
            poll_timeout_ms: 5,
            tick_rate_hz: 30,
            remove_resend_delay_ms: 100,
            worlds: vec![WorldConfig::named("farm")],
        }
    }
}

impl ServerConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    /// [`HomesteadError::ConfigRead`] or [`HomesteadError::ConfigParse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HomesteadError> {
        Self::from_json(&read_config(path.as_ref())?)
    }

    /// Parses and validates a JSON config.
    ///
    /// # Errors
    /// [`HomesteadError::ConfigParse`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, HomesteadError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Returns a copy with out-of-range values clamped.
    ///
    /// World names aren't checked here; an unknown starting world is
    /// reported when the server starts.
    pub fn validated(mut self) -> Self {
        self.poll_timeout_ms = validated_poll_timeout(self.poll_timeout_ms);
        self.tick_rate_hz = self.tick_config().tick_rate_hz;
        self
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.tick_rate_hz).validated()
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            remove_resend_delay_ms: self.remove_resend_delay_ms,
            ..SyncConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub server_tcp_addr: String,
    pub server_udp_addr: String,
    /// Local datagram socket. Port 0 picks a free port.
    pub client_udp_addr: String,
    pub poll_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_tcp_addr: "127.0.0.1:7777".into(),
            server_udp_addr: "127.0.0.1:7778".into(),
            client_udp_addr: "0.0.0.0:0".into(),
            poll_timeout_ms: 5,
        }
    }
}

impl ClientConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    /// [`HomesteadError::ConfigRead`] or [`HomesteadError::ConfigParse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HomesteadError> {
        Self::from_json(&read_config(path.as_ref())?)
    }

    /// # Errors
    /// [`HomesteadError::ConfigParse`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, HomesteadError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn validated(mut self) -> Self {
        self.poll_timeout_ms = validated_poll_timeout(self.poll_timeout_ms);
        self
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default_has_starting_world() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tick_rate_hz, 30);
        assert_eq!(cfg.remove_resend_delay_ms, 100);
        assert!(cfg.worlds.iter().any(|w| w.name == cfg.starting_world));
    }

    #[test]
    fn test_server_config_from_json_reads_camel_case() {
        let cfg = ServerConfig::from_json(
            r#"{
                "tcpAddr": "127.0.0.1:9000",
                "startingWorld": "barn",
                "pollTimeoutMs": 0,
                "tickRateHz": 1000,
                "removeResendDelayMs": 250,
                "worlds": [ { "name": "barn" }, { "name": "farm" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.tcp_addr, "127.0.0.1:9000");
        assert_eq!(cfg.udp_addr, "0.0.0.0:7778");
        assert_eq!(cfg.starting_world, "barn");
        assert_eq!(cfg.poll_timeout_ms, 1);
        assert_eq!(cfg.tick_rate_hz, TickConfig::MAX_TICK_RATE_HZ);
        assert_eq!(cfg.sync_config().remove_resend_delay_ms, 250);
        assert_eq!(cfg.worlds.len(), 2);
    }

    #[test]
    fn test_server_config_from_json_malformed_errors() {
        assert!(matches!(
            ServerConfig::from_json("{ not json"),
            Err(HomesteadError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_server_config_load_missing_file_errors() {
        let err = ServerConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, HomesteadError::ConfigRead { .. }));
    }

    #[test]
    fn test_server_config_manager_config_uses_poll_timeout() {
        let cfg = ServerConfig {
            poll_timeout_ms: 12,
            ..Default::default()
        };
        assert_eq!(cfg.manager_config().poll_timeout, Duration::from_millis(12));
    }

    #[test]
    fn test_client_config_from_json_empty_uses_defaults() {
        let cfg = ClientConfig::from_json("{}").unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_client_config_roundtrips_through_json() {
        let cfg = ClientConfig {
            server_tcp_addr: "10.0.0.1:1".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("serverTcpAddr"));
        assert_eq!(ClientConfig::from_json(&json).unwrap(), cfg);
    }
}
