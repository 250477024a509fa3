//! Configuration for the node command: the field set the lifecycle resolves against before it
//! can open a DB, pick a genesis source, or bind an RPC listener. CLI parsing and flag-to-struct
//! translation belong to the `lighthouse` binary; this module owns only the resulting struct and
//! the conflict rule between it and a named network preset.

use crate::weak_subjectivity::WeakSubjectivityCheckpoint;
use std::collections::HashSet;
use std::path::PathBuf;

/// Recognized options for the node command. Field names mirror the CLI flags a caller derives
/// them from, so `check_network_conflicts` can reason about them by name.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub database_dir: PathBuf,
    pub validators_dir: PathBuf,
    pub secrets_dir: PathBuf,
    pub web3_url: Option<String>,
    pub deposit_contract_address: Option<String>,
    pub deposit_contract_deployed_at: Option<u64>,
    pub finalized_checkpoint_state: Option<Vec<u8>>,
    pub finalized_checkpoint_block: Option<Vec<u8>>,
    pub weak_subjectivity_checkpoint: Option<WeakSubjectivityCheckpoint>,
    pub rpc_enabled: bool,
    pub rpc_address: String,
    pub rpc_port: u16,
    pub metrics_enabled: bool,
    pub metrics_address: String,
    pub metrics_port: u16,
    pub verify_finalization: bool,
    pub stop_at_epoch: Option<types::Epoch>,
    pub graffiti: [u8; 32],
    pub node_name: Option<String>,
    pub in_process_validators: bool,
    pub eth2_network: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(".lighthouse");
        ClientConfig {
            database_dir: data_dir.join("beacon"),
            validators_dir: data_dir.join("validators"),
            secrets_dir: data_dir.join("secrets"),
            data_dir,
            web3_url: None,
            deposit_contract_address: None,
            deposit_contract_deployed_at: None,
            finalized_checkpoint_state: None,
            finalized_checkpoint_block: None,
            weak_subjectivity_checkpoint: None,
            rpc_enabled: false,
            rpc_address: "127.0.0.1".to_string(),
            rpc_port: 5052,
            metrics_enabled: false,
            metrics_address: "127.0.0.1".to_string(),
            metrics_port: 5054,
            verify_finalization: false,
            stop_at_epoch: None,
            graffiti: [0u8; 32],
            node_name: None,
            in_process_validators: false,
            eth2_network: eth2_network_config::DEFAULT_HARDCODED_NETWORK.to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ClientConfig {
    /// Translates the logging-relevant fields into the `LoggerConfig` the binary's environment
    /// setup needs. File rotation is left at `environment`'s defaults; this core only decides
    /// the path and level.
    pub fn logger_config(&self) -> environment::LoggerConfig {
        environment::LoggerConfig {
            path: self.log_file.clone(),
            debug_level: self.log_level.clone(),
            ..environment::LoggerConfig::default()
        }
    }

    pub fn pid_file(&self) -> PathBuf {
        self.data_dir.join("beacon_node.pid")
    }

    pub fn enr_file(&self) -> PathBuf {
        self.data_dir.join("beacon_node.enr")
    }
}

/// A configuration field supplied both via a named `--network` preset and directly on the CLI.
/// The preset always loses: the caller must drop one of the two sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfigConflict(pub String);

impl std::fmt::Display for NetworkConfigConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "field `{}` was supplied both via --network and directly on the CLI",
            self.0
        )
    }
}

impl std::error::Error for NetworkConfigConflict {}

/// `--network` supplying a field precludes also passing that field on the CLI: this is a fatal
/// configuration error, not a silent override. The CLI parsing library that builds these two sets
/// is out of scope here; a caller derives them from whichever arg matches were present.
pub fn check_network_conflicts(
    network_supplied: &HashSet<String>,
    cli_supplied: &HashSet<String>,
) -> Result<(), NetworkConfigConflict> {
    for field in cli_supplied {
        if network_supplied.contains(field) {
            return Err(NetworkConfigConflict(field.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_dotlighthouse() {
        let config = ClientConfig::default();
        assert_eq!(config.data_dir, PathBuf::from(".lighthouse"));
        assert_eq!(config.database_dir, PathBuf::from(".lighthouse/beacon"));
    }

    #[test]
    fn disjoint_field_sets_do_not_conflict() {
        let network: HashSet<String> = ["web3Url".to_string()].into_iter().collect();
        let cli: HashSet<String> = ["rpcPort".to_string()].into_iter().collect();
        assert!(check_network_conflicts(&network, &cli).is_ok());
    }

    #[test]
    fn overlapping_field_is_a_fatal_conflict() {
        let network: HashSet<String> = ["web3Url".to_string()].into_iter().collect();
        let cli: HashSet<String> = ["web3Url".to_string()].into_iter().collect();
        let err = check_network_conflicts(&network, &cli).unwrap_err();
        assert_eq!(err.0, "web3Url");
    }
}
