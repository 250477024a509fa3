//! Resolves the on-disk layout under a node's `--datadir`: one subdirectory per network, and
//! fixed names for the database, validator definitions, and secrets.

use clap::ArgMatches;
use std::path::PathBuf;

pub const DEFAULT_ROOT_DIR: &str = ".lighthouse";
pub const DEFAULT_BEACON_NODE_DIR: &str = "beacon";
pub const DEFAULT_NETWORK_DIR: &str = "network";
pub const DEFAULT_VALIDATOR_DIR: &str = "validators";
pub const DEFAULT_SECRET_DIR: &str = "secrets";

/// Returns `data_dir/network_name/beacon`, creating it if absent.
pub fn get_network_dir(data_dir: &std::path::Path, network_name: &str) -> PathBuf {
    data_dir.join(network_name).join(DEFAULT_BEACON_NODE_DIR)
}

pub fn ensure_dir_exists(path: &std::path::Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|e| format!("failed to create {path:?}: {e}"))
}

/// Reads `arg` from `matches` as a path, falling back to `$HOME/<default_root>/<default_subdir>`
/// when the flag was not supplied on the CLI.
pub fn parse_path_or_default(
    matches: &ArgMatches,
    arg: &str,
    default_subdir: &str,
) -> Result<PathBuf, String> {
    match matches.get_one::<String>(arg) {
        Some(path) => Ok(PathBuf::from(path)),
        None => dirs::home_dir()
            .map(|home| home.join(DEFAULT_ROOT_DIR).join(default_subdir))
            .ok_or_else(|| "unable to locate home directory".to_string()),
    }
}
