//! Version string reported in logs, ENR identification, and gossip topic negotiation.

/// Returns the package version plus short git commit hash, e.g. `Lighthouse/v0.1.0-abcdef1`.
pub fn version_with_platform() -> String {
    format!(
        "{}/{}-{}",
        version(),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

pub fn version() -> String {
    format!("Lighthouse/v{}-{}", env!("CARGO_PKG_VERSION"), short_commit())
}

fn short_commit() -> &'static str {
    git_version::git_version!(fallback = "unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_contains_prefix() {
        assert!(version().starts_with("Lighthouse/v"));
    }
}
