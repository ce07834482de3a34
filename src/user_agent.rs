//! User-Agent string for API traffic.
//!
//! Single source so every request identifies the tool the same way.

/// Product token used in the User-Agent header.
const PRODUCT: &str = "harvester";

/// Default User-Agent for API requests (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (public-data-harvester)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("harvester/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_tool() {
        let ua = default_user_agent();
        assert!(ua.contains("public-data-harvester"), "unexpected UA: {ua}");
    }
}
