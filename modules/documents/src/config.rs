//! Configuration for the documents module.

use serde::Deserialize;

/// Whether storage-side row filtering is used as a second enforcement layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFiltering {
    /// Bind the caller to the connection and reconcile the engine's decision
    /// with what the filtered store returns.
    #[default]
    Enabled,
    /// Application-only enforcement. Connections are never bound.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentsConfig {
    pub row_filtering: RowFiltering,

    /// On a deny, still run the filtered read so a row filter that leaks the
    /// row is detected and logged. The response is the deny either way.
    pub probe_on_deny: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            row_filtering: RowFiltering::Enabled,
            probe_on_deny: true,
        }
    }
}

impl DocumentsConfig {
    #[must_use]
    pub fn row_filtering_enabled(&self) -> bool {
        self.row_filtering == RowFiltering::Enabled
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_both_layers() {
        let cfg: DocumentsConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.row_filtering_enabled());
        assert!(cfg.probe_on_deny);
    }

    #[test]
    fn filtering_can_be_turned_off() {
        let cfg: DocumentsConfig =
            serde_json::from_str(r#"{"row_filtering": "disabled"}"#).unwrap();
        assert_eq!(cfg.row_filtering, RowFiltering::Disabled);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<DocumentsConfig>(r#"{"rls": true}"#).is_err());
    }
}
