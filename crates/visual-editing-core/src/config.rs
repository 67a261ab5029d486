use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::VisualEditingError;

/// Options for a mounted overlay root.
///
/// Every key is optional on the wire; missing keys fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// z-index of the overlay container.
    pub z_index: i32,
    /// Rect changes smaller than this (in CSS pixels) are not reported.
    pub rect_epsilon: f64,
    /// Duration of the fade-out when overlays are enabled.
    pub flash_duration_ms: u32,
    /// Studio base URL used for intent links when an annotation has no `baseUrl`.
    pub studio_url: Option<String>,
    /// Content API version used for projection queries, e.g. `2023-10-27`.
    pub api_version: SmolStr,
    /// Content API host, e.g. `https://abc123.api.sanity.io`.
    pub api_host: Option<String>,
    pub project_id: Option<SmolStr>,
    pub dataset: Option<SmolStr>,
    /// Force the in-frame decision instead of detecting it.
    pub in_frame: Option<bool>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            z_index: 9_999_999,
            rect_epsilon: 0.5,
            flash_duration_ms: 1500,
            studio_url: None,
            api_version: SmolStr::new_static("2023-10-27"),
            api_host: None,
            project_id: None,
            dataset: None,
            in_frame: None,
        }
    }
}

impl OverlayConfig {
    /// Parse options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, VisualEditingError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| VisualEditingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the overlay engine cannot work with.
    pub fn validate(&self) -> Result<(), VisualEditingError> {
        if !self.rect_epsilon.is_finite() || self.rect_epsilon < 0.0 {
            return Err(VisualEditingError::Config(format!(
                "rectEpsilon must be a non-negative number, got {}",
                self.rect_epsilon
            )));
        }
        if self.api_version.is_empty() {
            return Err(VisualEditingError::Config(
                "apiVersion must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Content API host, derived from the project id when not given.
    pub fn resolved_api_host(&self) -> Option<String> {
        match (&self.api_host, &self.project_id) {
            (Some(host), _) => Some(host.trim_end_matches('/').to_string()),
            (None, Some(project)) => Some(format!("https://{project}.api.sanity.io")),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = OverlayConfig::from_json(r#"{"zIndex": 10, "dataset": "production"}"#).unwrap();
        assert_eq!(config.z_index, 10);
        assert_eq!(config.dataset.as_deref(), Some("production"));
        assert_eq!(config.rect_epsilon, 0.5);
        assert_eq!(config.flash_duration_ms, 1500);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = OverlayConfig::from_json(r#"{"zIndex": "high"}"#).unwrap_err();
        assert!(matches!(err, VisualEditingError::Config(_)));
    }

    #[test]
    fn test_negative_epsilon_rejected() {
        let err = OverlayConfig::from_json(r#"{"rectEpsilon": -1}"#).unwrap_err();
        assert!(err.to_string().contains("rectEpsilon"));
    }

    #[test]
    fn test_api_host_from_project() {
        let config = OverlayConfig {
            project_id: Some("abc123".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_api_host().as_deref(),
            Some("https://abc123.api.sanity.io")
        );

        let config = OverlayConfig {
            api_host: Some("https://api.example.com/".into()),
            project_id: Some("abc123".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_api_host().as_deref(),
            Some("https://api.example.com")
        );
    }
}
