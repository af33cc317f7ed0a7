//! Frame graph configuration with TOML support.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Tunables of the frame graph and the passes built on it.
///
/// All fields use `#[serde(default)]` so partial TOML files work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameGraphSettings {
    /// Internal render resolution relative to the back buffer (0, 4]
    pub render_scale: f32,
    /// Share physical objects between transients with disjoint lifetimes
    pub alias_transients: bool,
    /// Largest fraction of a buffer slot that may go unused when a smaller
    /// buffer aliases it, in [0, 1)
    pub max_alias_waste: f32,
    /// Execute passes of one dependency batch on the rayon pool
    pub parallel_execute: bool,
    /// Frames a pooled object may stay unused before it is destroyed
    pub max_idle_frames: u32,
    /// Edge length of one shadow map face
    pub shadow_map_resolution: u32,
}

impl Default for FrameGraphSettings {
    fn default() -> Self {
        Self {
            render_scale: 1.0,
            alias_transients: true,
            max_alias_waste: 0.25,
            parallel_execute: false,
            max_idle_frames: 3,
            shadow_map_resolution: 1024,
        }
    }
}

impl FrameGraphSettings {
    pub fn validate(&self) -> GraphResult<()> {
        if !(self.render_scale > 0.0 && self.render_scale <= 4.0) {
            return Err(GraphError::InvalidSettings(format!(
                "render_scale must be in (0, 4], got {}",
                self.render_scale
            )));
        }
        if !(self.max_alias_waste >= 0.0 && self.max_alias_waste < 1.0) {
            return Err(GraphError::InvalidSettings(format!(
                "max_alias_waste must be in [0, 1), got {}",
                self.max_alias_waste
            )));
        }
        if self.shadow_map_resolution == 0 {
            return Err(GraphError::InvalidSettings(
                "shadow_map_resolution must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate settings from TOML. Missing fields use defaults.
    pub fn from_toml_str(content: &str) -> GraphResult<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| GraphError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> GraphResult<String> {
        toml::to_string_pretty(self).map_err(|e| GraphError::InvalidSettings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FrameGraphSettings::default().validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = FrameGraphSettings {
            render_scale: 0.5,
            parallel_execute: true,
            ..Default::default()
        };
        let text = settings.to_toml_string().unwrap();
        assert_eq!(FrameGraphSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings = FrameGraphSettings::from_toml_str("alias_transients = false\n").unwrap();
        assert!(!settings.alias_transients);
        assert_eq!(settings.render_scale, 1.0);
        assert_eq!(settings.max_idle_frames, 3);
    }

    #[rstest]
    #[case::zero_scale("render_scale = 0.0")]
    #[case::huge_scale("render_scale = 8.0")]
    #[case::negative_waste("max_alias_waste = -0.1")]
    #[case::full_waste("max_alias_waste = 1.0")]
    #[case::no_shadow_resolution("shadow_map_resolution = 0")]
    #[case::not_toml("render_scale = ")]
    fn test_invalid_settings_rejected(#[case] content: &str) {
        let err = FrameGraphSettings::from_toml_str(content).unwrap_err();
        assert!(matches!(err, GraphError::InvalidSettings(_)));
    }
}
