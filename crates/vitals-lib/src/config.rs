use crate::scrub::ScrubConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Shading palette, one color per clinical band plus the trace itself.
/// Values are 0xRRGGBB.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub too_low: u32,
    pub resting: u32,
    pub moderate: u32,
    pub vigorous: u32,
    pub trace: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            too_low: 0x009AEE,
            resting: 0x2DB41E,
            moderate: 0xFEED53,
            vigorous: 0xF63C4C,
            trace: 0x00FF00,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub render_s: u32,
    pub average_s: u32,
}

impl Default for WindowSpec {
    fn default() -> Self {
        let config = ScrubConfig::default();
        Self {
            render_s: config.render_window_s,
            average_s: config.average_window_s,
        }
    }
}

/// Viewer configuration: window lengths, shading palette, and the telemetry
/// channel to read. Every field has a default so a partial file works.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub windows: WindowSpec,
    pub palette: Palette,
    pub channel: Option<String>,
}

impl ViewerConfig {
    pub fn scrub_config(&self) -> ScrubConfig {
        ScrubConfig {
            render_window_s: self.windows.render_s,
            average_window_s: self.windows.average_s,
        }
    }

    pub fn channel(&self) -> &str {
        self.channel
            .as_deref()
            .unwrap_or(crate::io::telemetry::DEFAULT_CHANNEL)
    }
}

pub fn read_config(path: &Path) -> Result<ViewerConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_builtin_windows() {
        let config = ViewerConfig::default();
        assert_eq!(config.scrub_config().render_window_s, 900);
        assert_eq!(config.scrub_config().average_window_s, 60);
        assert_eq!(config.channel(), "Solar8000/HR");
    }

    #[test]
    fn partial_file_keeps_defaults_elsewhere() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[windows]\nrender_s = 600").unwrap();
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.windows.render_s, 600);
        assert_eq!(config.windows.average_s, 60);
        assert_eq!(config.palette.trace, 0x00FF00);
    }

    #[test]
    fn channel_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "channel = \"CardioQ/HR\"").unwrap();
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.channel(), "CardioQ/HR");
    }
}
