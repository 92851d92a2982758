use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap().join(".mullion") }
pub fn config_file() -> PathBuf { dirs::home_dir().unwrap().join(".mullion.toml") }
pub fn attributes_file() -> PathBuf { data_dir().join("clients.ron") }

fn yes() -> bool { true }
fn default_snap_threshold() -> i32 { 10 }
fn default_auto_raise_delay_ms() -> u64 { 250 }
fn default_title_max_len() -> usize { 512 }
fn default_titlebar_height() -> u32 { 16 }
fn default_handle_height() -> u32 { 6 }
fn default_border_width() -> u32 { 1 }
fn default_workspace_count() -> u32 { 4 }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SnapSettings {
    /// Pixel distance within which a moving frame sticks to screen and
    /// window edges. 0 disables snapping entirely.
    #[serde(default = "default_snap_threshold")]
    pub threshold: i32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            threshold: default_snap_threshold(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct MoveResizeSettings {
    /// Move the window itself while dragging instead of a wire outline.
    #[serde(default = "yes")]
    pub opaque_move: bool,
    /// Dragging past a horizontal screen edge carries the frame to the
    /// neighboring workspace.
    #[serde(default = "yes")]
    pub workspace_warping: bool,
}

impl Default for MoveResizeSettings {
    fn default() -> Self {
        Self {
            opaque_move: yes(),
            workspace_warping: yes(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FocusSettings {
    /// Give input focus to freshly mapped windows.
    #[serde(default = "yes")]
    pub focus_new: bool,
    /// Arm the single-shot raise timer whenever focus changes.
    #[serde(default)]
    pub auto_raise: bool,
    #[serde(default = "default_auto_raise_delay_ms")]
    pub auto_raise_delay_ms: u64,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            focus_new: yes(),
            auto_raise: false,
            auto_raise_delay_ms: default_auto_raise_delay_ms(),
        }
    }
}

/// Decoration metrics the geometry code needs to convert between frame and
/// client sizes. Drawing them is somebody else's problem.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct FrameMetrics {
    #[serde(default = "default_titlebar_height")]
    pub titlebar_height: u32,
    #[serde(default = "default_handle_height")]
    pub handle_height: u32,
    #[serde(default = "default_border_width")]
    pub border_width: u32,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self {
            titlebar_height: default_titlebar_height(),
            handle_height: default_handle_height(),
            border_width: default_border_width(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub snap: SnapSettings,
    #[serde(default)]
    pub move_resize: MoveResizeSettings,
    #[serde(default)]
    pub focus: FocusSettings,
    #[serde(default)]
    pub frame: FrameMetrics,
    #[serde(default = "default_workspace_count", rename = "workspaces")]
    pub workspace_count: u32,
    /// Titles longer than this are truncated; pathologically long names have
    /// a history of melting window managers.
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snap: SnapSettings::default(),
            move_resize: MoveResizeSettings::default(),
            focus: FocusSettings::default(),
            frame: FrameMetrics::default(),
            workspace_count: default_workspace_count(),
            title_max_len: default_title_max_len(),
        }
    }
}

impl Config {
    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf).context("failed to parse config")?;
        Ok(config)
    }

    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.snap.threshold, 10);
        assert_eq!(config.workspace_count, 4);
        assert!(config.move_resize.workspace_warping);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            workspaces = 9

            [snap]
            threshold = 0

            [focus]
            auto_raise = true
            "#,
        )
        .unwrap();
        assert_eq!(config.snap.threshold, 0);
        assert_eq!(config.workspace_count, 9);
        assert!(config.focus.auto_raise);
        assert_eq!(config.focus.auto_raise_delay_ms, 250);
        assert!(config.move_resize.opaque_move);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[snap]\nthreshhold = 3\n").is_err());
    }
}
