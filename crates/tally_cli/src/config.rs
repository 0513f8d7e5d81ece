//! Scene files
//!
//! A scene (`tally.toml`) lists the counting labels to run side by side:
//!
//! ```toml
//! [scheduler]
//! tick_rate = 30
//!
//! [[label]]
//! name = "plain"
//! to = 100
//! duration = 3
//!
//! [[label]]
//! name = "styled"
//! to = 1000
//! duration = 1
//! easing = "ease-out"
//! template = "Score: {value}"
//! bold = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tally_animation::{AnimatorConfig, Color, Easing, NumberFormat, SchedulerConfig};

/// Default scene file name
pub const SCENE_FILE: &str = "tally.toml";

/// Placeholder replaced by the formatted value in templates
pub const VALUE_PLACEHOLDER: &str = "{value}";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneFile {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default, rename = "label")]
    pub labels: Vec<LabelConfig>,
}

/// One counting label
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelConfig {
    pub name: String,
    #[serde(default)]
    pub from: f64,
    pub to: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(flatten)]
    pub animator: AnimatorConfig,
    /// Text around the formatted value, e.g. `"Score: {value}"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Render as bold rich text
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    /// Blend from this color while counting (`#RRGGBB`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_color: Option<String>,
    /// Switch to this color once the count finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_color: Option<String>,
}

fn default_duration() -> f64 {
    tally_animation::DEFAULT_DURATION
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn parse_color(label: &str, field: &str, value: Option<&str>) -> Result<Option<Color>> {
    value
        .map(|literal| {
            Color::parse_hex(literal)
                .with_context(|| format!("Label '{}': invalid {}", label, field))
        })
        .transpose()
}

/// A label with its colors parsed
pub struct ResolvedColors {
    pub transition: Option<(Color, Color)>,
    pub completion: Option<Color>,
}

impl LabelConfig {
    pub fn new(name: &str, from: f64, to: f64, duration: f64) -> Self {
        Self {
            name: name.to_string(),
            from,
            to,
            duration,
            animator: AnimatorConfig::default(),
            template: None,
            bold: false,
            start_color: None,
            end_color: None,
            completion_color: None,
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.animator.easing = easing;
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.animator.format = format.to_string();
        self
    }

    pub fn template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn colors(mut self, start: &str, end: &str) -> Self {
        self.start_color = Some(start.to_string());
        self.end_color = Some(end.to_string());
        self
    }

    pub fn completion_color(mut self, color: &str) -> Self {
        self.completion_color = Some(color.to_string());
        self
    }

    /// Check formats and colors, returning the parsed colors
    pub fn resolve(&self) -> Result<ResolvedColors> {
        NumberFormat::parse(&self.animator.format)
            .with_context(|| format!("Label '{}': invalid format", self.name))?;

        let start = parse_color(&self.name, "start_color", self.start_color.as_deref())?;
        let end = parse_color(&self.name, "end_color", self.end_color.as_deref())?;
        let transition = match (start, end) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => anyhow::bail!(
                "Label '{}': start_color and end_color must be set together",
                self.name
            ),
        };

        let completion = parse_color(
            &self.name,
            "completion_color",
            self.completion_color.as_deref(),
        )?;

        Ok(ResolvedColors {
            transition,
            completion,
        })
    }
}

impl SceneFile {
    /// Load a scene from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let scene: SceneFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            anyhow::bail!("Scene has no [[label]] entries");
        }
        for label in &self.labels {
            label.resolve()?;
        }
        Ok(())
    }

    /// The counters of the sample app
    pub fn demo() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            labels: vec![
                LabelConfig::new("integer", 0.0, 100.0, 3.0),
                LabelConfig::new("decimal", 0.0, 100.0, 3.0).format("%f"),
                LabelConfig::new("ease-in-out", 0.0, 100.0, 3.0)
                    .easing(Easing::EaseInOut)
                    .template("EaseInOutAnimation: {value}"),
                LabelConfig::new("ease-out", 0.0, 1000.0, 1.0)
                    .easing(Easing::EaseOut)
                    .template("EaseOutAnimation + attributedString: {value}")
                    .bold(),
                LabelConfig::new("recolor", 0.0, 1000.0, 1.0)
                    .colors("#000000", "#000000")
                    .completion_color("#00FF00"),
                LabelConfig::new("blend", 0.0, 1000.0, 2.0)
                    .easing(Easing::EaseIn)
                    .colors("#FF0000", "#00FF00"),
            ],
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene() {
        let scene: SceneFile = toml::from_str(
            r##"
            [scheduler]
            tick_rate = 60

            [[label]]
            name = "score"
            to = 500
            duration = 2
            easing = "ease-in"
            easing_rate = 2.0
            format = "%05d"
            template = "Score {value}"
            start_color = "#000000"
            end_color = "#00ff00"
            "##,
        )
        .unwrap();

        assert_eq!(scene.scheduler.tick_rate, 60);
        let label = &scene.labels[0];
        assert_eq!(label.from, 0.0);
        assert_eq!(label.to, 500.0);
        assert_eq!(label.animator.easing, Easing::EaseIn);
        assert_eq!(label.animator.easing_rate, 2.0);
        assert_eq!(label.animator.format, "%05d");

        let colors = label.resolve().unwrap();
        assert_eq!(colors.transition, Some((Color::BLACK, Color::GREEN)));
        assert!(colors.completion.is_none());
    }

    #[test]
    fn test_defaults() {
        let scene: SceneFile = toml::from_str("[[label]]\nname = \"a\"\nto = 1\n").unwrap();
        let label = &scene.labels[0];
        assert_eq!(label.duration, 0.3);
        assert_eq!(label.animator, AnimatorConfig::default());
        assert_eq!(scene.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let bad_format = LabelConfig::new("a", 0.0, 1.0, 1.0).format("%s");
        assert!(bad_format.resolve().is_err());

        let half_colors = LabelConfig {
            start_color: Some("#000000".to_string()),
            ..LabelConfig::new("b", 0.0, 1.0, 1.0)
        };
        assert!(half_colors.resolve().is_err());

        let bad_color = LabelConfig::new("c", 0.0, 1.0, 1.0).completion_color("green");
        assert!(bad_color.resolve().is_err());

        assert!(SceneFile::default().validate().is_err());
    }

    #[test]
    fn test_demo_round_trips_through_toml() {
        let demo = SceneFile::demo();
        demo.validate().unwrap();

        let text = demo.to_toml().unwrap();
        let parsed: SceneFile = toml::from_str(&text).unwrap();
        assert_eq!(parsed.labels.len(), demo.labels.len());
        assert_eq!(parsed.labels[3].animator.easing, Easing::EaseOut);
        assert!(parsed.labels[3].bold);
    }
}
