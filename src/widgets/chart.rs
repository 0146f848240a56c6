//! Chart Configuration
//!
//! Serializable chart descriptions handed to a widget backend, plus the
//! preset charts used by the dashboard pages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Chart palette
pub mod palette {
    pub const PRIMARY: &str = "#3b82f6";
    pub const SUCCESS: &str = "#10b981";
    pub const WARNING: &str = "#f59e0b";
    pub const ERROR: &str = "#ef4444";
    pub const INFO: &str = "#06b6d4";
    pub const GRAY: &str = "#6b7280";

    /// Series colors, cycled for multi-series charts
    pub const SERIES: [&str; 5] = [PRIMARY, SUCCESS, WARNING, ERROR, INFO];

    /// Translucent fill for a series color
    pub fn fill(color: &str) -> String {
        format!("{}20", color)
    }
}

/// Rendering backend discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Doughnut,
    Matrix,
}

/// How a re-render should be animated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Animate the transition
    Active,
    /// Redraw without animation
    None,
}

/// One data series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Value>,
    /// Backend-specific styling (tension, fill, point radius, ...)
    #[serde(flatten)]
    pub style: serde_json::Map<String, Value>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            label: Some(label.into()),
            data,
            ..Default::default()
        }
    }

    pub fn from_numbers(label: impl Into<String>, values: &[f64]) -> Self {
        Self::new(label, values.iter().map(|v| json!(v)).collect())
    }

    pub fn color(mut self, color: &str) -> Self {
        self.border_color = Some(json!(color));
        self.background_color = Some(json!(palette::fill(color)));
        self
    }

    pub fn style(mut self, key: &str, value: Value) -> Self {
        self.style.insert(key.to_string(), value);
        self
    }
}

/// Labels and series of a chart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    /// Append a value to the first series, dropping its oldest point so the
    /// series keeps its length. Returns false when there is no series.
    pub fn push_rolling(&mut self, value: f64) -> bool {
        let Some(series) = self.datasets.first_mut() else {
            return false;
        };
        series.data.push(json!(value));
        series.data.remove(0);
        true
    }
}

/// Everything a backend needs to construct a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    #[serde(default)]
    pub options: Value,
}

impl WidgetConfig {
    pub fn new(kind: ChartKind, data: ChartData) -> Self {
        Self {
            kind,
            data,
            options: base_options(),
        }
    }

    /// Merge `patch` into the options, object keys recursively
    pub fn with_options(mut self, patch: Value) -> Self {
        merge(&mut self.options, patch);
        self
    }
}

/// Shared options for every chart
pub fn base_options() -> Value {
    let axis = json!({
        "grid": { "color": "rgba(255, 255, 255, 0.1)" },
        "ticks": { "color": "#94a3b8", "font": { "size": 11 } }
    });

    json!({
        "responsive": true,
        "maintainAspectRatio": false,
        "plugins": {
            "legend": { "labels": { "color": "#cbd5e1", "font": { "size": 12 } } }
        },
        "scales": { "x": axis.clone(), "y": axis }
    })
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

fn tooltip(border: Option<&str>) -> Value {
    let mut tooltip = json!({
        "backgroundColor": "rgba(0, 0, 0, 0.8)",
        "titleColor": "#ffffff",
        "bodyColor": "#ffffff"
    });
    if let Some(color) = border {
        merge(&mut tooltip, json!({ "borderColor": color, "borderWidth": 1 }));
    }
    tooltip
}

// ============================================
// Presets
// ============================================

/// Hourly message volume over the last day
pub fn message_chart(hourly_counts: Option<&[f64]>) -> WidgetConfig {
    let counts = hourly_counts.map(<[f64]>::to_vec).unwrap_or_else(|| vec![0.0; 24]);
    let labels = (0..counts.len()).map(|h| format!("{}:00", h)).collect();

    let dataset = Dataset::from_numbers("Messages", &counts)
        .color(palette::PRIMARY)
        .style("tension", json!(0.4))
        .style("fill", json!(true))
        .style("pointRadius", json!(3))
        .style("pointHoverRadius", json!(5));

    WidgetConfig::new(
        ChartKind::Line,
        ChartData {
            labels,
            datasets: vec![dataset],
        },
    )
    .with_options(json!({
        "plugins": { "legend": { "display": false }, "tooltip": tooltip(Some(palette::PRIMARY)) },
        "scales": { "y": { "beginAtZero": true } }
    }))
}

/// Success vs failure doughnut, `rate` in percent
pub fn success_rate_chart(rate: f64) -> WidgetConfig {
    let rate = rate.clamp(0.0, 100.0);
    let dataset = Dataset::from_numbers("", &[rate, 100.0 - rate])
        .style("borderWidth", json!(0))
        .style("hoverOffset", json!(4));
    let dataset = Dataset {
        label: None,
        background_color: Some(json!([palette::SUCCESS, palette::ERROR])),
        ..dataset
    };

    WidgetConfig::new(
        ChartKind::Doughnut,
        ChartData {
            labels: vec!["Success".to_string(), "Failure".to_string()],
            datasets: vec![dataset],
        },
    )
    .with_options(json!({
        "cutout": "70%",
        "plugins": {
            "legend": {
                "position": "bottom",
                "labels": { "color": "#cbd5e1", "padding": 20, "usePointStyle": true }
            },
            "tooltip": tooltip(None)
        }
    }))
}

/// CPU / memory / disk / network usage bars, in percent
pub fn resource_chart(usage: Option<[f64; 4]>) -> WidgetConfig {
    let usage = usage.unwrap_or([0.0; 4]);
    let mut dataset = Dataset::from_numbers("Usage (%)", &usage).style("borderWidth", json!(0));
    dataset.background_color = Some(json!([
        palette::PRIMARY,
        palette::SUCCESS,
        palette::WARNING,
        palette::INFO
    ]));

    WidgetConfig::new(
        ChartKind::Bar,
        ChartData {
            labels: ["CPU", "Memory", "Disk", "Network"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            datasets: vec![dataset],
        },
    )
    .with_options(json!({
        "plugins": { "legend": { "display": false } },
        "scales": { "y": { "beginAtZero": true, "max": 100 } }
    }))
}

/// Multi-series trend lines; series colors are cycled from the palette
pub fn trend_chart(labels: Vec<String>, series: Vec<(String, Vec<f64>)>) -> WidgetConfig {
    let datasets = series
        .into_iter()
        .enumerate()
        .map(|(idx, (label, values))| {
            Dataset::from_numbers(label, &values)
                .color(palette::SERIES[idx % palette::SERIES.len()])
                .style("tension", json!(0.4))
                .style("fill", json!(false))
        })
        .collect();

    WidgetConfig::new(ChartKind::Line, ChartData { labels, datasets }).with_options(json!({
        "interaction": { "mode": "index", "intersect": false },
        "scales": { "y": { "beginAtZero": true } }
    }))
}

/// Zero-filled rolling line of `max_points` samples
pub fn realtime_chart(max_points: usize) -> WidgetConfig {
    let dataset = Dataset::from_numbers("Live", &vec![0.0; max_points])
        .color(palette::SUCCESS)
        .style("borderWidth", json!(2))
        .style("fill", json!(true))
        .style("tension", json!(0.4))
        .style("pointRadius", json!(0));

    WidgetConfig::new(
        ChartKind::Line,
        ChartData {
            labels: (0..max_points).map(|i| i.to_string()).collect(),
            datasets: vec![dataset],
        },
    )
    .with_options(json!({
        "scales": { "x": { "display": false }, "y": { "beginAtZero": true } },
        "plugins": { "legend": { "display": false } },
        "animation": { "duration": 0 }
    }))
}

/// One cell of the weekly activity heatmap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    /// Hour of day, 0-23
    pub x: u8,
    /// Day of week, 0 = Sunday
    pub y: u8,
    pub v: f64,
}

/// Day-of-week by hour-of-day activity matrix
pub fn heatmap_chart(cells: Option<Vec<HeatCell>>) -> WidgetConfig {
    let cells = cells.unwrap_or_else(|| {
        (0..7u8)
            .flat_map(|y| (0..24u8).map(move |x| HeatCell { x, y, v: 0.0 }))
            .collect()
    });

    let dataset = Dataset {
        label: Some("Activity".to_string()),
        data: cells.iter().map(|c| json!(c)).collect(),
        border_color: Some(json!("rgba(255, 255, 255, 0.1)")),
        ..Default::default()
    }
    .style("borderWidth", json!(1));

    WidgetConfig::new(
        ChartKind::Matrix,
        ChartData {
            labels: Vec::new(),
            datasets: vec![dataset],
        },
    )
    .with_options(json!({
        "plugins": { "legend": { "display": false } },
        "scales": {
            "x": { "type": "linear", "min": 0, "max": 23 },
            "y": { "type": "linear", "min": 0, "max": 6, "reverse": true }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_chart_shape() {
        let config = message_chart(None);
        assert_eq!(config.kind, ChartKind::Line);
        assert_eq!(config.data.labels.len(), 24);
        assert_eq!(config.data.labels[13], "13:00");
        assert_eq!(config.options["plugins"]["legend"]["display"], json!(false));
        // Merged, not replaced
        assert_eq!(config.options["scales"]["y"]["beginAtZero"], json!(true));
        assert_eq!(config.options["scales"]["y"]["ticks"]["color"], json!("#94a3b8"));
    }

    #[test]
    fn test_success_rate_split() {
        let config = success_rate_chart(98.5);
        let data = &config.data.datasets[0].data;
        assert_eq!(data[0], json!(98.5));
        assert_eq!(data[1], json!(1.5));

        let clamped = success_rate_chart(140.0);
        assert_eq!(clamped.data.datasets[0].data[1], json!(0.0));
    }

    #[test]
    fn test_trend_colors_cycle() {
        let series = (0..6).map(|i| (format!("s{}", i), vec![1.0])).collect();
        let config = trend_chart(vec!["mon".into()], series);
        assert_eq!(config.data.datasets[0].border_color, Some(json!(palette::PRIMARY)));
        assert_eq!(config.data.datasets[5].border_color, Some(json!(palette::PRIMARY)));
    }

    #[test]
    fn test_push_rolling_keeps_length() {
        let mut data = realtime_chart(5).data;
        for v in 1..=7 {
            assert!(data.push_rolling(v as f64));
        }
        let series = &data.datasets[0].data;
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], json!(3.0));
        assert_eq!(series[4], json!(7.0));

        assert!(!ChartData::default().push_rolling(1.0));
    }

    #[test]
    fn test_heatmap_default_grid() {
        let config = heatmap_chart(None);
        assert_eq!(config.kind, ChartKind::Matrix);
        assert_eq!(config.data.datasets[0].data.len(), 7 * 24);
    }

    #[test]
    fn test_config_serializes_type_tag() {
        let json = serde_json::to_value(resource_chart(Some([25.0, 65.0, 45.0, 30.0]))).unwrap();
        assert_eq!(json["type"], "bar");
        assert_eq!(json["data"]["datasets"][0]["label"], "Usage (%)");
        assert_eq!(json["data"]["datasets"][0]["borderWidth"], 0);
    }
}
