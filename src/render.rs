use crate::format::Locale;
use crate::layers::{LegendEntry, ThematicLayer};
use crate::panel::InfoPanel;
use crate::projection::Projection;
use crate::stats::StatisticTables;
use crate::types::{ProjectedPath, RegionFeature};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// Highlight for the hovered region on the plain political map.
pub const HOVER_COLOR: &str = "#FFD700";

const LEGEND_HEIGHT: f64 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown theme '{0}' (expected light or dark)")]
pub struct ThemeParseError(String);

impl FromStr for Theme {
    type Err = ThemeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ThemeParseError(other.to_string())),
        }
    }
}

impl Theme {
    fn base_fill(self) -> &'static str {
        match self {
            Theme::Light => "#9ca3af",
            Theme::Dark => "#1a1a1a",
        }
    }

    fn stroke(self) -> (&'static str, f64) {
        match self {
            Theme::Light => ("#4b5563", 1.5),
            Theme::Dark => ("#FFD700", 0.5),
        }
    }

    fn text(self) -> &'static str {
        match self {
            Theme::Light => "#111827",
            Theme::Dark => "#e5e7eb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRegion {
    pub feature: usize,
    pub code: String,
    pub name: String,
    pub d: String,
    pub value: Option<f64>,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub hovered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn for_layer(layer: ThematicLayer, locale: Locale) -> Option<Self> {
        Some(Legend {
            title: layer.legend_title()?,
            entries: layer.scale()?.legend(locale),
        })
    }
}

/// Everything needed to draw one state of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub width: f64,
    pub height: f64,
    pub layer: ThematicLayer,
    pub theme: Theme,
    pub regions: Vec<RenderedRegion>,
    pub legend: Option<Legend>,
    pub panel: InfoPanel,
}

pub struct FrameInput<'a> {
    pub features: &'a [RegionFeature],
    pub paths: &'a [ProjectedPath],
    pub projection: &'a Projection,
    pub tables: &'a StatisticTables,
    pub layer: ThematicLayer,
    pub hover: Option<usize>,
    pub theme: Theme,
    pub locale: Locale,
}

pub fn build_frame(input: FrameInput<'_>) -> MapFrame {
    let scale = input.layer.scale();
    let (stroke, stroke_width) = input.theme.stroke();

    let regions = input
        .paths
        .iter()
        .map(|path| {
            let feature = &input.features[path.feature];
            let hovered = input.hover == Some(path.feature);
            let value = input.tables.layer_value(input.layer, &feature.code);
            let fill = match scale {
                Some(scale) => scale.color(value),
                None if hovered => HOVER_COLOR,
                None => input.theme.base_fill(),
            };
            RenderedRegion {
                feature: path.feature,
                code: feature.code.clone(),
                name: feature.name.clone(),
                d: path.d.clone(),
                value,
                fill,
                stroke,
                stroke_width,
                hovered,
            }
        })
        .collect();

    let hovered = input.hover.and_then(|i| input.features.get(i));
    MapFrame {
        width: input.projection.width,
        height: input.projection.height,
        layer: input.layer,
        theme: input.theme,
        regions,
        legend: Legend::for_layer(input.layer, input.locale),
        panel: InfoPanel::build(hovered, input.layer, input.tables, input.locale),
    }
}

/// Standalone SVG document: the map canvas, with the legend drawn below it.
pub fn to_svg(frame: &MapFrame) -> String {
    let total_height = match frame.legend {
        Some(_) => frame.height + LEGEND_HEIGHT,
        None => frame.height,
    };
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = frame.width,
        h = total_height
    );
    let _ = writeln!(svg, r#"<g class="regions" data-layer="{}">"#, frame.layer);
    for r in &frame.regions {
        let _ = writeln!(
            svg,
            r#"<path d="{}" fill="{}" stroke="{}" stroke-width="{}" data-code="{}"><title>{}</title></path>"#,
            r.d,
            r.fill,
            r.stroke,
            r.stroke_width,
            escape(&r.code),
            escape(&r.name)
        );
    }
    svg.push_str("</g>\n");

    if let Some(legend) = &frame.legend {
        let band = frame.width / legend.entries.len() as f64;
        let top = frame.height + 8.0;
        let _ = writeln!(svg, r#"<g class="legend" font-size="10" fill="{}">"#, frame.theme.text());
        let _ = writeln!(svg, r#"<text x="0" y="{}">{}</text>"#, top, escape(legend.title));
        for (i, entry) in legend.entries.iter().enumerate() {
            let x = i as f64 * band;
            let _ = writeln!(
                svg,
                r#"<rect x="{x}" y="{}" width="{band}" height="10" fill="{}"/><text x="{x}" y="{}">{}</text>"#,
                top + 6.0,
                entry.color,
                top + 30.0,
                escape(&entry.label)
            );
        }
        svg.push_str("</g>\n");
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
