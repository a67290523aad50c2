//! Hand-drawn SVG charts
//!
//! Both renderers are pure: they turn records into a list of
//! [`DrawCommand`]s, and [`to_svg`] serializes that list. Every call builds
//! its geometry from scratch.

use crate::data::{AuditRecord, XpSample};
use crate::format::format_fixed;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use tracing::warn;

pub const LINE_COLOR: &str = "steelblue";
pub const AXIS_COLOR: &str = "black";
pub const PASS_COLOR: &str = "mediumseagreen";
pub const FAIL_COLOR: &str = "tomato";
/// Pie labels sit on top of either slice, so they never take a slice colour
pub const LABEL_COLOR: &str = "black";

pub const NO_XP_DATA: &str = "No XP data available.";
pub const INVALID_XP_DATA: &str = "Invalid date data.";
pub const NO_AUDIT_DATA: &str = "No audit data available.";
pub const NO_VALID_GRADES: &str = "No completed audits with valid grades.";

const XP_MARGIN: Margin = Margin {
    top: 20.0,
    right: 30.0,
    bottom: 40.0,
    left: 60.0,
};
const MARKER_RADIUS: f64 = 3.0;
const LINE_WIDTH: f64 = 2.0;
const PIE_MARGIN: f64 = 20.0;
const PIE_LABEL_OFFSET: f64 = 10.0;
const PIE_LABEL_SIZE: f64 = 10.0;

/// Size of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// One drawing primitive, independent of any drawing API
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Point,
        to: Point,
        stroke: &'static str,
    },
    /// Connected path through `points` in order
    Polyline {
        points: Vec<Point>,
        stroke: &'static str,
        stroke_width: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: &'static str,
    },
    /// Pie wedge from `start_angle` clockwise to `end_angle` (radians,
    /// 0 = 3 o'clock, y pointing down)
    Slice {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        fill: &'static str,
    },
    Text {
        at: Point,
        content: String,
        anchor: TextAnchor,
        fill: &'static str,
        font_size: Option<f64>,
        /// Degrees, around `at`
        rotation: Option<f64>,
    },
}

impl DrawCommand {
    /// Centered text in the default style
    pub fn label(at: Point, content: impl Into<String>) -> Self {
        DrawCommand::Text {
            at,
            content: content.into(),
            anchor: TextAnchor::Middle,
            fill: AXIS_COLOR,
            font_size: None,
            rotation: None,
        }
    }

    /// Text content, if this is a text command
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawCommand::Text { content, .. } => Some(content.as_str()),
            _ => None,
        }
    }
}

/// Linear mapping from a numeric domain onto `[0, range_length]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_min: f64,
    domain_max: f64,
    range_length: f64,
}

impl LinearScale {
    pub fn new(domain_min: f64, domain_max: f64, range_length: f64) -> Self {
        Self {
            domain_min,
            domain_max,
            range_length,
        }
    }

    /// Offset of `value` along the range. A zero-width domain maps
    /// everything to 0.
    pub fn map(&self, value: f64) -> f64 {
        let width = self.domain_max - self.domain_min;
        if width <= 0.0 {
            return 0.0;
        }
        (value - self.domain_min) / width * self.range_length
    }

    /// Same as [`map`](Self::map) but measured from the far end, for
    /// top-left origin surfaces
    pub fn map_inverted(&self, value: f64) -> f64 {
        self.range_length - self.map(value)
    }
}

#[derive(Debug, Clone, Copy)]
struct Margin {
    top: f64,
    right: f64,
    bottom: f64,
    left: f64,
}

/// Canvas minus margins
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl PlotArea {
    fn new(canvas: Canvas, margin: Margin) -> Self {
        Self {
            left: margin.left,
            top: margin.top,
            width: (canvas.width - margin.left - margin.right).max(0.0),
            height: (canvas.height - margin.top - margin.bottom).max(0.0),
        }
    }

    fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Running totals of `samples` in input order
pub fn cumulative_totals(samples: &[XpSample]) -> Vec<f64> {
    samples
        .iter()
        .scan(0.0, |total, sample| {
            *total += sample.amount;
            Some(*total)
        })
        .collect()
}

/// Render the cumulative XP line chart.
///
/// `samples` must already be in ascending timestamp order; they are plotted
/// as given. Samples with unparseable timestamps still count towards the
/// running total but are not drawn.
pub fn render_xp_chart(samples: &[XpSample], canvas: Canvas) -> Vec<DrawCommand> {
    let plot = PlotArea::new(canvas, XP_MARGIN);

    if samples.is_empty() {
        return vec![DrawCommand::label(plot.center(), NO_XP_DATA)];
    }

    let points: Vec<(f64, f64)> = samples
        .iter()
        .zip(cumulative_totals(samples))
        .filter_map(|(sample, total)| {
            sample
                .timestamp()
                .map(|ts| (ts.timestamp_millis() as f64, total))
        })
        .collect();

    if points.is_empty() {
        return vec![DrawCommand::label(plot.center(), INVALID_XP_DATA)];
    }

    if points.windows(2).any(|w| w[1].0 < w[0].0) {
        warn!("XP samples are not in ascending time order; plotting as received");
    }

    let (min_time, max_time) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(t, _)| {
            (lo.min(t), hi.max(t))
        });
    let max_value = points.iter().fold(1.0_f64, |acc, &(_, v)| acc.max(v));

    let x_scale = LinearScale::new(min_time, max_time, plot.width);
    let y_scale = LinearScale::new(0.0, max_value, plot.height);

    let coords: Vec<Point> = points
        .iter()
        .map(|&(t, v)| {
            Point::new(
                plot.left + x_scale.map(t),
                plot.top + y_scale.map_inverted(v),
            )
        })
        .collect();

    let mut commands = Vec::with_capacity(coords.len() + 5);

    commands.push(DrawCommand::Line {
        from: Point::new(plot.left, plot.bottom()),
        to: Point::new(plot.left + plot.width, plot.bottom()),
        stroke: AXIS_COLOR,
    });
    commands.push(DrawCommand::Line {
        from: Point::new(plot.left, plot.top),
        to: Point::new(plot.left, plot.bottom()),
        stroke: AXIS_COLOR,
    });
    commands.push(DrawCommand::label(
        Point::new(plot.center().x, plot.bottom() + XP_MARGIN.bottom - 10.0),
        "Time",
    ));
    commands.push(DrawCommand::Text {
        at: Point::new(20.0, plot.center().y),
        content: "Cumulative XP".to_string(),
        anchor: TextAnchor::Middle,
        fill: AXIS_COLOR,
        font_size: None,
        rotation: Some(-90.0),
    });

    commands.push(DrawCommand::Polyline {
        points: coords.clone(),
        stroke: LINE_COLOR,
        stroke_width: LINE_WIDTH,
    });
    commands.extend(coords.into_iter().map(|center| DrawCommand::Circle {
        center,
        radius: MARKER_RADIUS,
        fill: LINE_COLOR,
    }));

    commands
}

/// Pass/fail counts over audits with a numeric grade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditTally {
    pub passes: usize,
    pub fails: usize,
}

impl AuditTally {
    pub fn from_records(records: &[AuditRecord]) -> Self {
        records
            .iter()
            .filter_map(AuditRecord::outcome)
            .fold(Self::default(), |mut tally, passed| {
                if passed {
                    tally.passes += 1;
                } else {
                    tally.fails += 1;
                }
                tally
            })
    }

    pub fn total(&self) -> usize {
        self.passes + self.fails
    }

    pub fn pass_percentage(&self) -> f64 {
        percentage(self.passes, self.total())
    }

    pub fn fail_percentage(&self) -> f64 {
        percentage(self.fails, self.total())
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Render the pass/fail pie chart.
pub fn render_audit_chart(records: &[AuditRecord], canvas: Canvas) -> Vec<DrawCommand> {
    let center = canvas.center();

    if records.is_empty() {
        return vec![DrawCommand::label(center, NO_AUDIT_DATA)];
    }

    let tally = AuditTally::from_records(records);
    let total = tally.total();
    if total == 0 {
        return vec![DrawCommand::label(center, NO_VALID_GRADES)];
    }

    let radius = (canvas.width.min(canvas.height) / 2.0 - PIE_MARGIN).max(0.0);
    let mut commands = Vec::with_capacity(4);

    if tally.fails == 0 || tally.passes == 0 {
        // A single 360° arc collapses to nothing, so draw a plain circle.
        let fill = if tally.fails == 0 { PASS_COLOR } else { FAIL_COLOR };
        commands.push(DrawCommand::Circle {
            center,
            radius,
            fill,
        });
    } else {
        let start = -FRAC_PI_2;
        let pass_end = start + tally.passes as f64 / total as f64 * TAU;

        commands.push(DrawCommand::Slice {
            center,
            radius,
            start_angle: start,
            end_angle: pass_end,
            fill: PASS_COLOR,
        });
        commands.push(DrawCommand::Slice {
            center,
            radius,
            start_angle: pass_end,
            end_angle: start + TAU,
            fill: FAIL_COLOR,
        });
    }

    for (offset, content) in [
        (-PIE_LABEL_OFFSET, format!("Pass: {}%", format_fixed(tally.pass_percentage(), 1))),
        (PIE_LABEL_OFFSET, format!("Fail: {}%", format_fixed(tally.fail_percentage(), 1))),
    ] {
        commands.push(DrawCommand::Text {
            at: Point::new(center.x, center.y + offset),
            content,
            anchor: TextAnchor::Middle,
            fill: LABEL_COLOR,
            font_size: Some(PIE_LABEL_SIZE),
            rotation: None,
        });
    }

    commands
}

/// Serialize draw commands into a standalone `<svg>` element
pub fn to_svg(commands: &[DrawCommand], canvas: Canvas) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = num(canvas.width),
        h = num(canvas.height)
    );

    for command in commands {
        svg.push_str("\n  ");
        svg.push_str(&element(command));
    }

    svg.push_str("\n</svg>");
    svg
}

fn element(command: &DrawCommand) -> String {
    match command {
        DrawCommand::Line { from, to, stroke } => format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}"/>"#,
            num(from.x),
            num(from.y),
            num(to.x),
            num(to.y),
            stroke
        ),
        DrawCommand::Polyline {
            points,
            stroke,
            stroke_width,
        } => {
            let d = points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let op = if i == 0 { "M" } else { "L" };
                    format!("{}{},{}", op, num(p.x), num(p.y))
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                d,
                stroke,
                num(*stroke_width)
            )
        }
        DrawCommand::Circle {
            center,
            radius,
            fill,
        } => format!(
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            num(center.x),
            num(center.y),
            num(*radius),
            fill
        ),
        DrawCommand::Slice {
            center,
            radius,
            start_angle,
            end_angle,
            fill,
        } => {
            let large_arc = if end_angle - start_angle <= PI { 0 } else { 1 };
            let start = polar(*center, *radius, *start_angle);
            let end = polar(*center, *radius, *end_angle);
            format!(
                r#"<path d="M {},{} L {},{} A {},{} 0 {} 1 {},{} Z" fill="{}"/>"#,
                num(center.x),
                num(center.y),
                num(start.x),
                num(start.y),
                num(*radius),
                num(*radius),
                large_arc,
                num(end.x),
                num(end.y),
                fill
            )
        }
        DrawCommand::Text {
            at,
            content,
            anchor,
            fill,
            font_size,
            rotation,
        } => {
            let mut attrs = format!(
                r#"x="{}" y="{}" text-anchor="{}" fill="{}""#,
                num(at.x),
                num(at.y),
                anchor.as_str(),
                fill
            );
            if let Some(size) = font_size {
                attrs.push_str(&format!(r#" font-size="{}px""#, num(*size)));
            }
            if let Some(deg) = rotation {
                attrs.push_str(&format!(
                    r#" transform="rotate({} {} {})""#,
                    num(*deg),
                    num(at.x),
                    num(at.y)
                ));
            }
            format!("<text {}>{}</text>", attrs, escape_xml(content))
        }
    }
}

fn polar(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

/// Two decimals, trailing zeros trimmed
fn num(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
