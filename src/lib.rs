//! profile-dash - learner progress dashboard
//!
//! Signs in against a GraphQL learning platform, aggregates a learner's
//! progress metrics and draws them as hand-made SVG charts.
//!
//! # Features
//!
//! - Session token storage with an expiry horizon
//! - GraphQL client with transport/status/`errors` classification
//! - Profile aggregation with per-section graceful degradation
//! - Cumulative XP line chart and pass/fail pie chart, no charting library
//! - Static HTML profile page
//!
//! # Example
//!
//! ```no_run
//! use profile_dash::{chart, data::XpSample};
//!
//! let samples = vec![
//!     XpSample::new(1200.0, "2024-01-01T00:00:00Z"),
//!     XpSample::new(800.0, "2024-02-01T00:00:00Z"),
//! ];
//! let canvas = chart::Canvas::new(600.0, 300.0);
//! let svg = chart::to_svg(&chart::render_xp_chart(&samples, canvas), canvas);
//! println!("{}", svg);
//! ```

pub mod auth;
pub mod chart;
pub mod config;
pub mod credentials;
pub mod data;
pub mod error;
pub mod format;
pub mod graphql;
pub mod html;
pub mod metrics;
pub mod session;

pub use error::{Error, QueryError, Result};
