//! HTML profile page with inline SVG charts

use crate::chart::{render_audit_chart, render_xp_chart, to_svg};
use crate::config::DashboardConfig;
use crate::data::parse_timestamp;
use crate::error::{Error, Result};
use crate::metrics::ProfileViewModel;
use minijinja::{context, Environment};
use std::path::PathBuf;

/// HTML template for the profile page
const PROFILE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <style>
        :root {
            --bg-primary: #f6f8fa;
            --bg-card: #ffffff;
            --text-primary: #1f2328;
            --text-muted: #656d76;
            --border-color: #d0d7de;
            --accent-red: #cf222e;
        }

        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }

        .container {
            max-width: 1000px;
            margin: 0 auto;
            padding: 2rem;
        }

        header {
            margin-bottom: 2rem;
        }

        .card {
            background: var(--bg-card);
            border: 1px solid var(--border-color);
            border-radius: 12px;
            padding: 1.25rem 1.5rem;
            margin-bottom: 1.5rem;
        }

        .label {
            color: var(--text-muted);
            font-size: 0.85rem;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }

        .error {
            color: var(--accent-red);
        }

        .charts {
            display: flex;
            flex-wrap: wrap;
            gap: 1.5rem;
        }

        .activity li {
            list-style: none;
            padding: 0.25rem 0;
            border-top: 1px solid var(--border-color);
        }

        .activity time {
            color: var(--text-muted);
            margin-left: 0.5rem;
        }

        footer {
            color: var(--text-muted);
            font-size: 0.85rem;
            text-align: center;
        }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>{{ title }}</h1>
        </header>

        {% if load_error %}
        <div class="card error" id="userInfo">
            <p>Error loading profile data. Please check the logs or try logging in again.</p>
            <p><small>{{ load_error }}</small></p>
        </div>
        {% endif %}

        <div class="card">
            <p><span class="label">Login</span><br><span id="userLogin"{% if load_error %} class="error"{% endif %}>{{ login }}</span></p>
            <p><span class="label">Total XP</span><br>
                {% if xp_error %}<span id="userXP" class="error" title="{{ xp_error }}">Error</span>{% else %}<span id="userXP">{{ xp }}</span>{% endif %}
            </p>
            <p><span class="label">Audits</span><br><span id="userAudits"{% if load_error %} class="error"{% endif %}>{{ audits }}</span></p>
        </div>

        <div class="card">
            <p class="label">Recent activity</p>
            {% if activity_error %}
            <p class="error">Error: {{ activity_error }}</p>
            {% elif activity %}
            <ul class="activity">
                {% for entry in activity %}
                <li>{{ entry.label }}<time>{{ entry.date }}</time></li>
                {% endfor %}
            </ul>
            {% else %}
            <p>No recent activity.</p>
            {% endif %}
        </div>

        <div class="charts">
            <div class="card">
                <p class="label">XP over time</p>
                {% if xp_series_error %}<p class="error">Error: {{ xp_series_error }}</p>{% endif %}
                {{ xp_svg | safe }}
            </div>
            <div class="card">
                <p class="label">Audit pass / fail</p>
                {% if audit_series_error %}<p class="error">Error: {{ audit_series_error }}</p>{% endif %}
                {{ audit_svg | safe }}
            </div>
        </div>

        <footer>
            <p>Generated {{ generated_at }}</p>
        </footer>
    </div>
</body>
</html>
"#;

#[derive(Debug, Clone, serde::Serialize)]
struct ActivityRow {
    label: String,
    date: String,
}

/// Render the profile page.
///
/// `view` is the loaded profile, or the message of the terminal load
/// failure; a failed load still produces a page with error markers and
/// empty charts.
pub fn generate_profile_page(
    view: std::result::Result<&ProfileViewModel, &str>,
    config: &DashboardConfig,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("profile.html", PROFILE_TEMPLATE)?;
    let template = env.get_template("profile.html")?;

    let (xp_samples, audit_records) = match view {
        Ok(v) => (v.xp_samples(), v.audit_records()),
        Err(_) => (&[][..], &[][..]),
    };

    let xp_svg = to_svg(&render_xp_chart(xp_samples, config.xp_canvas), config.xp_canvas);
    let audit_svg = to_svg(
        &render_audit_chart(audit_records, config.audit_canvas),
        config.audit_canvas,
    );
    let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let html = match view {
        Ok(v) => {
            let activity: Vec<ActivityRow> = v
                .activity()
                .iter()
                .map(|entry| ActivityRow {
                    label: entry.label(),
                    date: parse_timestamp(&entry.created_at)
                        .map(|ts| ts.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| entry.created_at.clone()),
                })
                .collect();

            template.render(context! {
                title => &config.title,
                login => v.login(),
                xp => v.xp_display.ready(),
                xp_error => v.xp_display.error(),
                audits => &v.audit_summary,
                activity => activity,
                activity_error => v.recent_activity.error(),
                xp_series_error => v.xp_series.error(),
                audit_series_error => v.audit_series.error(),
                xp_svg => xp_svg,
                audit_svg => audit_svg,
                generated_at => generated_at,
            })?
        }
        Err(message) => template.render(context! {
            title => &config.title,
            load_error => message,
            login => "Error",
            xp_error => message,
            audits => "Error",
            activity_error => message,
            xp_svg => xp_svg,
            audit_svg => audit_svg,
            generated_at => generated_at,
        })?,
    };

    Ok(html)
}

/// Write `index.html` (and `profile.json` for a loaded profile) into the
/// configured output directory; returns the page path
pub fn write_profile_page(
    view: std::result::Result<&ProfileViewModel, &str>,
    config: &DashboardConfig,
) -> Result<PathBuf> {
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).map_err(|e| Error::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let html = generate_profile_page(view, config)?;
    let index_path = output_dir.join("index.html");
    std::fs::write(&index_path, html).map_err(|e| Error::FileWriteError {
        path: index_path.display().to_string(),
        source: e,
    })?;

    if let Ok(v) = view {
        let data_path = output_dir.join("profile.json");
        std::fs::write(&data_path, serde_json::to_string_pretty(v)?).map_err(|e| {
            Error::FileWriteError {
                path: data_path.display().to_string(),
                source: e,
            }
        })?;
    }

    Ok(index_path)
}
