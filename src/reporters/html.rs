//! HTML reporter with embedded styles and charts
//!
//! Generates a standalone HTML report that can be viewed in any browser.
//! Includes:
//! - Summary cards for the snapshot
//! - Contributor, file and history tables
//! - Commit and line-change charts (Chart.js, fed from embedded JSON)

use crate::models::{AggregateDataset, ContributorProfile};
use anyhow::Result;
use serde_json::json;
use std::collections::BTreeMap;

const CHART_JS: &str = "https://cdn.jsdelivr.net/npm/chart.js@4";

/// Render dataset as standalone HTML
pub fn render(dataset: &AggregateDataset) -> Result<String> {
    let mut html = String::new();

    html.push_str(&render_head(dataset));
    html.push_str("<body>\n<div class=\"container\">\n");
    html.push_str(&render_header(dataset));

    html.push_str("<div class=\"content\">\n");
    html.push_str(&render_summary(dataset));
    html.push_str(&render_charts());
    html.push_str(&render_contributors(dataset));
    html.push_str(&render_files(dataset));
    html.push_str(&render_history(dataset));
    html.push_str("</div>\n");

    html.push_str(&render_footer(dataset));
    html.push_str("</div>\n");
    html.push_str(&render_chart_script(dataset)?);
    html.push_str("</body>\n</html>");

    Ok(html)
}

fn render_head(dataset: &AggregateDataset) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>repocensus - {}</title>
    <script src="{CHART_JS}"></script>
    <style>
{CSS}
    </style>
</head>
"#,
        html_escape(&dataset.metadata.snapshot.remote_url)
    )
}

fn render_header(dataset: &AggregateDataset) -> String {
    let snapshot = &dataset.metadata.snapshot;
    format!(
        r#"<div class="header">
    <h1>Repository Census</h1>
    <p class="subtitle">{} @ {}</p>
    <p class="timestamp">Snapshot {} &middot; {}</p>
</div>
"#,
        html_escape(&snapshot.remote_url),
        html_escape(&snapshot.branch),
        html_escape(&snapshot.sha),
        html_escape(&snapshot.message),
    )
}

fn render_summary(dataset: &AggregateDataset) -> String {
    let cards = [
        ("Commits", dataset.history.len()),
        ("Contributors", dataset.contributors.len()),
        ("Files", dataset.files.len()),
        ("Lines", dataset.total_lines()),
        ("Insertions", dataset.total_insertions()),
        ("Deletions", dataset.total_deletions()),
    ];

    let mut html = String::from(
        "<div class=\"section\">\n    <h2 class=\"section-title\">Summary</h2>\n    <div class=\"stats-grid\">\n",
    );
    for (label, value) in cards {
        html.push_str(&format!(
            "        <div class=\"stat-item\"><div class=\"stat-value\">{}</div><div class=\"stat-label\">{}</div></div>\n",
            value, label
        ));
    }
    html.push_str("    </div>\n</div>\n");
    html
}

fn render_charts() -> String {
    r#"<div class="section">
    <h2 class="section-title">Activity</h2>
    <div class="chart-grid">
        <div class="chart-card"><canvas id="chart-commits-by-contributor"></canvas></div>
        <div class="chart-card"><canvas id="chart-changes-by-contributor"></canvas></div>
        <div class="chart-card"><canvas id="chart-commits-by-day"></canvas></div>
        <div class="chart-card"><canvas id="chart-changes-by-day"></canvas></div>
    </div>
</div>
"#
    .to_string()
}

/// Contributors ordered by active lines (descending), then name.
fn ranked_contributors(dataset: &AggregateDataset) -> Vec<(&String, &ContributorProfile)> {
    let mut ranked: Vec<_> = dataset.contributors.iter().collect();
    ranked.sort_by(|a, b| b.1.active_lines.cmp(&a.1.active_lines).then(a.0.cmp(b.0)));
    ranked
}

fn render_contributors(dataset: &AggregateDataset) -> String {
    let total_lines = dataset.total_lines();
    let mut rows = String::new();
    for (name, profile) in ranked_contributors(dataset) {
        let share = if total_lines > 0 {
            profile.active_lines as f64 / total_lines as f64 * 100.0
        } else {
            0.0
        };
        let emails: Vec<&str> = profile.identities.iter().map(String::as_str).collect();
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"muted\">{}</td><td>{}</td><td class=\"ins\">+{}</td><td class=\"del\">-{}</td><td>{}</td><td>{:.2}%</td></tr>\n",
            html_escape(name),
            html_escape(&emails.join(", ")),
            profile.commit_count,
            profile.insertions,
            profile.deletions,
            profile.active_lines,
            share
        ));
    }

    format!(
        r#"<div class="section">
    <h2 class="section-title">Contributors</h2>
    <table>
        <thead><tr><th>Name</th><th>Emails</th><th>Commits</th><th>Insertions</th><th>Deletions</th><th>Active lines</th><th>Share</th></tr></thead>
        <tbody>
{}        </tbody>
    </table>
</div>
"#,
        rows
    )
}

fn render_files(dataset: &AggregateDataset) -> String {
    let mut rows = String::new();
    for (path, file) in &dataset.files {
        rows.push_str(&format!(
            "<tr><td class=\"path\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(path),
            file.total_lines,
            file.total_commits,
            html_escape(&file.top_contributor),
            html_escape(&file.original_author),
            file.date_introduced.format("%Y-%m-%d")
        ));
    }

    format!(
        r#"<div class="section">
    <h2 class="section-title">Files</h2>
    <table>
        <thead><tr><th>Path</th><th>Lines</th><th>Commits</th><th>Top contributor</th><th>Original author</th><th>Last change</th></tr></thead>
        <tbody>
{}        </tbody>
    </table>
</div>
"#,
        rows
    )
}

fn render_history(dataset: &AggregateDataset) -> String {
    let mut rows = String::new();
    for commit in dataset.history.iter().rev() {
        rows.push_str(&format!(
            "<tr><td>{}</td><td class=\"sha\" title=\"{}\">{}</td><td>{}</td><td>{}</td><td class=\"ins\">+{}</td><td class=\"del\">-{}</td></tr>\n",
            commit.date.format("%Y-%m-%d %H:%M"),
            html_escape(&commit.sha),
            html_escape(commit.short_sha()),
            html_escape(&commit.contributor),
            html_escape(commit.summary()),
            commit.insertions,
            commit.deletions
        ));
    }

    format!(
        r#"<div class="section">
    <h2 class="section-title">History</h2>
    <table>
        <thead><tr><th>Date</th><th>Commit</th><th>Contributor</th><th>Message</th><th>Insertions</th><th>Deletions</th></tr></thead>
        <tbody>
{}        </tbody>
    </table>
</div>
"#,
        rows
    )
}

fn render_footer(dataset: &AggregateDataset) -> String {
    let collector = &dataset.metadata.collector;
    format!(
        r#"<div class="footer">
    <p>Collected {} by {}@{} ({}, repocensus {}, {})</p>
</div>
"#,
        collector.date_collected.format("%Y-%m-%d %H:%M:%S UTC"),
        html_escape(&collector.user),
        html_escape(&collector.hostname),
        html_escape(&collector.platform),
        html_escape(&collector.version),
        html_escape(&collector.git_version),
    )
}

/// Chart inputs derived from the dataset.
fn chart_data(dataset: &AggregateDataset) -> serde_json::Value {
    let ranked = ranked_contributors(dataset);

    let mut by_day: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for commit in &dataset.history {
        let day = by_day
            .entry(commit.date.format("%Y-%m-%d").to_string())
            .or_default();
        day.0 += 1;
        day.1 += commit.insertions;
        day.2 += commit.deletions;
    }

    json!({
        "contributors": ranked.iter().map(|(name, _)| name).collect::<Vec<_>>(),
        "commits": ranked.iter().map(|(_, p)| p.commit_count).collect::<Vec<_>>(),
        "insertions": ranked.iter().map(|(_, p)| p.insertions).collect::<Vec<_>>(),
        "deletions": ranked.iter().map(|(_, p)| p.deletions).collect::<Vec<_>>(),
        "days": by_day.keys().collect::<Vec<_>>(),
        "dayCommits": by_day.values().map(|d| d.0).collect::<Vec<_>>(),
        "dayInsertions": by_day.values().map(|d| d.1).collect::<Vec<_>>(),
        "dayDeletions": by_day.values().map(|d| d.2).collect::<Vec<_>>(),
    })
}

fn render_chart_script(dataset: &AggregateDataset) -> Result<String> {
    // "</" would end the script element early
    let data = serde_json::to_string(&chart_data(dataset))?.replace("</", "<\\/");
    Ok(format!(
        r#"<script type="application/json" id="census-data">{data}</script>
<script>
{CHART_SCRIPT}
</script>
"#
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const CHART_SCRIPT: &str = r#"(function () {
    if (typeof Chart === 'undefined') { return; }
    const data = JSON.parse(document.getElementById('census-data').textContent);
    const bar = (id, labels, datasets, stacked) => new Chart(document.getElementById(id), {
        type: 'bar',
        data: { labels, datasets },
        options: { responsive: true, scales: { x: { stacked }, y: { stacked, beginAtZero: true } } }
    });
    bar('chart-commits-by-contributor', data.contributors,
        [{ label: 'Commits', data: data.commits, backgroundColor: '#6366f1' }], false);
    bar('chart-changes-by-contributor', data.contributors, [
        { label: 'Insertions', data: data.insertions, backgroundColor: '#10b981' },
        { label: 'Deletions', data: data.deletions, backgroundColor: '#ef4444' }
    ], true);
    new Chart(document.getElementById('chart-commits-by-day'), {
        type: 'line',
        data: { labels: data.days, datasets: [{ label: 'Commits per day', data: data.dayCommits, borderColor: '#6366f1', tension: 0.2 }] },
        options: { responsive: true, scales: { y: { beginAtZero: true } } }
    });
    bar('chart-changes-by-day', data.days, [
        { label: 'Insertions', data: data.dayInsertions, backgroundColor: '#10b981' },
        { label: 'Deletions', data: data.dayDeletions, backgroundColor: '#ef4444' }
    ], true);
})();"#;

// Embedded CSS
const CSS: &str = r#"
:root {
    --primary-color: #0f766e;
    --background-color: #f8fafc;
    --text-color: #1e293b;
    --muted-color: #64748b;
    --card-background: white;
    --border-color: #e2e8f0;
}

* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.5;
    color: var(--text-color);
    background: var(--background-color);
    padding: 2rem;
}

.container {
    max-width: 1280px;
    margin: 0 auto;
    background: var(--card-background);
    border-radius: 12px;
    box-shadow: 0 4px 6px -1px rgba(0,0,0,0.1);
    overflow: hidden;
}

.header {
    background: linear-gradient(135deg, #0f766e 0%, #0e7490 100%);
    color: white;
    padding: 2.5rem 2rem;
}

.header h1 { font-size: 2.25rem; }
.header .subtitle { font-size: 1.1rem; opacity: 0.95; word-break: break-all; }
.header .timestamp { opacity: 0.8; font-size: 0.9rem; font-family: monospace; }

.content { padding: 2rem; }

.section { margin-bottom: 2.5rem; }
.section-title {
    font-size: 1.4rem;
    margin-bottom: 1rem;
    padding-bottom: 0.5rem;
    border-bottom: 2px solid var(--border-color);
}

.stats-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
    gap: 1rem;
}

.stat-item {
    border: 1px solid var(--border-color);
    border-radius: 8px;
    padding: 1.25rem;
    text-align: center;
}
.stat-value { font-size: 1.8rem; font-weight: bold; }
.stat-label { font-size: 0.85rem; color: var(--muted-color); text-transform: uppercase; }

.chart-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(480px, 1fr));
    gap: 1.5rem;
}
.chart-card { border: 1px solid var(--border-color); border-radius: 8px; padding: 1rem; }

table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
th, td { text-align: left; padding: 0.5rem 0.75rem; border-bottom: 1px solid var(--border-color); }
th { background: #f1f5f9; font-weight: 600; }
tbody tr:hover { background: #f8fafc; }

.path, .sha { font-family: monospace; }
.muted { color: var(--muted-color); }
.ins { color: #059669; }
.del { color: #dc2626; }

.footer {
    padding: 1.5rem 2rem;
    border-top: 1px solid var(--border-color);
    color: var(--muted-color);
    font-size: 0.85rem;
    text-align: center;
}
"#;
