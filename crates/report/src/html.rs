//! Static HTML rendering of a `ComparisonResult`.
//!
//! The output is fully self-contained: inline CSS, no script or font
//! fetches, charts drawn as plain proportional bars. Rendering is
//! deterministic; the only timestamp in the page is the caller-supplied
//! `generated_at`.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::{Advantage, ComparisonResult, PlatformSummary};

pub struct ReportOptions {
    pub title: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportOptions {
    pub fn new(title: &str, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            generated_at,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn advantage_label(adv: Advantage, a: &str, b: &str) -> String {
    match adv {
        Advantage::A => escape(a),
        Advantage::B => escape(b),
        Advantage::Tie => "tie".to_string(),
    }
}

/// A two-value horizontal bar pair scaled against the larger value.
fn bar_pair(label: &str, a: f64, b: f64, unit: &str) -> String {
    let max = a.max(b);
    let (wa, wb) = if max > 0.0 {
        (a / max * 100.0, b / max * 100.0)
    } else {
        (0.0, 0.0)
    };
    format!(
        concat!(
            "<div class=\"chart\">\n",
            "<div class=\"chart-title\">{label}</div>\n",
            "<div class=\"bar-row\"><div class=\"bar a\" style=\"width:{wa:.1}%\"></div><span>{a:.2}{unit}</span></div>\n",
            "<div class=\"bar-row\"><div class=\"bar b\" style=\"width:{wb:.1}%\"></div><span>{b:.2}{unit}</span></div>\n",
            "</div>\n"
        ),
        label = escape(label),
        wa = wa,
        a = a,
        wb = wb,
        b = b,
        unit = unit,
    )
}

fn platform_card(side: &str, css: &str, s: &PlatformSummary) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        concat!(
            "<div class=\"card {css}\">\n",
            "<h2>{side}: {platform}</h2>\n",
            "<div class=\"metric\"><div class=\"metric-label\">Model</div><div class=\"metric-value\">{model}</div></div>\n",
            "<div class=\"metric\"><div class=\"metric-label\">Average FPS</div><div class=\"metric-value\">{fps:.2}</div></div>\n",
            "<div class=\"metric\"><div class=\"metric-label\">Average Latency</div><div class=\"metric-value\">{lat:.2} ms</div></div>\n",
            "<div class=\"metric\"><div class=\"metric-label\">Frames (ok / errored)</div><div class=\"metric-value\">{ok} / {err}</div></div>\n",
        ),
        css = css,
        side = side,
        platform = escape(&s.platform),
        model = escape(&s.model),
        fps = s.fps,
        lat = s.avg_latency_ms,
        ok = s.frame_count,
        err = s.error_count,
    );

    if !s.stage_overhead.is_empty() {
        out.push_str("<table class=\"stages\"><tr><th>Stage</th><th>avg ms</th><th>% of latency</th></tr>\n");
        for st in &s.stage_overhead {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{:.2}</td><td>{:.1}%</td></tr>\n",
                escape(&st.stage),
                st.avg_ms,
                st.pct_of_latency
            );
        }
        out.push_str("</table>\n");
    }
    out.push_str("</div>\n");
    out
}

/// Render the comparison to report bytes. Pure given its inputs.
pub fn render(cmp: &ComparisonResult, options: &ReportOptions) -> Vec<u8> {
    let name_a = cmp.a.platform.clone();
    let name_b = cmp.b.platform.clone();

    let mut body = String::new();

    body.push_str(&platform_card("A", "side-a", &cmp.a));
    body.push_str(&platform_card("B", "side-b", &cmp.b));

    let mut charts = String::new();
    if let Some(m) = cmp.metric("fps") {
        charts.push_str(&bar_pair("FPS (higher is better)", m.a, m.b, ""));
    }
    if let Some(m) = cmp.metric("avg_latency_ms") {
        charts.push_str(&bar_pair("Latency (lower is better)", m.a, m.b, " ms"));
    }
    if let Some(m) = cmp.metric("power_w") {
        charts.push_str(&bar_pair("Power (lower is better)", m.a, m.b, " W"));
    }
    if let Some(m) = cmp.metric("power_per_fps") {
        charts.push_str(&bar_pair("Power per FPS (lower is better)", m.a, m.b, " W/fps"));
    }

    let mut table = String::new();
    table.push_str("<table class=\"metrics\"><tr><th>Metric</th><th>A</th><th>B</th><th>Delta (A-B)</th><th>Ratio (A/B)</th><th>Winner</th></tr>\n");
    for m in &cmp.metrics {
        let ratio = match m.ratio {
            Some(r) => format!("{r:.3}"),
            None => "n/a".to_string(),
        };
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{}</td><td class=\"winner\">{}</td></tr>\n",
            escape(&m.name),
            m.a,
            m.b,
            m.delta,
            ratio,
            advantage_label(m.advantage, &name_a, &name_b)
        );
    }
    table.push_str("</table>\n");

    let mut skipped = String::new();
    if !cmp.only_in_a.is_empty() || !cmp.only_in_b.is_empty() {
        skipped.push_str("<div class=\"skipped\"><h2>Not comparable</h2>\n<p>Metrics reported by only one platform are listed, never defaulted to zero.</p>\n<ul>\n");
        for name in &cmp.only_in_a {
            let _ = write!(
                skipped,
                "<li><code>{}</code> only in {}</li>\n",
                escape(name),
                escape(&name_a)
            );
        }
        for name in &cmp.only_in_b {
            let _ = write!(
                skipped,
                "<li><code>{}</code> only in {}</li>\n",
                escape(name),
                escape(&name_b)
            );
        }
        skipped.push_str("</ul></div>\n");
    }

    let data_json =
        serde_json::to_string_pretty(cmp).expect("comparison serialization is infallible");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{ font-family: 'Segoe UI', Tahoma, sans-serif; background: #f0f2f5; color: #333; padding: 20px; }}
.container {{ max-width: 1100px; margin: 0 auto; }}
header {{ background: white; border-radius: 10px; padding: 24px; margin-bottom: 20px; text-align: center; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
h1 {{ color: #3558a0; margin-bottom: 6px; }}
.subtitle {{ color: #777; font-size: 0.95em; }}
.grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 20px; margin-bottom: 20px; }}
.card {{ background: white; border-radius: 10px; padding: 20px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
.card.side-a {{ border-top: 5px solid #0078d4; }}
.card.side-b {{ border-top: 5px solid #76b900; }}
.card h2 {{ margin-bottom: 12px; font-size: 1.3em; }}
.metric {{ margin-bottom: 10px; padding-bottom: 10px; border-bottom: 1px solid #eee; }}
.metric-label {{ color: #888; font-size: 0.8em; text-transform: uppercase; letter-spacing: 0.5px; }}
.metric-value {{ font-size: 1.5em; font-weight: bold; }}
.section {{ background: white; border-radius: 10px; padding: 24px; margin-bottom: 20px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
.chart {{ margin-bottom: 18px; }}
.chart-title {{ font-weight: bold; margin-bottom: 6px; }}
.bar-row {{ display: flex; align-items: center; gap: 8px; margin-bottom: 4px; }}
.bar {{ height: 18px; border-radius: 3px; min-width: 2px; }}
.bar.a {{ background: #0078d4; }}
.bar.b {{ background: #76b900; }}
.bar-row span {{ font-size: 0.85em; color: #555; }}
table {{ width: 100%; border-collapse: collapse; }}
th {{ background: #3558a0; color: white; padding: 8px 10px; text-align: left; }}
td {{ padding: 8px 10px; border-bottom: 1px solid #eee; }}
table.stages th {{ background: #eef2f8; color: #333; }}
.winner {{ color: #28a745; font-weight: bold; }}
.skipped ul {{ margin: 10px 0 0 24px; }}
footer {{ text-align: center; color: #999; font-size: 0.85em; padding: 10px; }}
</style>
</head>
<body>
<div class="container">
<header>
<h1>{title}</h1>
<p class="subtitle">Phase: {phase} | {name_a} vs {name_b}</p>
<p class="subtitle">Generated: {generated_at}</p>
</header>
<div class="grid">
{body}</div>
<div class="section">
<h2>Performance comparison</h2>
{charts}</div>
<div class="section">
<h2>Detailed metrics</h2>
{table}</div>
<div class="section">
{skipped}</div>
<footer>
<p>Bar colors: blue = {name_a}, green = {name_b}</p>
</footer>
</div>
<script type="application/json" id="comparison-data">
{data_json}
</script>
</body>
</html>
"#,
        title = escape(&options.title),
        phase = escape(&cmp.phase),
        name_a = escape(&name_a),
        name_b = escape(&name_b),
        generated_at = options.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        body = body,
        charts = charts,
        table = table,
        skipped = skipped,
        data_json = data_json,
    );

    html.into_bytes()
}

/// Write rendered report bytes to disk, creating parent directories.
pub fn write_report(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)
}
