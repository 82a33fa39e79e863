//! Server-rendered HTML pages for the upload flow.

use imgpress_core::models::ConversionOutcome;
use imgpress_services::BatchReport;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f4f5f7; margin: 0; padding: 2rem; color: #222; }
.container { max-width: 1100px; margin: 0 auto; }
h1 { text-align: center; }
.results-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 1.5rem; }
.result-card { background: #fff; border-radius: 12px; overflow: hidden; box-shadow: 0 2px 8px rgba(0, 0, 0, .08); }
.result-image img { width: 100%; height: 200px; object-fit: cover; display: block; }
.result-info { padding: 1rem; }
.result-info h3 { margin: 0 0 .5rem; word-break: break-all; }
.size-info { display: flex; flex-wrap: wrap; gap: .4rem; align-items: center; font-size: .9rem; }
.compression { color: #1b8a3a; font-weight: 600; }
.compression.negative { color: #b3261e; }
.download-btn, .action-btn { display: inline-block; margin-top: .8rem; padding: .5rem 1rem; border-radius: 8px; background: #3d5afe; color: #fff; text-decoration: none; }
.actions { display: flex; justify-content: center; gap: 1rem; margin-top: 2rem; }
.failures { background: #fff4f4; border-radius: 12px; padding: 1rem 1.5rem; margin-bottom: 1.5rem; }
.error-container { max-width: 480px; margin: 4rem auto; background: #fff; border-radius: 12px; padding: 2rem; text-align: center; }
"#;

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn result_card(outcome: &ConversionOutcome) -> String {
    let name = escape_html(&outcome.converted_name);
    let url = escape_html(&outcome.public_path);
    let ratio_class = if outcome.compression_ratio_percent < 0.0 {
        "compression negative"
    } else {
        "compression"
    };

    format!(
        r#"<div class="result-card">
  <div class="result-image"><img src="{url}" alt="{name}"></div>
  <div class="result-info">
    <h3>{name}</h3>
    <div class="size-info">
      <span class="original-size">{original} MB</span>
      <span class="arrow">&rarr;</span>
      <span class="converted-size">{converted} MB</span>
      <span class="{ratio_class}">{ratio}% compression</span>
    </div>
    <a href="{url}" download="{name}" class="download-btn">Download</a>
  </div>
</div>"#,
        original = outcome.original_size_mb(),
        converted = outcome.converted_size_mb(),
        ratio = outcome.compression_ratio_display(),
    )
}

/// Result page: one card per converted file, in submission order.
///
/// Items that failed under the partial-success policy are listed by name
/// above the cards.
pub fn render_success(report: &BatchReport) -> String {
    let cards: String = report.outcomes.iter().map(result_card).collect();

    let failures = if report.is_complete() {
        String::new()
    } else {
        let items: String = report
            .failures
            .iter()
            .map(|f| format!("<li>{}</li>", escape_html(&f.item)))
            .collect();
        format!(
            r#"<div class="failures"><p>These files could not be converted:</p><ul>{items}</ul></div>"#
        )
    };

    let body = format!(
        r#"<div class="container">
<h1>Conversion complete</h1>
{failures}
<div class="results-grid">
{cards}
</div>
<div class="actions">
  <a href="/" class="action-btn back-btn">New conversion</a>
  <a href="/download-all" class="action-btn download-all-btn">Download all</a>
</div>
</div>"#
    );

    page("Conversion complete", &body)
}

/// Error page for a failed batch. `message` is shown as-is after escaping
/// and must not carry internal details.
pub fn render_error(message: &str) -> String {
    let body = format!(
        r#"<div class="error-container">
<h1>Error</h1>
<p>{}</p>
<a href="/" class="action-btn back-btn">Back</a>
</div>"#,
        escape_html(message)
    );
    page("Conversion error", &body)
}
