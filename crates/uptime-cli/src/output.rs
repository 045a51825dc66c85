//! Terminal rendering of a finished run.

use console::style;

use uptime_core::{CheckResult, Report};

pub fn render(report: &Report) -> String {
    let mut lines = vec![format!(
        "{} {}",
        style("uptime-check").bold(),
        style(report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")).dim()
    )];

    lines.extend(report.results.iter().map(render_result));

    let summary = report.summary();
    let fail = if summary.fail > 0 {
        style(format!("FAIL:{}", summary.fail)).red().bold()
    } else {
        style(format!("FAIL:{}", summary.fail)).dim()
    };
    lines.push(format!(
        "{} | {} | Total:{}",
        style(format!("OK:{}", summary.ok)).green(),
        fail,
        summary.total
    ));

    lines.join("\n")
}

fn render_result(r: &CheckResult) -> String {
    if r.success {
        let latency = r
            .latency_ms
            .map(|ms| format!(" {}ms", ms))
            .unwrap_or_default();
        format!(
            "  {} {} {}{}",
            style("✓").green(),
            r.url,
            style(r.actual_status.unwrap_or(r.expected_status)).dim(),
            style(latency).dim()
        )
    } else {
        let attempts = if r.attempts > 1 {
            format!(" after {} attempts", r.attempts)
        } else {
            String::new()
        };
        format!(
            "  {} {} {}{}",
            style("✗").red().bold(),
            r.url,
            style(r.error.as_deref().unwrap_or("unknown error")).red(),
            style(attempts).dim()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, success: bool, attempts: u32) -> CheckResult {
        CheckResult {
            url: url.into(),
            expected_status: 200,
            actual_status: success.then_some(200),
            success,
            error: (!success).then(|| "Network error: dns error".to_string()),
            latency_ms: success.then_some(31),
            attempts,
        }
    }

    #[test]
    fn render_lists_sites_in_order_with_totals() {
        console::set_colors_enabled(false);
        let report = Report::new(vec![
            result("https://a.com", true, 1),
            result("https://b.com", false, 3),
        ]);
        let text = render(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "  ✓ https://a.com 200 31ms");
        assert_eq!(
            lines[2],
            "  ✗ https://b.com Network error: dns error after 3 attempts"
        );
        assert_eq!(lines[3], "OK:1 | FAIL:1 | Total:2");
    }
}
