use crate::models::RunStatistics;

const MAX_LISTED_ERRORS: usize = 10;
const RULE: &str = "============================================================";

/// Lines of the end-of-run summary.
pub fn summary_lines(stats: &RunStatistics) -> Vec<String> {
    let mut lines = vec![
        RULE.to_string(),
        "FINAL SUMMARY".to_string(),
        RULE.to_string(),
        format!("Total processed: {}", stats.total),
        format!("Success: {} ({:.1}%)", stats.success, stats.success_rate()),
        format!("Failed: {}", stats.failed),
        format!("No image: {}", stats.no_image),
    ];

    if !stats.errors.is_empty() {
        lines.push(format!("Errors ({}):", stats.errors.len()));
        for error in stats.errors.iter().take(MAX_LISTED_ERRORS) {
            lines.push(format!("  - {}", error));
        }
        if stats.errors.len() > MAX_LISTED_ERRORS {
            lines.push(format!("  ... and {} more", stats.errors.len() - MAX_LISTED_ERRORS));
        }
    }

    lines.push(RULE.to_string());
    lines
}

pub fn log_summary(stats: &RunStatistics) {
    for line in summary_lines(stats) {
        tracing::info!("{}", line);
    }
}
