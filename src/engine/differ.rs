//! Plan display - colored per-resource diffs

use colored::Colorize;
use declarative::{Action, DiffSummary, Error, FieldDiff, Preview, ResourceDiff, group_by_kind};

use crate::resource::iam_role_policy;

fn kind_title(kind: &str) -> &str {
    match kind {
        iam_role_policy::KIND => "IAM role policies",
        other => other,
    }
}

fn colorize_diff_line(line: &str) -> String {
    if line.starts_with("+ ") {
        line.green().to_string()
    } else if line.starts_with("- ") {
        line.red().to_string()
    } else {
        line.dimmed().to_string()
    }
}

fn display_field(field: &FieldDiff) {
    println!("│       {}", field.field.bold());
    let body = field
        .render()
        .unwrap_or_else(|| field.after.lines().map(|l| format!("+ {l}\n")).collect());
    for line in body.lines() {
        println!("│         {}", colorize_diff_line(line));
    }
}

/// One-line description of a task that could not be previewed
fn failure_detail(error: &Error) -> String {
    format!("{} failed: {error}", error.phase())
}

fn display_resource(diff: &ResourceDiff) {
    let symbol = match diff.action {
        Action::Create => "+".green(),
        Action::Update => "~".yellow(),
        Action::NoOp => "=".dimmed(),
    };
    let detail = match diff.action {
        Action::Create => "(will create)".to_string(),
        Action::Update => diff.changed_fields.join(", "),
        Action::NoOp => "(in sync)".to_string(),
    };
    println!("│   {} {:<40} {}", symbol, diff.key.name, detail.dimmed());

    for field in &diff.field_diffs {
        display_field(field);
    }
}

/// Display a discovered plan in a user-friendly format
pub fn display_preview(preview: &Preview) {
    let summary = DiffSummary::from_diffs(&preview.diffs);

    if preview.errors.is_empty() && !summary.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Plan".bold()
    );
    println!("│");

    for (kind, diffs) in group_by_kind(&preview.diffs) {
        println!("│ {}", kind_title(kind).bold());
        for diff in diffs.into_iter().filter(|d| d.has_changes()) {
            display_resource(diff);
        }
        println!("│");
    }

    if !preview.errors.is_empty() {
        println!("│ {}", "Could not plan".red().bold());
        for (key, error) in &preview.errors {
            println!("│   {} {:<40} {}", "✗".red(), key.to_string(), failure_detail(error));
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to update, {} unchanged{}",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.unchanged,
        if preview.errors.is_empty() {
            String::new()
        } else {
            format!(", {} failed", preview.errors.len().to_string().red())
        }
    );
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_diff_line_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(colorize_diff_line("+ added"), "+ added");
        assert_eq!(colorize_diff_line("- removed"), "- removed");
        assert_eq!(colorize_diff_line("  same"), "  same");
    }

    #[test]
    fn test_failure_detail_names_phase() {
        let key = declarative::ResourceKey::new("aws_iam_role_policy", "p1");
        let error = Error::decode(key, "PolicyDocument", std::io::Error::other("bad escape"));

        assert_eq!(
            failure_detail(&error),
            "discovery failed: error decoding PolicyDocument for aws_iam_role_policy.p1: bad escape"
        );
    }

    #[test]
    fn test_kind_title() {
        assert_eq!(kind_title("aws_iam_role_policy"), "IAM role policies");
        assert_eq!(kind_title("aws_s3_bucket"), "aws_s3_bucket");
    }
}
