use std::io::IsTerminal;
use chrono::{DateTime, Duration, Utc};
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::catalog::TierTable;
use crate::club::Club;
use crate::ledger::ActivityLogEntry;
use crate::reconcile::{AuditReport, BatchSummary, RelockReport};
use crate::scoring::{PenaltySource, ScoreResult};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format points without a trailing ".0" (1870, 12.5)
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{:.0}", points)
    } else {
        format!("{:.1}", points)
    }
}

/// Colour a tier name by its rank: top tier green, next yellow, rest red
fn paint_tier(name: &str, tiers: &TierTable, use_colors: bool) -> String {
    if !use_colors {
        return name.to_string();
    }
    match tiers.rank(name) {
        0 => name.green().bold().to_string(),
        1 => name.yellow().to_string(),
        _ => name.red().to_string(),
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a club name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Standings table: Rank, Total, Tier, Name, id
/// Rank column: 3 chars (fits "99."), total right-aligned in 6 chars
pub fn format_club_table(clubs: &[Club], tiers: &TierTable, use_colors: bool) -> String {
    if clubs.is_empty() {
        return "No clubs registered.".to_string();
    }

    let term_width = get_terminal_width();
    let tier_width = clubs
        .iter()
        .map(|c| c.classification.chars().count())
        .max()
        .unwrap_or(0);
    let total_width = 6;
    let separator = "  ";

    clubs
        .iter()
        .enumerate()
        .map(|(idx, club)| {
            let rank = format!("{:>2}.", idx + 1);
            let total = format!("{:>width$}", format_points(club.total_score), width = total_width);
            let pad = tier_width.saturating_sub(club.classification.chars().count());
            let tier = format!(
                "{}{}",
                paint_tier(&club.classification, tiers, use_colors),
                " ".repeat(pad)
            );

            let fixed_width = 4 + total_width + tier_width + separator.len() * 3 + club.id.len();
            let name = match term_width {
                Some(width) if width > fixed_width + 10 => truncate_name(&club.name, width - fixed_width),
                Some(_) => truncate_name(&club.name, 20),
                None => club.name.clone(),
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    rank.dimmed(),
                    total.bold(),
                    separator,
                    tier,
                    separator,
                    name,
                    separator,
                    club.id.dimmed()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    rank, total, separator, tier, separator, name, separator, club.id
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tab-separated standings for scripting
/// Columns: total, classification, id, name (no headers, no colors)
pub fn format_tsv(clubs: &[Club]) -> String {
    clubs
        .iter()
        .map(|club| {
            format!(
                "{}\t{}\t{}\t{}",
                format_points(club.total_score),
                club.classification,
                club.id,
                club.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line club view with every deduction that contributes to the total
pub fn format_club_detail(
    club: &Club,
    result: &ScoreResult,
    tiers: &TierTable,
    use_colors: bool,
) -> String {
    let breakdown = &result.breakdown;
    let mut lines = Vec::new();

    let title = format!("{} ({})", club.name, club.id);
    lines.push(if use_colors {
        title.bold().to_string()
    } else {
        title
    });
    if !club.region.is_empty() {
        lines.push(format!("  Region: {}", club.region));
    }
    lines.push(format!("  Members: {}", club.members));
    lines.push(format!(
        "  Total: {} / {}",
        format_points(result.total),
        format_points(breakdown.max_score)
    ));
    lines.push(format!(
        "  Classification: {}",
        paint_tier(&result.classification, tiers, use_colors)
    ));
    if club.total_score != result.total || club.classification != result.classification {
        let warning = format!(
            "  Cached {} ({}) is stale; run `reclassify`",
            format_points(club.total_score),
            club.classification
        );
        lines.push(if use_colors {
            warning.yellow().to_string()
        } else {
            warning
        });
    }
    lines.push(format!("  Evaluated criteria: {}", breakdown.evaluated));

    if breakdown.penalties.is_empty() {
        lines.push("  No deductions.".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "  Deductions: {} (criteria {}, demerits {})",
        format_points(breakdown.criterion_penalty + breakdown.demerit_penalty),
        format_points(breakdown.criterion_penalty),
        format_points(breakdown.demerit_penalty)
    ));
    for p in &breakdown.penalties {
        let tag = match p.source {
            PenaltySource::Criterion => format!("scored {}", format_points(p.value)),
            PenaltySource::Demerit => "demerit".to_string(),
        };
        let amount = format!("-{}", format_points(p.penalty));
        let amount = if use_colors {
            amount.red().to_string()
        } else {
            amount
        };
        lines.push(format!("    {:>6}  {} - {} ({})", amount, p.address, p.description, tag));
    }

    lines.join("\n")
}

pub fn format_relock_report(report: &RelockReport) -> String {
    let mut lines = vec![format!(
        "Re-locked {} changed, restored {} untouched",
        report.locked.len(),
        report.restored
    )];
    for address in &report.locked {
        lines.push(format!("  locked   {}", address));
    }
    for address in &report.skipped_zero {
        lines.push(format!("  zeroed   {} (left unevaluated)", address));
    }
    lines.join("\n")
}

pub fn format_batch_summary(label: &str, summary: &BatchSummary, use_colors: bool) -> String {
    let mut lines = vec![format!(
        "{}: {} processed, {} corrected, {} failed",
        label, summary.processed, summary.corrected, summary.failed
    )];
    for (club, error) in &summary.failures {
        let line = format!("  {}: {}", club, error);
        lines.push(if use_colors {
            line.red().to_string()
        } else {
            line
        });
    }
    if !summary.invalid_leaves.is_empty() {
        lines.push(format!("  {} stored values not allowed:", summary.invalid_leaves.len()));
        for leaf in &summary.invalid_leaves {
            lines.push(format!(
                "    {} {} = {}",
                leaf.club,
                leaf.address,
                format_points(leaf.value)
            ));
        }
    }
    lines.join("\n")
}

pub fn format_audit(report: &AuditReport) -> String {
    let mut lines: Vec<String> = report
        .drifts
        .iter()
        .map(|d| {
            format!(
                "{}: cached {} ({}), derived {} ({})",
                d.club,
                format_points(d.cached_total),
                d.cached_tier,
                format_points(d.derived_total),
                d.derived_tier
            )
        })
        .collect();
    if !report.failures.is_empty() {
        lines.push(format!("{} clubs could not be checked:", report.failures.len()));
        for (club, err) in &report.failures {
            lines.push(format!("  {}: {}", club, err));
        }
    }
    if lines.is_empty() {
        return "All cached totals are consistent.".to_string();
    }
    lines.join("\n")
}

/// Activity log, oldest first, with relative ages
pub fn format_history(entries: &[ActivityLogEntry], now: DateTime<Utc>, use_colors: bool) -> String {
    if entries.is_empty() {
        return "No activity recorded.".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let age = format!("{:>4}", format_age(now - entry.at));
            if use_colors {
                format!("{}  {}  {}", age.dimmed(), entry.actor.yellow(), entry.kind.summary())
            } else {
                format!("{}  {}  {}", age, entry.actor, entry.kind.summary())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}
