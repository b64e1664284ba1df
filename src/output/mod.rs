pub mod formatter;

pub use formatter::{
    format_age, format_audit, format_batch_summary, format_club_detail, format_club_table,
    format_history, format_points, format_relock_report, format_tsv, should_use_colors,
};
