use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use dbload::pipeline::{FileOutcome, RunSummary};

pub fn print_summary(summary: &RunSummary) {
    if summary.reports.is_empty() {
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    table.set_header(vec!["File", "Format", "Result", "Table", "Rows", "As text"]);
    for report in &summary.reports {
        let format = report.format.map_or("-", |f| f.name());
        let file = report.path.display().to_string();
        match &report.outcome {
            FileOutcome::Loaded { relation, stats } => {
                table.add_row(vec![
                    Cell::new(file),
                    Cell::new(format),
                    Cell::new("loaded").fg(Color::Green),
                    Cell::new(relation),
                    Cell::new(stats.rows),
                    Cell::new(stats.coercion_fallbacks),
                ]);
            }
            FileOutcome::Failed { error, .. } => {
                table.add_row(vec![
                    Cell::new(file),
                    Cell::new(format),
                    Cell::new(error).fg(Color::Red),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }
    println!("{table}");
    println!(
        "{} loaded, {} skipped, {} rows",
        summary.loaded(),
        summary.failed(),
        summary.rows()
    );
}
