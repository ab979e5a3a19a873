//! Console report of a finished run

use crate::output::summary::RunSummary;

/// Share of `part` in `whole` as a percentage, 0 when `whole` is 0
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Prints the summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Run id: {}", summary.run_id);
    println!("  Scraper: {}", summary.scraper_name);
    if !summary.source.is_empty() {
        println!("  Source: {}", summary.source);
    }
    println!("  Started: {} UTC", summary.start_time_utc);
    println!("  Finished: {} UTC", summary.end_time_utc);
    println!(
        "  Elapsed: {}m {}s",
        summary.elapsed_minutes,
        summary.elapsed_seconds % 60
    );
    println!("  Outcome: {}", summary.notes);
    println!();

    println!("Inputs:");
    println!("  What terms: {}", summary.what_inputs.len());
    println!("  Where terms: {}", summary.where_inputs.len());
    println!("  Category matching: {}", summary.category_matching);
    println!();

    println!("Listings:");
    println!("  Encountered: {}", summary.total_encountered);
    println!(
        "  Unique: {} ({:.1}%)",
        summary.unique_items,
        percentage(summary.unique_items, summary.total_encountered)
    );
    println!(
        "  Duplicates: {} ({:.1}%)",
        summary.duplicate_items,
        percentage(summary.duplicate_items, summary.total_encountered)
    );
    println!("  Excluded: {}", summary.excluded_record_count);
    println!("  Saved: {}", summary.saved_items);
    if summary.written_items != summary.saved_items {
        println!("  Written: {} (sink errors occurred)", summary.written_items);
    }
    println!();

    println!("Requests:");
    println!("  Issued: {}", summary.total_requests);
    println!("  Responses: {}", summary.total_responses);
    println!("  Errors: {}", summary.errors);
    println!();

    println!("Files:");
    println!("  Output: {}", summary.output_file);
    println!("  Summary: {}", summary.summary_file);
    if let Some(url) = &summary.output_url {
        println!("  Output URL: {}", url);
    }
    if let Some(url) = &summary.summary_url {
        println!("  Summary URL: {}", url);
    }
}
