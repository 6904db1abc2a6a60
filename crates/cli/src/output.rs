use crate::error::CliError;
use model::pagination::state::{PagerState, PersistedPagerState};
use pager_core::pager::PageSummary;
use serde_json::{Value, json};

const MAX_CELL_WIDTH: usize = 40;

pub fn print_page_json(
    state: &PagerState,
    summary: &PageSummary,
    items: &[Value],
) -> Result<(), CliError> {
    let report = json!({
        "id": state.id,
        "type": state.collection_type,
        "page": summary.page,
        "pageSize": summary.page_size,
        "pageCount": summary.page_count,
        "resultCount": summary.raw_result_count,
        "sort": state.sort_key,
        "order": state.sort_order,
        "filters": state.non_empty_filters(),
        "result": items,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn print_page_table(
    state: &PagerState,
    summary: &PageSummary,
    items: &[Value],
    columns: Option<&str>,
) {
    let columns = match columns {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect(),
        None => infer_columns(items),
    };

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| columns.iter().map(|c| cell(item.get(c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!("{}", format_row(&columns, &widths));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        println!("{}", format_row(row, &widths));
    }

    println!();
    println!(
        "Page {} of {} ({} results, {} per page, sorted by {} {})",
        summary.page,
        summary.page_count,
        summary.raw_result_count,
        summary.page_size,
        state.sort_key,
        state.sort_order
    );
    if let Some(from) = summary.clamped_from {
        println!("Page {from} no longer exists, showing page {}", summary.page);
    }
}

pub fn print_record(id: &str, record: Option<&PersistedPagerState>) -> Result<(), CliError> {
    match record {
        Some(record) => println!("{}", serde_json::to_string_pretty(record)?),
        None => println!("No state stored for pager '{id}'"),
    }
    Ok(())
}

pub fn print_ids(namespace: &str, ids: &[String]) {
    if ids.is_empty() {
        println!("No pager state stored under '{namespace}'");
        return;
    }
    println!("Pagers stored under '{namespace}':");
    for id in ids {
        println!("  {id}");
    }
}

/// `id` first, then every other attribute in first-seen order.
fn infer_columns(items: &[Value]) -> Vec<String> {
    let mut columns = vec!["id".to_string()];
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        text
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
