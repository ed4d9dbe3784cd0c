use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(len)))
}

/// Print rows as aligned columns. Widths count chars, not bytes, so cells
/// ending in an ellipsis line up.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| println!("{}", cells.join("  ").trim_end());

    line(
        headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| pad(h, w))
            .collect(),
    );
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in &rows {
        line(
            row.iter()
                .zip(&widths)
                .map(|(cell, &w)| pad(cell, w))
                .collect(),
        );
    }
}
