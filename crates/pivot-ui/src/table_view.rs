//! Pivot table rendering for the viewer.
//!
//! Renders a bordered [`ratatui::widgets::Table`]: key columns, one count
//! column per month in fiscal order, and a highlighted totals row.

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use pivot_core::formatting::format_count;
use pivot_core::models::PivotTable;

use crate::themes::Theme;

/// Label in the first column of the totals row.
pub const TOTAL_LABEL: &str = "合計";

/// Display width of every column: the widest of its header and cells.
pub fn column_widths(table: &PivotTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.width()).collect();
    let key_width = table.layout.columns().len();

    for row in &table.rows {
        for (i, value) in row.key.values(table.layout).into_iter().enumerate() {
            widths[i] = widths[i].max(value.width());
        }
        for (j, count) in row.counts.iter().enumerate() {
            let w = &mut widths[key_width + j];
            *w = (*w).max(format_count(*count).len());
        }
    }
    for (j, total) in table.month_totals().iter().enumerate() {
        let w = &mut widths[key_width + j];
        *w = (*w).max(format_count(*total).len());
    }
    if let Some(first) = widths.first_mut() {
        *first = (*first).max(TOTAL_LABEL.width());
    }
    widths
}

/// Number of data rows that fit in `area` below the border and header, with
/// one line kept for the totals row.
pub fn visible_rows(area: Rect) -> usize {
    area.height.saturating_sub(4) as usize
}

/// Render `table` into `area`, skipping the first `scroll` data rows.
pub fn render_pivot_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    table: &PivotTable,
    scroll: usize,
    theme: &Theme,
) {
    let key_width = table.layout.columns().len();

    let header = Row::new(
        table
            .columns()
            .into_iter()
            .map(|h| Cell::from(h).style(theme.table_header)),
    )
    .height(1);

    let count_cell = |count: u64, style: Style| {
        let text = Line::from(format_count(count)).right_aligned();
        Cell::from(text).style(style)
    };

    let mut rows: Vec<Row> = table
        .rows
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible_rows(area))
        .map(|(i, row)| {
            let style = theme.row_style(i);
            let keys = row
                .key
                .values(table.layout)
                .into_iter()
                .map(|v| Cell::from(v.to_string()));
            let counts = row.counts.iter().map(|c| {
                let style = if *c == 0 { theme.table_zero } else { style };
                count_cell(*c, style)
            });
            Row::new(keys.chain(counts).collect::<Vec<_>>()).style(style)
        })
        .collect();

    let mut total_cells = vec![Cell::from(TOTAL_LABEL)];
    total_cells.extend((1..key_width).map(|_| Cell::from("")));
    total_cells.extend(
        table
            .month_totals()
            .into_iter()
            .map(|t| count_cell(t, theme.table_total)),
    );
    rows.push(Row::new(total_cells).style(theme.table_total));

    let widths: Vec<Constraint> = column_widths(table)
        .into_iter()
        .map(|w| Constraint::Length(w as u16))
        .collect();

    let shown_to = (scroll + visible_rows(area)).min(table.rows.len());
    let block_title = format!(
        " {title} ({}–{} / {}) ",
        (scroll + 1).min(shown_to),
        shown_to,
        table.rows.len()
    );

    let widget = Table::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(Span::styled(block_title, theme.title)),
        )
        .style(theme.text);

    frame.render_widget(widget, area);
}

/// Render a placeholder when nothing has been aggregated yet.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("集計データなし", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Run a batch or upload a monthly roster first.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Esc to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Enrollment Pivot "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
