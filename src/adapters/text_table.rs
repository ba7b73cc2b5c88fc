//! Plain-text rendering of ranking tables and the memo panel.
//!
//! Output is pipe-delimited, one line per row, so it stays readable in a
//! terminal and greppable in scripts.

use crate::domain::annotation::{AnnotationTable, TaggedAnnotation};
use crate::domain::table::{DisplayRow, ExpandedDetail, TableView};

pub const NO_DATA_MESSAGE: &str = "데이터가 없습니다.";
pub const NO_HISTORY_MESSAGE: &str = "히스토리 없음";
pub const NO_MEMOS_MESSAGE: &str = "저장된 메모가 없습니다.";
pub const UNTAGGED_HEADING: &str = "태그 없음";
const NOTE_FLAG: &str = "📝";

pub fn render_table(view: &TableView) -> String {
    let mut out = String::new();

    let header: Vec<String> = view
        .header
        .iter()
        .map(|cell| format!("{}{}", cell.label, cell.indicator()))
        .collect();
    out.push_str(&header.join(" | "));
    out.push('\n');

    if view.no_data {
        out.push_str(NO_DATA_MESSAGE);
        out.push('\n');
        return out;
    }

    for row in &view.rows {
        out.push_str(&format_row(row));
        out.push('\n');
        if let Some(detail) = &row.expanded {
            out.push_str(&format_detail(detail));
        }
    }
    out
}

fn format_row(row: &DisplayRow) -> String {
    let mut name = format!("{} ({})", row.entry.name, row.ticker());
    for badge in row.badges() {
        name.push_str(&format!(" [{}]", badge.text()));
    }

    let mut memo = row.annotation.tags.join(", ");
    if row.annotation.has_note() {
        if !memo.is_empty() {
            memo.push(' ');
        }
        memo.push_str(NOTE_FLAG);
    }
    if row.recently_updated {
        memo.push('*');
    }

    let cells = [
        row.cells.rank.as_str(),
        name.as_str(),
        row.cells.price.as_str(),
        row.cells.change_pct.as_str(),
        row.cells.volume.as_str(),
        row.cells.trading_value.as_str(),
        memo.as_str(),
    ];
    cells.join(" | ")
}

fn format_detail(detail: &ExpandedDetail) -> String {
    let mut out = String::new();
    if detail.history.is_empty() {
        out.push_str(&format!("    {NO_HISTORY_MESSAGE}\n"));
    } else {
        out.push_str("    날짜 | 순위 | 거래대금 | 종가 | 등락률\n");
        for h in &detail.history {
            out.push_str(&format!(
                "    {} | {} | {} | {} | {}\n",
                h.date_label, h.rank, h.trading_value, h.close, h.change_pct
            ));
        }
    }
    if !detail.tags.is_empty() {
        out.push_str(&format!("    태그: {}\n", detail.tags.join(", ")));
    }
    if !detail.note.is_empty() {
        out.push_str(&format!("    메모: {}\n", detail.note));
    }
    out
}

fn format_memo_line(item: &TaggedAnnotation) -> String {
    if item.note.is_empty() {
        format!("  {}\n", item.ticker)
    } else {
        format!("  {}: {}\n", item.ticker, item.note)
    }
}

/// Tag groups in tag order, then notes that carry no tag.
pub fn render_memo_panel(table: &AnnotationTable) -> String {
    let groups = table.group_by_tag();
    let untagged = table.untagged_notes();
    if groups.is_empty() && untagged.is_empty() {
        return format!("{NO_MEMOS_MESSAGE}\n");
    }

    let mut out = String::new();
    for (tag, items) in &groups {
        out.push_str(&format!("#{} ({})\n", tag, items.len()));
        for item in items {
            out.push_str(&format_memo_line(item));
        }
    }
    if !untagged.is_empty() {
        out.push_str(&format!("{} ({})\n", UNTAGGED_HEADING, untagged.len()));
        for item in &untagged {
            out.push_str(&format_memo_line(item));
        }
    }
    out
}
