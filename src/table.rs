use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

use crate::{
    cache::CellCache,
    flatten::Row,
    model::{format_bytes, format_progress},
};

pub type CellKey = (Column, u64);
pub type Cells = CellCache<CellKey, String>;

const SEPARATOR: &str = "  ";
const MIN_NAME_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Size,
    Downloaded,
    Progress,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

impl Column {
    pub fn defaults() -> Vec<Column> {
        vec![
            Column::Size,
            Column::Downloaded,
            Column::Progress,
            Column::Priority,
            Column::Name,
        ]
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Size => "Size",
            Column::Downloaded => "Dn",
            Column::Progress => "%",
            Column::Priority => "Priority",
        }
    }

    pub fn align(self) -> Align {
        match self {
            Column::Name | Column::Priority => Align::Left,
            Column::Size | Column::Downloaded | Column::Progress => Align::Right,
        }
    }

    pub fn cell(self, row: &Row, cells: &mut Cells) -> String {
        match self {
            Column::Name => match row {
                Row::Directory(dir) if dir.filtered_count > 0 => {
                    format!("{} [{} filtered]", dir.name, dir.filtered_count)
                }
                _ => row.name().to_string(),
            },
            Column::Size => {
                let size = row.size();
                cells.get_or_insert_with((self, size), || format_bytes(size))
            }
            Column::Downloaded => {
                let downloaded = row.downloaded();
                cells.get_or_insert_with((self, downloaded), || format_bytes(downloaded))
            }
            Column::Progress => {
                let progress = row.progress();
                let permille = (progress * 1000.0).round() as u64;
                cells.get_or_insert_with((self, permille), || format_progress(progress))
            }
            Column::Priority => row
                .priority()
                .map(|p| p.label())
                .unwrap_or("mixed")
                .to_string(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Column::Name => "name",
            Column::Size => "size",
            Column::Downloaded => "downloaded",
            Column::Progress => "progress",
            Column::Priority => "priority",
        };
        f.write_str(name)
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Column::Name),
            "size" => Ok(Column::Size),
            "downloaded" | "dn" => Ok(Column::Downloaded),
            "progress" | "%downloaded" | "%" => Ok(Column::Progress),
            "priority" | "prio" => Ok(Column::Priority),
            other => Err(format!("unknown column '{other}'")),
        }
    }
}

pub fn parse_columns<S: AsRef<str>>(names: &[S]) -> Result<Vec<Column>, String> {
    let mut columns = Vec::new();
    for name in names {
        let name = name.as_ref();
        if name.trim().is_empty() {
            continue;
        }
        let column: Column = name.parse()?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    if columns.is_empty() {
        return Err("no columns selected".to_string());
    }
    Ok(columns)
}

/// Column widths for a set of rows. Without a total width nothing is
/// aligned and cells are separated by tabs.
#[derive(Debug, Clone)]
pub struct TableLayout {
    columns: Vec<Column>,
    widths: Option<Vec<usize>>,
}

impl TableLayout {
    pub fn new(
        columns: &[Column],
        rows: &[Row],
        total_width: Option<usize>,
        cells: &mut Cells,
    ) -> Self {
        let Some(total_width) = total_width else {
            return Self {
                columns: columns.to_vec(),
                widths: None,
            };
        };
        let mut widths: Vec<usize> = columns.iter().map(|c| c.header().chars().count()).collect();
        for row in rows {
            for (width, column) in widths.iter_mut().zip(columns) {
                if *column == Column::Name {
                    continue;
                }
                *width = (*width).max(column.cell(row, cells).chars().count());
            }
        }
        if let Some(name_idx) = columns.iter().position(|c| *c == Column::Name) {
            let fixed: usize = widths
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != name_idx)
                .map(|(_, w)| *w)
                .sum();
            let separators = SEPARATOR.len() * columns.len().saturating_sub(1);
            widths[name_idx] = total_width
                .saturating_sub(fixed + separators)
                .max(MIN_NAME_WIDTH);
        }
        Self {
            columns: columns.to_vec(),
            widths: Some(widths),
        }
    }

    pub fn header(&self) -> Option<String> {
        let widths = self.widths.as_ref()?;
        let cells = self
            .columns
            .iter()
            .zip(widths)
            .map(|(column, width)| pad(column.header(), *width, column.align()))
            .collect::<Vec<_>>();
        Some(trim_line(cells.join(SEPARATOR)))
    }

    pub fn format_row(&self, row: &Row, cells: &mut Cells) -> String {
        match &self.widths {
            None => self
                .columns
                .iter()
                .map(|column| column.cell(row, cells))
                .collect::<Vec<_>>()
                .join("\t"),
            Some(widths) => {
                let parts = self
                    .columns
                    .iter()
                    .zip(widths)
                    .map(|(column, width)| pad(&column.cell(row, cells), *width, column.align()))
                    .collect::<Vec<_>>();
                trim_line(parts.join(SEPARATOR))
            }
        }
    }
}

pub fn print_table<W: Write>(
    out: &mut W,
    rows: &[Row],
    columns: &[Column],
    width: Option<usize>,
    cells: &mut Cells,
) -> io::Result<()> {
    let layout = TableLayout::new(columns, rows, width, cells);
    if let Some(header) = layout.header() {
        writeln!(out, "{header}")?;
    }
    for row in rows {
        writeln!(out, "{}", layout.format_row(row, cells))?;
    }
    out.flush()
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let text = truncate(text, width);
    match align {
        Align::Left => format!("{text:<width$}"),
        Align::Right => format!("{text:>width$}"),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn trim_line(line: String) -> String {
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flatten::{flatten, NameStyle},
        model::{Priority, TorrentFile},
        tree::FileTree,
    };

    fn rows(style: NameStyle) -> Vec<Row> {
        let files = vec![
            TorrentFile {
                torrent_id: 1,
                index: 0,
                name: "b.txt".to_string(),
                path: String::new(),
                size: 2048,
                downloaded: 1024,
                priority: Priority::High,
            },
            TorrentFile {
                torrent_id: 1,
                index: 1,
                name: "c.txt".to_string(),
                path: "A".to_string(),
                size: 1024,
                downloaded: 1024,
                priority: Priority::Normal,
            },
        ];
        let tree = FileTree::from_files(1, files).unwrap();
        flatten(&tree, None, 0, style).rows
    }

    fn render(rows: &[Row], columns: &[Column], width: Option<usize>) -> String {
        let mut out = Vec::new();
        let mut cells = Cells::new();
        print_table(&mut out, rows, columns, width, &mut cells).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn unknown_width_prints_tab_separated_paths_without_header() {
        let text = render(
            &rows(NameStyle::FullPath),
            &[Column::Name, Column::Priority],
            None,
        );
        assert_eq!(text, "A\tnormal\nA/c.txt\tnormal\nb.txt\thigh\n");
    }

    #[test]
    fn known_width_aligns_columns() {
        let text = render(
            &rows(NameStyle::Indented),
            &[Column::Size, Column::Progress, Column::Name],
            Some(40),
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "    Size       %  Name");
        assert_eq!(lines[1], " 1.0 KiB  100.0%  A");
        assert_eq!(lines[2], " 1.0 KiB  100.0%    c.txt");
        assert_eq!(lines[3], " 2.0 KiB   50.0%  b.txt");
    }

    #[test]
    fn long_names_are_truncated_to_the_remaining_width() {
        let mut row = rows(NameStyle::Indented).remove(2);
        if let Row::File(file) = &mut row {
            file.name = "a-very-long-file-name.txt".to_string();
        }
        let text = render(&[row], &[Column::Priority, Column::Name], Some(20));
        // 20 - "Priority" (8) - separator (2) leaves 10 for the name.
        assert_eq!(text.lines().nth(1), Some("high      a-very-lo…"));
    }

    #[test]
    fn directories_show_their_filtered_count() {
        let files = vec![TorrentFile {
            torrent_id: 1,
            index: 0,
            name: "x".to_string(),
            path: "dir".to_string(),
            size: 1,
            downloaded: 0,
            priority: Priority::Normal,
        }];
        let tree = FileTree::from_files(1, files).unwrap();
        let reject = |_: &TorrentFile| false;
        let flat = flatten(&tree, Some(&reject), 0, NameStyle::Indented);
        let text = render(&flat.rows, &[Column::Name], None);
        assert_eq!(text, "dir [1 filtered]\n");
    }

    #[test]
    fn mixed_directory_priority() {
        let text = render(&rows(NameStyle::FullPath)[..1], &[Column::Priority], None);
        assert_eq!(text, "normal\n");
        let mut dir = rows(NameStyle::FullPath).remove(0);
        if let Row::Directory(summary) = &mut dir {
            summary.priority = None;
        }
        assert_eq!(render(&[dir], &[Column::Priority], None), "mixed\n");
    }

    #[test]
    fn column_names_parse_with_aliases_and_dedupe() {
        assert_eq!(
            parse_columns(&["name", "%downloaded", "prio", "Name"]),
            Ok(vec![Column::Name, Column::Progress, Column::Priority])
        );
        assert!(parse_columns(&["name", "colour"]).is_err());
        assert!(parse_columns::<&str>(&[]).is_err());
    }

    #[test]
    fn formatted_cells_are_cached() {
        let rows = rows(NameStyle::Indented);
        let mut cells = Cells::new();
        TableLayout::new(&Column::defaults(), &rows, Some(80), &mut cells);
        // Sizes 1024 and 2048, downloaded 1024, progress 100% and 50%.
        assert_eq!(cells.len(), 5);
    }
}
