//! Turns torrent file trees into ordered display rows.

use crate::{
    filter::FileFilter,
    model::{progress_of, Priority, TorrentFile, TorrentFiles},
    tree::{FileTree, TreeError, TreeNode},
};

/// How row names are written. `Indented` needs a renderer that aligns
/// columns; `FullPath` is for output whose width is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    Indented,
    FullPath,
}

impl NameStyle {
    pub fn for_width(width: Option<usize>) -> Self {
        match width {
            Some(_) => NameStyle::Indented,
            None => NameStyle::FullPath,
        }
    }

    fn file_name(self, file: &TorrentFile, indent_level: usize) -> String {
        match self {
            NameStyle::Indented => indent(&file.name, indent_level),
            NameStyle::FullPath => file.full_path(),
        }
    }

    fn directory_name(self, dir: &DirectorySummary, indent_level: usize) -> String {
        match self {
            NameStyle::Indented => indent(&dir.name, indent_level),
            NameStyle::FullPath => dir.path.clone(),
        }
    }
}

fn indent(name: &str, level: usize) -> String {
    format!("{}{}", "  ".repeat(level), name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySummary {
    pub torrent_id: i64,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub downloaded: u64,
    /// `None` when the files below have different priorities.
    pub priority: Option<Priority>,
    /// Files listed below this row; hidden files are left out.
    pub file_indices: Vec<usize>,
    pub filtered_count: usize,
}

impl DirectorySummary {
    /// Size, downloaded bytes and priority cover every file below `dir`;
    /// `file_indices` only the ones that made it into `shown`.
    pub fn new(dir: &FileTree, shown: &Flattened) -> Self {
        let leaves = dir.leaves();
        let mut priorities = leaves.iter().map(|f| f.priority);
        let first = priorities.next();
        let priority = match first {
            Some(p) if priorities.all(|other| other == p) => Some(p),
            _ => None,
        };
        Self {
            torrent_id: dir.torrent_id,
            name: dir.name.clone(),
            path: dir.path.clone(),
            size: leaves.iter().map(|f| f.size).sum(),
            downloaded: leaves.iter().map(|f| f.downloaded).sum(),
            priority,
            file_indices: shown
                .rows
                .iter()
                .filter_map(|row| match row {
                    Row::File(file) => Some(file.index),
                    Row::Directory(_) => None,
                })
                .collect(),
            filtered_count: shown.filtered_count,
        }
    }

    pub fn progress(&self) -> f64 {
        progress_of(self.downloaded, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    File(TorrentFile),
    Directory(DirectorySummary),
}

/// Stable identity of a row across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    File(i64, usize),
    Directory(i64, String),
}

impl Row {
    pub fn name(&self) -> &str {
        match self {
            Row::File(file) => &file.name,
            Row::Directory(dir) => &dir.name,
        }
    }

    pub fn torrent_id(&self) -> i64 {
        match self {
            Row::File(file) => file.torrent_id,
            Row::Directory(dir) => dir.torrent_id,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Row::File(file) => file.size,
            Row::Directory(dir) => dir.size,
        }
    }

    pub fn downloaded(&self) -> u64 {
        match self {
            Row::File(file) => file.downloaded,
            Row::Directory(dir) => dir.downloaded,
        }
    }

    pub fn progress(&self) -> f64 {
        match self {
            Row::File(file) => file.progress(),
            Row::Directory(dir) => dir.progress(),
        }
    }

    pub fn priority(&self) -> Option<Priority> {
        match self {
            Row::File(file) => Some(file.priority),
            Row::Directory(dir) => dir.priority,
        }
    }

    pub fn file_indices(&self) -> Vec<usize> {
        match self {
            Row::File(file) => vec![file.index],
            Row::Directory(dir) => dir.file_indices.clone(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Row::Directory(_))
    }

    pub fn key(&self) -> RowKey {
        match self {
            Row::File(file) => RowKey::File(file.torrent_id, file.index),
            Row::Directory(dir) => RowKey::Directory(dir.torrent_id, dir.path.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub rows: Vec<Row>,
    /// Files excluded directly at the flattened level. Exclusions deeper
    /// down are carried by the directory rows.
    pub filtered_count: usize,
}

impl Flattened {
    /// Every file the filter excluded, at any depth.
    pub fn total_filtered(&self) -> usize {
        self.filtered_count
            + self
                .rows
                .iter()
                .map(|row| match row {
                    Row::Directory(dir) => dir.filtered_count,
                    Row::File(_) => 0,
                })
                .sum::<usize>()
    }

    pub fn file_rows(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_directory()).count()
    }
}

pub fn flatten(
    tree: &FileTree,
    filter: Option<&dyn FileFilter>,
    indent_level: usize,
    style: NameStyle,
) -> Flattened {
    let mut rows = Vec::new();
    let mut filtered_count = 0;
    for (_, node) in tree.sorted_children() {
        match node {
            TreeNode::Leaf(file) => {
                if filter.map_or(true, |f| f.matches(file)) {
                    let mut row = file.clone();
                    row.name = style.file_name(file, indent_level);
                    rows.push(Row::File(row));
                } else {
                    filtered_count += 1;
                }
            }
            TreeNode::Parent(dir) => {
                let sub = flatten(dir, filter, indent_level + 1, style);
                let mut summary = DirectorySummary::new(dir, &sub);
                summary.name = style.directory_name(&summary, indent_level);
                rows.push(Row::Directory(summary));
                rows.extend(sub.rows);
            }
        }
    }
    Flattened {
        rows,
        filtered_count,
    }
}

/// Flattens every torrent, ordered by name without regard to case.
pub fn flatten_torrents(
    torrents: &[TorrentFiles],
    filter: Option<&dyn FileFilter>,
    style: NameStyle,
) -> Result<Flattened, TreeError> {
    let mut ordered: Vec<&TorrentFiles> = torrents.iter().collect();
    ordered.sort_by_cached_key(|t| t.name.to_lowercase());

    let mut out = Flattened::default();
    for torrent in ordered {
        let tree = FileTree::from_files(torrent.torrent_id, torrent.files.iter().cloned())?;
        let flat = flatten(&tree, filter, 0, style);
        log::debug!(
            "{}: {} rows, {} files filtered",
            torrent.name,
            flat.rows.len(),
            flat.total_filtered()
        );
        out.rows.extend(flat.rows);
        out.filtered_count += flat.filtered_count;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(index: usize, path: &str, name: &str) -> TorrentFile {
        TorrentFile {
            torrent_id: 1,
            index,
            name: name.to_string(),
            path: path.to_string(),
            size: 100,
            downloaded: 50,
            priority: Priority::Normal,
        }
    }

    fn tree(files: Vec<TorrentFile>) -> FileTree {
        FileTree::from_files(1, files).unwrap()
    }

    fn names(flat: &Flattened) -> Vec<&str> {
        flat.rows.iter().map(Row::name).collect()
    }

    fn sample() -> FileTree {
        tree(vec![file(0, "", "b.txt"), file(1, "A", "c.txt")])
    }

    fn deep() -> FileTree {
        tree(vec![
            file(0, "Root", "keep.txt"),
            file(1, "Root", "drop.log"),
            file(2, "Root/Sub", "drop.log"),
            file(3, "Root/Sub", "keep.txt"),
            file(4, "Root/Sub/Deeper", "drop.log"),
            file(5, "", "drop.log"),
        ])
    }

    fn no_logs(f: &TorrentFile) -> bool {
        !f.name.ends_with(".log")
    }

    #[test]
    fn directories_sort_among_files_without_case() {
        let flat = flatten(&sample(), None, 0, NameStyle::Indented);
        assert_eq!(names(&flat), vec!["A", "  c.txt", "b.txt"]);
        assert_eq!(flat.filtered_count, 0);
        let Row::Directory(dir) = &flat.rows[0] else {
            panic!("expected directory row");
        };
        assert_eq!(dir.filtered_count, 0);
    }

    #[test]
    fn filtered_leaf_is_counted_on_its_directory() {
        let not_c = |f: &TorrentFile| f.name != "c.txt";
        let flat = flatten(&sample(), Some(&not_c), 0, NameStyle::Indented);
        assert_eq!(names(&flat), vec!["A", "b.txt"]);
        assert_eq!(flat.filtered_count, 0);
        let Row::Directory(dir) = &flat.rows[0] else {
            panic!("expected directory row");
        };
        assert_eq!(dir.filtered_count, 1);
    }

    #[test]
    fn empty_directory_flattens_to_nothing() {
        let flat = flatten(&FileTree::root(1), None, 0, NameStyle::Indented);
        assert!(flat.rows.is_empty());
        assert_eq!(flat.filtered_count, 0);
    }

    #[test]
    fn counts_are_not_summed_upwards() {
        let flat = flatten(&deep(), Some(&no_logs), 0, NameStyle::Indented);
        assert_eq!(
            names(&flat),
            vec!["Root", "  keep.txt", "  Sub", "    Deeper", "    keep.txt"]
        );
        // Only the top-level drop.log is reported at the root.
        assert_eq!(flat.filtered_count, 1);
        let counts: Vec<usize> = flat
            .rows
            .iter()
            .filter_map(|row| match row {
                Row::Directory(dir) => Some(dir.filtered_count),
                Row::File(_) => None,
            })
            .collect();
        // Root only sees its own drop.log; Sub its own; Deeper its own.
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn every_file_is_either_shown_or_counted() {
        let total = deep().leaves().len();
        let reject = |_: &TorrentFile| false;
        let filters: [Option<&dyn FileFilter>; 3] = [None, Some(&no_logs), Some(&reject)];
        for filter in filters {
            let flat = flatten(&deep(), filter, 0, NameStyle::FullPath);
            assert_eq!(flat.file_rows() + flat.total_filtered(), total);
        }
    }

    #[test]
    fn rejecting_everything_keeps_directory_rows() {
        let none = |_: &TorrentFile| false;
        let flat = flatten(&deep(), Some(&none), 0, NameStyle::Indented);
        assert_eq!(names(&flat), vec!["Root", "  Sub", "    Deeper"]);
        assert_eq!(flat.file_rows(), 0);
        assert_eq!(flat.filtered_count, 1);
        assert_eq!(flat.total_filtered(), 6);
    }

    #[test]
    fn accepting_everything_lists_files_depth_first() {
        let all = |_: &TorrentFile| true;
        let flat = flatten(&deep(), Some(&all), 0, NameStyle::FullPath);
        let files: Vec<&str> = flat
            .rows
            .iter()
            .filter(|row| !row.is_directory())
            .map(Row::name)
            .collect();
        assert_eq!(
            files,
            vec![
                "drop.log",
                "Root/drop.log",
                "Root/keep.txt",
                "Root/Sub/Deeper/drop.log",
                "Root/Sub/drop.log",
                "Root/Sub/keep.txt",
            ]
        );
        assert_eq!(flat.total_filtered(), 0);
    }

    #[test]
    fn full_path_style_names_files_and_directories_by_path() {
        let flat = flatten(&deep(), Some(&no_logs), 0, NameStyle::FullPath);
        assert_eq!(
            names(&flat),
            vec![
                "Root",
                "Root/keep.txt",
                "Root/Sub",
                "Root/Sub/Deeper",
                "Root/Sub/keep.txt",
            ]
        );
    }

    #[test]
    fn indent_level_offsets_every_name() {
        let flat = flatten(&sample(), None, 2, NameStyle::Indented);
        assert_eq!(names(&flat), vec!["    A", "      c.txt", "    b.txt"]);
    }

    #[test]
    fn flattening_twice_gives_the_same_rows() {
        let t = deep();
        let first = flatten(&t, Some(&no_logs), 0, NameStyle::Indented);
        let second = flatten(&t, Some(&no_logs), 0, NameStyle::Indented);
        assert_eq!(first, second);
    }

    #[test]
    fn directory_summary_aggregates_the_whole_subtree() {
        let mut files = vec![file(0, "d", "a"), file(1, "d/e", "b")];
        files[1].priority = Priority::High;
        files[1].downloaded = 100;
        let first_only = |f: &TorrentFile| f.index == 0;
        let flat = flatten(&tree(files), Some(&first_only), 0, NameStyle::Indented);
        let Row::Directory(dir) = &flat.rows[0] else {
            panic!("expected directory row");
        };
        assert_eq!(dir.size, 200);
        assert_eq!(dir.downloaded, 150);
        assert_eq!(dir.priority, None);
        assert_eq!(dir.file_indices, vec![0]);
        assert_eq!(flat.rows[0].progress(), 0.75);
    }

    #[test]
    fn directory_indices_follow_the_visible_files() {
        let unfiltered = flatten(&deep(), None, 0, NameStyle::Indented);
        let Row::Directory(root) = &unfiltered.rows[0] else {
            panic!("expected directory row");
        };
        assert_eq!(root.file_indices, vec![1, 0, 4, 2, 3]);

        let filtered = flatten(&deep(), Some(&no_logs), 0, NameStyle::Indented);
        let dirs: Vec<Vec<usize>> = filtered
            .rows
            .iter()
            .filter_map(|row| match row {
                Row::Directory(dir) => Some(dir.file_indices.clone()),
                Row::File(_) => None,
            })
            .collect();
        assert_eq!(dirs, vec![vec![0, 3], vec![3], vec![]]);
    }

    #[test]
    fn torrents_are_concatenated_by_name() {
        let torrents = vec![
            TorrentFiles {
                torrent_id: 2,
                name: "zeta".to_string(),
                files: vec![TorrentFile {
                    torrent_id: 2,
                    ..file(0, "", "zeta.iso")
                }],
            },
            TorrentFiles {
                torrent_id: 1,
                name: "Alpha".to_string(),
                files: vec![file(0, "Alpha", "x"), file(1, "Alpha", "y")],
            },
        ];
        let not_y = |f: &TorrentFile| f.name != "y";
        let flat = flatten_torrents(&torrents, Some(&not_y), NameStyle::Indented).unwrap();
        assert_eq!(names(&flat), vec!["Alpha", "  x", "zeta.iso"]);
        assert_eq!(flat.rows[2].torrent_id(), 2);
        assert_eq!(flat.total_filtered(), 1);
    }

    #[test]
    fn row_keys_survive_renaming() {
        let indented = flatten(&sample(), None, 0, NameStyle::Indented);
        let full = flatten(&sample(), None, 0, NameStyle::FullPath);
        let a: Vec<RowKey> = indented.rows.iter().map(Row::key).collect();
        let b: Vec<RowKey> = full.rows.iter().map(Row::key).collect();
        assert_eq!(a, b);
    }
}
