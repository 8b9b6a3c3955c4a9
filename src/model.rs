use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    pub torrents: Vec<TorrentFiles>,
}

impl FileSnapshot {
    pub fn file_count(&self) -> usize {
        self.torrents.iter().map(|t| t.files.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct TorrentFiles {
    pub torrent_id: i64,
    pub name: String,
    pub files: Vec<TorrentFile>,
}

impl TorrentFiles {
    /// `needle` must already be lowercase; an empty needle matches everything.
    pub fn matches_name(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(needle)
    }
}

/// One file of a torrent. `path` is the directory that contains the file,
/// relative to the download directory, without a trailing separator.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentFile {
    pub torrent_id: i64,
    pub index: usize,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub downloaded: u64,
    pub priority: Priority,
}

impl TorrentFile {
    pub fn progress(&self) -> f64 {
        progress_of(self.downloaded, self.size)
    }

    pub fn is_wanted(&self) -> bool {
        self.priority != Priority::Off
    }

    pub fn is_complete(&self) -> bool {
        self.downloaded >= self.size
    }

    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Off,
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Off => "off",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    pub fn raise(self) -> Self {
        match self {
            Priority::Off => Priority::Low,
            Priority::Low => Priority::Normal,
            Priority::Normal | Priority::High => Priority::High,
        }
    }

    pub fn lower(self) -> Self {
        match self {
            Priority::High => Priority::Normal,
            Priority::Normal => Priority::Low,
            Priority::Low | Priority::Off => Priority::Off,
        }
    }

    pub fn from_rpc(wanted: bool, priority: i64) -> Self {
        if !wanted {
            return Priority::Off;
        }
        match priority {
            p if p < 0 => Priority::Low,
            0 => Priority::Normal,
            _ => Priority::High,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "skip" => Ok(Priority::Off),
            "low" | "-" => Ok(Priority::Low),
            "normal" | "norm" => Ok(Priority::Normal),
            "high" | "+" => Ok(Priority::High),
            other => Err(format!(
                "invalid priority '{other}' (expected off, low, normal or high)"
            )),
        }
    }
}

pub fn progress_of(downloaded: u64, size: u64) -> f64 {
    if size == 0 {
        return 1.0;
    }
    (downloaded.min(size) as f64) / (size as f64)
}

pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

pub fn format_progress(value: f64) -> String {
    format!("{:5.1}%", value * 100.0)
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut magnitude = value as f64;
    let mut unit = 0;
    while magnitude >= 1024.0 && unit < UNITS.len() - 1 {
        magnitude /= 1024.0;
        unit += 1;
    }
    format!("{:>4.1} {}", magnitude, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, name: &str, size: u64, downloaded: u64) -> TorrentFile {
        TorrentFile {
            torrent_id: 1,
            index: 0,
            name: name.to_string(),
            path: path.to_string(),
            size,
            downloaded,
            priority: Priority::Normal,
        }
    }

    #[test]
    fn full_path_skips_separator_for_top_level_files() {
        assert_eq!(file("", "a.iso", 1, 0).full_path(), "a.iso");
        assert_eq!(file("Show/S01", "e01.mkv", 1, 0).full_path(), "Show/S01/e01.mkv");
    }

    #[test]
    fn empty_files_count_as_complete() {
        let empty = file("", "empty", 0, 0);
        assert_eq!(empty.progress(), 1.0);
        assert!(empty.is_complete());
        assert_eq!(file("", "half", 200, 100).progress(), 0.5);
    }

    #[test]
    fn priority_from_rpc_treats_unwanted_as_off() {
        assert_eq!(Priority::from_rpc(false, 1), Priority::Off);
        assert_eq!(Priority::from_rpc(true, -1), Priority::Low);
        assert_eq!(Priority::from_rpc(true, 0), Priority::Normal);
        assert_eq!(Priority::from_rpc(true, 1), Priority::High);
    }

    #[test]
    fn priority_steps_saturate() {
        assert_eq!(Priority::High.raise(), Priority::High);
        assert_eq!(Priority::Off.lower(), Priority::Off);
        assert_eq!(Priority::Off.raise(), Priority::Low);
        assert_eq!(Priority::High.lower(), Priority::Normal);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" off ".parse::<Priority>(), Ok(Priority::Off));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(1536), " 1.5 KiB");
        assert_eq!(format_progress(0.5), " 50.0%");
    }

    #[test]
    fn torrent_name_match_is_case_insensitive() {
        let torrent = TorrentFiles {
            torrent_id: 3,
            name: "Debian ISO".to_string(),
            files: Vec::new(),
        };
        assert!(torrent.matches_name("debian"));
        assert!(torrent.matches_name(""));
        assert!(!torrent.matches_name("arch"));
    }
}
