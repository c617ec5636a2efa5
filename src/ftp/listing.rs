//! `LIST` output parser
//!
//! Understands unix `ls -l` style lines:
//! `-rw-r--r--   1 owner group   1234 Jan 01 12:00 report final.txt`
//!
//! Tokens are split on whitespace, so runs of spaces inside a name collapse
//! to one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum token count for a usable unix listing line
const MIN_TOKENS: usize = 9;

/// Kind of directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    File,
    Directory,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Byte size; only reported for files
    pub size: Option<u64>,
    pub modified: Option<String>,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Parse every line of a `LIST` response, skipping unusable lines and `.`/`..`
pub fn parse_listing<S: AsRef<str>>(lines: &[S]) -> Vec<FileEntry> {
    lines.iter().filter_map(|l| parse_line(l.as_ref())).collect()
}

/// Parse a single `LIST` line
pub fn parse_line(line: &str) -> Option<FileEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < MIN_TOKENS {
        return None;
    }

    let name = parts[8..].join(" ");
    if name == "." || name == ".." {
        return None;
    }

    let entry_type = if parts[0].starts_with('d') {
        EntryType::Directory
    } else {
        EntryType::File
    };

    let size = match entry_type {
        EntryType::File => Some(parse_size(parts[4])),
        EntryType::Directory => None,
    };

    Some(FileEntry {
        name,
        entry_type,
        size,
        modified: Some(parts[5..8].join(" ")),
    })
}

/// All-digit size token, otherwise 0
fn parse_size(token: &str) -> u64 {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_file_line() {
        let entry = parse_line("-rw-r--r--   1 ftp ftp       1234 Jan 01 12:00 notes.txt").unwrap();
        assert_eq!(
            entry,
            FileEntry {
                name: "notes.txt".to_string(),
                entry_type: EntryType::File,
                size: Some(1234),
                modified: Some("Jan 01 12:00".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_directory_line() {
        let entry = parse_line("drwxr-xr-x   2 ftp ftp       4096 Mar 14  2023 pub").unwrap();
        assert!(entry.is_dir());
        assert_eq!(entry.size, None);
        assert_eq!(entry.modified.as_deref(), Some("Mar 14 2023"));
    }

    #[test]
    fn test_name_with_spaces_collapses() {
        let entry = parse_line("-rw-r--r-- 1 a b 5 Jan 01 12:00 my   holiday  photo.jpg").unwrap();
        assert_eq!(entry.name, "my holiday photo.jpg");
    }

    #[test]
    fn test_non_numeric_size_is_zero() {
        let entry = parse_line("-rw-r--r-- 1 a b ??? Jan 01 12:00 odd").unwrap();
        assert_eq!(entry.size, Some(0));
    }

    #[test]
    fn test_symlink_is_reported_as_file() {
        let entry = parse_line("lrwxrwxrwx 1 a b 7 Jan 01 12:00 latest -> v2").unwrap();
        assert_eq!(entry.entry_type, EntryType::File);
        assert_eq!(entry.name, "latest -> v2");
    }

    #[test]
    fn test_listing_skips_dots_and_short_lines() {
        let lines = vec![
            "total 12",
            "drwxr-xr-x 2 a b 4096 Jan 01 12:00 .",
            "drwxr-xr-x 2 a b 4096 Jan 01 12:00 ..",
            "drwxr-xr-x 2 a b 4096 Jan 01 12:00 incoming",
            "-rw-r--r-- 1 a b 10 Jan 01 12:00 readme",
            "",
        ];
        let entries = parse_listing(&lines);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["incoming", "readme"]);
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let entry = parse_line("drwxr-xr-x 2 a b 4096 Jan 01 12:00 pub").unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "directory");
        assert!(json["size"].is_null());
    }

    proptest! {
        #[test]
        fn parse_line_never_panics(line in "\\PC*") {
            let _ = parse_line(&line);
        }

        #[test]
        fn file_sizes_round_trip(size in 0u64..u64::MAX, name in "[a-zA-Z0-9_.-]{1,20}") {
            prop_assume!(name != "." && name != "..");
            let line = format!("-rw-r--r-- 1 owner group {} Feb 02 09:30 {}", size, name);
            let entry = parse_line(&line).unwrap();
            prop_assert_eq!(entry.size, Some(size));
            prop_assert_eq!(entry.name, name);
        }
    }
}
