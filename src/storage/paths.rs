//! Path handling for the Backtory adapter.
//!
//! Backtory uploads into a directory and names the object afterwards, so
//! every write path has to be split into a directory and an optional leaf
//! name. A trailing `/` always means "directory". Without it, a leaf that
//! contains a dot after its first character is taken as a file name. The
//! dot rule is a compatibility heuristic: `a/b/v1.2` is a file named `v1.2`
//! and `a/b/README` is a directory.

/// A path split into its upload directory and optional file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSplit {
    pub directory: String,
    pub name: Option<String>,
}

/// Split a write path into directory and name.
pub fn split_path(path: &str) -> PathSplit {
    if path.ends_with('/') {
        return PathSplit {
            directory: path.to_string(),
            name: None,
        };
    }

    let leaf = leaf_name(path);
    if leaf.find('.').is_some_and(|i| i > 0) {
        let parent = dirname(path);
        let directory = if matches!(parent, "." | "" | "..") { "/" } else { parent };
        return PathSplit {
            directory: directory.to_string(),
            name: Some(leaf.to_string()),
        };
    }

    PathSplit {
        directory: path.to_string(),
        name: None,
    }
}

/// Whether a rename target should first be tried as a move destination.
///
/// True when the first `.` of `new_path` sits at byte 0 or there is no `.`
/// at all.
pub fn is_move_target(new_path: &str) -> bool {
    !new_path.find('.').is_some_and(|i| i > 0)
}

/// Make sure a directory path ends with a separator.
pub fn with_trailing_separator(dirname: &str) -> String {
    if dirname.ends_with('/') {
        dirname.to_string()
    } else {
        format!("{}/", dirname)
    }
}

/// Stream uploads treat an empty or `.` directory as the root.
pub fn upload_directory(directory: &str) -> &str {
    if matches!(directory, "." | "") { "/" } else { directory }
}

/// Normalize a configured path prefix: trailing separators trimmed and a
/// single `/` appended. An empty prefix stays empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Apply a normalized prefix to a path. An empty prefix leaves the path untouched.
pub fn apply_prefix(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}{}", prefix, path.trim_start_matches(['/', '\\']))
    }
}

fn leaf_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Parent directory of a path without a trailing separator.
///
/// `"a/b/c.txt"` gives `"a/b"`, `"/c.txt"` gives `"/"` and `"c.txt"` gives `"."`.
fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        None => ".",
        Some(i) => {
            let parent = path[..i].trim_end_matches('/');
            if parent.is_empty() { "/" } else { parent }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(path: &str) -> (String, Option<String>) {
        let s = split_path(path);
        (s.directory, s.name)
    }

    #[test]
    fn test_split_file_path() {
        assert_eq!(split("a/b/file.txt"), ("a/b".to_string(), Some("file.txt".to_string())));
        assert_eq!(split("dir/archive.tar.gz"), ("dir".to_string(), Some("archive.tar.gz".to_string())));
    }

    #[test]
    fn test_split_directory_path() {
        assert_eq!(split("a/b"), ("a/b".to_string(), None));
        assert_eq!(split("a/b/"), ("a/b/".to_string(), None));
        assert_eq!(split(""), ("".to_string(), None));
    }

    #[test]
    fn test_split_root_level_file() {
        assert_eq!(split("file.txt"), ("/".to_string(), Some("file.txt".to_string())));
        assert_eq!(split("/file.txt"), ("/".to_string(), Some("file.txt".to_string())));
        assert_eq!(split("../file.txt"), ("/".to_string(), Some("file.txt".to_string())));
    }

    #[test]
    fn test_split_dot_rules() {
        // Leading dot does not count.
        assert_eq!(split("a/.env"), ("a/.env".to_string(), None));
        // Only the trailing segment is inspected.
        assert_eq!(split("v1.2/data"), ("v1.2/data".to_string(), None));
        // An explicit separator wins over the heuristic.
        assert_eq!(split("a/b.d/"), ("a/b.d/".to_string(), None));
    }

    #[test]
    fn test_is_move_target() {
        assert!(is_move_target("archive"));
        assert!(is_move_target(".hidden"));
        assert!(is_move_target(""));
        assert!(!is_move_target("file.txt"));
        assert!(!is_move_target("dir/file.txt"));
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(with_trailing_separator("dir"), "dir/");
        assert_eq!(with_trailing_separator("dir/"), "dir/");
    }

    #[test]
    fn test_upload_directory() {
        assert_eq!(upload_directory(""), "/");
        assert_eq!(upload_directory("."), "/");
        assert_eq!(upload_directory("a/b"), "a/b");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("uploads//"), "uploads/");
        assert_eq!(apply_prefix("", "/a.txt"), "/a.txt");
        assert_eq!(apply_prefix("uploads/", "/a.txt"), "uploads/a.txt");
        assert_eq!(apply_prefix("uploads/", "/"), "uploads/");
    }
}
