//! Object key helpers shared by the bundled clients.
//!
//! Keys never start with `/`. Directory keys end with `/`; the root is "".

/// Normalize a client path to an object key.
pub(crate) fn object_key(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed == "." { String::new() } else { trimmed.to_string() }
}

/// Normalize a client path to a directory key (root is "").
pub(crate) fn directory_key(path: &str) -> String {
    let key = object_key(path);
    let key = key.trim_end_matches('/');
    if key.is_empty() { String::new() } else { format!("{}/", key) }
}

/// Join a directory and a leaf name into an object key.
pub(crate) fn join(directory: &str, name: &str) -> String {
    format!("{}{}", directory_key(directory), name.trim_start_matches('/'))
}

/// Directory key that contains `key`.
pub(crate) fn parent(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => trimmed[..=i].to_string(),
        None => String::new(),
    }
}

/// Leaf name of `key`, without a trailing slash.
pub(crate) fn leaf(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("/dir/a.txt"), "dir/a.txt");
        assert_eq!(object_key("dir/"), "dir/");
        assert_eq!(object_key("/"), "");
        assert_eq!(object_key("."), "");
    }

    #[test]
    fn test_directory_key() {
        assert_eq!(directory_key("dir"), "dir/");
        assert_eq!(directory_key("/dir/sub/"), "dir/sub/");
        assert_eq!(directory_key("/"), "");
        assert_eq!(directory_key(""), "");
    }

    #[test]
    fn test_join_parent_leaf() {
        assert_eq!(join("dir", "a.txt"), "dir/a.txt");
        assert_eq!(join("/", "a.txt"), "a.txt");
        assert_eq!(parent("dir/sub/a.txt"), "dir/sub/");
        assert_eq!(parent("dir/sub/"), "dir/");
        assert_eq!(parent("a.txt"), "");
        assert_eq!(leaf("dir/sub/"), "sub");
        assert_eq!(leaf("dir/a.txt"), "a.txt");
    }
}
