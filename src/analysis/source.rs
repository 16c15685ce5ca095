use std::time::SystemTime;

/// Watch-mode change kind reported by the upstream producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Add => write!(f, "ADD"),
            ChangeKind::Change => write!(f, "CHANGE"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// An in-memory source file handle.
///
/// Contents are read by the caller before ingestion; the core never touches
/// the file system. Identity is the normalized repository-relative path.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub contents: String,
    pub mtime: SystemTime,
    pub event: Option<ChangeKind>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, contents: impl Into<String>, mtime: SystemTime) -> Self {
        Self {
            path: normalize_path(&path.into()),
            contents: contents.into(),
            mtime,
            event: None,
        }
    }

    pub fn with_event(mut self, event: ChangeKind) -> Self {
        self.event = Some(event);
        self
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        Some(ext.to_ascii_lowercase())
    }
}

/// Normalize a path to its repository-relative form: forward slashes, no
/// leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest.to_string();
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest.to_string();
        } else {
            break;
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./app/main.js"), "app/main.js");
        assert_eq!(normalize_path("/views/home.html"), "views/home.html");
        assert_eq!(normalize_path("a\\b\\c.js"), "a/b/c.js");
        assert_eq!(normalize_path("plain.js"), "plain.js");
    }

    #[test]
    fn test_extension() {
        let file = SourceFile::new("app/Main.JS", "", SystemTime::UNIX_EPOCH);
        assert_eq!(file.extension(), Some("js".to_string()));

        let file = SourceFile::new("app/README", "", SystemTime::UNIX_EPOCH);
        assert_eq!(file.extension(), None);
    }
}
