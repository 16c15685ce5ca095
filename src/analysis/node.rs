use crate::analysis::record::FactRecord;
use crate::analysis::source::SourceFile;
use crate::analysis::{markup, script};
use crate::errors::BuildError;

/// One ingested file: the opaque source handle plus its fact record.
///
/// The analyzer to run is chosen purely by file extension. Files with an
/// unknown extension, and files the graph marks unparsed (excluded or
/// library files), keep an empty record but remain addressable as required
/// leaf files.
#[derive(Debug)]
pub struct FileNode {
    pub file: SourceFile,
    pub record: FactRecord,
    pub parsed: bool,
}

impl FileNode {
    pub fn new(file: SourceFile, unparsed: bool) -> Result<Self, BuildError> {
        let mut record = FactRecord::new(file.path.clone());
        let mut parsed = false;

        if !unparsed {
            match file.extension().as_deref() {
                Some("js") => {
                    script::analyze(&file.path, &file.contents, &mut record)?;
                    parsed = true;
                }
                Some("html") | Some("htm") | Some("ejs") => {
                    markup::analyze(&file.contents, &mut record);
                    parsed = true;
                }
                _ => {}
            }
        }

        Ok(Self {
            file,
            record,
            parsed,
        })
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::analysis::record::DependencyKind;

    fn file(path: &str, contents: &str) -> SourceFile {
        SourceFile::new(path, contents, SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn test_dispatch_by_extension() {
        let node = FileNode::new(
            file("a.js", r#"x.controller = "MainCtrl";"#),
            false,
        )
        .unwrap();
        assert!(node.parsed);
        assert!(
            node.record
                .dependencies(DependencyKind::Component)
                .contains("MainCtrl")
        );

        let node = FileNode::new(file("v.html", r#"<div ng-controller="A"></div>"#), false).unwrap();
        assert!(node.parsed);

        let node = FileNode::new(file("style.css", ".a { color: red }"), false).unwrap();
        assert!(!node.parsed);
        assert!(node.record.modules.is_empty());
    }

    #[test]
    fn test_unparsed_files_keep_empty_records() {
        let node = FileNode::new(file("lib/vendor.js", "not ( valid js"), true).unwrap();
        assert!(!node.parsed);
        assert!(node.record.dependencies(DependencyKind::Component).is_empty());
    }
}
