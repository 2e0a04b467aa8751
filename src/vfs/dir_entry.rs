use crate::EntryType;

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    kind: EntryType,
}

impl DirEntry {
    pub fn new<S: Into<String>>(name: S, kind: EntryType) -> DirEntry {
        DirEntry {
            name: name.into(),
            kind,
        }
    }

    /// File name of the entry, without its parent directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryType {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Directory
    }
}
