//! In-memory filesystem used to hand buffers to the PDF engine by path.

use std::collections::BTreeMap;

use crate::schema::ToolError;

#[derive(Debug, Default)]
pub struct VirtualFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or truncates `path`.
    pub fn write_file(&mut self, path: &str, bytes: Vec<u8>) {
        log::debug!("vfs: write {path} ({} bytes)", bytes.len());
        self.files.insert(path.to_owned(), bytes);
    }

    pub fn read_file(&self, path: &str) -> Result<&[u8], ToolError> {
        self.files
            .get(path)
            .map(Vec::as_slice)
            .ok_or_else(|| ToolError::FileNotFound(path.to_owned()))
    }

    /// Removes `path` and hands its contents back.
    pub fn take_file(&mut self, path: &str) -> Result<Vec<u8>, ToolError> {
        self.files
            .remove(path)
            .ok_or_else(|| ToolError::FileNotFound(path.to_owned()))
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_take() {
        let mut fs = VirtualFs::new();
        fs.write_file("/a.pdf", b"one".to_vec());
        fs.write_file("/a.pdf", b"two".to_vec());

        assert_eq!(fs.read_file("/a.pdf").unwrap(), b"two");
        assert_eq!(fs.paths().collect::<Vec<_>>(), vec!["/a.pdf"]);
        assert_eq!(fs.take_file("/a.pdf").unwrap(), b"two".to_vec());
        assert!(!fs.exists("/a.pdf"));
        assert_eq!(
            fs.read_file("/a.pdf"),
            Err(ToolError::FileNotFound("/a.pdf".into()))
        );
    }
}
