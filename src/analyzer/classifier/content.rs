use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use tracing::debug;

use crate::analyzer::scanner::ScannedFile;
use crate::constants::classify::{BINARY_EXTENSIONS, BINARY_SNIFF_BYTES};
use crate::types::{ErrorKind, ScanIssue};

/// Per-project cache of bounded file prefixes
///
/// Every file is read at most once, up to `limit` bytes. Binary and unreadable
/// files are cached as absent and reported once as `FileSkipped`.
pub struct ContentCache {
    limit: usize,
    entries: HashMap<String, Option<String>>,
    issues: Vec<ScanIssue>,
    lines: usize,
    skipped: usize,
}

impl ContentCache {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: HashMap::new(),
            issues: Vec::new(),
            lines: 0,
            skipped: 0,
        }
    }

    /// Text prefix of `file`, or `None` when it is binary or unreadable
    pub fn get(&mut self, file: &ScannedFile) -> Option<&str> {
        if !self.entries.contains_key(&file.relative) {
            let loaded = self.load(file);
            self.entries.insert(file.relative.clone(), loaded);
        }
        self.entries.get(&file.relative).and_then(|c| c.as_deref())
    }

    fn load(&mut self, file: &ScannedFile) -> Option<String> {
        if has_binary_extension(file) {
            self.skipped += 1;
            return None;
        }

        let mut buf = Vec::with_capacity(self.limit.min(file.size as usize));
        let read = File::open(&file.path)
            .and_then(|f| f.take(self.limit as u64).read_to_end(&mut buf));
        if let Err(e) = read {
            debug!("Unreadable file {}: {}", file.relative, e);
            self.skip(file, format!("unreadable: {}", e));
            return None;
        }

        let sniff = &buf[..buf.len().min(BINARY_SNIFF_BYTES)];
        if sniff.contains(&0) {
            self.skip(file, "binary content".to_string());
            return None;
        }

        let text = String::from_utf8_lossy(&buf).into_owned();
        self.lines += text.lines().count();
        Some(text)
    }

    fn skip(&mut self, file: &ScannedFile, reason: String) {
        self.skipped += 1;
        self.issues
            .push(ScanIssue::at(ErrorKind::FileSkipped, &file.relative, reason));
    }

    /// Lines counted across every text file read so far
    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_issues(self) -> Vec<ScanIssue> {
        self.issues
    }
}

pub fn has_binary_extension(file: &ScannedFile) -> bool {
    file.extension
        .as_deref()
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext))
}
