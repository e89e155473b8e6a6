//! Open documents, synchronized in full on every change.

use std::collections::HashMap;

use lsp_types::{TextDocumentContentChangeEvent, Url};
use pursls_lsp::{DocumentSnapshot, Documents};

#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<Url, DocumentSnapshot>,
}

impl DocumentStore {
    pub fn open(&mut self, uri: Url, version: i32, text: String) {
        self.docs.insert(uri, DocumentSnapshot::new(version, text));
    }

    /// Apply full-text changes; the last change wins.
    pub fn change(&mut self, uri: &Url, version: i32, changes: Vec<TextDocumentContentChangeEvent>) {
        let Some(last) = changes.into_iter().last() else {
            return;
        };
        if last.range.is_some() {
            tracing::warn!(%uri, "Ignoring incremental change; full sync expected");
            return;
        }
        self.docs
            .insert(uri.clone(), DocumentSnapshot::new(version, last.text));
    }

    pub fn close(&mut self, uri: &Url) {
        self.docs.remove(uri);
    }
}

impl Documents for DocumentStore {
    fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.docs.get(uri).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Position, Range};

    fn uri() -> Url {
        Url::parse("file:///project/src/Main.purs").unwrap()
    }

    fn full(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_open_change_close() {
        let mut store = DocumentStore::default();
        store.open(uri(), 1, String::from("module Main where\n"));
        store.change(&uri(), 2, vec![full("a"), full("module Main where\nx = 1\n")]);

        let doc = store.snapshot(&uri()).unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.text, "module Main where\nx = 1\n");

        store.close(&uri());
        assert!(store.snapshot(&uri()).is_none());
    }

    #[test]
    fn test_ranged_change_ignored() {
        let mut store = DocumentStore::default();
        store.open(uri(), 1, String::from("x"));
        let ranged = TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(0, 0), Position::new(0, 1))),
            range_length: None,
            text: String::from("y"),
        };
        store.change(&uri(), 2, vec![ranged]);
        assert_eq!(store.snapshot(&uri()).unwrap().version, 1);
    }
}
