use std::fmt;

use bytes::Bytes;
use vale_store::FileTree;
use vale_types::ContentHash;

/// Failure recorded when a source yielded no trees.
pub const NO_TREES: &str = "Found no trees at that source";

/// Per-source failures, in the order the sources were tried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceFailures {
    entries: Vec<(String, String)>,
}

impl SourceFailures {
    pub fn record(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.entries.push((source.into(), message.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, m)| (s.as_str(), m.as_str()))
    }
}

impl fmt::Display for SourceFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed loading from {} hint source(s):", self.entries.len())?;
        for (source, message) in &self.entries {
            write!(f, "\n{source}: {message}")?;
        }
        Ok(())
    }
}

/// First blob across `trees` whose SHA-256 equals `target`.
pub fn find_blob(trees: &[FileTree], target: &ContentHash) -> Option<Bytes> {
    trees.iter().find_map(|tree| {
        tree.enumerate_blobs_transitive()
            .into_iter()
            .find(|blob| ContentHash::sha256(&blob.content) == *target)
            .map(|blob| blob.content)
    })
}

/// Diagnostic for a source whose trees did not contain the target.
pub fn describe_search(trees: &[FileTree]) -> String {
    let mut lines = vec![format!(
        "Searched {} tree nodes but none of those contained a matching blob:",
        trees.len()
    )];
    for (index, tree) in trees.iter().enumerate() {
        if tree.is_blob() {
            lines.push(format!("Node {index} {} is a blob", tree.hash()));
            continue;
        }
        lines.push(format!("Node {index} {} is a tree:", tree.hash()));
        for blob in tree.enumerate_blobs_transitive() {
            lines.push(format!(
                "Found {} at {}",
                ContentHash::sha256(&blob.content),
                blob.path_string()
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> FileTree {
        FileTree::sorted_tree([
            ("index.html".to_string(), FileTree::blob(&b"<html/>"[..])),
            (
                "assets".to_string(),
                FileTree::sorted_tree([("app.js".to_string(), FileTree::blob(&b"run()"[..]))]),
            ),
        ])
    }

    #[test]
    fn report_lists_sources_in_order() {
        let mut failures = SourceFailures::default();
        failures.record("first", NO_TREES);
        failures.record("second", "boom");
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures.to_string(),
            "Failed loading from 2 hint source(s):\nfirst: Found no trees at that source\nsecond: boom"
        );
    }

    #[test]
    fn empty_report() {
        let failures = SourceFailures::default();
        assert!(failures.is_empty());
        assert_eq!(failures.to_string(), "Failed loading from 0 hint source(s):");
    }

    #[test]
    fn finds_nested_blob_by_sha256() {
        let target = ContentHash::sha256(b"run()");
        assert_eq!(find_blob(&[site()], &target).unwrap().as_ref(), b"run()");
    }

    #[test]
    fn hash_tree_digest_does_not_match_in_trees() {
        let target = ContentHash::of_blob(b"run()");
        assert!(find_blob(&[site()], &target).is_none());
    }

    #[test]
    fn first_matching_tree_wins() {
        let a = FileTree::sorted_tree([("x".to_string(), FileTree::blob(&b"same"[..]))]);
        let b = FileTree::blob(&b"same"[..]);
        let found = find_blob(&[a, b], &ContentHash::sha256(b"same"));
        assert_eq!(found.unwrap().as_ref(), b"same");
    }

    #[test]
    fn search_description_lists_every_blob() {
        let solo = FileTree::blob(&b"solo"[..]);
        let text = describe_search(&[site(), solo.clone()]);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Searched 2 tree nodes but none of those contained a matching blob:"
        );
        assert_eq!(lines[1], format!("Node 0 {} is a tree:", site().hash()));
        assert_eq!(
            lines[2],
            format!("Found {} at assets/app.js", ContentHash::sha256(b"run()"))
        );
        assert_eq!(
            lines[3],
            format!("Found {} at index.html", ContentHash::sha256(b"<html/>"))
        );
        assert_eq!(lines[4], format!("Node 1 {} is a blob", solo.hash()));
        assert_eq!(lines.len(), 5);
    }
}
