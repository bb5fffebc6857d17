//! Prefix tree over completion candidates.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct TrieNode {
    /// Ordered by character so traversal yields words in sorted order.
    children: BTreeMap<char, TrieNode>,
    is_word_end: bool,
}

/// A set of words that can be enumerated by prefix.
///
/// Any character may appear in a word, so executable names such as `python3.12`
/// or `x86_64-linux-gnu-gcc` are indexed like any other.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `word`. Inserting a word twice has no effect.
    pub fn insert(&mut self, word: &str) {
        let mut node = &mut self.root;
        for ch in word.chars() {
            node = node.children.entry(ch).or_default();
        }
        if !node.is_word_end {
            node.is_word_end = true;
            self.len += 1;
        }
    }

    /// Whether exactly `word` was inserted.
    pub fn contains(&self, word: &str) -> bool {
        self.find(word).is_some_and(|node| node.is_word_end)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All inserted words starting with `prefix`, in lexicographic order.
    ///
    /// An unknown prefix yields an empty vector.
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(node) = self.find(prefix) {
            let mut path = prefix.to_string();
            collect(node, &mut path, &mut out);
        }
        out
    }

    fn find(&self, prefix: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for ch in prefix.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }
}

impl<S: AsRef<str>> FromIterator<S> for Trie {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut trie = Trie::new();
        for word in iter {
            trie.insert(word.as_ref());
        }
        trie
    }
}

/// Depth-first walk appending every word below `node`.
fn collect(node: &TrieNode, path: &mut String, out: &mut Vec<String>) {
    if node.is_word_end {
        out.push(path.clone());
    }
    for (&ch, child) in &node.children {
        path.push(ch);
        collect(child, path, out);
        path.pop();
    }
}
