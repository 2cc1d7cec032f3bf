//! Namespace tree construction
//!
//! Content keys are slash-delimited logical paths. Inserting every item of a
//! package builds a tree of directories and leaves; the two serializers walk
//! this tree in lock step.

use std::collections::BTreeMap;

use pp_core::{BuildError, ContentItem};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Directory(BTreeMap<String, Node>),
    Leaf(ContentItem),
}

/// The assembled content tree of one package.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    package: String,
    root: BTreeMap<String, Node>,
}

/// Splits a logical key into tree segments.
///
/// A key ending in a separator addresses a leaf literally named `/` or `\`:
/// the trailing-`/` form drops the final two split pieces (the escaped
/// segment and the empty piece after it), the trailing-`\` form drops the
/// final piece, and both append the bare separator as the leaf name.
fn split_key(key: &str) -> Vec<String> {
    let mut segments: Vec<String> = key.split('/').map(str::to_owned).collect();
    if key.ends_with('/') {
        segments.truncate(segments.len().saturating_sub(2));
        segments.push("/".to_owned());
    } else if key.ends_with('\\') {
        segments.pop();
        segments.push("\\".to_owned());
    }
    segments
}

impl Namespace {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            root: BTreeMap::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub(crate) fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    fn conflict(&self, reason: String) -> BuildError {
        BuildError::NamingConflict {
            package: self.package.clone(),
            reason,
        }
    }

    /// Inserts one content item under its logical key, creating intermediate
    /// directories. Any clash between a leaf and a directory, or between two
    /// leaves, is a naming conflict.
    pub fn insert(&mut self, key: &str, item: ContentItem) -> Result<(), BuildError> {
        let segments = split_key(key);
        let (leaf, directories) = match segments.split_last() {
            Some(split) => split,
            None => {
                return Err(self.conflict(format!(
                    "\"{key}\" is the name of two pieces of content in package \"{}\"",
                    self.package
                )))
            }
        };

        let mut children = &mut self.root;
        for segment in directories {
            if !children.contains_key(segment) {
                children.insert(segment.clone(), Node::Directory(BTreeMap::new()));
            }
            children = match children.get_mut(segment) {
                Some(Node::Directory(next)) => next,
                _ => {
                    return Err(BuildError::NamingConflict {
                        package: self.package.clone(),
                        reason: format!(
                            "\"{key}\" is the name of both an object containing content \
                             and a piece of content in package \"{}\"",
                            self.package
                        ),
                    })
                }
            };
        }

        match children.get(leaf) {
            None => {
                children.insert(leaf.clone(), Node::Leaf(item));
                Ok(())
            }
            Some(Node::Directory(_)) => Err(BuildError::NamingConflict {
                package: self.package.clone(),
                reason: format!(
                    "\"{key}\" is the name of both a piece of content and an object \
                     containing content in package \"{}\"",
                    self.package
                ),
            }),
            Some(Node::Leaf(_)) => Err(BuildError::NamingConflict {
                package: self.package.clone(),
                reason: format!(
                    "\"{key}\" is the name of two pieces of content in package \"{}\"",
                    self.package
                ),
            }),
        }
    }
}

/// A directory whose keys are exactly `"0".."n-1"` serializes as an array in
/// numeric order. Non-contiguous or non-numeric keys stay an object.
pub(crate) fn as_array(children: &BTreeMap<String, Node>) -> Option<Vec<&Node>> {
    let mut elements = Vec::new();
    while let Some(node) = children.get(&elements.len().to_string()) {
        elements.push(node);
    }
    (elements.len() == children.len()).then_some(elements)
}
