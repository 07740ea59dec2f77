//! Decision-tree vertices as authored in the tree source document.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::intake::GraphicsKind;

/// A vertex in the diagnostic tree.
///
/// A node with a `question` is a decision node; otherwise a node with a
/// `result` is a terminal node. The gating fields redirect to
/// `next_if_skipped` depending on checklist state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_done: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_not_done: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_if_skipped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<Knowledge>,
}

/// Auxiliary content shown with a node regardless of its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knowledge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

/// Borrowed view of what a node displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Decision {
        question: &'a str,
        options: &'a Options,
    },
    Result(&'a str),
}

impl Node {
    /// Classify the node; a node with neither question nor result is invalid.
    pub fn kind(&self) -> DomainResult<NodeKind<'_>> {
        match (&self.question, &self.result) {
            (Some(question), _) => Ok(NodeKind::Decision {
                question,
                options: &self.options,
            }),
            (None, Some(result)) => Ok(NodeKind::Result(result)),
            (None, None) => Err(DomainError::InvalidNode(self.id.clone())),
        }
    }

    pub fn is_decision(&self) -> bool {
        self.question.is_some()
    }

    /// True when the checklist state fails this node's gate.
    ///
    /// The gate fails if any `requires_not_done` id is done, or any
    /// `requires_done` id is missing.
    pub fn gate_fails(&self, done: &BTreeSet<String>) -> bool {
        let blocked = self.requires_not_done.iter().any(|id| done.contains(id));
        let missing = self.requires_done.iter().any(|id| !done.contains(id));
        blocked || missing
    }

    /// Every node id this node refers to, with the field it came from.
    pub fn references(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.options
            .iter()
            .map(|(_, option)| ("next", option.next.as_str()))
            .chain(
                self.next_if_skipped
                    .as_deref()
                    .map(|id| ("nextIfSkipped", id)),
            )
    }

    /// Every checklist id this node mentions (gates and option marks).
    pub fn checklist_ids(&self) -> impl Iterator<Item = &str> {
        self.requires_done
            .iter()
            .chain(self.requires_not_done.iter())
            .chain(self.options.iter().flat_map(|(_, o)| o.marked_ids().iter()))
            .map(String::as_str)
    }
}

/// One answer of a decision node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOption {
    pub next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_checklist: Option<ChecklistMarks>,
    #[serde(default, rename = "requiresGPU", skip_serializing_if = "Option::is_none")]
    pub requires_gpu: Option<GraphicsKind>,
}

impl TreeOption {
    pub fn new(next: impl Into<String>) -> Self {
        Self {
            next: next.into(),
            mark_checklist: None,
            requires_gpu: None,
        }
    }

    /// Checklist ids marked done when this option is chosen.
    pub fn marked_ids(&self) -> &[String] {
        match &self.mark_checklist {
            Some(marks) => marks.ids(),
            None => &[],
        }
    }
}

/// `markChecklist` accepts a single id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecklistMarks {
    One(String),
    Many(Vec<String>),
}

impl ChecklistMarks {
    pub fn ids(&self) -> &[String] {
        match self {
            ChecklistMarks::One(id) => std::slice::from_ref(id),
            ChecklistMarks::Many(ids) => ids,
        }
    }
}

/// Option labels in document order.
///
/// The tree source stores options as a JSON object whose key order is the
/// display order, so this keeps entries in a Vec instead of a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(Vec<(String, TreeOption)>);

impl Options {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TreeOption)> {
        self.0.iter().map(|(label, option)| (label.as_str(), option))
    }

    pub fn get(&self, label: &str) -> Option<&TreeOption> {
        self.iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, option)| option)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, TreeOption)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, TreeOption)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(label, option)| (label, option)))
    }
}

impl<'de> Deserialize<'de> for Options {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OptionsVisitor)
    }
}

struct OptionsVisitor;

impl<'de> Visitor<'de> for OptionsVisitor {
    type Value = Options;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of option label to option")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, TreeOption)> =
            Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, option)) = access.next_entry::<String, TreeOption>()? {
            if entries.iter().any(|(existing, _)| *existing == label) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate option label: {label}"
                )));
            }
            entries.push((label, option));
        }
        Ok(Options(entries))
    }
}
