//! Arena-backed schema graph.
//!
//! Schemas form a graph, not a tree: `$ref` chains may be cyclic. Every
//! schema lives in a [`SchemaArena`] slot and refers to its children by
//! [`SchemaId`], so a self-referential definition is just an ordinary edge
//! back into the arena instead of an infinite inline expansion. Cycles are
//! detected once after resolution and marked, which lets the synthesizer
//! bound recursion with a depth cap.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Opaque identifier of a schema slot in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    /// Raw index of this slot.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// String constraints (`format`, `pattern`, `enum`, length bounds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringSchema {
    /// Declared `format` (e.g. `date-time`, `email`, `uuid`).
    pub format: Option<String>,
    /// Declared `pattern` (regex, informational only).
    pub pattern: Option<String>,
    /// Declared `enum` members.
    pub enum_values: Vec<Value>,
    /// Minimum length.
    pub min_length: Option<u64>,
    /// Maximum length.
    pub max_length: Option<u64>,
}

/// Numeric constraints shared by `integer` and `number`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberSchema {
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Declared `enum` members.
    pub enum_values: Vec<Value>,
}

/// Object properties and required set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: Vec<(String, SchemaId)>,
    /// Names of required properties.
    pub required: Vec<String>,
}

impl ObjectSchema {
    /// Whether the named property is required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Array item schema and size bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    /// Item schema, if declared.
    pub items: Option<SchemaId>,
    /// Minimum item count.
    pub min_items: Option<u64>,
    /// Maximum item count.
    pub max_items: Option<u64>,
}

/// How composite branches combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompositeMode {
    /// Exactly one branch must match.
    OneOf,
    /// At least one branch must match.
    AnyOf,
    /// All branches must match (merged for synthesis).
    AllOf,
}

/// Composite schema (`oneOf` / `anyOf` / `allOf`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSchema {
    /// Combination mode.
    pub mode: CompositeMode,
    /// Branch schemas in declaration order.
    pub branches: Vec<SchemaId>,
}

/// Closed set of schema shapes.
///
/// Loosely-typed spec documents collapse into these tagged variants so every
/// consumption site handles the full set exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// `type: boolean`
    Boolean,
    /// `type: null`
    Null,
    /// `type: string`
    String(StringSchema),
    /// `type: integer`
    Integer(NumberSchema),
    /// `type: number`
    Number(NumberSchema),
    /// `type: object`
    Object(ObjectSchema),
    /// `type: array`
    Array(ArraySchema),
    /// `oneOf` / `anyOf` / `allOf`
    Composite(CompositeSchema),
    /// Untyped schema (`{}`) — matches anything.
    Any,
}

impl SchemaNode {
    /// Child schema IDs, in declaration order.
    #[must_use]
    pub fn children(&self) -> Vec<SchemaId> {
        match self {
            Self::Object(o) => o.properties.iter().map(|(_, id)| *id).collect(),
            Self::Array(a) => a.items.into_iter().collect(),
            Self::Composite(c) => c.branches.clone(),
            Self::Boolean
            | Self::Null
            | Self::String(_)
            | Self::Integer(_)
            | Self::Number(_)
            | Self::Any => Vec::new(),
        }
    }
}

/// Arena of resolved schema nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
    cyclic: BTreeSet<SchemaId>,
}

impl SchemaArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot that will be filled later (two-pass `$ref` resolution).
    pub(crate) fn reserve(&mut self) -> SchemaId {
        self.nodes.push(SchemaNode::Any);
        SchemaId(self.nodes.len() - 1)
    }

    /// Fill a previously reserved slot.
    pub(crate) fn fill(&mut self, id: SchemaId, node: SchemaNode) {
        self.nodes[id.0] = node;
    }

    /// Insert a node and return its ID.
    pub(crate) fn insert(&mut self, node: SchemaNode) -> SchemaId {
        self.nodes.push(node);
        SchemaId(self.nodes.len() - 1)
    }

    /// Resolve an ID to its node.
    #[must_use]
    pub fn get(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Number of schemas in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the schema participates in a reference cycle.
    #[must_use]
    pub fn is_cyclic(&self, id: SchemaId) -> bool {
        self.cyclic.contains(&id)
    }

    /// IDs marked as self-referential.
    #[must_use]
    pub fn cyclic_ids(&self) -> impl Iterator<Item = SchemaId> + '_ {
        self.cyclic.iter().copied()
    }

    /// Detect reference cycles and mark every node on a cycle.
    ///
    /// Iterative three-color DFS; a back edge to a gray node marks all stack
    /// entries from that node onward as cyclic.
    pub(crate) fn mark_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color = vec![Color::White; self.nodes.len()];
        let mut cyclic = BTreeSet::new();

        for start in 0..self.nodes.len() {
            if color[start] != Color::White {
                continue;
            }
            // Stack of (node, next child index)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;
            while let Some(&mut (node, ref mut next)) = stack.last_mut() {
                let children = self.nodes[node].children();
                if *next >= children.len() {
                    color[node] = Color::Black;
                    stack.pop();
                    continue;
                }
                let child = children[*next].0;
                *next += 1;
                match color[child] {
                    Color::White => {
                        color[child] = Color::Gray;
                        stack.push((child, 0));
                    }
                    Color::Gray => {
                        // Back edge: everything from `child` up the stack is on a cycle.
                        let from = stack
                            .iter()
                            .position(|&(n, _)| n == child)
                            .unwrap_or(stack.len() - 1);
                        for &(n, _) in &stack[from..] {
                            cyclic.insert(SchemaId(n));
                        }
                    }
                    Color::Black => {}
                }
            }
        }
        self.cyclic = cyclic;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn leaf() -> SchemaNode {
        SchemaNode::String(StringSchema::default())
    }

    #[test]
    fn test_reserve_and_fill() {
        let mut arena = SchemaArena::new();
        let id = arena.reserve();
        arena.fill(id, leaf());
        assert!(matches!(arena.get(id), SchemaNode::String(_)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_acyclic_graph_not_marked() {
        let mut arena = SchemaArena::new();
        let s = arena.insert(leaf());
        let obj = arena.insert(SchemaNode::Object(ObjectSchema {
            properties: vec![("name".to_string(), s)],
            required: vec!["name".to_string()],
        }));
        arena.mark_cycles();
        assert!(!arena.is_cyclic(obj));
        assert!(!arena.is_cyclic(s));
    }

    #[test]
    fn test_self_reference_marked_cyclic() {
        // Node { children: array<Node> }
        let mut arena = SchemaArena::new();
        let node = arena.reserve();
        let children = arena.insert(SchemaNode::Array(ArraySchema {
            items: Some(node),
            min_items: None,
            max_items: None,
        }));
        arena.fill(
            node,
            SchemaNode::Object(ObjectSchema {
                properties: vec![("children".to_string(), children)],
                required: vec![],
            }),
        );
        arena.mark_cycles();
        assert!(arena.is_cyclic(node));
        assert!(arena.is_cyclic(children));
    }

    #[test]
    fn test_mutual_reference_marked_cyclic() {
        let mut arena = SchemaArena::new();
        let a = arena.reserve();
        let b = arena.reserve();
        arena.fill(
            a,
            SchemaNode::Object(ObjectSchema {
                properties: vec![("b".to_string(), b)],
                required: vec![],
            }),
        );
        arena.fill(
            b,
            SchemaNode::Object(ObjectSchema {
                properties: vec![("a".to_string(), a)],
                required: vec![],
            }),
        );
        arena.mark_cycles();
        assert!(arena.is_cyclic(a));
        assert!(arena.is_cyclic(b));
        assert_eq!(arena.cyclic_ids().count(), 2);
    }

    #[test]
    fn test_shared_subschema_is_not_a_cycle() {
        // Two objects referencing the same leaf is a DAG, not a cycle.
        let mut arena = SchemaArena::new();
        let s = arena.insert(leaf());
        let a = arena.insert(SchemaNode::Object(ObjectSchema {
            properties: vec![("x".to_string(), s)],
            required: vec![],
        }));
        let b = arena.insert(SchemaNode::Object(ObjectSchema {
            properties: vec![("y".to_string(), s)],
            required: vec![],
        }));
        arena.mark_cycles();
        assert!(!arena.is_cyclic(a));
        assert!(!arena.is_cyclic(b));
        assert!(!arena.is_cyclic(s));
    }

    #[test]
    fn test_node_serialization_tagged() {
        let node = SchemaNode::Integer(NumberSchema {
            minimum: Some(1.0),
            maximum: Some(10.0),
            enum_values: vec![],
        });
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"kind\":\"integer\""));
        let back: SchemaNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
