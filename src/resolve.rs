//! Formatter resolution.
//!
//! Decides, per node, how the emission stage will encode it. Strategies
//! refer to other types by identity only; the formatter for a referenced
//! type is found through the resolver table at run time, which is what
//! keeps self-referential graphs finite.
use serde::Serialize;
use tracing::trace;

use crate::graph::{KeyKind, MemberType, NodeId, TypeGraph, TypeKind, TypeNode};
use crate::identity::TypeIdentity;
use crate::validate::Validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Positional: array index = int key, gaps written as nil.
    ArrayEncoded,
    MapEncoded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MemberKey {
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberFormatter {
    /// Looked up through the resolver by the member's declared type.
    Resolver,
    Custom { formatter: TypeIdentity },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPlan {
    pub name: String,
    pub key: MemberKey,
    pub declared: TypeIdentity,
    pub formatter: MemberFormatter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionArm {
    pub tag: i64,
    pub variant: TypeIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    WellKnownBuiltin {
        formatter: String,
    },
    Enum {
        underlying: TypeIdentity,
    },
    CollectionAdapter {
        adapter: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        backing: Option<String>,
        /// Element (and key) types, in argument order.
        elements: Vec<TypeIdentity>,
    },
    CustomFormatter {
        formatter: TypeIdentity,
    },
    GeneratedObject {
        shape: Shape,
        /// Array-encoded: ascending int key. Map-encoded: declaration order, bases first.
        members: Vec<MemberPlan>,
        /// Array-encoded only: highest int key + 1. Positions without a
        /// member are written as nil.
        #[serde(skip_serializing_if = "Option::is_none")]
        array_length: Option<u32>,
    },
    /// Writes `[tag, payload]`. On read, a tag with no arm is a recoverable
    /// decode error for that value; the dispatcher must not abort the
    /// surrounding stream.
    UnionDispatcher {
        arms: Vec<UnionArm>,
    },
    /// Formatted by a resolver outside this plan.
    AssumedFormattable,
    Unresolved,
}

impl Strategy {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Strategy::Unresolved)
    }
}

/// Memoized per node; resolving a node twice yields the same value.
pub struct Resolver<'a> {
    graph: &'a TypeGraph,
    validation: &'a Validation,
    uses_map_mode: bool,
    memo: Vec<Option<Strategy>>,
    in_progress: Vec<bool>,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a TypeGraph, validation: &'a Validation, uses_map_mode: bool) -> Self {
        Self {
            graph,
            validation,
            uses_map_mode,
            memo: vec![None; graph.len()],
            in_progress: vec![false; graph.len()],
        }
    }

    pub fn strategy(&mut self, id: NodeId) -> &Strategy {
        self.ensure(id);
        match &self.memo[id.index()] {
            Some(strategy) => strategy,
            None => &Strategy::Unresolved,
        }
    }

    /// Strategies for every node, indexed by [`NodeId`].
    pub fn resolve_all(mut self) -> Vec<Strategy> {
        let graph = self.graph;
        for node in graph.nodes() {
            self.ensure(node.id);
        }
        self.memo.into_iter().map(|s| s.unwrap_or(Strategy::Unresolved)).collect()
    }

    fn ensure(&mut self, id: NodeId) {
        let graph = self.graph;
        if self.memo[id.index()].is_some() || self.in_progress[id.index()] {
            return;
        }
        let node = graph.node(id);
        self.in_progress[id.index()] = true;
        let strategy = self.compute(node);
        trace!(identity = %node.identity, ?strategy, "resolved");
        self.in_progress[id.index()] = false;
        self.memo[id.index()] = Some(strategy);
    }

    /// Derived unresolvability. A node still being resolved further up the
    /// stack counts as resolvable.
    fn unresolved(&mut self, id: NodeId) -> bool {
        self.ensure(id);
        self.memo[id.index()].as_ref().is_some_and(Strategy::is_unresolved)
    }

    fn compute(&mut self, node: &'a TypeNode) -> Strategy {
        if self.validation.is_blocked(node.id) {
            return Strategy::Unresolved;
        }
        if let Some(custom) = &node.formatter_override {
            return Strategy::CustomFormatter { formatter: custom.identity.clone() };
        }
        let graph = self.graph;
        match node.kind {
            TypeKind::WellKnown(builtin) => Strategy::WellKnownBuiltin { formatter: builtin.formatter.to_string() },
            TypeKind::AssumedFormattable => Strategy::AssumedFormattable,
            TypeKind::Enum => match node.elements.first() {
                Some(underlying) => Strategy::Enum { underlying: graph.node(*underlying).identity.clone() },
                None => Strategy::Unresolved,
            },
            TypeKind::Collection(shape) => {
                if node.elements.iter().any(|e| self.unresolved(*e)) {
                    return Strategy::Unresolved;
                }
                if let (Some(special), [only]) = (shape.byte_specialization, node.elements.as_slice()) {
                    let is_byte = matches!(
                        graph.node(*only).kind,
                        TypeKind::WellKnown(b) if b.metadata_name == "System.Byte"
                    );
                    if is_byte {
                        return Strategy::WellKnownBuiltin { formatter: special.to_string() };
                    }
                }
                Strategy::CollectionAdapter {
                    adapter: shape.adapter.to_string(),
                    backing: shape.backing.map(str::to_string),
                    elements: node.elements.iter().map(|e| graph.node(*e).identity.clone()).collect(),
                }
            }
            TypeKind::Object { .. } => self.generated_object(node),
            TypeKind::Union => {
                if node.union_variants.iter().any(|v| self.unresolved(v.node)) {
                    return Strategy::Unresolved;
                }
                let mut arms: Vec<UnionArm> = node
                    .union_variants
                    .iter()
                    .map(|v| UnionArm { tag: v.tag, variant: graph.node(v.node).identity.clone() })
                    .collect();
                arms.sort_by_key(|arm| arm.tag);
                Strategy::UnionDispatcher { arms }
            }
            TypeKind::GeneratedOpen(_) | TypeKind::Unresolved => Strategy::Unresolved,
        }
    }

    fn generated_object(&self, node: &TypeNode) -> Strategy {
        let shape = if node.is_map_encoded(self.uses_map_mode) { Shape::MapEncoded } else { Shape::ArrayEncoded };
        let mut members: Vec<MemberPlan> = node
            .members
            .iter()
            .filter_map(|member| {
                let key = match &member.key {
                    KeyKind::Int(n) => MemberKey::Int(*n),
                    KeyKind::Str(s) => MemberKey::Str(s.clone()),
                    _ => return None,
                };
                let declared = match &member.declared {
                    MemberType::Node(id) => self.graph.node(*id).identity.clone(),
                    MemberType::Open(identity) => identity.clone(),
                };
                let formatter = match &member.formatter_override {
                    Some(custom) => MemberFormatter::Custom { formatter: custom.identity.clone() },
                    None => MemberFormatter::Resolver,
                };
                Some(MemberPlan { name: member.name.clone(), key, declared, formatter })
            })
            .collect();
        let mut array_length = None;
        if shape == Shape::ArrayEncoded {
            members.sort_by_key(|m| match m.key {
                MemberKey::Int(n) => i64::from(n),
                MemberKey::Str(_) => i64::MAX,
            });
            // negative keys are rejected for this shape; `i32::MAX + 1` fits a u32
            array_length = members
                .iter()
                .filter_map(|m| match m.key {
                    MemberKey::Int(n) => u32::try_from(n).ok(),
                    MemberKey::Str(_) => None,
                })
                .max()
                .map(|max| max + 1)
                .or(Some(0));
        }
        Strategy::GeneratedObject { shape, members, array_length }
    }
}
