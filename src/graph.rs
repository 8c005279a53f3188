//! Arena of discovered types.
//!
//! Every distinct closed type reachable from a root gets exactly one
//! [`TypeNode`]; all cross references are [`NodeId`]s into the arena, so
//! cyclic type graphs need no shared ownership. Arena order is discovery
//! order, which the resolver table reuses for its ids.
pub mod collect;

use std::collections::HashMap;

use crate::identity::{Constructed, TypeIdentity};
use crate::symbols::Accessibility;
use crate::wellknown::{Builtin, CollectionShape};

pub use collect::collect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Classification decided once, when a node is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object { keys_as_names: bool },
    Union,
    Collection(&'static CollectionShape),
    WellKnown(&'static Builtin),
    Enum,
    /// Generic definition with free parameters; validated but never resolved.
    GeneratedOpen(OpenDefinition),
    /// Named in the options as formattable by some other resolver.
    AssumedFormattable,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDefinition {
    Object { keys_as_names: bool },
    Union,
}

impl TypeKind {
    /// Member layout policy for object-shaped declarations, open or closed.
    pub fn object_policy(self) -> Option<bool> {
        match self {
            TypeKind::Object { keys_as_names }
            | TypeKind::GeneratedOpen(OpenDefinition::Object { keys_as_names }) => Some(keys_as_names),
            _ => None,
        }
    }

    pub fn is_union_like(self) -> bool {
        matches!(self, TypeKind::Union | TypeKind::GeneratedOpen(OpenDefinition::Union))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    Int(i32),
    Str(String),
    /// `[Key]` present but carrying neither an int nor a string.
    Null,
    Ignored,
    Unattributed,
}

impl KeyKind {
    pub fn is_keyed(&self) -> bool {
        matches!(self, KeyKind::Int(_) | KeyKind::Str(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    Node(NodeId),
    /// Mentions a free generic parameter; only inside open definitions.
    Open(TypeIdentity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOrigin {
    Own,
    Inherited { base: TypeIdentity, base_attributed: bool },
}

/// A user formatter named by `[MessagePackFormatter(typeof(F))]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOverride {
    pub formatter: Constructed,
    pub identity: TypeIdentity,
}

#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub name: String,
    pub declared: MemberType,
    pub declared_ty: Constructed,
    pub accessibility: Accessibility,
    pub key: KeyKind,
    pub formatter_override: Option<FormatterOverride>,
    pub origin: MemberOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionVariant {
    pub tag: i64,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub id: NodeId,
    pub identity: TypeIdentity,
    pub ty: Constructed,
    pub kind: TypeKind,
    /// Effective serialized members: base levels first (outermost ancestor
    /// first), then own. Ignored and non-public unkeyed members are left out.
    pub members: Vec<MemberSpec>,
    pub base_chain: Vec<NodeId>,
    pub union_variants: Vec<UnionVariant>,
    /// Collection arguments, array element, or enum underlying type.
    pub elements: Vec<NodeId>,
    /// Type-level `[MessagePackFormatter]`.
    pub formatter_override: Option<FormatterOverride>,
    /// Malformed attribute usages found while expanding the node.
    pub defects: Vec<String>,
}

impl TypeNode {
    /// Map encoding is forced by the options or by any string-keyed member.
    pub fn is_map_encoded(&self, uses_map_mode: bool) -> bool {
        uses_map_mode || self.members.iter().any(|m| matches!(m.key, KeyKind::Str(_)))
    }
}

#[derive(Debug, Clone)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    index: HashMap<TypeIdentity, NodeId>,
    root: NodeId,
}

impl TypeGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, identity: &TypeIdentity) -> Option<&TypeNode> {
        self.index.get(identity).map(|id| self.node(*id))
    }

    /// Nodes in discovery order.
    pub fn nodes(&self) -> &[TypeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
