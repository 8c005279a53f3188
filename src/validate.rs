//! Validation engine.
//!
//! Runs the fixed rule set over every node of a collected graph, in
//! discovery order, and records which nodes carry a diagnostic. The graph
//! itself is never modified; a node with a diagnostic is "blocked" and the
//! resolver downgrades it to `Unresolved`.
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::graph::{KeyKind, MemberOrigin, MemberSpec, MemberType, NodeId, TypeGraph, TypeKind, TypeNode};
use crate::identity::{Constructed, TypeIdentity};
use crate::symbols::{DeclKind, MemberKind, SymbolProvider};

#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// Deduplicated, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    blocked: Vec<bool>,
}

impl Validation {
    pub fn is_blocked(&self, id: NodeId) -> bool {
        self.blocked.get(id.index()).copied().unwrap_or(false)
    }
}

pub fn validate<P: SymbolProvider + ?Sized>(provider: &P, graph: &TypeGraph, uses_map_mode: bool) -> Validation {
    let mut diagnostics = IndexSet::new();
    let mut blocked = vec![false; graph.len()];
    for node in graph.nodes() {
        let found = NodeCheck { provider, graph, node, uses_map_mode }.run();
        if !found.is_empty() {
            debug!(identity = %node.identity, count = found.len(), "node blocked by diagnostics");
            blocked[node.id.index()] = true;
            diagnostics.extend(found);
        }
    }

    // Objects writing a blocked type are blocked too, transitively. The
    // blocked set is settled before any of these diagnostics is produced.
    let mut referencing = Vec::new();
    loop {
        let newly: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| !blocked[n.id.index()] && !blocked_references(graph, n, &blocked).is_empty())
            .map(|n| n.id)
            .collect();
        if newly.is_empty() {
            break;
        }
        for id in &newly {
            blocked[id.index()] = true;
        }
        referencing.extend(newly);
    }
    referencing.sort();
    for id in referencing {
        let node = graph.node(id);
        debug!(identity = %node.identity, "node blocked through a referenced type");
        for (member, target) in blocked_references(graph, node, &blocked) {
            let target = &graph.node(target).identity;
            let detail = match member {
                Some(member) => format!("{}.{member} is written with {target}, which has errors", node.identity),
                None => format!("{} derives from {target}, which has errors", node.identity),
            };
            diagnostics.insert(Diagnostic::new(
                DiagnosticKind::InvalidMessagePackObject,
                &node.identity,
                member,
                vec![detail],
            ));
        }
    }
    Validation { diagnostics: diagnostics.into_iter().collect(), blocked }
}

/// Blocked nodes an object node depends on: through a member's type
/// (`Some(member)`) or through its base chain (`None`).
fn blocked_references<'g>(graph: &'g TypeGraph, node: &'g TypeNode, blocked: &[bool]) -> Vec<(Option<&'g str>, NodeId)> {
    if node.kind.object_policy().is_none() {
        return Vec::new();
    }
    let bases = node.base_chain.iter().filter(|b| blocked[b.index()]).map(|b| (None, *b));
    let members = node
        .members
        .iter()
        .filter(|m| m.formatter_override.is_none())
        .filter_map(|m| match m.declared {
            MemberType::Node(id) => {
                blocked_target(graph, id, blocked, &mut Vec::new()).map(|target| (Some(m.name.as_str()), target))
            }
            MemberType::Open(_) => None,
        });
    bases.chain(members).collect()
}

/// Follows collection arguments and union variants, which have no
/// formatter of their own once something they carry is blocked.
fn blocked_target(graph: &TypeGraph, id: NodeId, blocked: &[bool], seen: &mut Vec<NodeId>) -> Option<NodeId> {
    if blocked[id.index()] {
        return Some(id);
    }
    let node = graph.node(id);
    if node.formatter_override.is_some() || seen.contains(&id) {
        return None;
    }
    seen.push(id);
    match node.kind {
        TypeKind::Collection(_) => node.elements.iter().find_map(|e| blocked_target(graph, *e, blocked, seen)),
        TypeKind::Union => node.union_variants.iter().find_map(|v| blocked_target(graph, v.node, blocked, seen)),
        _ => None,
    }
}

/// Structural formatter capability: an instance `Serialize` accepting the
/// target and an instance `Deserialize` returning it. Free generic
/// parameters on either side match anything.
pub fn implements_formatter<P: SymbolProvider + ?Sized>(
    provider: &P,
    formatter: &Constructed,
    target: &Constructed,
) -> bool {
    let Some(symbol) = formatter.symbol() else { return false };
    if !matches!(provider.info_of(symbol).kind, DeclKind::Class | DeclKind::Struct) {
        return false;
    }
    let methods = || {
        provider
            .members_of(symbol)
            .iter()
            .filter(|m| m.kind == MemberKind::Method && !m.is_static)
    };
    let closes_over_target = |ty: &crate::symbols::TypeRef| {
        Constructed::instantiate(ty, formatter.args()).unifies_with(target)
    };
    let serializes = methods()
        .filter(|m| m.name == "Serialize")
        .any(|m| m.parameters.iter().any(closes_over_target));
    let deserializes = methods()
        .filter(|m| m.name == "Deserialize")
        .any(|m| m.ty.as_ref().is_some_and(closes_over_target));
    serializes && deserializes
}

struct NodeCheck<'a, P: ?Sized> {
    provider: &'a P,
    graph: &'a TypeGraph,
    node: &'a TypeNode,
    uses_map_mode: bool,
}

impl<'a, P: SymbolProvider + ?Sized> NodeCheck<'a, P> {
    fn run(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if self.node.kind.object_policy().is_some() {
            self.attribution(&mut out);
            self.member_keys(&mut out);
            self.null_keys(&mut out);
            self.key_uniqueness(&mut out);
            self.member_formatters(&mut out);
        }
        if self.node.kind.is_union_like() {
            self.union_variants(&mut out);
        }
        self.type_formatter(&mut out);
        for defect in &self.node.defects {
            out.push(self.invalid(defect.clone()));
        }
        out
    }

    fn on_node(&self, kind: DiagnosticKind, member: Option<&str>, args: Vec<String>) -> Diagnostic {
        Diagnostic::new(kind, &self.node.identity, member, args)
    }

    fn invalid(&self, detail: String) -> Diagnostic {
        self.on_node(DiagnosticKind::InvalidMessagePackObject, None, vec![detail])
    }

    /// Members whose own rules are checked here. Members inherited from an
    /// attributed base are checked on that base's node instead.
    fn checked_members(&self) -> impl Iterator<Item = &'a MemberSpec> + 'a {
        self.node
            .members
            .iter()
            .filter(|m| !matches!(m.origin, MemberOrigin::Inherited { base_attributed: true, .. }))
    }

    fn declaring_type(&self, member: &'a MemberSpec) -> &'a TypeIdentity {
        match &member.origin {
            MemberOrigin::Own => &self.node.identity,
            MemberOrigin::Inherited { base, .. } => base,
        }
    }

    fn attribution(&self, out: &mut Vec<Diagnostic>) {
        for member in self.checked_members() {
            if member.formatter_override.is_some() {
                continue;
            }
            let MemberType::Node(id) = member.declared else { continue };
            let mut leaves = Vec::new();
            unattributed_leaves(self.graph, id, &mut leaves);
            for leaf in leaves {
                out.push(self.on_node(
                    DiagnosticKind::TypeMustBeMessagePackObject,
                    Some(&member.name),
                    vec![leaf.to_string()],
                ));
            }
        }
    }

    fn member_keys(&self, out: &mut Vec<Diagnostic>) {
        for member in self.checked_members().filter(|m| m.key == KeyKind::Unattributed) {
            out.push(match &member.origin {
                MemberOrigin::Own => self.on_node(
                    DiagnosticKind::PublicMemberNeedsKey,
                    Some(&member.name),
                    vec![self.node.identity.to_string(), member.name.clone()],
                ),
                MemberOrigin::Inherited { base, .. } => Diagnostic::new(
                    DiagnosticKind::BaseTypeContainsUnattributedPublicMembers,
                    base,
                    Some(&member.name),
                    vec![base.to_string(), member.name.clone()],
                ),
            });
        }
    }

    fn null_keys(&self, out: &mut Vec<Diagnostic>) {
        for member in self.checked_members().filter(|m| m.key == KeyKind::Null) {
            let declaring = self.declaring_type(member);
            out.push(Diagnostic::new(
                DiagnosticKind::BothStringAndIntKeyAreNull,
                declaring,
                Some(&member.name),
                vec![declaring.to_string(), member.name.clone()],
            ));
        }
    }

    /// Over the effective member set, attributed bases included.
    fn key_uniqueness(&self, out: &mut Vec<Diagnostic>) {
        let mut ints: IndexMap<i32, Vec<&str>> = IndexMap::new();
        let mut strings: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for member in &self.node.members {
            match &member.key {
                KeyKind::Int(n) => ints.entry(*n).or_default().push(&member.name),
                KeyKind::Str(s) => strings.entry(s).or_default().push(&member.name),
                _ => {}
            }
        }
        let owner = &self.node.identity;
        for (key, names) in ints.iter().filter(|(_, names)| names.len() > 1) {
            out.push(self.invalid(format!("{owner} has duplicate key {key} on members {}", names.join(", "))));
        }
        for (key, names) in strings.iter().filter(|(_, names)| names.len() > 1) {
            out.push(self.invalid(format!("{owner} has duplicate key \"{key}\" on members {}", names.join(", "))));
        }
        if !self.node.is_map_encoded(self.uses_map_mode) {
            for (key, names) in ints.iter().filter(|(key, _)| **key < 0) {
                out.push(self.invalid(format!(
                    "{owner} has negative key {key} on members {}, which has no array position",
                    names.join(", ")
                )));
            }
        }
    }

    fn member_formatters(&self, out: &mut Vec<Diagnostic>) {
        for member in self.checked_members() {
            let Some(custom) = &member.formatter_override else { continue };
            if !implements_formatter(self.provider, &custom.formatter, &member.declared_ty) {
                out.push(self.on_node(
                    DiagnosticKind::MessageFormatterMustBeMessagePackFormatter,
                    Some(&member.name),
                    vec![custom.identity.to_string()],
                ));
            }
            let MemberType::Node(id) = member.declared else { continue };
            if let Some(declared) = &self.graph.node(id).formatter_override {
                if declared.identity != custom.identity {
                    out.push(self.on_node(
                        DiagnosticKind::ConflictingFormatterOverride,
                        Some(&member.name),
                        vec![
                            self.node.identity.to_string(),
                            member.name.clone(),
                            custom.identity.to_string(),
                            declared.identity.to_string(),
                        ],
                    ));
                }
            }
        }
    }

    fn type_formatter(&self, out: &mut Vec<Diagnostic>) {
        let Some(custom) = &self.node.formatter_override else { return };
        if !implements_formatter(self.provider, &custom.formatter, &self.node.ty) {
            out.push(self.on_node(
                DiagnosticKind::MessageFormatterMustBeMessagePackFormatter,
                None,
                vec![custom.identity.to_string()],
            ));
        }
    }

    fn union_variants(&self, out: &mut Vec<Diagnostic>) {
        let mut tags: IndexMap<i64, Vec<String>> = IndexMap::new();
        for variant in &self.node.union_variants {
            tags.entry(variant.tag).or_default().push(self.graph.node(variant.node).identity.to_string());
        }
        let owner = &self.node.identity;
        for (tag, variants) in tags.iter().filter(|(_, variants)| variants.len() > 1) {
            out.push(self.invalid(format!("{owner} has duplicate union key {tag} on {}", variants.join(", "))));
        }

        for variant in &self.node.union_variants {
            let target = self.graph.node(variant.node);
            let serializable = target.formatter_override.is_some()
                || matches!(target.kind, TypeKind::Object { .. } | TypeKind::Union | TypeKind::AssumedFormattable);
            if !serializable {
                out.push(Diagnostic::new(
                    DiagnosticKind::TypeMustBeMessagePackObject,
                    &target.identity,
                    None,
                    vec![target.identity.to_string()],
                ));
            }
        }
    }
}

/// Unresolved types reached from `id` through collection arguments.
fn unattributed_leaves<'g>(graph: &'g TypeGraph, id: NodeId, out: &mut Vec<&'g TypeIdentity>) {
    let node = graph.node(id);
    if node.formatter_override.is_some() {
        return;
    }
    match node.kind {
        TypeKind::Unresolved => {
            if !out.contains(&&node.identity) {
                out.push(&node.identity);
            }
        }
        TypeKind::Collection(_) => {
            for element in &node.elements {
                unattributed_leaves(graph, *element, out);
            }
        }
        _ => {}
    }
}
