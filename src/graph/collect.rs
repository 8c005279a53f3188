//! Breadth-first type discovery.
//!
//! Nodes are registered (identity → id) before anything they reference is
//! visited, so cycles and diamond-shaped sharing terminate on the table
//! lookup. Generic arguments are substituted at the point of reference;
//! a reference that still mentions a free parameter never becomes a node.
use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use super::{
    FormatterOverride, KeyKind, MemberOrigin, MemberSpec, MemberType, NodeId, OpenDefinition, TypeGraph,
    TypeKind, TypeNode, UnionVariant,
};
use crate::analysis::{AnalysisError, AnalyzerOptions, CancellationToken};
use crate::identity::{Constructed, TypeIdentity};
use crate::symbols::{
    Accessibility, AttributeArg, AttributeData, DeclKind, MemberDescriptor, ReferenceSymbols, SymbolId,
    SymbolProvider,
};
use crate::wellknown;

/// Discover every type reachable from `root`.
///
/// The cancellation token is checked once per node visit; a node is never
/// left half-expanded.
pub fn collect<P: SymbolProvider + ?Sized>(
    provider: &P,
    refs: &ReferenceSymbols,
    options: &AnalyzerOptions,
    root: SymbolId,
    cancel: &CancellationToken,
) -> Result<TypeGraph, AnalysisError> {
    let mut builder = Builder {
        provider,
        refs,
        options,
        nodes: Vec::new(),
        index: HashMap::new(),
        queue: VecDeque::new(),
    };
    let root = builder.intern(Constructed::definition(provider, root));
    while let Some(id) = builder.queue.pop_front() {
        cancel.check()?;
        builder.expand(id);
    }
    debug!(nodes = builder.nodes.len(), "type graph collected");
    Ok(TypeGraph { nodes: builder.nodes, index: builder.index, root })
}

struct Builder<'a, P: ?Sized> {
    provider: &'a P,
    refs: &'a ReferenceSymbols,
    options: &'a AnalyzerOptions,
    nodes: Vec<TypeNode>,
    index: HashMap<TypeIdentity, NodeId>,
    queue: VecDeque<NodeId>,
}

/// One level of an inheritance chain: the type itself, then each base.
struct Level {
    ty: Constructed,
    identity: TypeIdentity,
    origin: MemberOrigin,
}

impl<P: SymbolProvider + ?Sized> Builder<'_, P> {
    fn intern(&mut self, ty: Constructed) -> NodeId {
        let identity = TypeIdentity::of(&ty, self.provider);
        if let Some(id) = self.index.get(&identity) {
            return *id;
        }
        let id = NodeId(self.nodes.len() as u32);
        let kind = self.classify(&ty);
        debug!(id = id.0, identity = %identity, ?kind, "registered type node");
        self.nodes.push(TypeNode {
            id,
            identity: identity.clone(),
            ty,
            kind,
            members: Vec::new(),
            base_chain: Vec::new(),
            union_variants: Vec::new(),
            elements: Vec::new(),
            formatter_override: None,
            defects: Vec::new(),
        });
        self.index.insert(identity, id);
        self.queue.push_back(id);
        id
    }

    fn classify(&self, ty: &Constructed) -> TypeKind {
        let (symbol, args) = match ty {
            Constructed::Array { element, rank } => {
                let is_byte = matches!(**element, Constructed::Named { symbol, .. } if self.refs.is_byte(symbol));
                if *rank == 1 && is_byte {
                    return TypeKind::WellKnown(&wellknown::BYTE_ARRAY);
                }
                return wellknown::array_shape(*rank).map_or(TypeKind::Unresolved, TypeKind::Collection);
            }
            Constructed::Param { .. } => return TypeKind::Unresolved,
            Constructed::Named { symbol, args } => (*symbol, args),
        };
        let info = self.provider.info_of(symbol);
        if self.options.assumes_formattable(info) {
            return TypeKind::AssumedFormattable;
        }
        if let Some(builtin) = self.refs.builtin(symbol) {
            return TypeKind::WellKnown(builtin);
        }
        if let Some(shape) = self.refs.collection(symbol) {
            return TypeKind::Collection(shape);
        }
        if info.kind == DeclKind::Enum {
            return TypeKind::Enum;
        }

        let open = !args.iter().all(Constructed::is_closed);
        let attributes = self.provider.attributes_of(symbol);
        let abstract_shape = matches!(info.kind, DeclKind::Interface | DeclKind::AbstractClass);
        if abstract_shape && self.refs.find(attributes, self.refs.union).is_some() {
            return if open { TypeKind::GeneratedOpen(OpenDefinition::Union) } else { TypeKind::Union };
        }
        if info.kind != DeclKind::Interface {
            if let Some(object) = self.refs.object_attribute(attributes) {
                let keys_as_names = matches!(object.args.first(), Some(AttributeArg::Bool(true)));
                return if open {
                    TypeKind::GeneratedOpen(OpenDefinition::Object { keys_as_names })
                } else {
                    TypeKind::Object { keys_as_names }
                };
            }
        }
        TypeKind::Unresolved
    }

    fn expand(&mut self, id: NodeId) {
        let provider = self.provider;
        let (ty, kind, identity) = {
            let node = &self.nodes[id.index()];
            (node.ty.clone(), node.kind, node.identity.clone())
        };
        let mut defects = Vec::new();
        let mut members = Vec::new();
        let mut base_chain = Vec::new();
        let mut union_variants = Vec::new();
        let mut elements = Vec::new();

        let formatter_override = match ty.symbol() {
            Some(symbol) => self.formatter_attribute(
                provider.attributes_of(symbol),
                ty.args(),
                &identity.to_string(),
                &mut defects,
            ),
            None => None,
        };

        if let Some(keys_as_names) = kind.object_policy() {
            let levels = self.levels(&ty, &identity, &mut base_chain, &mut defects);
            for level in levels.iter().rev() {
                let Some(symbol) = level.ty.symbol() else { continue };
                for descriptor in provider.members_of(symbol).iter().filter(|m| m.is_data_member()) {
                    if let Some(member) = self.member(descriptor, level, keys_as_names, &mut defects) {
                        members.push(member);
                    }
                }
            }
        } else if kind.is_union_like() {
            union_variants = self.variants(&ty, &identity, &mut defects);
        } else {
            match (&ty, kind) {
                (Constructed::Array { element, .. }, TypeKind::Collection(_)) => {
                    elements.push(self.intern((**element).clone()));
                }
                (Constructed::Named { args, .. }, TypeKind::Collection(_)) => {
                    for arg in args {
                        elements.push(self.intern(arg.clone()));
                    }
                }
                (Constructed::Named { symbol, .. }, TypeKind::Enum) => {
                    if let Some(underlying) = &provider.info_of(*symbol).enum_underlying {
                        elements.push(self.intern(Constructed::instantiate(underlying, &[])));
                    }
                }
                _ => {}
            }
        }

        let node = &mut self.nodes[id.index()];
        node.members = members;
        node.base_chain = base_chain;
        node.union_variants = union_variants;
        node.elements = elements;
        node.formatter_override = formatter_override;
        node.defects = defects;
    }

    /// The type itself followed by its closed-over bases, nearest first.
    fn levels(
        &mut self,
        ty: &Constructed,
        identity: &TypeIdentity,
        base_chain: &mut Vec<NodeId>,
        defects: &mut Vec<String>,
    ) -> Vec<Level> {
        let provider = self.provider;
        let mut levels = vec![Level { ty: ty.clone(), identity: identity.clone(), origin: MemberOrigin::Own }];
        let mut seen: HashSet<SymbolId> = ty.symbol().into_iter().collect();
        let mut current = ty.clone();
        while let Some(base_ref) = current.symbol().and_then(|s| provider.base_of(s)) {
            let base = Constructed::instantiate(base_ref, current.args());
            let Some(base_symbol) = base.symbol() else { break };
            if !seen.insert(base_symbol) {
                defects.push(format!("{identity} has a cyclic base type chain"));
                break;
            }
            if base.is_closed() {
                base_chain.push(self.intern(base.clone()));
            }
            let base_identity = TypeIdentity::of(&base, provider);
            let base_attributed = self.refs.object_attribute(provider.attributes_of(base_symbol)).is_some();
            levels.push(Level {
                ty: base.clone(),
                identity: base_identity.clone(),
                origin: MemberOrigin::Inherited { base: base_identity, base_attributed },
            });
            current = base;
        }
        levels
    }

    /// `None` for members that are never written: ignored ones, and
    /// unkeyed members that are not public. Their types are not visited.
    fn member(
        &mut self,
        descriptor: &MemberDescriptor,
        level: &Level,
        keys_as_names: bool,
        defects: &mut Vec<String>,
    ) -> Option<MemberSpec> {
        let ty = descriptor.ty.as_ref()?;
        let context = format!("{}.{}", level.identity, descriptor.name);
        let key = self.key_of(descriptor, keys_as_names, &context, defects);
        let serialized = match key {
            KeyKind::Ignored => false,
            KeyKind::Unattributed => descriptor.accessibility == Accessibility::Public,
            _ => true,
        };
        if !serialized {
            trace!(member = %context, ?key, "skipped member");
            return None;
        }
        let declared_ty = Constructed::instantiate(ty, level.ty.args());
        let declared = if declared_ty.is_closed() {
            MemberType::Node(self.intern(declared_ty.clone()))
        } else {
            MemberType::Open(TypeIdentity::of(&declared_ty, self.provider))
        };
        trace!(member = %context, ?key, "collected member");
        let formatter_override =
            self.formatter_attribute(&descriptor.attributes, level.ty.args(), &context, defects);
        Some(MemberSpec {
            name: descriptor.name.clone(),
            declared,
            declared_ty,
            accessibility: descriptor.accessibility,
            key,
            formatter_override,
            origin: level.origin.clone(),
        })
    }

    fn key_of(
        &self,
        descriptor: &MemberDescriptor,
        keys_as_names: bool,
        context: &str,
        defects: &mut Vec<String>,
    ) -> KeyKind {
        if self.refs.is_ignored(&descriptor.attributes) {
            return KeyKind::Ignored;
        }
        match self.refs.find(&descriptor.attributes, self.refs.key) {
            Some(attribute) => match attribute.args.first() {
                Some(AttributeArg::Int(n)) => match i32::try_from(*n) {
                    Ok(n) => KeyKind::Int(n),
                    Err(_) => {
                        defects.push(format!("{context}: key {n} does not fit in an int"));
                        KeyKind::Ignored
                    }
                },
                Some(AttributeArg::Str(s)) => KeyKind::Str(s.clone()),
                None | Some(AttributeArg::Null) => KeyKind::Null,
                Some(other) => {
                    // reported as a defect; kept out of the keyed layout
                    defects.push(format!("{context}: KeyAttribute takes an int or a string, found {other:?}"));
                    KeyKind::Ignored
                }
            },
            None if keys_as_names && descriptor.accessibility == Accessibility::Public => {
                KeyKind::Str(descriptor.name.clone())
            }
            None => KeyKind::Unattributed,
        }
    }

    fn formatter_attribute(
        &self,
        attributes: &[AttributeData],
        ctx: &[Constructed],
        context: &str,
        defects: &mut Vec<String>,
    ) -> Option<FormatterOverride> {
        let attribute = self.refs.find(attributes, self.refs.formatter)?;
        match attribute.args.first() {
            Some(AttributeArg::Type(formatter)) => {
                let formatter = Constructed::instantiate(formatter, ctx);
                let identity = TypeIdentity::of(&formatter, self.provider);
                Some(FormatterOverride { formatter, identity })
            }
            _ => {
                defects.push(format!("{context}: MessagePackFormatterAttribute needs a formatter type"));
                None
            }
        }
    }

    fn variants(&mut self, ty: &Constructed, identity: &TypeIdentity, defects: &mut Vec<String>) -> Vec<UnionVariant> {
        let (provider, refs) = (self.provider, self.refs);
        let Some(symbol) = ty.symbol() else { return Vec::new() };
        let mut out = Vec::new();
        for attribute in refs.find_all(provider.attributes_of(symbol), refs.union) {
            match attribute.args.as_slice() {
                [AttributeArg::Int(tag), AttributeArg::Type(variant)] => {
                    let variant = Constructed::instantiate(variant, ty.args());
                    if variant.is_closed() {
                        out.push(UnionVariant { tag: *tag, node: self.intern(variant) });
                    }
                }
                _ => defects.push(format!("{identity}: UnionAttribute takes (int key, Type subType)")),
            }
        }
        out
    }
}
