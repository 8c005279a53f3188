//! In-memory [`SymbolProvider`] loaded from JSON declaration documents.
//!
//! Each document plays the role of one source file of a compilation; all
//! documents plus a built-in prelude (builtin types, collection types and the
//! serialization attributes) form one universe. Type references are written
//! in C#-like syntax (`List<int>`, `int[,]`, `(int, string)`, `int?`) and are
//! resolved against the whole universe after every declaration is known.
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::refs::{
    FORMATTER_ATTRIBUTE, IGNORE_DATA_MEMBER_ATTRIBUTE, IGNORE_MEMBER_ATTRIBUTE, KEY_ATTRIBUTE,
    MESSAGE_PACK_OBJECT_ATTRIBUTE, UNION_ATTRIBUTE,
};
use super::{
    split_arity, Accessibility, AttributeArg, AttributeData, DeclKind, MemberDescriptor, MemberKind,
    SymbolId, SymbolInfo, SymbolProvider, TypeRef,
};
use crate::path_de::{self, PathError};
use crate::wellknown::{self, KEYWORD_ALIASES};

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniverseDoc {
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,
    #[serde(default)]
    pub members: Vec<MemberDoc>,
    /// Enum underlying type; `int` when omitted.
    #[serde(default)]
    pub underlying: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDoc {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    #[serde(default)]
    pub kind: MemberKind,
    #[serde(default)]
    pub access: Accessibility,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeDoc {
    Bare(String),
    Full {
        #[serde(rename = "type")]
        class: String,
        #[serde(default)]
        args: Vec<ArgDoc>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgDoc {
    TypeOf {
        #[serde(rename = "typeof")]
        type_of: String,
    },
    Value(serde_json::Value),
}

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] PathError),
    #[error("invalid type reference `{input}` in {context}: {message}")]
    Syntax { input: String, context: String, message: String },
    #[error("unknown type `{name}` referenced from {context}")]
    UnknownType { name: String, context: String },
    #[error("ambiguous type `{name}` referenced from {context}: candidates are {}", candidates.join(", "))]
    AmbiguousType { name: String, context: String, candidates: Vec<String> },
    #[error("type `{name}` is declared more than once")]
    DuplicateType { name: String },
    #[error("invalid attribute argument in {context}: {message}")]
    AttributeArgument { context: String, message: String },
}

// ————————————————————————————————————————————————————————————————————————————
// UNIVERSE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
struct Declaration {
    info: SymbolInfo,
    generics: Vec<String>,
    attributes: Vec<AttributeData>,
    members: Vec<MemberDescriptor>,
    base: Option<TypeRef>,
}

#[derive(Debug, Default)]
pub struct Universe {
    decls: Vec<Declaration>,
    by_metadata_name: HashMap<String, SymbolId>,
    prelude_len: usize,
}

impl Universe {
    pub fn from_docs<I>(docs: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = UniverseDoc>,
    {
        let prelude = prelude();
        let prelude_len = prelude.len();
        let decls: Vec<TypeDecl> = prelude
            .into_iter()
            .chain(docs.into_iter().flat_map(|doc| doc.types))
            .collect();

        let mut index = NameIndex::default();
        for (i, decl) in decls.iter().enumerate() {
            index.insert(decl, SymbolId(i as u32))?;
        }
        let decls = decls
            .into_iter()
            .map(|decl| index.declaration(decl))
            .collect::<Result<Vec<_>, _>>()?;

        let by_metadata_name = decls
            .iter()
            .enumerate()
            .map(|(i, d)| (d.info.metadata_name.clone(), SymbolId(i as u32)))
            .collect();
        tracing::debug!(declarations = decls.len() - prelude_len, "universe loaded");
        Ok(Self { decls, by_metadata_name, prelude_len })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LoadError> {
        let doc = path_de::from_value_with_path::<UniverseDoc>(value)?;
        Self::from_docs([doc])
    }

    /// Find a declaration by metadata name, full name, or unique simple name.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        if let Some(id) = self.by_metadata_name.get(name) {
            return Some(*id);
        }
        let mut hits = self
            .declarations()
            .chain((0..self.prelude_len).map(|i| SymbolId(i as u32)))
            .filter(|id| {
                let info = &self.decls[id.index()].info;
                info.name == name || info.simple_name() == name
            });
        let first = hits.next()?;
        match hits.next() {
            None => Some(first),
            Some(_) => None,
        }
    }

    /// User declarations, in load order (the prelude is excluded).
    pub fn declarations(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (self.prelude_len..self.decls.len()).map(|i| SymbolId(i as u32))
    }
}

impl SymbolProvider for Universe {
    fn resolve_well_known(&self, metadata_name: &str) -> Option<SymbolId> {
        self.by_metadata_name.get(metadata_name).copied()
    }

    fn info_of(&self, symbol: SymbolId) -> &SymbolInfo {
        &self.decls[symbol.index()].info
    }

    fn attributes_of(&self, symbol: SymbolId) -> &[AttributeData] {
        &self.decls[symbol.index()].attributes
    }

    fn members_of(&self, symbol: SymbolId) -> &[MemberDescriptor] {
        &self.decls[symbol.index()].members
    }

    fn base_of(&self, symbol: SymbolId) -> Option<&TypeRef> {
        self.decls[symbol.index()].base.as_ref()
    }

    fn generic_params_of(&self, symbol: SymbolId) -> &[String] {
        &self.decls[symbol.index()].generics
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NAME RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Default)]
struct NameIndex {
    by_full: HashMap<(String, usize), SymbolId>,
    by_simple: HashMap<(String, usize), Vec<SymbolId>>,
    names: Vec<String>,
    kinds: Vec<DeclKind>,
}

impl NameIndex {
    fn insert(&mut self, decl: &TypeDecl, id: SymbolId) -> Result<(), LoadError> {
        let arity = decl.generics.len();
        if self.by_full.insert((decl.name.clone(), arity), id).is_some() {
            return Err(LoadError::DuplicateType { name: super::metadata_name(&decl.name, arity) });
        }
        let simple = decl.name.rsplit('.').next().unwrap_or(&decl.name).to_string();
        self.by_simple.entry((simple, arity)).or_default().push(id);
        self.names.push(decl.name.clone());
        self.kinds.push(decl.kind);
        Ok(())
    }

    fn declaration(&self, decl: TypeDecl) -> Result<Declaration, LoadError> {
        let scope = Scope { index: self, generics: &decl.generics, owner: &decl.name };
        let attributes = scope.attributes(&decl.attributes, &decl.name)?;
        let base = decl
            .base
            .as_deref()
            .map(|b| scope.type_ref(b, &decl.name))
            .transpose()?;
        let members = decl
            .members
            .iter()
            .map(|m| scope.member(m))
            .collect::<Result<Vec<_>, _>>()?;
        let enum_underlying = match decl.kind {
            DeclKind::Enum => Some(scope.type_ref(decl.underlying.as_deref().unwrap_or("int"), &decl.name)?),
            _ => None,
        };
        let info = SymbolInfo {
            metadata_name: super::metadata_name(&decl.name, decl.generics.len()),
            name: decl.name,
            kind: decl.kind,
            enum_underlying,
        };
        Ok(Declaration { info, generics: decl.generics, attributes, members, base })
    }

    fn resolve_name(&self, name: &str, arity: usize, attribute: bool, context: &str) -> Result<SymbolId, LoadError> {
        let mut candidates = vec![name.to_string()];
        if arity == 0 {
            if let Some(alias) = KEYWORD_ALIASES.get(name) {
                candidates.insert(0, alias.to_string());
            }
        }
        if attribute && !name.ends_with("Attribute") {
            candidates.push(format!("{name}Attribute"));
        }
        for candidate in &candidates {
            if let Some(id) = self.by_full.get(&(candidate.clone(), arity)) {
                return Ok(*id);
            }
            match self.by_simple.get(&(candidate.clone(), arity)).map(Vec::as_slice) {
                Some([id]) => return Ok(*id),
                Some(ids) if ids.len() > 1 => {
                    return Err(LoadError::AmbiguousType {
                        name: name.to_string(),
                        context: context.to_string(),
                        candidates: ids.iter().map(|id| self.names[id.index()].clone()).collect(),
                    });
                }
                _ => {}
            }
        }
        Err(LoadError::UnknownType { name: name.to_string(), context: context.to_string() })
    }
}

struct Scope<'a> {
    index: &'a NameIndex,
    generics: &'a [String],
    owner: &'a str,
}

impl Scope<'_> {
    fn type_ref(&self, src: &str, context: &str) -> Result<TypeRef, LoadError> {
        let syntax = parse_type(src).map_err(|message| LoadError::Syntax {
            input: src.to_string(),
            context: context.to_string(),
            message,
        })?;
        self.resolve(&syntax, false, context)
    }

    fn resolve(&self, syntax: &TypeSyntax, attribute: bool, context: &str) -> Result<TypeRef, LoadError> {
        match syntax {
            TypeSyntax::Named { name, args } => {
                if args.is_empty() {
                    if let Some(index) = self.generics.iter().position(|g| g == name) {
                        return Ok(TypeRef::Param { index, name: name.clone() });
                    }
                }
                let symbol = self.index.resolve_name(name, args.len(), attribute, context)?;
                let args = args
                    .iter()
                    .map(|a| self.resolve(a, false, context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeRef::Named { symbol, args })
            }
            TypeSyntax::Array { element, rank } => Ok(TypeRef::Array {
                element: Box::new(self.resolve(element, false, context)?),
                rank: *rank,
            }),
            TypeSyntax::Tuple(elements) => {
                let symbol = self.index.resolve_name("System.ValueTuple", elements.len(), false, context)?;
                let args = elements
                    .iter()
                    .map(|a| self.resolve(a, false, context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeRef::Named { symbol, args })
            }
            TypeSyntax::Nullable(inner) => {
                let inner = self.resolve(inner, false, context)?;
                match &inner {
                    TypeRef::Named { symbol, .. } if self.index.kinds[symbol.index()].is_value_type() => {
                        let nullable = self.index.resolve_name("System.Nullable", 1, false, context)?;
                        Ok(TypeRef::Named { symbol: nullable, args: vec![inner] })
                    }
                    // nullable reference annotations do not change the type
                    _ => Ok(inner),
                }
            }
        }
    }

    fn attributes(&self, docs: &[AttributeDoc], context: &str) -> Result<Vec<AttributeData>, LoadError> {
        docs.iter().map(|doc| self.attribute(doc, context)).collect()
    }

    fn attribute(&self, doc: &AttributeDoc, context: &str) -> Result<AttributeData, LoadError> {
        let (class, args) = match doc {
            AttributeDoc::Bare(class) => (class.as_str(), &[][..]),
            AttributeDoc::Full { class, args } => (class.as_str(), args.as_slice()),
        };
        let class = self.index.resolve_name(class, 0, true, context)?;
        let args = args
            .iter()
            .map(|arg| self.attribute_arg(arg, context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AttributeData { class, args })
    }

    fn attribute_arg(&self, arg: &ArgDoc, context: &str) -> Result<AttributeArg, LoadError> {
        use serde_json::Value;
        match arg {
            ArgDoc::TypeOf { type_of } => Ok(AttributeArg::Type(self.type_ref(type_of, context)?)),
            ArgDoc::Value(Value::Null) => Ok(AttributeArg::Null),
            ArgDoc::Value(Value::Bool(b)) => Ok(AttributeArg::Bool(*b)),
            ArgDoc::Value(Value::String(s)) => Ok(AttributeArg::Str(s.clone())),
            ArgDoc::Value(Value::Number(n)) => n.as_i64().map(AttributeArg::Int).ok_or_else(|| {
                LoadError::AttributeArgument { context: context.to_string(), message: format!("{n} is not an integer") }
            }),
            ArgDoc::Value(other) => Err(LoadError::AttributeArgument {
                context: context.to_string(),
                message: format!("unsupported argument {other}"),
            }),
        }
    }

    fn member(&self, doc: &MemberDoc) -> Result<MemberDescriptor, LoadError> {
        let context = format!("{}.{}", self.owner, doc.name);
        let ty = match (&doc.ty, doc.kind) {
            (Some(ty), _) => Some(self.type_ref(ty, &context)?),
            (None, MemberKind::Method) => None,
            (None, _) => {
                return Err(LoadError::Syntax {
                    input: String::new(),
                    context,
                    message: "fields and properties need a `type`".to_string(),
                });
            }
        };
        let parameters = doc
            .params
            .iter()
            .map(|p| self.type_ref(p, &context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MemberDescriptor {
            name: doc.name.clone(),
            kind: doc.kind,
            ty,
            parameters,
            accessibility: doc.access,
            is_static: doc.is_static,
            attributes: self.attributes(&doc.attributes, &context)?,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE REFERENCE SYNTAX
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
enum TypeSyntax {
    Named { name: String, args: Vec<TypeSyntax> },
    Array { element: Box<TypeSyntax>, rank: u8 },
    Tuple(Vec<TypeSyntax>),
    Nullable(Box<TypeSyntax>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Punct(char),
}

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:([A-Za-z_][A-Za-z0-9_.]*)|([<>,\[\]()?]))").expect("token pattern compiles")
});

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let mut rest = src;
    while !rest.trim_start().is_empty() {
        let caps = TOKEN
            .captures(rest)
            .ok_or_else(|| format!("unexpected input at `{}`", rest.trim_start()))?;
        if let Some(ident) = caps.get(1) {
            out.push(Token::Ident(ident.as_str().to_string()));
        } else if let Some(punct) = caps.get(2).and_then(|p| p.as_str().chars().next()) {
            out.push(Token::Punct(punct));
        }
        rest = &rest[caps[0].len()..];
    }
    Ok(out)
}

fn parse_type(src: &str) -> Result<TypeSyntax, String> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let ty = parser.ty()?;
    match parser.peek() {
        None => Ok(ty),
        Some(tok) => Err(format!("trailing {tok:?}")),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), String> {
        if self.eat(punct) { Ok(()) } else { Err(format!("expected `{punct}`")) }
    }

    fn ty(&mut self) -> Result<TypeSyntax, String> {
        let mut ty = self.primary()?;
        loop {
            if self.eat('[') {
                let mut rank: u8 = 1;
                while self.eat(',') {
                    rank = rank.saturating_add(1);
                }
                self.expect(']')?;
                ty = TypeSyntax::Array { element: Box::new(ty), rank };
            } else if self.eat('?') {
                ty = TypeSyntax::Nullable(Box::new(ty));
            } else {
                return Ok(ty);
            }
        }
    }

    fn primary(&mut self) -> Result<TypeSyntax, String> {
        if self.eat('(') {
            let elements = self.list(')')?;
            if elements.len() < 2 {
                return Err("a tuple needs at least two elements".to_string());
            }
            return Ok(TypeSyntax::Tuple(elements));
        }
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            other => return Err(format!("expected a type name, found {other:?}")),
        };
        self.pos += 1;
        let args = if self.eat('<') { self.list('>')? } else { Vec::new() };
        Ok(TypeSyntax::Named { name, args })
    }

    fn list(&mut self, close: char) -> Result<Vec<TypeSyntax>, String> {
        let mut items = vec![self.ty()?];
        while self.eat(',') {
            items.push(self.ty()?);
        }
        self.expect(close)?;
        Ok(items)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PRELUDE
// ————————————————————————————————————————————————————————————————————————————

fn prelude_decl(metadata_name: &str, kind: DeclKind) -> TypeDecl {
    let (name, arity) = split_arity(metadata_name);
    let generics = match arity {
        1 => vec!["T".to_string()],
        n => (1..=n).map(|i| format!("T{i}")).collect(),
    };
    TypeDecl {
        name: name.to_string(),
        kind,
        generics,
        base: None,
        attributes: Vec::new(),
        members: Vec::new(),
        underlying: None,
    }
}

fn is_interface_name(metadata_name: &str) -> bool {
    let simple = metadata_name.rsplit('.').next().unwrap_or(metadata_name);
    let mut chars = simple.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

fn prelude() -> Vec<TypeDecl> {
    let mut out = Vec::new();
    for b in wellknown::BUILTINS {
        let kind = if b.is_value_type { DeclKind::Struct } else { DeclKind::Class };
        out.push(prelude_decl(b.metadata_name, kind));
    }
    for c in wellknown::COLLECTIONS {
        let kind = if is_interface_name(c.metadata_name) {
            DeclKind::Interface
        } else if c.is_value_type {
            DeclKind::Struct
        } else {
            DeclKind::Class
        };
        out.push(prelude_decl(c.metadata_name, kind));
    }
    for attribute in [
        MESSAGE_PACK_OBJECT_ATTRIBUTE,
        KEY_ATTRIBUTE,
        IGNORE_MEMBER_ATTRIBUTE,
        IGNORE_DATA_MEMBER_ATTRIBUTE,
        UNION_ATTRIBUTE,
        FORMATTER_ATTRIBUTE,
    ] {
        out.push(prelude_decl(attribute, DeclKind::Class));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn universe(types: serde_json::Value) -> Universe {
        Universe::from_value(json!({ "types": types })).expect("universe loads")
    }

    #[test]
    fn type_syntax_covers_generics_arrays_tuples_and_nullables() {
        assert_eq!(
            parse_type("Dictionary<string, List<int[]>>?").unwrap(),
            TypeSyntax::Nullable(Box::new(TypeSyntax::Named {
                name: "Dictionary".into(),
                args: vec![
                    TypeSyntax::Named { name: "string".into(), args: vec![] },
                    TypeSyntax::Named {
                        name: "List".into(),
                        args: vec![TypeSyntax::Array {
                            element: Box::new(TypeSyntax::Named { name: "int".into(), args: vec![] }),
                            rank: 1,
                        }],
                    },
                ],
            }))
        );
        assert!(matches!(parse_type("(int, string, long)").unwrap(), TypeSyntax::Tuple(xs) if xs.len() == 3));
        assert!(matches!(parse_type("int[,,]").unwrap(), TypeSyntax::Array { rank: 3, .. }));
        assert!(parse_type("List<int").is_err());
        assert!(parse_type("int$").is_err());
        assert!(parse_type("(int)").is_err());
    }

    #[test]
    fn references_resolve_against_prelude_and_generic_scope() {
        let u = universe(json!([
            { "name": "App.Box", "kind": "class", "generics": ["T"],
              "members": [
                { "name": "Value", "type": "T" },
                { "name": "Many", "type": "List<T>" },
                { "name": "Maybe", "type": "int?" },
                { "name": "Pair", "type": "(int, string)" },
              ] }
        ]));
        let boxed = u.lookup("Box").unwrap();
        let members = u.members_of(boxed);
        assert_eq!(members[0].ty, Some(TypeRef::Param { index: 0, name: "T".into() }));

        let list = u.resolve_well_known("System.Collections.Generic.List`1").unwrap();
        assert_eq!(
            members[1].ty,
            Some(TypeRef::Named { symbol: list, args: vec![TypeRef::Param { index: 0, name: "T".into() }] })
        );

        let nullable = u.resolve_well_known("System.Nullable`1").unwrap();
        let int = u.resolve_well_known("System.Int32").unwrap();
        assert_eq!(members[2].ty, Some(TypeRef::Named { symbol: nullable, args: vec![TypeRef::named(int)] }));

        let tuple = u.resolve_well_known("System.ValueTuple`2").unwrap();
        assert!(matches!(&members[3].ty, Some(TypeRef::Named { symbol, .. }) if *symbol == tuple));
    }

    #[test]
    fn nullable_reference_types_are_just_annotations() {
        let u = universe(json!([
            { "name": "App.Holder", "kind": "class", "members": [{ "name": "Name", "type": "string?" }] }
        ]));
        let string = u.resolve_well_known("System.String").unwrap();
        assert_eq!(u.members_of(u.lookup("Holder").unwrap())[0].ty, Some(TypeRef::named(string)));
    }

    #[test]
    fn attributes_accept_short_names_and_typeof() {
        let u = universe(json!([
            { "name": "App.IShape", "kind": "interface",
              "attributes": [{ "type": "Union", "args": [0, { "typeof": "App.Circle" }] }] },
            { "name": "App.Circle", "kind": "class", "attributes": ["MessagePackObject"],
              "members": [{ "name": "R", "type": "double", "attributes": [{ "type": "Key", "args": [0] }] }] }
        ]));
        let shape = u.lookup("App.IShape").unwrap();
        let circle = u.lookup("App.Circle").unwrap();
        let attrs = u.attributes_of(shape);
        assert_eq!(attrs[0].class, u.resolve_well_known(UNION_ATTRIBUTE).unwrap());
        assert_eq!(attrs[0].args, vec![AttributeArg::Int(0), AttributeArg::Type(TypeRef::named(circle))]);
        assert_eq!(u.members_of(circle)[0].attributes[0].args, vec![AttributeArg::Int(0)]);
    }

    #[test]
    fn load_errors_are_specific() {
        let unknown = Universe::from_value(json!({ "types": [
            { "name": "A", "kind": "class", "members": [{ "name": "X", "type": "Missing" }] }
        ]}))
        .unwrap_err();
        assert!(matches!(unknown, LoadError::UnknownType { ref name, ref context } if name == "Missing" && context == "A.X"));

        let ambiguous = Universe::from_value(json!({ "types": [
            { "name": "One.Thing", "kind": "class" },
            { "name": "Two.Thing", "kind": "class" },
            { "name": "User", "kind": "class", "base": "Thing" }
        ]}))
        .unwrap_err();
        assert!(matches!(ambiguous, LoadError::AmbiguousType { ref candidates, .. } if candidates.len() == 2));

        let duplicate = Universe::from_value(json!({ "types": [
            { "name": "A", "kind": "class" },
            { "name": "A", "kind": "struct" }
        ]}))
        .unwrap_err();
        assert!(matches!(duplicate, LoadError::DuplicateType { .. }));

        let decode = Universe::from_value(json!({ "types": [{ "name": "A", "kind": "widget" }] })).unwrap_err();
        assert!(matches!(decode, LoadError::Decode(ref e) if e.path == "types[0].kind"));
    }

    #[test]
    fn generic_arity_distinguishes_same_named_declarations() {
        let u = universe(json!([
            { "name": "App.Node", "kind": "class" },
            { "name": "App.Node", "kind": "class", "generics": ["T"] },
            { "name": "App.User", "kind": "class", "members": [
                { "name": "A", "type": "Node" },
                { "name": "B", "type": "Node<int>" }
            ] }
        ]));
        let members = u.members_of(u.lookup("User").unwrap());
        let a = u.resolve_well_known("App.Node").unwrap();
        let b = u.resolve_well_known("App.Node`1").unwrap();
        assert!(matches!(&members[0].ty, Some(TypeRef::Named { symbol, .. }) if *symbol == a));
        assert!(matches!(&members[1].ty, Some(TypeRef::Named { symbol, .. }) if *symbol == b));
    }
}
