//! Host symbol capability surface.
//!
//! The analysis core never sees a compiler's symbol objects. It asks a
//! [`SymbolProvider`] a handful of questions about declarations and works
//! from the answers:
//! - what well-known declaration a metadata name refers to,
//! - which attributes a declaration carries,
//! - which members it declares,
//! - what its base type is,
//! - which generic parameters it declares.
//!
//! Closed generic arguments are never stored on a declaration; they travel
//! with [`TypeRef`]s and are substituted at the point of reference.
pub mod refs;
pub mod universe;

use serde::Deserialize;

pub use refs::ReferenceSymbols;
pub use universe::Universe;

/// Opaque handle to one type declaration of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    #[serde(alias = "record")]
    Class,
    AbstractClass,
    #[serde(alias = "record_struct")]
    Struct,
    Interface,
    Enum,
}

impl DeclKind {
    pub fn is_value_type(self) -> bool {
        matches!(self, DeclKind::Struct | DeclKind::Enum)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    /// Dotted name without the generic arity suffix (`System.Collections.Generic.List`).
    pub name: String,
    /// Name with the arity suffix (`System.Collections.Generic.List`1`).
    pub metadata_name: String,
    pub kind: DeclKind,
    pub enum_underlying: Option<TypeRef>,
}

impl SymbolInfo {
    /// Last dotted segment, as a user would write it in source.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A type as written at a use site, possibly mentioning generic parameters
/// of the enclosing declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named { symbol: SymbolId, args: Vec<TypeRef> },
    Param { index: usize, name: String },
    Array { element: Box<TypeRef>, rank: u8 },
}

impl TypeRef {
    pub fn named(symbol: SymbolId) -> Self {
        TypeRef::Named { symbol, args: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArg {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
    Type(TypeRef),
}

#[derive(Debug, Clone)]
pub struct AttributeData {
    pub class: SymbolId,
    pub args: Vec<AttributeArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    #[default]
    Property,
    Method,
}

#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    /// Field/property type, or method return type (`None` for void).
    pub ty: Option<TypeRef>,
    /// Method parameter types; empty for fields and properties.
    pub parameters: Vec<TypeRef>,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub attributes: Vec<AttributeData>,
}

impl MemberDescriptor {
    /// Instance fields and properties take part in serialization; methods
    /// and statics never do.
    pub fn is_data_member(&self) -> bool {
        !self.is_static && self.kind != MemberKind::Method
    }
}

/// Read-only view of the host's declarations.
///
/// Implementations must be cheap to query repeatedly; the analysis asks the
/// same questions for every instantiation of a generic declaration.
pub trait SymbolProvider {
    /// Resolve a well-known metadata name such as
    /// `MessagePack.MessagePackObjectAttribute` or ``System.Collections.Generic.List`1``.
    fn resolve_well_known(&self, metadata_name: &str) -> Option<SymbolId>;

    fn info_of(&self, symbol: SymbolId) -> &SymbolInfo;

    fn attributes_of(&self, symbol: SymbolId) -> &[AttributeData];

    fn members_of(&self, symbol: SymbolId) -> &[MemberDescriptor];

    fn base_of(&self, symbol: SymbolId) -> Option<&TypeRef>;

    /// Declared generic parameter names, in order.
    fn generic_params_of(&self, symbol: SymbolId) -> &[String];
}

/// Split ``List`1`` into (`List`, 1).
pub fn split_arity(metadata_name: &str) -> (&str, usize) {
    match metadata_name.rsplit_once('`') {
        Some((name, arity)) => match arity.parse::<usize>() {
            Ok(n) => (name, n),
            Err(_) => (metadata_name, 0),
        },
        None => (metadata_name, 0),
    }
}

pub fn metadata_name(name: &str, arity: usize) -> String {
    if arity == 0 {
        name.to_string()
    } else {
        format!("{name}`{arity}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_suffix_round_trips_through_metadata_names() {
        assert_eq!(split_arity("System.Collections.Generic.Dictionary`2"), ("System.Collections.Generic.Dictionary", 2));
        assert_eq!(split_arity("System.Int32"), ("System.Int32", 0));
        assert_eq!(split_arity("Odd`x"), ("Odd`x", 0));
        assert_eq!(metadata_name("System.Nullable", 1), "System.Nullable`1");
        assert_eq!(metadata_name("System.String", 0), "System.String");
    }
}
