//! Instantiated types and their canonical identities.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::symbols::{SymbolId, SymbolProvider, TypeRef};

/// A [`TypeRef`] with the enclosing generic arguments substituted.
///
/// `Param` survives only where no closing argument exists (the body of an
/// open generic definition); such a type is never materialised as a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constructed {
    Named { symbol: SymbolId, args: Vec<Constructed> },
    Array { element: Box<Constructed>, rank: u8 },
    Param { index: usize, name: String },
}

impl Constructed {
    /// The generic definition itself: `G<T0, T1>` with its own parameters as arguments.
    pub fn definition<P: SymbolProvider + ?Sized>(provider: &P, symbol: SymbolId) -> Self {
        let args = provider
            .generic_params_of(symbol)
            .iter()
            .enumerate()
            .map(|(index, name)| Constructed::Param { index, name: name.clone() })
            .collect();
        Constructed::Named { symbol, args }
    }

    /// Substitute `ctx` into `ty`. Parameters without a closing argument stay open.
    pub fn instantiate(ty: &TypeRef, ctx: &[Constructed]) -> Self {
        match ty {
            TypeRef::Named { symbol, args } => Constructed::Named {
                symbol: *symbol,
                args: args.iter().map(|a| Self::instantiate(a, ctx)).collect(),
            },
            TypeRef::Array { element, rank } => Constructed::Array {
                element: Box::new(Self::instantiate(element, ctx)),
                rank: *rank,
            },
            TypeRef::Param { index, name } => ctx
                .get(*index)
                .cloned()
                .unwrap_or_else(|| Constructed::Param { index: *index, name: name.clone() }),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Constructed::Named { args, .. } => args.iter().all(Constructed::is_closed),
            Constructed::Array { element, .. } => element.is_closed(),
            Constructed::Param { .. } => false,
        }
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Constructed::Named { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Constructed] {
        match self {
            Constructed::Named { args, .. } => args,
            _ => &[],
        }
    }

    /// Structural match where an open parameter on either side matches anything.
    pub fn unifies_with(&self, other: &Constructed) -> bool {
        match (self, other) {
            (Constructed::Param { .. }, _) | (_, Constructed::Param { .. }) => true,
            (
                Constructed::Named { symbol: a, args: xs },
                Constructed::Named { symbol: b, args: ys },
            ) => a == b && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.unifies_with(y)),
            (
                Constructed::Array { element: a, rank: r },
                Constructed::Array { element: b, rank: s },
            ) => r == s && a.unifies_with(b),
            _ => false,
        }
    }
}

/// Canonical name of a type: declaration name plus closed argument identities.
///
/// Two references to the same instantiation always produce equal identities,
/// which is what the node table and the resolver table key on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeIdentity {
    Named { name: String, args: Vec<TypeIdentity> },
    Array { element: Box<TypeIdentity>, rank: u8 },
    Param { name: String },
}

impl TypeIdentity {
    pub fn of<P: SymbolProvider + ?Sized>(ty: &Constructed, provider: &P) -> Self {
        match ty {
            Constructed::Named { symbol, args } => TypeIdentity::Named {
                name: provider.info_of(*symbol).name.clone(),
                args: args.iter().map(|a| Self::of(a, provider)).collect(),
            },
            Constructed::Array { element, rank } => TypeIdentity::Array {
                element: Box::new(Self::of(element, provider)),
                rank: *rank,
            },
            Constructed::Param { name, .. } => TypeIdentity::Param { name: name.clone() },
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeIdentity::Named { name: name.into(), args: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeIdentity>) -> Self {
        TypeIdentity::Named { name: name.into(), args }
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeIdentity::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeIdentity::Array { element, rank } => {
                let commas = ",".repeat(usize::from(rank.saturating_sub(1)));
                write!(f, "{element}[{commas}]")
            }
            TypeIdentity::Param { name } => f.write_str(name),
        }
    }
}

impl Serialize for TypeIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_csharp_like() {
        let list = TypeIdentity::generic(
            "System.Collections.Generic.List",
            vec![TypeIdentity::Array { element: Box::new(TypeIdentity::named("System.Int32")), rank: 2 }],
        );
        assert_eq!(list.to_string(), "System.Collections.Generic.List<System.Int32[,]>");
        assert_eq!(serde_json::to_value(&list).unwrap(), serde_json::json!("System.Collections.Generic.List<System.Int32[,]>"));
    }

    #[test]
    fn instantiation_substitutes_and_keeps_missing_params_open() {
        let wrapper = SymbolId(7);
        let int = SymbolId(1);
        let ty = TypeRef::Named {
            symbol: wrapper,
            args: vec![
                TypeRef::Param { index: 0, name: "T".into() },
                TypeRef::Param { index: 1, name: "U".into() },
            ],
        };
        let closed = Constructed::instantiate(&ty, &[Constructed::Named { symbol: int, args: vec![] }]);
        assert!(!closed.is_closed());
        assert_eq!(closed.args()[0], Constructed::Named { symbol: int, args: vec![] });
        assert!(closed.unifies_with(&Constructed::Named {
            symbol: wrapper,
            args: vec![
                Constructed::Named { symbol: int, args: vec![] },
                Constructed::Named { symbol: SymbolId(2), args: vec![] },
            ],
        }));
    }
}
