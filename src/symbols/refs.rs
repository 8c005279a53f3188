//! Attribute and well-known type symbols, resolved once per session.
use std::collections::HashMap;

use super::{AttributeData, SymbolId, SymbolProvider};
use crate::wellknown::{self, Builtin, CollectionShape};

pub const MESSAGE_PACK_OBJECT_ATTRIBUTE: &str = "MessagePack.MessagePackObjectAttribute";
pub const KEY_ATTRIBUTE: &str = "MessagePack.KeyAttribute";
pub const IGNORE_MEMBER_ATTRIBUTE: &str = "MessagePack.IgnoreMemberAttribute";
pub const IGNORE_DATA_MEMBER_ATTRIBUTE: &str = "System.Runtime.Serialization.IgnoreDataMemberAttribute";
pub const UNION_ATTRIBUTE: &str = "MessagePack.UnionAttribute";
pub const FORMATTER_ATTRIBUTE: &str = "MessagePack.MessagePackFormatterAttribute";

/// Well-known identities resolved once per analysis session.
#[derive(Debug)]
pub struct ReferenceSymbols {
    pub message_pack_object: SymbolId,
    pub key: Option<SymbolId>,
    pub ignore_member: Option<SymbolId>,
    pub ignore_data_member: Option<SymbolId>,
    pub union: Option<SymbolId>,
    pub formatter: Option<SymbolId>,
    builtins: HashMap<SymbolId, &'static Builtin>,
    collections: HashMap<SymbolId, &'static CollectionShape>,
    byte: Option<SymbolId>,
}

impl ReferenceSymbols {
    /// `None` when the serialization attributes are not referenced at all;
    /// the analysis has nothing to do in that compilation.
    pub fn try_create<P: SymbolProvider + ?Sized>(provider: &P) -> Option<Self> {
        let message_pack_object = provider.resolve_well_known(MESSAGE_PACK_OBJECT_ATTRIBUTE)?;
        let builtins = wellknown::BUILTINS
            .iter()
            .filter_map(|b| Some((provider.resolve_well_known(b.metadata_name)?, b)))
            .collect();
        let collections = wellknown::COLLECTIONS
            .iter()
            .filter_map(|c| Some((provider.resolve_well_known(c.metadata_name)?, c)))
            .collect();
        Some(Self {
            message_pack_object,
            key: provider.resolve_well_known(KEY_ATTRIBUTE),
            ignore_member: provider.resolve_well_known(IGNORE_MEMBER_ATTRIBUTE),
            ignore_data_member: provider.resolve_well_known(IGNORE_DATA_MEMBER_ATTRIBUTE),
            union: provider.resolve_well_known(UNION_ATTRIBUTE),
            formatter: provider.resolve_well_known(FORMATTER_ATTRIBUTE),
            builtins,
            collections,
            byte: provider.resolve_well_known("System.Byte"),
        })
    }

    pub fn builtin(&self, symbol: SymbolId) -> Option<&'static Builtin> {
        self.builtins.get(&symbol).copied()
    }

    pub fn collection(&self, symbol: SymbolId) -> Option<&'static CollectionShape> {
        self.collections.get(&symbol).copied()
    }

    pub fn is_byte(&self, symbol: SymbolId) -> bool {
        self.byte == Some(symbol)
    }

    pub fn find<'a>(&self, attributes: &'a [AttributeData], class: Option<SymbolId>) -> Option<&'a AttributeData> {
        let class = class?;
        attributes.iter().find(|a| a.class == class)
    }

    pub fn find_all<'a>(
        &self,
        attributes: &'a [AttributeData],
        class: Option<SymbolId>,
    ) -> impl Iterator<Item = &'a AttributeData> {
        attributes.iter().filter(move |a| Some(a.class) == class)
    }

    pub fn is_ignored(&self, attributes: &[AttributeData]) -> bool {
        self.find(attributes, self.ignore_member).is_some()
            || self.find(attributes, self.ignore_data_member).is_some()
    }

    pub fn object_attribute<'a>(&self, attributes: &'a [AttributeData]) -> Option<&'a AttributeData> {
        self.find(attributes, Some(self.message_pack_object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{MemberDescriptor, SymbolInfo, TypeRef, Universe};
    use serde_json::json;

    /// A compilation that never referenced the serialization library.
    struct WithoutMessagePack<'a>(&'a Universe);

    impl SymbolProvider for WithoutMessagePack<'_> {
        fn resolve_well_known(&self, metadata_name: &str) -> Option<SymbolId> {
            if metadata_name.starts_with("MessagePack.") {
                return None;
            }
            self.0.resolve_well_known(metadata_name)
        }
        fn info_of(&self, symbol: SymbolId) -> &SymbolInfo {
            self.0.info_of(symbol)
        }
        fn attributes_of(&self, symbol: SymbolId) -> &[AttributeData] {
            self.0.attributes_of(symbol)
        }
        fn members_of(&self, symbol: SymbolId) -> &[MemberDescriptor] {
            self.0.members_of(symbol)
        }
        fn base_of(&self, symbol: SymbolId) -> Option<&TypeRef> {
            self.0.base_of(symbol)
        }
        fn generic_params_of(&self, symbol: SymbolId) -> &[String] {
            self.0.generic_params_of(symbol)
        }
    }

    #[test]
    fn missing_marker_attribute_means_nothing_to_do() {
        let universe = Universe::from_value(json!({ "types": [] })).unwrap();
        assert!(ReferenceSymbols::try_create(&WithoutMessagePack(&universe)).is_none());
        assert!(ReferenceSymbols::try_create(&universe).is_some());
    }

    #[test]
    fn both_ignore_attributes_are_recognised() {
        let universe = Universe::from_value(json!({ "types": [
            { "name": "App.A", "kind": "class", "members": [
                { "name": "X", "type": "int", "attributes": ["IgnoreMember"] },
                { "name": "Y", "type": "int", "attributes": ["IgnoreDataMember"] },
                { "name": "Z", "type": "int", "attributes": [{ "type": "Key", "args": [0] }] },
            ] },
        ]}))
        .unwrap();
        let refs = ReferenceSymbols::try_create(&universe).unwrap();
        let a = universe.lookup("App.A").unwrap();
        let ignored: Vec<bool> = universe.members_of(a).iter().map(|m| refs.is_ignored(&m.attributes)).collect();
        assert_eq!(ignored, vec![true, true, false]);
    }

    #[test]
    fn builtins_and_collections_map_to_their_rows() {
        let universe = Universe::from_value(json!({ "types": [] })).unwrap();
        let refs = ReferenceSymbols::try_create(&universe).unwrap();
        let int = universe.lookup("System.Int32").unwrap();
        let list = universe.lookup("System.Collections.Generic.List`1").unwrap();
        let byte = universe.lookup("System.Byte").unwrap();
        assert!(refs.builtin(int).is_some());
        assert!(refs.collection(int).is_none());
        assert!(refs.collection(list).is_some());
        assert!(refs.is_byte(byte));
        assert!(!refs.is_byte(int));
    }
}
