//! Fixed formatter tables for types that never need generated code.
//!
//! Two tables:
//! - [`BUILTINS`]: primitives and standard value types with a hand-written codec.
//! - [`COLLECTIONS`]: generic and non-generic collection shapes, one row per
//!   metadata name tagged with its (category, arity), parameterised by their
//!   element formatters.
//!
//! Interface-shaped collections carry no type identity on the wire, so each one
//! names the concrete mutable type it deserializes into ([`CollectionShape::backing`]).
use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Builtin {
    pub metadata_name: &'static str,
    pub formatter: &'static str,
    pub is_value_type: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionCategory {
    /// Ordered sequences: arrays, lists, queues, stacks, bags.
    List,
    Set,
    Dictionary,
    /// `System.Collections` shapes whose elements are untyped.
    NonGeneric,
    Tuple,
    /// Single-argument wrappers: `Nullable<T>`, `Lazy<T>`, `KeyValuePair<K, V>`,
    /// memory and segment views.
    Wrapper,
    /// `ILookup<K, V>` and `IGrouping<K, V>`.
    Grouping,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CollectionShape {
    pub metadata_name: &'static str,
    pub category: CollectionCategory,
    pub arity: usize,
    pub adapter: &'static str,
    /// Concrete type an interface shape deserializes into.
    pub backing: Option<&'static str>,
    /// Dedicated builtin used when the only argument is `System.Byte`.
    pub byte_specialization: Option<&'static str>,
    pub is_value_type: bool,
}

const fn builtin(metadata_name: &'static str, formatter: &'static str, is_value_type: bool) -> Builtin {
    Builtin { metadata_name, formatter, is_value_type }
}

pub static BUILTINS: &[Builtin] = &[
    builtin("System.Boolean", "BooleanFormatter", true),
    builtin("System.Byte", "ByteFormatter", true),
    builtin("System.SByte", "SByteFormatter", true),
    builtin("System.Int16", "Int16Formatter", true),
    builtin("System.UInt16", "UInt16Formatter", true),
    builtin("System.Int32", "Int32Formatter", true),
    builtin("System.UInt32", "UInt32Formatter", true),
    builtin("System.Int64", "Int64Formatter", true),
    builtin("System.UInt64", "UInt64Formatter", true),
    builtin("System.Int128", "Int128Formatter", true),
    builtin("System.UInt128", "UInt128Formatter", true),
    builtin("System.Half", "HalfFormatter", true),
    builtin("System.Single", "SingleFormatter", true),
    builtin("System.Double", "DoubleFormatter", true),
    builtin("System.Decimal", "DecimalFormatter", true),
    builtin("System.Char", "CharFormatter", true),
    builtin("System.Text.Rune", "RuneFormatter", true),
    builtin("System.DateTime", "DateTimeFormatter", true),
    builtin("System.DateTimeOffset", "DateTimeOffsetFormatter", true),
    builtin("System.DateOnly", "DateOnlyFormatter", true),
    builtin("System.TimeOnly", "TimeOnlyFormatter", true),
    builtin("System.TimeSpan", "TimeSpanFormatter", true),
    builtin("System.Guid", "GuidFormatter", true),
    builtin("System.Numerics.BigInteger", "BigIntegerFormatter", true),
    builtin("System.Numerics.Complex", "ComplexFormatter", true),
    builtin("System.String", "NullableStringFormatter", false),
    builtin("System.Object", "PrimitiveObjectFormatter", false),
    builtin("System.Uri", "UriFormatter", false),
    builtin("System.Version", "VersionFormatter", false),
    builtin("System.Type", "TypeFormatter", false),
    builtin("System.Text.StringBuilder", "StringBuilderFormatter", false),
    builtin("System.Collections.BitArray", "BitArrayFormatter", false),
];

/// `byte[]` bypasses the array adapter.
pub static BYTE_ARRAY: Builtin = builtin("System.Byte[]", "ByteArrayFormatter", false);

const fn shape(
    metadata_name: &'static str,
    category: CollectionCategory,
    arity: usize,
    adapter: &'static str,
    backing: Option<&'static str>,
) -> CollectionShape {
    CollectionShape {
        metadata_name,
        category,
        arity,
        adapter,
        backing,
        byte_specialization: None,
        is_value_type: false,
    }
}

const fn value_shape(
    metadata_name: &'static str,
    category: CollectionCategory,
    arity: usize,
    adapter: &'static str,
    byte_specialization: Option<&'static str>,
) -> CollectionShape {
    CollectionShape {
        metadata_name,
        category,
        arity,
        adapter,
        backing: None,
        byte_specialization,
        is_value_type: true,
    }
}

use CollectionCategory::*;

const LIST: Option<&str> = Some("System.Collections.Generic.List`1");
const HASH_SET: Option<&str> = Some("System.Collections.Generic.HashSet`1");
const DICTIONARY: Option<&str> = Some("System.Collections.Generic.Dictionary`2");

pub static COLLECTIONS: &[CollectionShape] = &[
    // concrete sequences
    shape("System.Collections.Generic.List`1", List, 1, "ListFormatter", None),
    shape("System.Collections.Generic.LinkedList`1", List, 1, "LinkedListFormatter", None),
    shape("System.Collections.Generic.Queue`1", List, 1, "QueueFormatter", None),
    shape("System.Collections.Generic.Stack`1", List, 1, "StackFormatter", None),
    shape("System.Collections.Generic.PriorityQueue`2", List, 2, "PriorityQueueFormatter", None),
    shape("System.Collections.Concurrent.ConcurrentQueue`1", List, 1, "ConcurrentQueueFormatter", None),
    shape("System.Collections.Concurrent.ConcurrentStack`1", List, 1, "ConcurrentStackFormatter", None),
    shape("System.Collections.Concurrent.ConcurrentBag`1", List, 1, "ConcurrentBagFormatter", None),
    // readonly / observable variants
    shape("System.Collections.ObjectModel.ReadOnlyCollection`1", List, 1, "ReadOnlyCollectionFormatter", None),
    shape("System.Collections.ObjectModel.ObservableCollection`1", List, 1, "ObservableCollectionFormatter", None),
    shape(
        "System.Collections.ObjectModel.ReadOnlyObservableCollection`1",
        List,
        1,
        "ReadOnlyObservableCollectionFormatter",
        None,
    ),
    // concrete sets
    shape("System.Collections.Generic.HashSet`1", Set, 1, "HashSetFormatter", None),
    shape("System.Collections.Generic.SortedSet`1", Set, 1, "SortedSetFormatter", None),
    // concrete dictionaries
    shape("System.Collections.Generic.Dictionary`2", Dictionary, 2, "DictionaryFormatter", None),
    shape("System.Collections.Generic.SortedDictionary`2", Dictionary, 2, "SortedDictionaryFormatter", None),
    shape("System.Collections.Generic.SortedList`2", Dictionary, 2, "SortedListFormatter", None),
    shape(
        "System.Collections.Concurrent.ConcurrentDictionary`2",
        Dictionary,
        2,
        "ConcurrentDictionaryFormatter",
        None,
    ),
    shape(
        "System.Collections.ObjectModel.ReadOnlyDictionary`2",
        Dictionary,
        2,
        "ReadOnlyDictionaryFormatter",
        None,
    ),
    // list-like interfaces
    shape("System.Collections.Generic.IEnumerable`1", List, 1, "InterfaceEnumerableFormatter", LIST),
    shape("System.Collections.Generic.ICollection`1", List, 1, "InterfaceCollectionFormatter2", LIST),
    shape("System.Collections.Generic.IList`1", List, 1, "InterfaceListFormatter2", LIST),
    shape(
        "System.Collections.Generic.IReadOnlyCollection`1",
        List,
        1,
        "InterfaceReadOnlyCollectionFormatter",
        LIST,
    ),
    shape("System.Collections.Generic.IReadOnlyList`1", List, 1, "InterfaceReadOnlyListFormatter", LIST),
    // set-like interfaces
    shape("System.Collections.Generic.ISet`1", Set, 1, "InterfaceSetFormatter", HASH_SET),
    shape("System.Collections.Generic.IReadOnlySet`1", Set, 1, "InterfaceReadOnlySetFormatter", HASH_SET),
    // dictionary-like interfaces
    shape("System.Collections.Generic.IDictionary`2", Dictionary, 2, "InterfaceDictionaryFormatter", DICTIONARY),
    shape(
        "System.Collections.Generic.IReadOnlyDictionary`2",
        Dictionary,
        2,
        "InterfaceReadOnlyDictionaryFormatter",
        DICTIONARY,
    ),
    shape("System.Linq.ILookup`2", Grouping, 2, "InterfaceLookupFormatter", Some("System.Linq.Lookup`2")),
    shape("System.Linq.IGrouping`2", Grouping, 2, "InterfaceGroupingFormatter", Some("System.Linq.Grouping`2")),
    // non-generic
    shape("System.Collections.ArrayList", NonGeneric, 0, "NonGenericListFormatter", None),
    shape("System.Collections.IEnumerable", NonGeneric, 0, "NonGenericInterfaceEnumerableFormatter", Some("System.Object[]")),
    shape(
        "System.Collections.ICollection",
        NonGeneric,
        0,
        "NonGenericInterfaceCollectionFormatter",
        Some("System.Collections.ArrayList"),
    ),
    shape("System.Collections.IList", NonGeneric, 0, "NonGenericInterfaceListFormatter", Some("System.Collections.ArrayList")),
    shape(
        "System.Collections.IDictionary",
        NonGeneric,
        0,
        "NonGenericInterfaceDictionaryFormatter",
        Some("System.Collections.Hashtable"),
    ),
    shape("System.Collections.Hashtable", NonGeneric, 0, "NonGenericDictionaryFormatter", None),
    // wrappers
    value_shape("System.Nullable`1", Wrapper, 1, "NullableFormatter", None),
    value_shape("System.Collections.Generic.KeyValuePair`2", Wrapper, 2, "KeyValuePairFormatter", None),
    shape("System.Lazy`1", Wrapper, 1, "LazyFormatter", None),
    value_shape("System.ArraySegment`1", Wrapper, 1, "ArraySegmentFormatter", Some("ByteArraySegmentFormatter")),
    value_shape("System.Memory`1", Wrapper, 1, "MemoryFormatter", Some("ByteMemoryFormatter")),
    value_shape("System.ReadOnlyMemory`1", Wrapper, 1, "ReadOnlyMemoryFormatter", Some("ByteReadOnlyMemoryFormatter")),
    value_shape(
        "System.Buffers.ReadOnlySequence`1",
        Wrapper,
        1,
        "ReadOnlySequenceFormatter",
        Some("ByteReadOnlySequenceFormatter"),
    ),
    // tuples
    value_shape("System.ValueTuple`1", Tuple, 1, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`2", Tuple, 2, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`3", Tuple, 3, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`4", Tuple, 4, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`5", Tuple, 5, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`6", Tuple, 6, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`7", Tuple, 7, "ValueTupleFormatter", None),
    value_shape("System.ValueTuple`8", Tuple, 8, "ValueTupleFormatter", None),
    shape("System.Tuple`1", Tuple, 1, "TupleFormatter", None),
    shape("System.Tuple`2", Tuple, 2, "TupleFormatter", None),
    shape("System.Tuple`3", Tuple, 3, "TupleFormatter", None),
    shape("System.Tuple`4", Tuple, 4, "TupleFormatter", None),
    shape("System.Tuple`5", Tuple, 5, "TupleFormatter", None),
    shape("System.Tuple`6", Tuple, 6, "TupleFormatter", None),
    shape("System.Tuple`7", Tuple, 7, "TupleFormatter", None),
    shape("System.Tuple`8", Tuple, 8, "TupleFormatter", None),
];

/// Array shapes by rank (1..=4). Ranks above four have no adapter.
pub static ARRAYS: [CollectionShape; 4] = [
    shape("[]", List, 1, "ArrayFormatter", None),
    shape("[,]", List, 1, "TwoDimensionalArrayFormatter", None),
    shape("[,,]", List, 1, "ThreeDimensionalArrayFormatter", None),
    shape("[,,,]", List, 1, "FourDimensionalArrayFormatter", None),
];

pub fn array_shape(rank: u8) -> Option<&'static CollectionShape> {
    ARRAYS.get(usize::from(rank).checked_sub(1)?)
}

/// C# keyword spellings of builtin types.
pub static KEYWORD_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("bool", "System.Boolean"),
        ("byte", "System.Byte"),
        ("sbyte", "System.SByte"),
        ("short", "System.Int16"),
        ("ushort", "System.UInt16"),
        ("int", "System.Int32"),
        ("uint", "System.UInt32"),
        ("long", "System.Int64"),
        ("ulong", "System.UInt64"),
        ("float", "System.Single"),
        ("double", "System.Double"),
        ("decimal", "System.Decimal"),
        ("char", "System.Char"),
        ("string", "System.String"),
        ("object", "System.Object"),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn interface_shapes_name_a_concrete_backing_type() {
        for c in COLLECTIONS.iter().filter(|c| {
            let simple = c.metadata_name.rsplit('.').next().unwrap_or_default();
            simple.starts_with('I') && simple.chars().nth(1).is_some_and(|ch| ch.is_ascii_uppercase())
        }) {
            assert!(c.backing.is_some(), "{} has no backing type", c.metadata_name);
        }
    }

    #[test]
    fn table_names_are_unique() {
        let builtins: HashSet<_> = BUILTINS.iter().map(|b| b.metadata_name).collect();
        let collections: HashSet<_> = COLLECTIONS.iter().map(|c| c.metadata_name).collect();
        assert_eq!(builtins.len(), BUILTINS.len());
        assert_eq!(collections.len(), COLLECTIONS.len());
        assert!(builtins.is_disjoint(&collections));
    }

    #[test]
    fn arrays_stop_at_rank_four() {
        assert_eq!(array_shape(1).map(|s| s.adapter), Some("ArrayFormatter"));
        assert_eq!(array_shape(2).map(|s| s.adapter), Some("TwoDimensionalArrayFormatter"));
        assert!(array_shape(0).is_none());
        assert!(array_shape(5).is_none());
    }
}
