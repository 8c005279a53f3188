//! Resolver table: closed type identity → dense id → strategy.
//!
//! Ids follow first discovery, never resolution order, so a table built
//! from an unchanged universe is byte-for-byte reproducible.
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::graph::TypeGraph;
use crate::identity::TypeIdentity;
use crate::resolve::Strategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverEntry {
    pub id: u32,
    #[serde(rename = "type")]
    pub identity: TypeIdentity,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverTable {
    entries: Vec<ResolverEntry>,
    lookup: IndexMap<TypeIdentity, u32>,
}

/// Builtins go through the standard resolver, unresolved and assumed
/// types have no formatter here.
fn is_tabled(strategy: &Strategy) -> bool {
    !matches!(
        strategy,
        Strategy::Unresolved | Strategy::AssumedFormattable | Strategy::WellKnownBuiltin { .. }
    )
}

impl ResolverTable {
    /// `strategies` is indexed by node id, as produced by the resolver.
    pub fn build(graph: &TypeGraph, strategies: &[Strategy]) -> Self {
        let mut table = Self::default();
        for (node, strategy) in graph.nodes().iter().zip(strategies) {
            if is_tabled(strategy) {
                table.insert(node.identity.clone(), strategy.clone());
            }
        }
        table
    }

    /// Concatenate tables in the given order, keeping the first entry for
    /// each identity and renumbering densely.
    pub fn merge<I: IntoIterator<Item = ResolverTable>>(tables: I) -> Self {
        let mut merged = Self::default();
        for table in tables {
            for entry in table.entries {
                merged.insert(entry.identity, entry.strategy);
            }
        }
        merged
    }

    fn insert(&mut self, identity: TypeIdentity, strategy: Strategy) -> bool {
        if self.lookup.contains_key(&identity) {
            return false;
        }
        let id = self.entries.len() as u32;
        self.lookup.insert(identity.clone(), id);
        self.entries.push(ResolverEntry { id, identity, strategy });
        true
    }

    pub fn entries(&self) -> &[ResolverEntry] {
        &self.entries
    }

    pub fn id_of(&self, identity: &TypeIdentity) -> Option<u32> {
        self.lookup.get(identity).copied()
    }

    pub fn get(&self, identity: &TypeIdentity) -> Option<&ResolverEntry> {
        self.id_of(identity).map(|id| &self.entries[id as usize])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResolverTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzerOptions, CancellationToken};
    use crate::graph::collect;
    use crate::resolve::Resolver;
    use crate::symbols::{ReferenceSymbols, Universe};
    use crate::validate::validate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(universe: &Universe, root: &str) -> ResolverTable {
        let refs = ReferenceSymbols::try_create(universe).unwrap();
        let options = AnalyzerOptions::default();
        let graph =
            collect(universe, &refs, &options, universe.lookup(root).unwrap(), &CancellationToken::new()).unwrap();
        let validation = validate(universe, &graph, false);
        let strategies = Resolver::new(&graph, &validation, false).resolve_all();
        ResolverTable::build(&graph, &strategies)
    }

    fn identities(table: &ResolverTable) -> Vec<String> {
        table.entries().iter().map(|e| e.identity.to_string()).collect()
    }

    fn universe() -> Universe {
        Universe::from_value(json!({ "types": [
            { "name": "App.Root", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "A", "type": "List<int>", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "B", "type": "Child", "attributes": [{ "type": "Key", "args": [1] }] },
                { "name": "C", "type": "Color", "attributes": [{ "type": "Key", "args": [2] }] },
            ] },
            { "name": "App.Holder", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "Inner", "type": "Broken", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "Fine", "type": "Child", "attributes": [{ "type": "Key", "args": [1] }] },
            ] },
            { "name": "App.Child", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "Again", "type": "List<int>", "attributes": [{ "type": "Key", "args": [0] }] },
            ] },
            { "name": "App.Color", "kind": "enum", "underlying": "byte" },
            { "name": "App.Broken", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "X", "type": "int", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "Y", "type": "int", "attributes": [{ "type": "Key", "args": [0] }] },
            ] },
        ]}))
        .unwrap()
    }

    #[test]
    fn one_entry_per_identity_in_discovery_order() {
        let table = table(&universe(), "Root");
        assert_eq!(
            identities(&table),
            vec!["App.Root", "System.Collections.Generic.List<System.Int32>", "App.Child", "App.Color"]
        );
        let ids: Vec<u32> = table.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(table.id_of(&TypeIdentity::named("App.Child")), Some(2));
        assert!(table.get(&TypeIdentity::named("System.Int32")).is_none());
    }

    #[test]
    fn blocked_types_and_their_referrers_have_no_entry() {
        let table = table(&universe(), "Holder");
        assert_eq!(identities(&table), vec!["App.Child", "System.Collections.Generic.List<System.Int32>"]);
        assert!(table.get(&TypeIdentity::named("App.Holder")).is_none());
        assert!(table.get(&TypeIdentity::named("App.Broken")).is_none());
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let universe = universe();
        assert_eq!(table(&universe, "Root"), table(&universe, "Root"));
    }

    #[test]
    fn merge_keeps_first_entry_and_renumbers() {
        let universe = universe();
        let merged = ResolverTable::merge([table(&universe, "Child"), table(&universe, "Root")]);
        assert_eq!(
            identities(&merged),
            vec!["App.Child", "System.Collections.Generic.List<System.Int32>", "App.Root", "App.Color"]
        );
        assert_eq!(merged.id_of(&TypeIdentity::named("App.Color")), Some(3));
    }

    #[test]
    fn serializes_as_entry_list() {
        let universe = universe();
        let value = serde_json::to_value(table(&universe, "Child")).unwrap();
        assert_eq!(value[1], json!({
            "id": 1,
            "type": "System.Collections.Generic.List<System.Int32>",
            "strategy": { "kind": "collection_adapter", "adapter": "ListFormatter", "elements": ["System.Int32"] },
        }));
    }
}
