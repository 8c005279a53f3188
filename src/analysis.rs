//! Analysis sessions.
//!
//! A [`Session`] binds a symbol provider to the reference symbols and
//! options of one compilation. Each root gets its own graph, validation
//! pass, resolution pass and table; nothing mutable is shared between
//! roots, which is what lets [`Session::analyze_all`] run them on rayon.
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::Diagnostic;
use crate::graph::{self, TypeGraph};
use crate::identity::TypeIdentity;
use crate::resolve::{Resolver, Strategy};
use crate::symbols::{DeclKind, ReferenceSymbols, SymbolId, SymbolInfo, SymbolProvider};
use crate::table::ResolverTable;
use crate::validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerOptions {
    /// Force map encoding for every generated object.
    pub uses_map_mode: bool,
    /// Full type names (with or without arity suffix) formatted elsewhere.
    pub assumed_formattable_types: BTreeSet<String>,
}

impl AnalyzerOptions {
    pub fn assumes_formattable(&self, info: &SymbolInfo) -> bool {
        self.assumed_formattable_types.contains(&info.name)
            || self.assumed_formattable_types.contains(&info.metadata_name)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,
}

/// Host cancellation flag. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() { Err(AnalysisError::Cancelled) } else { Ok(()) }
    }
}

/// Result of analysing one root.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub root: TypeIdentity,
    pub graph: TypeGraph,
    pub diagnostics: Vec<Diagnostic>,
    /// Indexed by node id.
    pub strategies: Vec<Strategy>,
    pub table: ResolverTable,
}

/// Merged result of several roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub diagnostics: Vec<Diagnostic>,
    #[serde(rename = "resolver")]
    pub table: ResolverTable,
}

pub struct Session<'a, P: ?Sized> {
    provider: &'a P,
    refs: ReferenceSymbols,
    options: &'a AnalyzerOptions,
}

impl<'a, P: SymbolProvider + ?Sized> Session<'a, P> {
    /// `None` when the compilation does not reference the serialization
    /// attributes; there is nothing to analyse.
    pub fn new(provider: &'a P, options: &'a AnalyzerOptions) -> Option<Self> {
        let refs = ReferenceSymbols::try_create(provider)?;
        Some(Self { provider, refs, options })
    }

    /// Attributed declarations: `[MessagePackObject]` classes and structs,
    /// `[Union]` interfaces and abstract classes.
    pub fn is_root_candidate(&self, symbol: SymbolId) -> bool {
        let attributes = self.provider.attributes_of(symbol);
        match self.provider.info_of(symbol).kind {
            DeclKind::Class | DeclKind::Struct => self.refs.object_attribute(attributes).is_some(),
            DeclKind::AbstractClass => {
                self.refs.object_attribute(attributes).is_some()
                    || self.refs.find(attributes, self.refs.union).is_some()
            }
            DeclKind::Interface => self.refs.find(attributes, self.refs.union).is_some(),
            DeclKind::Enum => false,
        }
    }

    pub fn analyze(&self, root: SymbolId, cancel: &CancellationToken) -> Result<Analysis, AnalysisError> {
        let graph = graph::collect(self.provider, &self.refs, self.options, root, cancel)?;
        let validation = validate::validate(self.provider, &graph, self.options.uses_map_mode);
        let strategies = Resolver::new(&graph, &validation, self.options.uses_map_mode).resolve_all();
        let table = ResolverTable::build(&graph, &strategies);
        let root = graph.node(graph.root()).identity.clone();
        info!(
            root = %root,
            nodes = graph.len(),
            diagnostics = validation.diagnostics.len(),
            entries = table.len(),
            "analysed root"
        );
        Ok(Analysis { root, graph, diagnostics: validation.diagnostics, strategies, table })
    }

    /// Analyse every root in parallel and merge in root-name order:
    /// diagnostics deduplicated, entries deduplicated by identity and
    /// renumbered in merged discovery order.
    pub fn analyze_all(&self, roots: &[SymbolId], cancel: &CancellationToken) -> Result<Plan, AnalysisError>
    where
        P: Sync,
    {
        let mut ordered = roots.to_vec();
        ordered.sort_by(|a, b| {
            let (a, b) = (self.provider.info_of(*a), self.provider.info_of(*b));
            (&a.name, &a.metadata_name).cmp(&(&b.name, &b.metadata_name))
        });
        ordered.dedup();
        debug!(roots = ordered.len(), "analysing roots");

        let analyses = ordered
            .par_iter()
            .map(|root| self.analyze(*root, cancel))
            .collect::<Result<Vec<_>, _>>()?;

        let mut diagnostics = IndexSet::new();
        let mut tables = Vec::with_capacity(analyses.len());
        for analysis in analyses {
            diagnostics.extend(analysis.diagnostics);
            tables.push(analysis.table);
        }
        Ok(Plan { diagnostics: diagnostics.into_iter().collect(), table: ResolverTable::merge(tables) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::symbols::Universe;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn universe() -> Universe {
        Universe::from_value(json!({ "types": [
            { "name": "App.Order", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "Lines", "type": "List<Line>", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "Customer", "type": "Customer", "attributes": [{ "type": "Key", "args": [1] }] },
            ] },
            { "name": "App.Line", "kind": "struct", "attributes": ["MessagePackObject"], "members": [
                { "name": "Sku", "type": "string", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "Tags", "type": "List<string>", "attributes": [{ "type": "Key", "args": [1] }] },
            ] },
            { "name": "App.Customer", "kind": "class" },
            { "name": "App.Invoice", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "Lines", "type": "List<Line>", "attributes": [{ "type": "Key", "args": [0] }] },
                { "name": "Customer", "type": "Customer", "attributes": [{ "type": "Key", "args": [1] }] },
            ] },
            { "name": "App.Box", "kind": "class", "generics": ["T"], "attributes": ["MessagePackObject"], "members": [
                { "name": "Value", "type": "T", "attributes": [{ "type": "Key", "args": [0] }] },
            ] },
            { "name": "App.Loose", "kind": "class" },
        ]}))
        .unwrap()
    }

    fn plan(universe: &Universe, options: &AnalyzerOptions) -> Plan {
        let session = Session::new(universe, options).unwrap();
        let roots: Vec<_> = universe.declarations().filter(|s| session.is_root_candidate(*s)).collect();
        session.analyze_all(&roots, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn roots_are_attributed_declarations() {
        let universe = universe();
        let options = AnalyzerOptions::default();
        let session = Session::new(&universe, &options).unwrap();
        let roots: Vec<_> = universe
            .declarations()
            .filter(|s| session.is_root_candidate(*s))
            .map(|s| universe.info_of(s).name.clone())
            .collect();
        assert_eq!(roots, vec!["App.Order", "App.Line", "App.Invoice", "App.Box"]);
    }

    #[test]
    fn merged_plan_is_sorted_by_root_and_deduplicated() {
        let universe = universe();
        let plan = plan(&universe, &AnalyzerOptions::default());
        let entries: Vec<_> = plan.table.entries().iter().map(|e| (e.id, e.identity.to_string())).collect();
        assert_eq!(
            entries,
            vec![
                (0, "System.Collections.Generic.List<App.Line>".to_string()),
                (1, "App.Line".to_string()),
                (2, "System.Collections.Generic.List<System.String>".to_string()),
            ]
        );
        let kinds: Vec<_> = plan.diagnostics.iter().map(|d| (d.kind, d.subject.to_string())).collect();
        assert_eq!(
            kinds,
            vec![
                (DiagnosticKind::TypeMustBeMessagePackObject, "App.Invoice".to_string()),
                (DiagnosticKind::TypeMustBeMessagePackObject, "App.Order".to_string()),
            ]
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let universe = universe();
        let options = AnalyzerOptions::default();
        assert_eq!(plan(&universe, &options), plan(&universe, &options));
    }

    #[test]
    fn assumed_formattable_types_silence_attribution() {
        let universe = universe();
        let options = AnalyzerOptions {
            assumed_formattable_types: BTreeSet::from(["App.Customer".to_string()]),
            ..AnalyzerOptions::default()
        };
        let plan = plan(&universe, &options);
        assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
        assert!(plan.table.get(&TypeIdentity::named("App.Customer")).is_none());
        assert!(plan.table.get(&TypeIdentity::named("App.Invoice")).is_some());
    }

    #[test]
    fn open_generic_roots_are_checked_but_not_tabled() {
        let universe = universe();
        let options = AnalyzerOptions::default();
        let session = Session::new(&universe, &options).unwrap();
        let analysis = session.analyze(universe.lookup("Box").unwrap(), &CancellationToken::new()).unwrap();
        assert_eq!(analysis.root.to_string(), "App.Box<T>");
        assert!(analysis.diagnostics.is_empty());
        assert!(analysis.table.is_empty());
        assert_eq!(analysis.strategies[0], Strategy::Unresolved);
    }

    #[test]
    fn plan_serializes_diagnostics_and_resolver() {
        let universe = Universe::from_value(json!({ "types": [
            { "name": "App.E", "kind": "enum" },
            { "name": "App.Holder", "kind": "class", "attributes": ["MessagePackObject"], "members": [
                { "name": "E", "type": "E", "attributes": [{ "type": "Key", "args": [0] }] },
            ] },
        ]}))
        .unwrap();
        let plan = plan(&universe, &AnalyzerOptions::default());
        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({
                "diagnostics": [],
                "resolver": [
                    { "id": 0, "type": "App.Holder", "strategy": { "kind": "generated_object", "shape": "array_encoded", "members": [
                        { "name": "E", "key": 0, "declared": "App.E", "formatter": { "kind": "resolver" } },
                    ], "array_length": 1 } },
                    { "id": 1, "type": "App.E", "strategy": { "kind": "enum", "underlying": "System.Int32" } },
                ],
            })
        );
    }

    #[test]
    fn cancelled_token_stops_the_plan() {
        let universe = universe();
        let options = AnalyzerOptions::default();
        let session = Session::new(&universe, &options).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let roots: Vec<_> = universe.declarations().collect();
        assert_eq!(session.analyze_all(&roots, &cancel), Err(AnalysisError::Cancelled));
    }
}
