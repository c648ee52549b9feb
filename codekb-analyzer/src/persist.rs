//! Helpers for projecting `codekb-core`/`codekb-resolver` domain types onto
//! `codekb-graph`'s stringly-kinded node/edge shape. `EntityKind` carries its
//! own `as_str()`; `RelationshipKind` does not, so this module supplies the
//! equivalent mapping for edges.

use codekb_core::types::RelationshipKind;

pub fn relationship_kind_str(kind: RelationshipKind) -> &'static str {
    match kind {
        RelationshipKind::Calls => "Calls",
        RelationshipKind::Imports => "Imports",
        RelationshipKind::DependsOn => "DependsOn",
        RelationshipKind::Inherits => "Inherits",
        RelationshipKind::Implements => "Implements",
        RelationshipKind::Uses => "Uses",
        RelationshipKind::Contains => "Contains",
        RelationshipKind::SimilarTo => "SimilarTo",
        RelationshipKind::TemporalNext => "TemporalNext",
        RelationshipKind::TemporalPrev => "TemporalPrev",
    }
}

/// The graph node kind used for a per-file "the file as a whole" node,
/// distinct from any `EntityKind::File` entity the parser itself may emit.
pub const FILE_NODE_KIND: &str = "SourceFile";

/// The graph node kind used for a lazily-created placeholder standing in for
/// an edge endpoint that has no materialized `CodeEntity` yet.
pub const EXTERNAL_NODE_KIND: &str = "External";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_relationship_kind_maps_to_a_distinct_name() {
        let kinds = [
            RelationshipKind::Calls,
            RelationshipKind::Imports,
            RelationshipKind::DependsOn,
            RelationshipKind::Inherits,
            RelationshipKind::Implements,
            RelationshipKind::Uses,
            RelationshipKind::Contains,
            RelationshipKind::SimilarTo,
            RelationshipKind::TemporalNext,
            RelationshipKind::TemporalPrev,
        ];
        let names: Vec<&str> = kinds.iter().map(|k| relationship_kind_str(*k)).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }
}
