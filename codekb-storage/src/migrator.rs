//! Streams a file-tree store into a graph store — markdown enumeration,
//! front-matter parsing, Document node creation, then regex-based
//! Concept/Fact/Event/Entity extraction.
//!
//! Regex extractors are pre-compiled once and reused across documents. The
//! migration result records phased steps with per-step duration and error
//! counts, the same shape a streaming export manifest reports counts from
//! enumeration.

use std::time::Instant;

use codekb_core::traits::storage::StorageBackend;
use codekb_core::EngineError;
use codekb_graph::{KnowledgeGraph, QueryExpr, QueryResult};
use regex::Regex;
use serde_json::json;

const HEADING_RE: &str = r"(?m)^(#{1,6})\s+(.+)$";
const DATE_TOKEN_RE: &str = r"\b\d{4}[-/]\d{2}[-/]\d{2}\b";
const EVENT_VERB_RE: &str =
    r"(?i)\b(happened|occurred|started|began|ended|finished|created|updated|released)\b";
const DECLARATIVE_VERB_RE: &str = r"(?i)\b(is|are|was|were|has|have|can|will|must|should)\b";

const PERSON_RE: &str = r"\b[A-Z][a-z]+\s[A-Z][a-z]+\b";
const ORG_RE: &str = r"\b[A-Z][A-Za-z]*(?:\s[A-Z][A-Za-z]*){0,2}\s(?:Inc|Corp|LLC|Ltd|GmbH)\b";
const ACRONYM_RE: &str = r"\b[A-Z]{2,6}\b";
const VERSION_RE: &str = r"\bv?\d+\.\d+(?:\.\d+)?\b";
const FRONT_MATTER_RE: &str = r"(?s)^---\n(.*?)\n---\n?";

pub struct MigratorConfig {
    pub dry_run: bool,
    pub batch_size: usize,
    pub similar_to_top_k: usize,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self { dry_run: false, batch_size: 32, similar_to_top_k: 0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub errors: Vec<String>,
    pub ms: u64,
}

/// Pre-compiled extractor set, built once and reused across every
/// document in a migration run.
struct Extractors {
    heading: Regex,
    date_token: Regex,
    event_verb: Regex,
    declarative_verb: Regex,
    person: Regex,
    org: Regex,
    acronym: Regex,
    version: Regex,
    front_matter: Regex,
}

impl Extractors {
    fn compile() -> Result<Self, EngineError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| EngineError::InvalidArgument(e.to_string()))
        };
        Ok(Self {
            heading: compile(HEADING_RE)?,
            date_token: compile(DATE_TOKEN_RE)?,
            event_verb: compile(EVENT_VERB_RE)?,
            declarative_verb: compile(DECLARATIVE_VERB_RE)?,
            person: compile(PERSON_RE)?,
            org: compile(ORG_RE)?,
            acronym: compile(ACRONYM_RE)?,
            version: compile(VERSION_RE)?,
            front_matter: compile(FRONT_MATTER_RE)?,
        })
    }
}

pub struct BackendMigrator {
    extractors: Extractors,
}

impl BackendMigrator {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self { extractors: Extractors::compile()? })
    }

    fn parse_front_matter(&self, content: &str) -> (serde_json::Value, &str) {
        match self.extractors.front_matter.find(content) {
            Some(mat) => {
                let raw = &content[mat.start()..mat.end()];
                let body = &content[mat.end()..];
                let meta = raw
                    .trim_start_matches("---")
                    .trim_end_matches("---")
                    .trim()
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .map(|(k, v)| (k.trim().to_string(), json!(v.trim())))
                    .collect::<serde_json::Map<_, _>>();
                (serde_json::Value::Object(meta), body)
            }
            None => (json!({}), content),
        }
    }

    fn extract_concepts(&self, file_path: &str, body: &str) -> Vec<serde_json::Value> {
        self.extractors
            .heading
            .captures_iter(body)
            .map(|caps| {
                let level = caps[1].len() as u32;
                let text = caps[2].trim().to_string();
                json!({ "kind": "Concept", "file_path": file_path, "text": text, "level": level })
            })
            .collect()
    }

    fn extract_facts(&self, file_path: &str, body: &str) -> Vec<serde_json::Value> {
        body.split(". ")
            .map(str::trim)
            .filter(|sentence| sentence.len() > 10 && self.extractors.declarative_verb.is_match(sentence))
            .map(|sentence| json!({ "kind": "Fact", "file_path": file_path, "text": sentence }))
            .collect()
    }

    fn extract_events(&self, file_path: &str, body: &str) -> Vec<serde_json::Value> {
        body.lines()
            .filter(|line| {
                self.extractors.date_token.is_match(line) && self.extractors.event_verb.is_match(line)
            })
            .map(|line| json!({ "kind": "Event", "file_path": file_path, "text": line.trim() }))
            .collect()
    }

    fn extract_entities(&self, file_path: &str, body: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        for mat in self.extractors.org.find_iter(body) {
            out.push(json!({ "kind": "Entity", "file_path": file_path, "text": mat.as_str(), "entity_type": "organization" }));
        }
        for mat in self.extractors.person.find_iter(body) {
            out.push(json!({ "kind": "Entity", "file_path": file_path, "text": mat.as_str(), "entity_type": "person" }));
        }
        for mat in self.extractors.version.find_iter(body) {
            out.push(json!({ "kind": "Entity", "file_path": file_path, "text": mat.as_str(), "entity_type": "version" }));
        }
        for mat in self.extractors.acronym.find_iter(body) {
            out.push(json!({ "kind": "Entity", "file_path": file_path, "text": mat.as_str(), "entity_type": "acronym" }));
        }
        out
    }

    /// Stream every markdown document in `source` into `graph`, in
    /// `batches` of `config.batch_size`. `dry_run` walks the full
    /// extraction pipeline but performs no graph writes.
    pub fn migrate(
        &self,
        source: &dyn StorageBackend,
        graph: &KnowledgeGraph,
        config: &MigratorConfig,
    ) -> Result<MigrationResult, EngineError> {
        let started = Instant::now();
        let mut result = MigrationResult::default();

        let paths: Vec<String> = source
            .list(None)?
            .into_iter()
            .map(|f| f.path)
            .filter(|p| p.ends_with(".md") || p.ends_with(".markdown"))
            .collect();
        result.total = paths.len();

        for chunk in paths.chunks(config.batch_size.max(1)) {
            for path in chunk {
                match self.migrate_one(source, graph, path, config.dry_run) {
                    Ok((nodes, edges)) => {
                        result.processed += 1;
                        result.nodes += nodes;
                        result.edges += edges;
                    }
                    Err(e) => {
                        result.failed += 1;
                        result.errors.push(format!("{path}: {e}"));
                    }
                }
            }
        }

        if !config.dry_run && config.similar_to_top_k > 0 {
            result.edges += self.link_similar_documents(graph, config.similar_to_top_k);
        }

        result.ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }

    fn migrate_one(
        &self,
        source: &dyn StorageBackend,
        graph: &KnowledgeGraph,
        path: &str,
        dry_run: bool,
    ) -> Result<(usize, usize), EngineError> {
        let (bytes, _meta) = source.read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let (front_matter, body) = self.parse_front_matter(&content);

        let mut extracted = self.extract_concepts(path, body);
        extracted.extend(self.extract_facts(path, body));
        extracted.extend(self.extract_events(path, body));
        extracted.extend(self.extract_entities(path, body));

        if dry_run {
            return Ok((1 + extracted.len(), extracted.len()));
        }

        let doc_id = graph.create_node(
            "Document",
            json!({ "path": path, "content": content.as_ref(), "front_matter": front_matter }),
        );
        let mut nodes = 1;
        let mut edges = 0;
        for props in extracted {
            let kind = props.get("kind").and_then(|v| v.as_str()).unwrap_or("Concept").to_string();
            let node_id = graph.create_node(kind, props);
            graph.create_edge(doc_id, node_id, "Contains", serde_json::Value::Null)?;
            nodes += 1;
            edges += 1;
        }

        Ok((nodes, edges))
    }

    /// `SimilarTo` top-K linking between documents using Jaccard
    /// similarity over whitespace-tokenized content as the similarity
    /// signal — the simplest faithful instance of a similarity-search
    /// collaborator, treated as swappable for a smarter one later.
    fn link_similar_documents(&self, graph: &KnowledgeGraph, top_k: usize) -> usize {
        let QueryResult::Nodes(doc_ids) = graph.query(&QueryExpr::ByKind { kind: "Document".to_string() }) else {
            return 0;
        };
        let docs: Vec<_> = doc_ids
            .into_iter()
            .filter_map(|id| graph.get_node(id).map(|n| (id, n)))
            .collect();

        let mut edges = 0;
        for (i, (id_a, doc_a)) in docs.iter().enumerate() {
            let tokens_a = token_set(doc_a.props.get("content").and_then(|v| v.as_str()).unwrap_or_default());
            let mut scored: Vec<(codekb_graph::NodeId, f64)> = docs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (id_b, doc_b))| {
                    let tokens_b =
                        token_set(doc_b.props.get("content").and_then(|v| v.as_str()).unwrap_or_default());
                    (*id_b, jaccard(&tokens_a, &tokens_b))
                })
                .filter(|(_, score)| *score > 0.0)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            for (target, score) in scored.into_iter().take(top_k) {
                if graph.create_edge(*id_a, target, "SimilarTo", json!({ "score": score })).is_ok() {
                    edges += 1;
                }
            }
        }
        edges
    }
}

fn token_set(content: &str) -> std::collections::HashSet<String> {
    content.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_tree::FileTreeBackend;

    fn sample_doc() -> &'static str {
        "---\nauthor: Ada Lovelace\n---\n# Overview\n\nThe system is distributed. \
         It was released on 2024-01-15 by Example Corp. Version 2.3.1 shipped.\n"
    }

    #[test]
    fn dry_run_reports_counts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTreeBackend::new(dir.path()).unwrap();
        source.init().unwrap();
        source.write("a.md", sample_doc().as_bytes(), None).unwrap();

        let migrator = BackendMigrator::new().unwrap();
        let graph = KnowledgeGraph::new(1);
        let config = MigratorConfig { dry_run: true, ..Default::default() };

        let result = migrator.migrate(&source, &graph, &config).unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.processed, 1);
        assert_eq!(result.failed, 0);
        assert_eq!(graph.node_count(), 0, "dry run must not write to the graph");
        assert!(result.nodes > 0);
    }

    #[test]
    fn live_run_creates_document_and_contains_edges() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTreeBackend::new(dir.path()).unwrap();
        source.init().unwrap();
        source.write("a.md", sample_doc().as_bytes(), None).unwrap();

        let migrator = BackendMigrator::new().unwrap();
        let graph = KnowledgeGraph::new(1);
        let config = MigratorConfig::default();

        let result = migrator.migrate(&source, &graph, &config).unwrap();

        assert_eq!(result.processed, 1);
        assert_eq!(result.failed, 0);
        assert!(graph.node_count() > 1, "expects a Document node plus extracted nodes");
        assert!(graph.edge_count() > 0, "expects Contains edges back to the Document");

        let QueryResult::Nodes(docs) = graph.query(&QueryExpr::ByKind { kind: "Document".to_string() }) else {
            panic!("expected Nodes result");
        };
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn extract_concepts_finds_all_heading_levels() {
        let migrator = BackendMigrator::new().unwrap();
        let body = "# Title\n## Subtitle\n### Detail\n";
        let concepts = migrator.extract_concepts("a.md", body);
        assert_eq!(concepts.len(), 3);
        assert_eq!(concepts[0]["level"], 1);
        assert_eq!(concepts[2]["level"], 3);
    }

    #[test]
    fn extract_events_requires_both_date_and_verb() {
        let migrator = BackendMigrator::new().unwrap();
        let body = "Nothing happened on a normal day.\nThe project started on 2023-06-01.\n";
        let events = migrator.extract_events("a.md", body);
        assert_eq!(events.len(), 1);
    }
}
