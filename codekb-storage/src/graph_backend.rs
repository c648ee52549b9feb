//! `GraphBackend` — the graph-variant `StorageBackend`. Blobs are stored
//! as `Document` node properties rather than files; `list`/`search`
//! delegate to `KnowledgeGraph`'s kind index and property scan.

use codekb_core::traits::storage::{
    BlobMeta, HealthStatus, LineRange, ListedFile, SearchHit, SearchOptions, StorageBackend,
    StorageBackendError, StorageSnapshot,
};
use codekb_graph::{KnowledgeGraph, QueryExpr, QueryResult};
use serde_json::{json, Value};

const DOCUMENT_KIND: &str = "Document";

pub struct GraphBackend {
    graph: KnowledgeGraph,
}

impl GraphBackend {
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self { graph }
    }

    fn find_by_path(&self, path: &str) -> Option<codekb_graph::GraphNode> {
        match self.graph.query(&QueryExpr::ByKind { kind: DOCUMENT_KIND.to_string() }) {
            QueryResult::Nodes(ids) => ids
                .into_iter()
                .filter_map(|id| self.graph.get_node(id))
                .find(|n| n.props.get("path").and_then(Value::as_str) == Some(path)),
            QueryResult::Path(_) => None,
        }
    }

    fn meta_from_node(&self, node: &codekb_graph::GraphNode, size: u64) -> BlobMeta {
        BlobMeta {
            content_type: None,
            size,
            modified_unix_secs: node.props.get("modified_unix_secs").and_then(Value::as_u64).unwrap_or_default(),
            extra: json!({ "content_hash": node.props.get("content_hash").and_then(Value::as_u64).unwrap_or_default() }),
        }
    }
}

impl StorageBackend for GraphBackend {
    fn init(&self) -> Result<(), StorageBackendError> {
        Ok(())
    }

    fn health(&self) -> Result<HealthStatus, StorageBackendError> {
        Ok(HealthStatus {
            healthy: true,
            backend_kind: "graph".into(),
            detail: format!("{} nodes", self.graph.node_count()),
        })
    }

    fn read(&self, path: &str) -> Result<(Vec<u8>, BlobMeta), StorageBackendError> {
        let node = self.find_by_path(path).ok_or_else(|| StorageBackendError::NotFound(path.to_string()))?;
        let content = node.props.get("content").and_then(Value::as_str).unwrap_or_default();
        let bytes = content.as_bytes().to_vec();
        let meta = self.meta_from_node(&node, bytes.len() as u64);
        Ok((bytes, meta))
    }

    fn write(
        &self,
        path: &str,
        bytes: &[u8],
        meta: Option<BlobMeta>,
    ) -> Result<(), StorageBackendError> {
        let content = String::from_utf8_lossy(bytes).into_owned();
        let modified_unix_secs = meta
            .as_ref()
            .map(|m| m.modified_unix_secs)
            .unwrap_or_else(|| {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs()
            });
        let content_hash = codekb_core::types::hash_bytes(bytes);

        if let Some(existing) = self.find_by_path(path) {
            self.graph.remove_node(existing.id);
        }
        self.graph.create_node(
            DOCUMENT_KIND,
            json!({
                "path": path,
                "content": content,
                "modified_unix_secs": modified_unix_secs,
                "content_hash": content_hash,
            }),
        );
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageBackendError> {
        let node = self.find_by_path(path).ok_or_else(|| StorageBackendError::NotFound(path.to_string()))?;
        self.graph.remove_node(node.id);
        Ok(())
    }

    fn list(&self, dir: Option<&str>) -> Result<Vec<ListedFile>, StorageBackendError> {
        let QueryResult::Nodes(ids) = self.graph.query(&QueryExpr::ByKind { kind: DOCUMENT_KIND.to_string() }) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<ListedFile> = ids
            .into_iter()
            .filter_map(|id| self.graph.get_node(id))
            .filter_map(|n| {
                let path = n.props.get("path").and_then(Value::as_str)?.to_string();
                let size = n.props.get("content").and_then(Value::as_str).map(str::len).unwrap_or_default() as u64;
                let meta = self.meta_from_node(&n, size);
                Some(ListedFile { path, meta })
            })
            .filter(|f| dir.map_or(true, |prefix| f.path.starts_with(prefix)))
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StorageBackendError> {
        let query_lower = query.to_lowercase();
        let mut hits = Vec::new();
        for listed in self.list(options.category.as_deref())? {
            let Some(node) = self.find_by_path(&listed.path) else { continue };
            let content = node.props.get("content").and_then(Value::as_str).unwrap_or_default();
            let matches = content.to_lowercase().matches(&query_lower).count();
            if matches > 0 {
                let score = matches as f64 / content.len().max(1) as f64;
                hits.push(SearchHit { path: listed.path, score, matches: Vec::<LineRange>::new() });
            }
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    fn export(&self) -> Result<StorageSnapshot, StorageBackendError> {
        let mut files = Vec::new();
        for listed in self.list(None)? {
            let (bytes, meta) = self.read(&listed.path)?;
            files.push((listed.path, bytes, meta));
        }
        Ok(StorageSnapshot { files, relationships: Vec::new() })
    }

    fn import(&self, snapshot: &StorageSnapshot) -> Result<(), StorageBackendError> {
        for (path, bytes, meta) in &snapshot.files {
            self.write(path, bytes, Some(meta.clone()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let backend = GraphBackend::new(KnowledgeGraph::new(1));
        backend.write("a.md", b"hello", None).unwrap();
        let (bytes, _) = backend.read("a.md").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn write_twice_replaces_prior_node() {
        let backend = GraphBackend::new(KnowledgeGraph::new(1));
        backend.write("a.md", b"first", None).unwrap();
        backend.write("a.md", b"second", None).unwrap();
        assert_eq!(backend.list(None).unwrap().len(), 1);
        assert_eq!(backend.read("a.md").unwrap().0, b"second");
    }

    #[test]
    fn delete_missing_is_not_found() {
        let backend = GraphBackend::new(KnowledgeGraph::new(1));
        assert!(matches!(backend.delete("missing.md").unwrap_err(), StorageBackendError::NotFound(_)));
    }

    #[test]
    fn search_matches_by_content() {
        let backend = GraphBackend::new(KnowledgeGraph::new(1));
        backend.write("a.md", b"mentions widgets", None).unwrap();
        backend.write("b.md", b"nothing relevant", None).unwrap();
        let hits = backend
            .search("widgets", &SearchOptions { limit: Some(10), ..Default::default() })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a.md");
    }
}
