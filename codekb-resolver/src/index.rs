//! Step 1: build the per-run lookup indices — parallel per-file extraction
//! into `FxHashMap` name/qualified/export indices via `rayon`.

use codekb_core::types::{CodeEntity, EntityId, ExportInfo, ImportInfo};
use codekb_core::FxHashMap;
use rayon::prelude::*;

use crate::types::FileAnalysis;

pub struct ResolverIndex<'a> {
    pub entities_by_id: FxHashMap<EntityId, &'a CodeEntity>,
    pub entities_by_file: FxHashMap<&'a str, Vec<&'a CodeEntity>>,
    pub entities_by_name: FxHashMap<&'a str, Vec<&'a CodeEntity>>,
    pub exports_by_file: FxHashMap<&'a str, &'a [ExportInfo]>,
    pub imports_by_file: FxHashMap<&'a str, &'a [ImportInfo]>,
}

impl<'a> ResolverIndex<'a> {
    pub fn build(inputs: &'a [FileAnalysis]) -> Self {
        // Per-file index fragments built in parallel, merged sequentially,
        // keeping the hot extraction loop data-parallel while indices stay
        // single-writer.
        let fragments: Vec<(
            FxHashMap<EntityId, &'a CodeEntity>,
            Vec<(&'a str, &'a CodeEntity)>,
            Vec<(&'a str, &'a CodeEntity)>,
        )> = inputs
            .par_iter()
            .map(|file| {
                let mut by_id = FxHashMap::default();
                let mut by_file = Vec::new();
                let mut by_name = Vec::new();
                for entity in &file.entities {
                    by_id.insert(entity.id, entity);
                    by_file.push((file.file_path.as_str(), entity));
                    by_name.push((entity.name.as_str(), entity));
                }
                (by_id, by_file, by_name)
            })
            .collect();

        let mut entities_by_id = FxHashMap::default();
        let mut entities_by_file: FxHashMap<&'a str, Vec<&'a CodeEntity>> = FxHashMap::default();
        let mut entities_by_name: FxHashMap<&'a str, Vec<&'a CodeEntity>> = FxHashMap::default();
        for (by_id, by_file, by_name) in fragments {
            entities_by_id.extend(by_id);
            for (file, entity) in by_file {
                entities_by_file.entry(file).or_default().push(entity);
            }
            for (name, entity) in by_name {
                entities_by_name.entry(name).or_default().push(entity);
            }
        }

        let mut exports_by_file = FxHashMap::default();
        let mut imports_by_file = FxHashMap::default();
        for file in inputs {
            exports_by_file.insert(file.file_path.as_str(), file.exports.as_slice());
            imports_by_file.insert(file.file_path.as_str(), file.imports.as_slice());
        }

        Self {
            entities_by_id,
            entities_by_file,
            entities_by_name,
            exports_by_file,
            imports_by_file,
        }
    }
}
