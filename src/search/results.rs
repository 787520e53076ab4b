//! Result set post-processing (C9, spec §4.9): score blending, clustering,
//! coarse-KWIC, the seek/next cursor, and the projection set the
//! LogicalFile boundary exposes to the SQL kernel. Grounded on the
//! teacher's `search/results.rs` (`TopKCollector`, `ScoredDocument`
//! max-heap ordering) extended with clustering
//! (`original_source/FullText2/ResultSet.cpp`) and the coarse-KWIC math
//! spec §4.9 spells out directly.

use std::collections::{HashMap, HashSet};

use roaring::RoaringBitmap;

use crate::core::config::InvertedFileOptions;
use crate::core::types::{DocId, RowId};
use crate::query::operator::DocumentScore;
use crate::search::executor::Hit;
use crate::search::info::{DocumentStats, SearchInformation, WordData};

/// How an external score column blends with the computed score (spec
/// §4.9's `adjustScore`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustMethod {
    Multiply,
    Add,
    Replace,
}

/// Which column the post-adjust sort orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Score,
    DocId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// How per-field similarity scores combine during clustering (spec §4.9,
/// §9's "single-virtual-dispatch point isolated to the clustering stage" —
/// here a plain enum match since there are exactly two strategies named in
/// spec.md and no plugin point is specified).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCombiner {
    Avg,
    Max,
}

/// Clustering knobs (spec §4.9's `setClusterParameter`).
#[derive(Debug, Clone)]
pub struct ClusterParameters {
    pub global_limit: f64,
    pub combiner: ClusterCombiner,
    pub field_weights: HashMap<String, f64>,
}

/// Projections the LogicalFile boundary can ask `next` to fill in (spec
/// §4.9, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    RowId,
    Score,
    Section,
    Tf,
    Existence,
    ClusterId,
    FeatureValue,
    RoughKwicPosition,
}

/// One row of the result set: a matched document plus whatever the
/// executor and clustering pass have attached to it so far.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub doc_id: DocId,
    pub row_id: Option<RowId>,
    pub score: DocumentScore,
    pub external_score: Option<f64>,
    pub cluster_id: Option<u32>,
    /// Per-term frequencies for this hit, in query-term order (spec §4.9's
    /// `Tf` projection); `Existence` derives from `tf_per_term[i] > 0`.
    pub tf_per_term: Vec<u32>,
    /// Which input sections contained a hit (spec §4.9's `Section`
    /// projection).
    pub section_hits: Vec<bool>,
    /// Absolute positions this hit matched at, used by coarse-KWIC.
    pub hit_positions: Vec<(usize, u32)>,
}

impl ResultRow {
    pub fn from_hit(hit: Hit) -> Self {
        ResultRow {
            doc_id: hit.doc_id,
            row_id: None,
            score: hit.score.unwrap_or(0.0),
            external_score: None,
            cluster_id: None,
            tf_per_term: Vec::new(),
            section_hits: Vec::new(),
            hit_positions: Vec::new(),
        }
    }
}

/// What `next` hands back for one cursor step, filled in only for the
/// requested [`ProjectionKind`]s.
#[derive(Debug, Clone, Default)]
pub struct ProjectedRow {
    pub doc_id: Option<DocId>,
    pub row_id: Option<RowId>,
    pub score: Option<DocumentScore>,
    pub section: Option<Vec<bool>>,
    pub tf: Option<Vec<u32>>,
    pub existence: Option<Vec<bool>>,
    pub cluster_id: Option<u32>,
    pub feature_value: Option<Vec<WordData>>,
    pub rough_kwic_position: Option<(u32, u32)>,
}

/// Collected, sortable, clusterable hit set plus its seek/next cursor
/// (spec §4.9). Constructed from one or more `Executor::run` outputs (C12
/// feeds the K-way merge of several of these back into one).
pub struct ResultSet {
    rows: Vec<ResultRow>,
    cursor: usize,
    cluster_params: Option<ClusterParameters>,
}

impl ResultSet {
    pub fn from_hits(hits: Vec<Hit>) -> Self {
        ResultSet {
            rows: hits.into_iter().map(ResultRow::from_hit).collect(),
            cursor: 0,
            cluster_params: None,
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Blend an external score column into each row's computed score, then
    /// sort by the requested key/order (spec §4.9).
    pub fn adjust_score(
        &mut self,
        method: AdjustMethod,
        external: &HashMap<DocId, f64>,
        key: SortKey,
        order: SortOrder,
    ) {
        for row in &mut self.rows {
            let ext = external.get(&row.doc_id).copied();
            row.external_score = ext;
            if let Some(ext) = ext {
                row.score = match method {
                    AdjustMethod::Multiply => row.score * ext,
                    AdjustMethod::Add => row.score + ext,
                    AdjustMethod::Replace => ext,
                };
            }
        }
        self.sort_by(key, order);
    }

    pub fn sort_by(&mut self, key: SortKey, order: SortOrder) {
        self.rows.sort_by(|a, b| {
            let ord = match key {
                SortKey::Score => a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal),
                SortKey::DocId => a.doc_id.cmp(&b.doc_id),
            };
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        self.cursor = 0;
    }

    pub fn set_cluster_parameter(&mut self, global_limit: f64, combiner: ClusterCombiner, field_weights: HashMap<String, f64>) {
        self.cluster_params = Some(ClusterParameters { global_limit, combiner, field_weights });
    }

    /// Cluster the result set in bands (spec §4.9): a rough pass by
    /// score-gap detection, a detail pass by feature-vector similarity
    /// inside each rough cluster, then a cross-boundary merge pass. Rows
    /// are re-sorted by score descending first since the gap-detection
    /// scan assumes that order; within a cluster, rows keep their relative
    /// score order afterward (spec §8 scenario 6).
    pub fn clustering(&mut self, si: &SearchInformation, options: &InvertedFileOptions) {
        let Some(params) = self.cluster_params.clone() else { return };
        self.sort_by(SortKey::Score, SortOrder::Desc);
        if self.rows.is_empty() {
            return;
        }

        let rough = rough_clusters(&self.rows);
        let local_limit = params
            .field_weights
            .get("__unused__")
            .copied()
            .unwrap_or_else(|| (1.0 + params.global_limit) / 2.0);

        let mut detail: Vec<Vec<usize>> = Vec::new();
        for band in &rough {
            detail.extend(detail_clusters(band, &self.rows, si, &params, local_limit));
        }

        let merged = merge_across_boundaries(detail, &self.rows, si, &params, local_limit, options.merge_cluster_distance as usize);

        for (cluster_id, indices) in merged.iter().enumerate() {
            for &idx in indices {
                self.rows[idx].cluster_id = Some(cluster_id as u32);
            }
        }

        // Present grouped by cluster id, preserving each cluster's
        // original (score-descending) relative order (spec §8 scenario 6:
        // "next() returns documents grouped by cluster... original score
        // order inside each").
        let mut regrouped = Vec::with_capacity(self.rows.len());
        for indices in &merged {
            for &idx in indices {
                regrouped.push(self.rows[idx].clone());
            }
        }
        self.rows = regrouped;
        self.cursor = 0;
    }

    /// Matched-document-id projection (spec §4.9/§6's narrowing output):
    /// hand the SQL kernel a compact bitset instead of walking the cursor
    /// when all it needs is set membership.
    pub fn to_bitmap(&self) -> RoaringBitmap {
        self.rows.iter().map(|row| row.doc_id.0).collect()
    }

    pub fn seek(&mut self, offset: usize, _limit: usize) {
        self.cursor = offset.min(self.rows.len());
    }

    /// Advance the cursor and project the requested fields for the row it
    /// was on (spec §4.9/§6's `next`).
    pub fn next(&mut self, projections: &[ProjectionKind], si: &SearchInformation, kwic_size: u32, kwic_scale_factor: f64) -> Option<ProjectedRow> {
        if self.cursor >= self.rows.len() {
            return None;
        }
        let row = self.rows[self.cursor].clone();
        self.cursor += 1;

        let mut out = ProjectedRow { doc_id: Some(row.doc_id), ..Default::default() };
        for proj in projections {
            match proj {
                ProjectionKind::RowId => out.row_id = row.row_id,
                ProjectionKind::Score => out.score = Some(row.score),
                ProjectionKind::Section => out.section = Some(row.section_hits.clone()),
                ProjectionKind::Tf => out.tf = Some(row.tf_per_term.clone()),
                ProjectionKind::Existence => {
                    out.existence = Some(row.tf_per_term.iter().map(|&tf| tf > 0).collect())
                }
                ProjectionKind::ClusterId => out.cluster_id = row.cluster_id,
                ProjectionKind::FeatureValue => {
                    out.feature_value = si.document_stats(row.doc_id).map(|s| s.feature_set.as_ref().clone())
                }
                ProjectionKind::RoughKwicPosition => {
                    out.rough_kwic_position = si
                        .document_stats(row.doc_id)
                        .map(|stats| rough_kwic_position(&row.hit_positions, stats, kwic_size, kwic_scale_factor))
                }
            }
        }
        Some(out)
    }
}

/// Rough clustering: a left-to-right scan computing the running mean of
/// adjacent score gaps over a trailing window capped at 1024 (spec §4.9 /
/// SPEC_FULL B.4); a boundary is cut where the current gap exceeds that
/// mean. `rows` must already be sorted by score descending.
fn rough_clusters(rows: &[ResultRow]) -> Vec<Vec<usize>> {
    const WINDOW: usize = 1024;
    let mut clusters = Vec::new();
    let mut current = vec![0usize];
    let mut gaps: Vec<f64> = Vec::new();

    for i in 1..rows.len() {
        let gap = (rows[i - 1].score - rows[i].score).abs();
        let mean = if gaps.is_empty() { gap } else { gaps.iter().sum::<f64>() / gaps.len() as f64 };
        if gap > mean && !gaps.is_empty() {
            clusters.push(std::mem::take(&mut current));
        }
        current.push(i);
        gaps.push(gap);
        if gaps.len() > WINDOW {
            gaps.remove(0);
        }
    }
    clusters.push(current);
    clusters
}

fn feature_similarity(a: &[WordData], b: &[WordData], combiner: ClusterCombiner, field_weights: &HashMap<String, f64>) -> f64 {
    let b_by_term: HashMap<&str, f64> = b.iter().map(|w| (w.term.as_str(), w.weight)).collect();
    let mut total = 0.0;
    for wa in a {
        if let Some(&wb) = b_by_term.get(wa.term.as_str()) {
            let weight = field_weights.get(&wa.term).copied().unwrap_or(1.0);
            let combined = match combiner {
                ClusterCombiner::Avg => (wa.weight + wb) / 2.0,
                ClusterCombiner::Max => wa.weight.max(wb),
            };
            total += combined * weight;
        }
    }
    total
}

/// Agglomerative pass inside one rough cluster: each item either joins the
/// first existing detail cluster whose representative (first member)
/// scores at/above `local_limit` on feature-vector similarity, or starts a
/// new one.
fn detail_clusters(
    band: &[usize],
    rows: &[ResultRow],
    si: &SearchInformation,
    params: &ClusterParameters,
    local_limit: f64,
) -> Vec<Vec<usize>> {
    let empty: Vec<WordData> = Vec::new();
    let features = |idx: usize| -> Vec<WordData> {
        si.document_stats(rows[idx].doc_id).map(|s| s.feature_set.as_ref().clone()).unwrap_or_else(|| empty.clone())
    };

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &idx in band {
        let f = features(idx);
        let mut placed = false;
        for cluster in &mut clusters {
            let rep = features(cluster[0]);
            if feature_similarity(&f, &rep, params.combiner, &params.field_weights) >= local_limit {
                cluster.push(idx);
                placed = true;
                break;
            }
        }
        if !placed {
            clusters.push(vec![idx]);
        }
    }
    clusters
}

/// Merge detail clusters that straddle a rough-cluster boundary: within a
/// neighbor window of `merge_distance` positions in score order, clusters
/// whose representatives are still similar enough get folded together
/// (spec §4.9: "merge detail clusters across rough-cluster boundaries by
/// re-clustering their representatives with a neighbor window").
fn merge_across_boundaries(
    mut clusters: Vec<Vec<usize>>,
    rows: &[ResultRow],
    si: &SearchInformation,
    params: &ClusterParameters,
    local_limit: f64,
    merge_distance: usize,
) -> Vec<Vec<usize>> {
    let empty: Vec<WordData> = Vec::new();
    let features = |idx: usize| -> Vec<WordData> {
        si.document_stats(rows[idx].doc_id).map(|s| s.feature_set.as_ref().clone()).unwrap_or_else(|| empty.clone())
    };

    let mut merged_into: Vec<Option<usize>> = vec![None; clusters.len()];
    for i in 0..clusters.len() {
        if merged_into[i].is_some() {
            continue;
        }
        for j in (i + 1)..clusters.len().min(i + 1 + merge_distance) {
            if merged_into[j].is_some() {
                continue;
            }
            let rep_i = features(clusters[i][0]);
            let rep_j = features(clusters[j][0]);
            if feature_similarity(&rep_i, &rep_j, params.combiner, &params.field_weights) >= local_limit {
                merged_into[j] = Some(i);
            }
        }
    }

    let mut result: Vec<Vec<usize>> = Vec::new();
    let mut target_of: HashMap<usize, usize> = HashMap::new();
    for (i, cluster) in clusters.iter_mut().enumerate() {
        if let Some(target) = merged_into[i] {
            let dest = *target_of.get(&target).expect("earlier cluster must already have a slot");
            result[dest].append(cluster);
        } else {
            target_of.insert(i, result.len());
            result.push(std::mem::take(cluster));
        }
    }
    result
}

/// Coarse KWIC seed-position extraction (spec §4.9). `hit_positions` pairs
/// each match with a query-term id so the window scan can count *distinct*
/// terms rather than raw hit count.
fn rough_kwic_position(hit_positions: &[(usize, u32)], stats: &DocumentStats, kwic_size: u32, scale_factor: f64) -> (u32, u32) {
    if hit_positions.is_empty() {
        return (0, 0);
    }
    let adjust = if stats.original_length == 0 {
        1.0
    } else {
        stats.normalized_length as f64 / stats.original_length as f64
    };
    let window = ((kwic_size as f64) * adjust).max(1.0);

    let mut best_start = hit_positions[0].1;
    let mut best_count = 0usize;
    for &(_, start) in hit_positions {
        let end = start as f64 + window;
        let distinct: HashSet<usize> = hit_positions
            .iter()
            .filter(|&&(_, p)| (p as f64) >= start as f64 && (p as f64) < end)
            .map(|&(term, _)| term)
            .collect();
        if distinct.len() > best_count {
            best_count = distinct.len();
            best_start = start;
        }
    }

    let seed = ((best_start as f64) / adjust).round().max(0.0) as u32;
    let expand = (((scale_factor - 1.0) * kwic_size as f64) / 2.0).round().max(0.0) as u32;
    let start = seed.saturating_sub(expand);
    let end = seed.saturating_add(expand).min(stats.original_length);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn hit(doc: u32, score: f64) -> Hit {
        Hit { doc_id: DocId(doc), score: Some(score) }
    }

    #[test]
    fn adjust_score_multiplies_and_resorts() {
        let mut rs = ResultSet::from_hits(vec![hit(0, 1.0), hit(1, 2.0)]);
        let mut external = HashMap::new();
        external.insert(DocId(0), 10.0);
        external.insert(DocId(1), 1.0);
        rs.adjust_score(AdjustMethod::Multiply, &external, SortKey::Score, SortOrder::Desc);
        assert_eq!(rs.rows()[0].doc_id, DocId(0));
        assert_eq!(rs.rows()[0].score, 10.0);
    }

    #[test]
    fn clustering_groups_by_score_gap_per_scenario_six() {
        let mut si = SearchInformation::new(5, 10.0);
        for i in 0..5u32 {
            // The top band (0,1,2) and bottom band (3,4) carry disjoint
            // feature vocabularies so the cross-boundary merge pass (which
            // only looks at feature similarity) does not re-fuse them; a
            // real corpus would naturally diverge the same way once the
            // score gap this large separates two topics.
            let term = if i < 3 { "t" } else { "u" };
            si.set_document_stats(
                DocId(i),
                DocumentStats {
                    normalized_length: 10,
                    original_length: 10,
                    section_sizes: vec![],
                    feature_set: Arc::new(vec![WordData { term: term.into(), weight: 1.0 }]),
                },
            );
        }
        let hits = vec![hit(0, 0.91), hit(1, 0.90), hit(2, 0.89), hit(3, 0.40), hit(4, 0.39)];
        let mut rs = ResultSet::from_hits(hits);
        rs.set_cluster_parameter(0.8, ClusterCombiner::Avg, HashMap::new());
        let options = InvertedFileOptions { merge_cluster_distance: 2, ..Default::default() };
        rs.clustering(&si, &options);

        let ids: Vec<Option<u32>> = rs.rows().iter().map(|r| r.cluster_id).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
        assert_eq!(ids[3], ids[4]);
        assert_ne!(ids[0], ids[3]);
    }

    #[test]
    fn seek_and_next_walk_rows_in_order() {
        let mut rs = ResultSet::from_hits(vec![hit(0, 1.0), hit(1, 2.0), hit(2, 3.0)]);
        rs.sort_by(SortKey::DocId, SortOrder::Asc);
        rs.seek(1, 10);
        let si = SearchInformation::new(3, 1.0);
        let row = rs.next(&[ProjectionKind::Score], &si, 10, 3.0).unwrap();
        assert_eq!(row.doc_id, Some(DocId(1)));
        assert_eq!(row.score, Some(2.0));
    }

    #[test]
    fn to_bitmap_contains_every_matched_doc_id() {
        let rs = ResultSet::from_hits(vec![hit(3, 1.0), hit(7, 2.0), hit(1, 0.5)]);
        let bitmap = rs.to_bitmap();
        assert_eq!(bitmap.len(), 3);
        assert!(bitmap.contains(1) && bitmap.contains(3) && bitmap.contains(7));
    }

    #[test]
    fn rough_kwic_picks_leftmost_densest_window() {
        let stats = DocumentStats {
            normalized_length: 10,
            original_length: 10,
            section_sizes: vec![],
            feature_set: Arc::new(vec![]),
        };
        let positions = vec![(0usize, 0u32), (1, 1), (0, 20)];
        let (start, _end) = rough_kwic_position(&positions, &stats, 4, 3.0);
        assert_eq!(start, 0);
    }
}
