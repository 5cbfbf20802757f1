// peerguard/src/detectors/ring.rs
//
// Review ring (collusion) detector.
//
// The review sentiment graph is built fresh for every scan and dropped with
// it: nodes are user ids, a directed edge reviewer → author carries the
// number of favorable (ACCEPT / MINOR_REVISION) completed reviews that
// reviewer gave the author's submissions inside the scan window.
//
// Reciprocity scan: iterate edges once, look up the reverse edge, and emit
// one REVIEW_RING per unordered pair whose weaker direction reaches
// review_ring_min_reciprocal. O(R) to build, O(E) to scan.
// Cycles longer than two are not detected.

use petgraph::graphmap::DiGraphMap;

use crate::anomaly::{Anomaly, Evidence, Subject};
use crate::config::EngineConfig;

/// A favorable review, reduced to the edge it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavorableEdge {
    pub reviewer_id: String,
    pub author_id: String,
}

pub struct SentimentGraph<'a> {
    graph: DiGraphMap<&'a str, u32>,
}

impl<'a> SentimentGraph<'a> {
    pub fn build(edges: &'a [FavorableEdge]) -> Self {
        let mut graph: DiGraphMap<&'a str, u32> = DiGraphMap::new();
        for e in edges {
            // Self-review never forms a ring
            if e.reviewer_id == e.author_id {
                continue;
            }
            let (from, to) = (e.reviewer_id.as_str(), e.author_id.as_str());
            match graph.edge_weight_mut(from, to) {
                Some(w) => *w = w.saturating_add(1),
                None => {
                    graph.add_edge(from, to, 1);
                }
            }
        }
        Self { graph }
    }

    pub fn weight(&self, reviewer: &str, author: &str) -> u32 {
        self.graph.edge_weight(reviewer, author).copied().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    /// (a, b, a→b, b→a) for every mutually connected pair, a < b.
    pub fn reciprocal_pairs(&self) -> Vec<(&'a str, &'a str, u32, u32)> {
        let mut pairs: Vec<_> = self
            .graph
            .all_edges()
            .filter(|(u, v, _)| u < v)
            .filter_map(|(u, v, &fwd)| self.graph.edge_weight(v, u).map(|&back| (u, v, fwd, back)))
            .collect();
        pairs.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        pairs
    }
}

fn ring_anomaly(a: &str, b: &str, a_to_b: u32, b_to_a: u32) -> Anomaly {
    Anomaly::new(
        vec![Subject::User(a.to_string()), Subject::User(b.to_string())],
        Evidence::ReviewRing {
            user_a: a.to_string(),
            user_b: b.to_string(),
            a_to_b,
            b_to_a,
            reciprocal_strength: a_to_b.min(b_to_a),
        },
    )
}

pub fn analyze(graph: &SentimentGraph<'_>, cfg: &EngineConfig) -> Vec<Anomaly> {
    graph
        .reciprocal_pairs()
        .into_iter()
        .filter(|(_, _, ab, ba)| (*ab).min(*ba) >= cfg.review_ring_min_reciprocal)
        .map(|(a, b, ab, ba)| ring_anomaly(a, b, ab, ba))
        .collect()
}

/// Rings with `user_id` as one of the two members.
pub fn analyze_for_user(graph: &SentimentGraph<'_>, user_id: &str, cfg: &EngineConfig) -> Vec<Anomaly> {
    analyze(graph, cfg).into_iter().filter(|a| a.implicates(user_id)).collect()
}
