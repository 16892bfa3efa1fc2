use std::cmp::Reverse;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::quality::SearchBudget;
use crate::graph::GraphStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Fuzzy,
    Substring,
    Prefix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub label: String,
    pub kind: MatchKind,
    pub score: i64,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Ranks node labels against a query within a scan budget.
pub struct SearchController {
    matcher: SkimMatcherV2,
}

impl Default for SearchController {
    fn default() -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
        }
    }
}

impl std::fmt::Debug for SearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController").finish_non_exhaustive()
    }
}

impl SearchController {
    pub fn score(&self, label: &str, query: &str) -> Option<(MatchKind, i64)> {
        let label_lower = label.to_lowercase();
        let query_lower = query.to_lowercase();
        let fuzzy = fuzzy_match_score(&self.matcher, label, query);

        if label_lower.starts_with(&query_lower) {
            Some((MatchKind::Prefix, fuzzy.unwrap_or(0)))
        } else if label_lower.contains(&query_lower) {
            Some((MatchKind::Substring, fuzzy.unwrap_or(0)))
        } else {
            fuzzy.map(|score| (MatchKind::Fuzzy, score))
        }
    }

    /// Best match first. Scans at most `budget.scan_limit` nodes and stops
    /// once `budget.max_matches` prefix or substring hits are collected.
    /// Fuzzy hits are returned only when no label contains the query.
    pub fn find(&self, graph: &dyn GraphStore, query: &str, budget: SearchBudget) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut direct = Vec::new();
        let mut fuzzy = Vec::new();
        for node in graph.nodes().take(budget.scan_limit) {
            if direct.len() >= budget.max_matches {
                break;
            }
            let Some((kind, score)) = self.score(&node.label, query) else {
                continue;
            };
            let hits = match kind {
                MatchKind::Fuzzy if fuzzy.len() >= budget.max_matches => continue,
                MatchKind::Fuzzy => &mut fuzzy,
                MatchKind::Prefix | MatchKind::Substring => &mut direct,
            };
            hits.push(SearchHit {
                id: node.id.clone(),
                label: node.label.clone(),
                kind,
                score,
            });
        }

        let mut hits = if direct.is_empty() { fuzzy } else { direct };
        hits.sort_by_key(|hit| (Reverse(hit.kind), Reverse(hit.score), hit.label.len()));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryGraph, NodeData, NodeKind, NodeSpec};

    fn graph(labels: &[&str]) -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        for (index, label) in labels.iter().enumerate() {
            graph.add_node(NodeData::from(NodeSpec {
                id: format!("n{index}"),
                label: (*label).to_owned(),
                description: None,
                kind: NodeKind::Skill,
                size: 3.0,
                skill_count: None,
            }));
        }
        graph
    }

    const WIDE: SearchBudget = SearchBudget {
        scan_limit: 100,
        max_matches: 10,
    };

    #[test]
    fn prefix_beats_substring_beats_fuzzy() {
        let graph = graph(&["Welding inspector", "Pipe welder", "Web developer"]);
        let hits = SearchController::default().find(&graph, "wel", WIDE);
        let order = hits.iter().map(|hit| hit.kind).collect::<Vec<_>>();
        assert_eq!(order, vec![MatchKind::Prefix, MatchKind::Substring]);
        assert_eq!(hits[0].label, "Welding inspector");

        let fuzzy = SearchController::default().find(&graph, "wbdv", WIDE);
        assert_eq!(fuzzy.first().map(|hit| hit.kind), Some(MatchKind::Fuzzy));
    }

    #[test]
    fn budget_limits_scan_and_matches() {
        let graph = graph(&["alpha", "beta", "alpine", "alps", "alto"]);
        let search = SearchController::default();

        let scanned = search.find(
            &graph,
            "al",
            SearchBudget {
                scan_limit: 2,
                max_matches: 10,
            },
        );
        assert_eq!(scanned.len(), 1);

        let capped = search.find(
            &graph,
            "al",
            SearchBudget {
                scan_limit: 10,
                max_matches: 2,
            },
        );
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn blank_and_unmatched_queries_find_nothing() {
        let graph = graph(&["alpha"]);
        let search = SearchController::default();
        assert!(search.find(&graph, "   ", WIDE).is_empty());
        assert!(search.find(&graph, "zzzz", WIDE).is_empty());
    }

    #[test]
    fn loose_fuzzy_labels_do_not_use_up_the_match_budget() {
        let mut labels = (0..15).map(|index| format!("a big rat {index}")).collect::<Vec<_>>();
        labels.push("Art director".to_owned());
        let labels = labels.iter().map(String::as_str).collect::<Vec<_>>();
        let graph = graph(&labels);

        let hits = SearchController::default().find(
            &graph,
            "art",
            SearchBudget {
                scan_limit: 2000,
                max_matches: 15,
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "n15");
        assert_eq!(hits[0].kind, MatchKind::Prefix);
    }

    #[test]
    fn fuzzy_hits_are_capped_by_the_budget() {
        let graph = graph(&["a big rat", "a brat", "arbiter art", "a rat tail"]);
        let hits = SearchController::default().find(
            &graph,
            "abt",
            SearchBudget {
                scan_limit: 10,
                max_matches: 2,
            },
        );
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.kind == MatchKind::Fuzzy));
    }
}
