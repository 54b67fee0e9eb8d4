//! Aggregate-graph flattening and multi-criterion ranking (C7).

use apt_core::{CancelToken, Domain, Graph, Neighbor, NeighborList};
use indexmap::{IndexMap, IndexSet};

/// Flattens a list of filtered/whitelisted clusters into one aggregate
/// graph, unioning neighbor lists by summing duplicate entries rather than
/// deduplicating (spec §4.7/§9, preserved as observed; see DESIGN.md).
///
/// Polls `cancel` once per cluster.
pub fn flatten(components: &[Graph], cancel: &CancelToken) -> Option<Graph> {
    let mut node_order: IndexSet<String> = IndexSet::new();
    let mut domain_pool: IndexMap<String, Domain> = IndexMap::new();
    let mut accumulated: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();

    for component in components {
        if cancel.is_cancelled() {
            return None;
        }
        for (domain, neighbors) in component.entries() {
            node_order.insert(domain.name.clone());
            domain_pool
                .entry(domain.name.clone())
                .and_modify(|d| d.merge(domain))
                .or_insert_with(|| domain.clone());
            let targets = accumulated.entry(domain.name.clone()).or_default();
            for neighbor in neighbors {
                domain_pool
                    .entry(neighbor.domain.name.clone())
                    .and_modify(|d| d.merge(&neighbor.domain))
                    .or_insert_with(|| neighbor.domain.clone());
                *targets.entry(neighbor.domain.name.clone()).or_insert(0.0) += neighbor.similarity;
            }
        }
    }

    let mut output = Graph::new(None);
    for name in &node_order {
        let domain = domain_pool
            .get(name)
            .cloned()
            .unwrap_or_else(|| Domain::new(name.clone()));
        let mut list = NeighborList::new();
        if let Some(targets) = accumulated.get(name) {
            for (target_name, similarity) in targets {
                let target_domain = domain_pool
                    .get(target_name)
                    .cloned()
                    .unwrap_or_else(|| Domain::new(target_name.clone()));
                list.push(Neighbor::new(target_domain.clone(), *similarity).expect("non-negative sum"));
                output.ensure_node(target_domain);
            }
        }
        output.put(domain, list);
    }
    Some(output)
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankEntry {
    pub name: String,
    pub parents: f64,
    pub children: f64,
    pub requests: usize,
    pub index: f64,
}

/// A ranking: the full sorted entry list, and the same entries grouped into
/// index-value buckets (multiple domains may share an index; insertion
/// order is preserved within a bucket).
#[derive(Clone, Debug, Default)]
pub struct Ranking {
    pub entries: Vec<RankEntry>,
    pub buckets: Vec<(f64, Vec<String>)>,
}

/// Computes `parents`/`children`/`requests` per node of the flattened
/// graph, combines them with `weights = [r0, r1, r2]` into
/// `r0*parents + r1*children + r2*requests`, and sorts descending with a
/// stable tie-break on insertion order.
pub fn rank(flat: &Graph, weights: [f64; 3]) -> Ranking {
    let mut parents: IndexMap<String, f64> = IndexMap::new();
    let mut children: IndexMap<String, f64> = IndexMap::new();
    for domain in flat.nodes() {
        parents.entry(domain.name.clone()).or_insert(0.0);
        children.entry(domain.name.clone()).or_insert(0.0);
    }
    for (domain, neighbors) in flat.entries() {
        for neighbor in neighbors {
            *children.get_mut(&domain.name).unwrap() += neighbor.similarity;
            *parents.entry(neighbor.domain.name.clone()).or_insert(0.0) += neighbor.similarity;
        }
    }

    let entries: Vec<RankEntry> = flat
        .nodes()
        .map(|domain| {
            let p = *parents.get(&domain.name).unwrap_or(&0.0);
            let c = *children.get(&domain.name).unwrap_or(&0.0);
            let r = domain.requests.len();
            let index = weights[0] * p + weights[1] * c + weights[2] * (r as f64);
            RankEntry {
                name: domain.name.clone(),
                parents: p,
                children: c,
                requests: r,
                index,
            }
        })
        .collect();

    let entries = apt_core::stats::sort_by_index(entries, |e| e.index);

    let mut buckets: Vec<(f64, Vec<String>)> = Vec::new();
    for entry in &entries {
        match buckets.last_mut() {
            Some((value, names)) if value.to_bits() == entry.index.to_bits() => {
                names.push(entry.name.clone());
            }
            _ => buckets.push((entry.index, vec![entry.name.clone()])),
        }
    }

    Ranking { entries, buckets }
}

/// One `.apt`-suffixed domain's rounded index, kept for the report.
#[derive(Clone, Debug, PartialEq)]
pub struct AptEntry {
    pub name: String,
    pub index: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AptReport {
    pub worst_top_percentile: f64,
    pub apt_domains: Vec<AptEntry>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// The APT-position analysis: for every ranked entry whose name ends in
/// `.apt`, its rounded index and 1-based rank position. The report's
/// headline number is the worst (highest-position) `.apt` domain's TOP
/// percentile: `position / total * 100`.
pub fn apt_report(ranking: &Ranking) -> Option<AptReport> {
    let total = ranking.entries.len();
    if total == 0 {
        return None;
    }

    let mut apt_domains = Vec::new();
    let mut worst_position = 0usize;
    for (position, entry) in ranking.entries.iter().enumerate() {
        if entry.name.ends_with(".apt") {
            apt_domains.push(AptEntry {
                name: entry.name.clone(),
                index: round2(entry.index),
            });
            worst_position = worst_position.max(position + 1);
        }
    }

    if apt_domains.is_empty() {
        return None;
    }

    Some(AptReport {
        worst_top_percentile: (worst_position as f64 / total as f64) * 100.0,
        apt_domains,
    })
}

/// The HTML-fragment summary string named in spec §4.7/§6. Its exact markup
/// is an external-UI concern the spec leaves unspecified beyond containing
/// the TOP-percentile text (§8 scenario S4); this renders a minimal ranked
/// list plus that line when an APT report is present.
pub fn render_summary(ranking: &Ranking, report: Option<&AptReport>) -> String {
    let mut html = String::from("<ul>\n");
    for (index, names) in &ranking.buckets {
        for name in names {
            html.push_str(&format!("<li>{name} ({index:.4})</li>\n"));
        }
    }
    html.push_str("</ul>\n");

    if let Some(report) = report {
        html.push_str(&format!(
            "<p>TOP for first APT: {:.2}%</p>\n",
            report.worst_top_percentile
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::Domain;

    fn graph(edges: &[(&str, &str, f64)], isolated: &[&str]) -> Graph {
        let mut g = Graph::new(None);
        for name in isolated {
            g.ensure_node(Domain::new(*name));
        }
        for (from, to, sim) in edges {
            let mut list = g.neighbors(from).cloned().unwrap_or_else(NeighborList::new);
            list.push(Neighbor::new(Domain::new(*to), *sim).unwrap());
            g.ensure_node(Domain::new(*to));
            g.put(Domain::new(*from), list);
        }
        g
    }

    #[test]
    fn children_weight_sums_all_outgoing_similarities() {
        // Component-level check of rank() alone, fed the fused pre-prune
        // graph from spec's S1 (A->B(0.4), A->C(0.3)): with weights=(0,1,0)
        // children sums both edges to 0.7. The full S1 scenario runs the
        // pruning stage first and asserts children=0.4; see
        // apt_pipeline::controller's end-to-end test for that.
        let g = graph(&[("A", "B", 0.4), ("A", "C", 0.3)], &[]);
        let ranking = rank(&g, [0.0, 1.0, 0.0]);
        assert_eq!(ranking.entries[0].name, "A");
        assert!((ranking.entries[0].index - 0.7).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let g = graph(&[], &["b", "a", "c"]);
        let ranking = rank(&g, [0.0, 0.0, 0.0]);
        let names: Vec<_> = ranking.entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(ranking.buckets.len(), 1);
        assert_eq!(ranking.buckets[0].1, vec!["b", "a", "c"]);
    }

    #[test]
    fn s4_scenario_apt_position_percentile() {
        // evil.apt ranked at position 7 of 100 => "TOP for first APT: 7.00%"
        let mut entries = Vec::new();
        for i in 0..100 {
            let name = if i == 6 {
                "evil.apt".to_string()
            } else {
                format!("d{i}.com")
            };
            entries.push(RankEntry {
                name,
                parents: 0.0,
                children: 0.0,
                requests: 0,
                index: 100.0 - i as f64,
            });
        }
        let ranking = Ranking {
            buckets: entries.iter().map(|e| (e.index, vec![e.name.clone()])).collect(),
            entries,
        };

        let report = apt_report(&ranking).unwrap();
        assert_eq!(report.apt_domains.len(), 1);
        assert!((report.worst_top_percentile - 7.0).abs() < 1e-9);

        let summary = render_summary(&ranking, Some(&report));
        assert!(summary.contains("TOP for first APT: 7.00%"));
    }
}
