use theocosmos_core::{Corpus, NodeId};

const MAX_RESULTS: usize = 12;

/// Flattened, lowercased view of one doctrine entry for scoring.
#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub id: NodeId,
    pub name: String,
    keywords: String,
    description: String,
    is_locus: bool,
}

pub fn build_search_entries(corpus: &Corpus) -> Vec<SearchEntry> {
    let mut entries = Vec::with_capacity(corpus.node_count());
    for locus in &corpus.loci {
        entries.push(SearchEntry {
            id: locus.id.clone(),
            name: locus.name.clone(),
            keywords: locus.keywords.join(" ").to_lowercase(),
            description: locus.description.to_lowercase(),
            is_locus: true,
        });
        for sub in &locus.subs {
            entries.push(SearchEntry {
                id: sub.id.clone(),
                name: sub.name.clone(),
                keywords: sub.keywords.join(" ").to_lowercase(),
                description: sub.description.to_lowercase(),
                is_locus: false,
            });
        }
    }
    entries
}

/// Ranked search over names, keywords and descriptions. Title matches weigh
/// heaviest, loci get a small boost over sub-topics, top 12 returned.
pub fn search_nodes(entries: &[SearchEntry], query: &str) -> Vec<(NodeId, f32)> {
    let q = query.trim().to_lowercase();
    if q.len() < 2 {
        return Vec::new();
    }

    let mut results: Vec<(NodeId, f32)> = entries
        .iter()
        .filter_map(|entry| {
            let mut score = 0.0;
            let title = fuzzy_match(&q, &entry.name.to_lowercase());
            if title > 0.0 {
                score += title * 100.0;
            }
            let kw = fuzzy_match(&q, &entry.keywords);
            if kw > 0.0 {
                score += kw * 40.0;
            }
            if entry.description.contains(&q) {
                score += 20.0;
            }
            if entry.is_locus {
                score *= 1.3;
            }
            (score > 0.0).then(|| (entry.id.clone(), score))
        })
        .collect();

    results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    results.truncate(MAX_RESULTS);
    results
}

/// 1.0 exact substring, 0.8 word-prefix, 0.6 within typo distance for short
/// queries, 0 otherwise.
fn fuzzy_match(query: &str, text: &str) -> f32 {
    if text.contains(query) {
        return 1.0;
    }
    for word in text.split_whitespace() {
        if word.starts_with(query) {
            return 0.8;
        }
    }
    if query.chars().count() <= 12 {
        let budget = (query.chars().count() / 4).max(1);
        for word in text.split_whitespace() {
            let prefix: String = word.chars().take(query.chars().count() + 2).collect();
            if levenshtein(query, &prefix) <= budget {
                return 0.6;
            }
        }
    }
    0.0
}

/// Two-row Levenshtein distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use theocosmos_core::{Locus, SubTopic};

    fn corpus() -> Corpus {
        Corpus {
            loci: vec![
                Locus {
                    id: NodeId("christ".to_string()),
                    name: "Christology".to_string(),
                    category: "godhead".to_string(),
                    color: "#e0c050".to_string(),
                    weight: 2.0,
                    order: 0,
                    description: "The person and work of Christ (John 1:14).".to_string(),
                    keywords: vec!["mediator".to_string(), "incarnation".to_string()],
                    subs: vec![SubTopic {
                        id: NodeId("kenosis".to_string()),
                        name: "Kenosis".to_string(),
                        category: None,
                        description: "The self-emptying of Philippians 2:7.".to_string(),
                        keywords: vec!["humiliation".to_string()],
                    }],
                    cross_refs: Vec::new(),
                },
                Locus {
                    id: NodeId("soteriology".to_string()),
                    name: "Soteriology".to_string(),
                    category: "salvation".to_string(),
                    color: "#d078b0".to_string(),
                    weight: 1.8,
                    order: 1,
                    description: "The doctrine of salvation.".to_string(),
                    keywords: vec!["grace".to_string(), "mediator".to_string()],
                    subs: Vec::new(),
                    cross_refs: Vec::new(),
                },
            ],
            paths: Vec::new(),
        }
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("grace", "grase"), 1);
    }

    #[test]
    fn title_match_outranks_keyword_match() {
        let entries = build_search_entries(&corpus());
        let hits = search_nodes(&entries, "christ");
        assert_eq!(hits[0].0, NodeId("christ".to_string()));
        // "mediator" hits both via keywords; the locus boost decides nothing
        // here, both are loci, but both must appear.
        let hits = search_nodes(&entries, "mediator");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn short_queries_and_typos() {
        let entries = build_search_entries(&corpus());
        assert!(search_nodes(&entries, "x").is_empty());
        assert!(search_nodes(&entries, " ").is_empty());
        // One substitution away from "kenosis".
        let hits = search_nodes(&entries, "kenoses");
        assert!(hits.iter().any(|(id, _)| id == &NodeId("kenosis".to_string())));
    }

    #[test]
    fn description_text_is_searchable() {
        let entries = build_search_entries(&corpus());
        let hits = search_nodes(&entries, "philippians");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, NodeId("kenosis".to_string()));
    }

    #[test]
    fn results_are_capped() {
        let mut c = corpus();
        for i in 0..30 {
            c.loci.push(Locus {
                id: NodeId(format!("grace{i}")),
                name: format!("Grace Topic {i}"),
                category: "salvation".to_string(),
                color: "#d078b0".to_string(),
                weight: 1.0,
                order: 10 + i,
                description: String::new(),
                keywords: vec!["grace".to_string()],
                subs: Vec::new(),
                cross_refs: Vec::new(),
            });
        }
        let entries = build_search_entries(&c);
        assert_eq!(search_nodes(&entries, "grace").len(), 12);
    }
}
