use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nested doctrine entry, owned by exactly one locus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTopic {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Top-level doctrine entry. `order == 0` marks the hub locus at the origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locus {
    pub id: NodeId,
    pub name: String,
    pub category: String,
    pub color: String,
    pub weight: f32,
    pub order: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subs: Vec<SubTopic>,
    #[serde(default)]
    pub cross_refs: Vec<NodeId>,
}

/// Authored study path: an ordered walk through the cosmos, usable both as a
/// guided-path highlight and as a flythrough itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidedPath {
    pub key: String,
    pub name: String,
    pub color: String,
    pub ids: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub loci: Vec<Locus>,
    #[serde(default)]
    pub paths: Vec<GuidedPath>,
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate node id `{0}`")]
    DuplicateId(String),
    #[error("invalid color `{color}` on `{id}`")]
    InvalidColor { id: String, color: String },
    #[error("corpus contains no loci")]
    Empty,
}

impl Corpus {
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let corpus: Corpus = serde_json::from_str(json)?;
        corpus.validate()?;
        Ok(corpus)
    }

    /// Ids must be unique across loci and subs; colors must be `#rrggbb`.
    /// Cross-references to unknown ids are allowed here — the scene builder
    /// skips them, matching the always-on robustness policy.
    pub fn validate(&self) -> Result<(), CorpusError> {
        if self.loci.is_empty() {
            return Err(CorpusError::Empty);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for locus in &self.loci {
            if !seen.insert(locus.id.as_str()) {
                return Err(CorpusError::DuplicateId(locus.id.0.clone()));
            }
            if parse_hex_color(&locus.color).is_none() {
                return Err(CorpusError::InvalidColor {
                    id: locus.id.0.clone(),
                    color: locus.color.clone(),
                });
            }
            for sub in &locus.subs {
                if !seen.insert(sub.id.as_str()) {
                    return Err(CorpusError::DuplicateId(sub.id.0.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.loci.iter().map(|l| 1 + l.subs.len()).sum()
    }
}

/// `#rrggbb` → linear-ish [r, g, b] in 0..1. Returns None on malformed input.
pub fn parse_hex_color(s: &str) -> Option<[f32; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r##"{
            "loci": [
                {"id": "christ", "name": "Christology", "category": "godhead",
                 "color": "#e0c050", "weight": 2.0, "order": 0,
                 "subs": [{"id": "incarnation", "name": "Incarnation"}],
                 "cross_refs": ["trinity"]},
                {"id": "trinity", "name": "Theology Proper", "category": "godhead",
                 "color": "#50a0e0", "weight": 1.6, "order": 1}
            ]
        }"##
    }

    #[test]
    fn parses_and_validates_minimal_corpus() {
        let corpus = Corpus::from_json(minimal_json()).expect("parse corpus");
        assert_eq!(corpus.loci.len(), 2);
        assert_eq!(corpus.node_count(), 3);
        assert_eq!(corpus.loci[0].subs[0].id.as_str(), "incarnation");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r##"{"loci": [
            {"id": "a", "name": "A", "category": "c", "color": "#ffffff", "weight": 1.0, "order": 0},
            {"id": "a", "name": "A2", "category": "c", "color": "#ffffff", "weight": 1.0, "order": 1}
        ]}"##;
        assert!(matches!(
            Corpus::from_json(json),
            Err(CorpusError::DuplicateId(_))
        ));
    }

    #[test]
    fn rejects_bad_color() {
        let json = r##"{"loci": [
            {"id": "a", "name": "A", "category": "c", "color": "gold", "weight": 1.0, "order": 0}
        ]}"##;
        assert!(matches!(
            Corpus::from_json(json),
            Err(CorpusError::InvalidColor { .. })
        ));
    }

    #[test]
    fn hex_color_roundtrip() {
        assert_eq!(parse_hex_color("#000000"), Some([0.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert!(parse_hex_color("#fff").is_none());
        assert!(parse_hex_color("e0c050").is_none());
    }
}
