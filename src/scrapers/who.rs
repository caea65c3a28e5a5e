//! World Health Organization publications.

use crate::models::SourceDescriptor;

pub const SEEDS: &[&str] = &[
    "https://www.who.int/publications",
    "https://www.who.int/health-topics/diabetes",
];

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor {
        name: "WHO".to_string(),
        seeds: SEEDS.iter().map(|s| s.to_string()).collect(),
        follow: Vec::new(),
        require_keyword: true,
        folder: None,
    }
}
