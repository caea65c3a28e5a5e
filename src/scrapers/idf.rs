//! International Diabetes Federation resources.
//!
//! Resource listings mix diabetes material with organizational reports
//! (annual reports, financial statements), so the keyword filter stays on.

use crate::models::SourceDescriptor;

pub const SEEDS: &[&str] = &[
    "https://idf.org/resources/",
    "https://idf.org/about-diabetes/diabetes-facts-figures/",
];

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor {
        name: "IDF".to_string(),
        seeds: SEEDS.iter().map(|s| s.to_string()).collect(),
        follow: Vec::new(),
        require_keyword: true,
        folder: None,
    }
}
