//! American Diabetes Association: *Diabetes Care* journal issues.
//!
//! The journal is diabetes-specific, so every PDF linked from an issue page
//! is in scope and no keyword filter is applied.

use crate::models::SourceDescriptor;

pub const SEEDS: &[&str] = &[
    "https://diabetesjournals.org/care/issue",
    "https://diabetesjournals.org/care/issue/48/Supplement_1",
];

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor {
        name: "ADA".to_string(),
        seeds: SEEDS.iter().map(|s| s.to_string()).collect(),
        follow: Vec::new(),
        require_keyword: false,
        folder: None,
    }
}
