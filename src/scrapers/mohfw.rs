//! Indian Ministry of Health and Family Welfare homepage.

use crate::models::SourceDescriptor;

pub const SEED: &str = "https://main.mohfw.gov.in";

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor {
        name: "MOHFW".to_string(),
        seeds: vec![SEED.to_string()],
        follow: Vec::new(),
        require_keyword: true,
        folder: None,
    }
}
