//! National Institute for Health and Care Excellence (UK).
//!
//! Guidance PDFs are not linked from the search results; each result leads
//! to a guidance page that carries the downloads. The crawl therefore has
//! one follow stage:
//!
//! ```text
//! search?q=diabetes ──(text mentions diabetes, href has /guidance/)──▶ guidance page ──▶ PDFs
//! ```
//!
//! Guidance pages are already on topic, so the PDF pass runs without the
//! keyword filter.
//!
//! All NICE PDFs land in one folder and are deduplicated by filename. NICE
//! names each resource after its guidance title and resource id
//! (`/guidance/ng28/resources/type-2-diabetes-in-adults-management-pdf-1837338615493`),
//! so names do not collide across guidance pages. A mirror that serves every
//! guidance as e.g. `full-guideline.pdf` would only have its first document
//! downloaded; later ones would be adopted as already present.

use crate::models::{FollowStage, SourceDescriptor};

pub const SEARCH_URL: &str = "https://www.nice.org.uk/search?q=diabetes&ndt=Guidance";

/// Only links under this path are treated as guidance pages.
pub const GUIDANCE_PATH: &str = "/guidance/";

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor {
        name: "NICE".to_string(),
        seeds: vec![SEARCH_URL.to_string()],
        follow: vec![FollowStage {
            href_contains: Some(GUIDANCE_PATH.to_string()),
        }],
        require_keyword: false,
        folder: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DownloadEngine;
    use crate::fetch::testing::FakeFetcher;
    use crate::models::DownloadOutcome;
    use crate::state::{SeenUrls, StateStore};
    use crate::utils::local_filename;

    #[test]
    fn test_guidance_resources_get_distinct_filenames() {
        let ng17 = local_filename(
            "https://www.nice.org.uk/guidance/ng17/resources/type-1-diabetes-in-adults-diagnosis-and-management-pdf-1837276469701",
        );
        let ng28 = local_filename(
            "https://www.nice.org.uk/guidance/ng28/resources/type-2-diabetes-in-adults-management-pdf-1837338615493",
        );
        assert_ne!(ng17, ng28);
        assert_eq!(ng28, "type-2-diabetes-in-adults-management-pdf-1837338615493.pdf");
    }

    #[tokio::test]
    async fn test_shared_resource_name_is_adopted_not_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("NICE");
        let first = "https://nice.test/guidance/ng17/resources/full-guideline.pdf";
        let second = "https://nice.test/guidance/ng28/resources/full-guideline.pdf";
        let fetcher = FakeFetcher::new()
            .with_file(first, b"ng17")
            .with_file(second, b"ng28");
        let store = StateStore::new(tmp.path().join("seen.json"), tmp.path().join("index.csv"));
        let mut engine = DownloadEngine::new(store, SeenUrls::new());

        assert!(matches!(
            engine.download(&fetcher, first, &folder, "NICE").await,
            DownloadOutcome::Saved(_)
        ));
        assert_eq!(
            engine.download(&fetcher, second, &folder, "NICE").await,
            DownloadOutcome::Adopted
        );
        assert_eq!(std::fs::read(folder.join("full-guideline.pdf")).unwrap(), b"ng17");
    }

    #[test]
    fn test_nice_is_two_stage() {
        let source = descriptor();
        assert_eq!(source.follow.len(), 1);
        assert!(!source.require_keyword);
        assert_eq!(source.folder(), "NICE");
    }
}
