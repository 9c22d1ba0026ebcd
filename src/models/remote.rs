//! Upstream catalog payload shapes.
//!
//! These mirror the document API's JSON responses. Fields the engine does
//! not consume are omitted; missing fields are tolerated so one malformed
//! record never fails a whole catalog.

use serde::Deserialize;

/// Response envelope for the title catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleCatalog {
    #[serde(default)]
    pub titles: Vec<TitleSummary>,
}

/// One entry from the title catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleSummary {
    pub number: u32,

    #[serde(default)]
    pub name: String,

    /// Most recent issue date, `YYYY-MM-DD`
    #[serde(default)]
    pub latest_issue_date: Option<String>,

    /// Reserved titles have no content to fetch
    #[serde(default)]
    pub reserved: bool,
}

/// Response envelope for the agency catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AgencyCatalog {
    #[serde(default)]
    pub agencies: Vec<RemoteAgency>,
}

/// One (possibly nested) entry from the agency catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAgency {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub short_name: Option<String>,

    /// Stable identifier; records without one are skipped during sync
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub cfr_references: Vec<RemoteCfrReference>,

    #[serde(default)]
    pub children: Vec<RemoteAgency>,
}

/// One CFR reference as delivered by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCfrReference {
    #[serde(default)]
    pub title: Option<u32>,

    #[serde(default)]
    pub chapter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_agency_catalog() {
        let json = r#"{
            "agencies": [
                {
                    "name": "Department of Agriculture",
                    "short_name": "USDA",
                    "slug": "agriculture-department",
                    "cfr_references": [{"title": 7, "chapter": "I"}],
                    "children": [
                        {
                            "name": "Forest Service",
                            "slug": "forest-service",
                            "cfr_references": [{"title": 36, "chapter": "II"}]
                        }
                    ]
                }
            ]
        }"#;
        let catalog: AgencyCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.agencies.len(), 1);
        assert_eq!(catalog.agencies[0].children.len(), 1);
        assert_eq!(
            catalog.agencies[0].children[0].slug.as_deref(),
            Some("forest-service")
        );
    }

    #[test]
    fn test_tolerates_sparse_records() {
        let json = r#"{"agencies": [{"name": "Orphan Bureau"}]}"#;
        let catalog: AgencyCatalog = serde_json::from_str(json).unwrap();
        assert!(catalog.agencies[0].slug.is_none());
        assert!(catalog.agencies[0].cfr_references.is_empty());
    }

    #[test]
    fn test_parses_title_catalog() {
        let json = r#"{
            "titles": [
                {"number": 1, "name": "General Provisions", "latest_issue_date": "2026-08-01"},
                {"number": 35, "name": "Reserved", "reserved": true}
            ]
        }"#;
        let catalog: TitleCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.titles.len(), 2);
        assert!(catalog.titles[1].reserved);
    }
}
