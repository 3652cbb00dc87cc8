//! Data models for monitored sources and the publications they announce.
//!
//! - [`Source`]: tag of the site a publication came from
//! - [`SourceConfig`]: where a source lives and how its links are resolved
//! - [`Publication`]: one normalized announcement, also the on-disk record
//!
//! The serde field names of [`Publication`] are the state file contract
//! (`source`, `data`, `titulo`, `url`) and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The OAB bar exam news page.
pub const OAB_PAGE_URL: &str = "https://examedeordem.oab.org.br/Noticias";
/// Base used to resolve relative OAB links.
pub const OAB_BASE_URL: &str = "https://examedeordem.oab.org.br";
/// The FGV exam section listing notices and results.
pub const FGV_PAGE_URL: &str = "https://oab.fgv.br/NovoSec.aspx?key=jyMaUzWUnzQ=&codSec=5138";
/// Base used to resolve relative FGV links.
pub const FGV_BASE_URL: &str = "https://oab.fgv.br";

/// Site a publication was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Source {
    #[serde(rename = "OAB")]
    Oab,
    #[serde(rename = "FGV")]
    Fgv,
}

impl Source {
    /// Short tag shown in messages and logs.
    pub fn tag(self) -> &'static str {
        match self {
            Source::Oab => "OAB",
            Source::Fgv => "FGV",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Location of one monitored page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Which extraction rules apply to the page.
    pub source: Source,
    /// Page fetched on every cycle.
    pub page_url: String,
    /// Prefix for links that are not absolute.
    pub base_url: String,
}

impl SourceConfig {
    pub fn new(source: Source, page_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            source,
            page_url: page_url.into(),
            base_url: base_url.into(),
        }
    }

    /// The production OAB page.
    pub fn oab() -> Self {
        Self::new(Source::Oab, OAB_PAGE_URL, OAB_BASE_URL)
    }

    /// The production FGV page.
    pub fn fgv() -> Self {
        Self::new(Source::Fgv, FGV_PAGE_URL, FGV_BASE_URL)
    }
}

/// A single announcement found on a source page.
///
/// Two publications describe the same announcement when their source, date
/// and title match; see [`Publication::same_as`]. The URL is carried along
/// for the message but plays no part in that identity, so an item whose link
/// is later corrected is not announced again.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Publication {
    /// Originating site. Older state files call this field `fonte`.
    #[serde(alias = "fonte")]
    pub source: Source,
    /// Date as displayed by the site; never parsed.
    #[serde(rename = "data")]
    pub date: String,
    /// Title as displayed by the site, possibly percent-encoded.
    #[serde(rename = "titulo")]
    pub title: String,
    /// Absolute link to the announcement, when the page offers one.
    pub url: Option<String>,
}

impl Publication {
    pub fn new(
        source: Source,
        date: impl Into<String>,
        title: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            source,
            date: date.into(),
            title: title.into(),
            url,
        }
    }

    /// Dedup identity: `(source, date, title)`.
    pub fn same_as(&self, other: &Publication) -> bool {
        self.source == other.source && self.date == other.date && self.title == other.title
    }
}

/// Summary of one monitoring cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates returned by all sources together.
    pub fetched: usize,
    /// Publications delivered and added to the history.
    pub delivered: usize,
    /// New publications whose delivery failed.
    pub failed: usize,
    /// Whether the history was written to disk.
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_serializes_with_state_file_names() {
        let publication = Publication::new(
            Source::Fgv,
            "10/03/2025",
            "Edital",
            Some("https://oab.fgv.br/a.pdf".to_string()),
        );

        let json = serde_json::to_value(&publication).unwrap();
        assert_eq!(json["source"], "FGV");
        assert_eq!(json["data"], "10/03/2025");
        assert_eq!(json["titulo"], "Edital");
        assert_eq!(json["url"], "https://oab.fgv.br/a.pdf");
    }

    #[test]
    fn test_absent_url_serializes_as_null() {
        let publication = Publication::new(Source::Oab, "01/02/2025", "Aviso", None);
        let json = serde_json::to_string(&publication).unwrap();
        assert!(json.contains(r#""url":null"#));
    }

    #[test]
    fn test_legacy_fonte_field_is_accepted() {
        let json = r#"{"fonte": "OAB", "data": "01/02/2025", "titulo": "Aviso", "url": null}"#;
        let publication: Publication = serde_json::from_str(json).unwrap();
        assert_eq!(publication.source, Source::Oab);
        assert_eq!(publication.url, None);
    }

    #[test]
    fn test_same_as_ignores_url() {
        let a = Publication::new(Source::Oab, "01/02/2025", "Aviso", None);
        let b = Publication::new(
            Source::Oab,
            "01/02/2025",
            "Aviso",
            Some("https://examedeordem.oab.org.br/x".to_string()),
        );
        assert!(a.same_as(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_as_distinguishes_source_date_and_title() {
        let base = Publication::new(Source::Oab, "01/02/2025", "Aviso", None);
        assert!(!base.same_as(&Publication::new(Source::Fgv, "01/02/2025", "Aviso", None)));
        assert!(!base.same_as(&Publication::new(Source::Oab, "02/02/2025", "Aviso", None)));
        assert!(!base.same_as(&Publication::new(Source::Oab, "01/02/2025", "Edital", None)));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Oab.to_string(), "OAB");
        assert_eq!(Source::Fgv.to_string(), "FGV");
    }
}
