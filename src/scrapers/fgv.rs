//! FGV exam section scraper.
//!
//! The section page is a plain table: the first cell holds the date, the
//! second the title, usually linking to a PDF.

use crate::models::{Publication, Source};
use crate::utils::{element_text, normalize_url};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Extract publications from the FGV section table.
///
/// Rows with fewer than two cells are layout rows and are skipped. When the
/// title cell has no usable link the whole cell text becomes the title and
/// the URL is absent.
pub fn extract(html: &str, base_url: &str) -> Vec<Publication> {
    let document = Html::parse_document(html);

    document
        .select(&ROW)
        .filter_map(|row| {
            let mut cells = row.select(&CELL);
            let date_cell = cells.next()?;
            let title_cell = cells.next()?;

            let date = element_text(date_cell);
            let link = title_cell
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href").map(|href| (a, href)));

            let (title, url) = match link {
                Some((a, href)) => (element_text(a), normalize_url(base_url, href)),
                None => (element_text(title_cell), None),
            };

            if date.is_empty() || title.is_empty() {
                return None;
            }
            Some(Publication::new(Source::Fgv, date, title, url))
        })
        .collect()
}
