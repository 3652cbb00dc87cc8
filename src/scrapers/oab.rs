//! OAB exam news scraper.
//!
//! The [news page](https://examedeordem.oab.org.br/Noticias) renders each item
//! as two sibling blocks: a `div.noticia-data` with the date and a
//! `div.noticia-resumo` whose `h4` holds the linked title. The blocks are
//! paired up in document order.

use crate::models::{Publication, Source};
use crate::utils::{element_text, normalize_url};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

static DATE_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.noticia-data").unwrap());
static SUMMARY_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.noticia-resumo").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// Extract publications from an OAB news page.
///
/// A summary without an `h4` has no title and is skipped. A heading without
/// a link falls back to its own text and no URL.
pub fn extract(html: &str, base_url: &str) -> Vec<Publication> {
    let document = Html::parse_document(html);

    let dates = document.select(&DATE_BLOCK);
    let summaries = document.select(&SUMMARY_BLOCK);

    let mut publications = Vec::new();
    for (date_block, summary_block) in dates.zip(summaries) {
        let date = element_text(date_block);
        let Some(heading) = summary_block.select(&HEADING).next() else {
            debug!(%date, "Summary block without heading; skipped");
            continue;
        };

        let (title, url) = match heading.select(&LINK).next() {
            Some(link) => (
                element_text(link),
                link.value()
                    .attr("href")
                    .and_then(|href| normalize_url(base_url, href)),
            ),
            None => (element_text(heading), None),
        };

        if date.is_empty() || title.is_empty() {
            debug!(%date, %title, "Incomplete OAB item; skipped");
            continue;
        }
        publications.push(Publication::new(Source::Oab, date, title, url));
    }
    publications
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://examedeordem.oab.org.br";

    fn item(date: &str, summary: &str) -> String {
        format!(
            r#"<div class="noticia"><div class="noticia-data">{date}</div>
               <div class="noticia-resumo">{summary}<p>Resumo da notícia</p></div></div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body>{}</body></html>", items.join("\n"))
    }

    #[test]
    fn test_extracts_linked_items_in_order() {
        let html = page(&[
            item(" 12/03/2025 ", r#"<h4><a href="/Noticias/123">Resultado preliminar</a></h4>"#),
            item("05/03/2025", r#"<h4><a href="https://www.oab.org.br/x">Nota oficial</a></h4>"#),
        ]);

        let publications = extract(&html, BASE);
        assert_eq!(
            publications,
            vec![
                Publication::new(
                    Source::Oab,
                    "12/03/2025",
                    "Resultado preliminar",
                    Some("https://examedeordem.oab.org.br/Noticias/123".to_string()),
                ),
                Publication::new(
                    Source::Oab,
                    "05/03/2025",
                    "Nota oficial",
                    Some("https://www.oab.org.br/x".to_string()),
                ),
            ]
        );
    }

    #[test]
    fn test_heading_without_link_is_text_only() {
        let html = page(&[item("12/03/2025", "<h4>Comunicado importante</h4>")]);

        let publications = extract(&html, BASE);
        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0].title, "Comunicado importante");
        assert_eq!(publications[0].url, None);
    }

    #[test]
    fn test_summary_without_heading_is_skipped() {
        let html = page(&[
            item("12/03/2025", ""),
            item("13/03/2025", r#"<h4><a href="/n/2">Convocação</a></h4>"#),
        ]);

        let publications = extract(&html, BASE);
        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0].date, "13/03/2025");
    }

    #[test]
    fn test_link_without_href_has_no_url() {
        let html = page(&[item("12/03/2025", "<h4><a>Sem endereço</a></h4>")]);

        let publications = extract(&html, BASE);
        assert_eq!(publications[0].title, "Sem endereço");
        assert_eq!(publications[0].url, None);
    }

    #[test]
    fn test_unmatched_blocks_are_ignored() {
        let html = format!(
            "{}<div class=\"noticia-data\">99/99/9999</div>",
            page(&[item("12/03/2025", r#"<h4><a href="/n/1">Edital</a></h4>"#)])
        );
        assert_eq!(extract(&html, BASE).len(), 1);
    }

    #[test]
    fn test_unrelated_page_yields_nothing() {
        assert!(extract("<html><body><p>Manutenção</p></body></html>", BASE).is_empty());
    }
}
