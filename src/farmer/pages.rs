//! Badge and per-game page extraction.
//!
//! All extraction is best-effort: a malformed row skips only that row, and
//! a page missing the expected markup yields an empty result rather than an
//! error. The farming scheduler treats both the same as "nothing usable".

use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::domain::AppId;

const NAME_MARKER_PLAYING: &str = " by playing ";
const NAME_MARKER_NO_DROPS: &str = "You don't have any more drops remaining for ";

/// One farmable row of a badges listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeRow {
    pub app_id: AppId,
    pub name: String,
    pub hours_played: f32,
    pub cards_remaining: u16,
}

/// A parsed badges listing page.
#[derive(Debug, Clone, Default)]
pub struct BadgePage {
    /// Highest page number visible in the pagination links; 1 when absent.
    pub last_page: u32,
    pub rows: Vec<BadgeRow>,
}

struct BadgeSelectors {
    row: Selector,
    dialog: Selector,
    progress: Selector,
    playtime: Selector,
    body: Selector,
    pagelink: Selector,
}

impl BadgeSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            row: Selector::parse("div.badge_title_stats_content").ok()?,
            dialog: Selector::parse("div.card_drop_info_dialog").ok()?,
            progress: Selector::parse("span.progress_info_bold").ok()?,
            playtime: Selector::parse("div.badge_title_stats_playtime").ok()?,
            body: Selector::parse("div.card_drop_info_body").ok()?,
            pagelink: Selector::parse("a.pagelink").ok()?,
        })
    }
}

/// Extracts the farmable rows and the pagination bound from one badges page.
#[must_use]
pub fn parse_badge_page(html: &str) -> BadgePage {
    let Some(selectors) = BadgeSelectors::new() else {
        return BadgePage::default();
    };
    let document = Html::parse_document(html);

    let last_page = document
        .select(&selectors.pagelink)
        .filter_map(|link| first_uint(&element_text(link)))
        .max()
        .unwrap_or(1);

    let rows = document
        .select(&selectors.row)
        .filter_map(|row| parse_row(row, &selectors))
        .collect();

    BadgePage { last_page, rows }
}

fn parse_row(row: ElementRef<'_>, selectors: &BadgeSelectors) -> Option<BadgeRow> {
    // App id is the fifth underscore segment of the drop-dialog id,
    // e.g. "card_drop_info_dialog_440".
    let dialog = row.select(&selectors.dialog).next()?;
    let dialog_id = dialog.value().attr("id")?;
    let app_id: u32 = dialog_id.split('_').nth(4)?.parse().ok()?;

    let progress_text = element_text(row.select(&selectors.progress).next()?);
    let cards_remaining = first_uint(&progress_text).unwrap_or(0);
    let cards_remaining = u16::try_from(cards_remaining).ok()?;

    let hours_played = row
        .select(&selectors.playtime)
        .next()
        .and_then(|node| first_float(&element_text(node)))
        .unwrap_or(0.0);

    let body_text = element_text(row.select(&selectors.body).last()?);
    let name = extract_name(&body_text)?;

    trace!(app_id, %name, cards_remaining, "parsed badge row");
    Some(BadgeRow {
        app_id: AppId::new(app_id),
        name,
        hours_played,
        cards_remaining,
    })
}

/// Pulls the game name out of a drop-info sentence: the text between
/// `" by playing "` (or the no-drops-remaining phrasing) and the final `.`.
fn extract_name(text: &str) -> Option<String> {
    let start = text
        .find(NAME_MARKER_PLAYING)
        .map(|idx| idx + NAME_MARKER_PLAYING.len())
        .or_else(|| {
            text.find(NAME_MARKER_NO_DROPS)
                .map(|idx| idx + NAME_MARKER_NO_DROPS.len())
        })?;
    let end = text.rfind('.')?;
    if start >= end {
        return None;
    }
    let name = text[start..end].trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Cards still dropping according to a per-game cards page; `None` when the
/// page carries no progress marker at all.
#[must_use]
pub fn parse_cards_remaining(html: &str) -> Option<u16> {
    let selector = Selector::parse("span.progress_info_bold").ok()?;
    let document = Html::parse_document(html);
    let text = element_text(document.select(&selector).next()?);
    let remaining = first_uint(&text).unwrap_or(0);
    u16::try_from(remaining).ok()
}

/// Cards already earned according to the per-game header; `None` when the
/// header is absent.
#[must_use]
pub fn parse_cards_earned(html: &str) -> Option<u16> {
    let selector = Selector::parse("div.card_drop_info_header").ok()?;
    let document = Html::parse_document(html);
    let text = element_text(document.select(&selector).next()?);
    let earned = first_uint(&text).unwrap_or(0);
    u16::try_from(earned).ok()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_uint(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// First `[0-9.,]+` run, invariant formatting with `,` as group separator.
fn first_float(text: &str) -> Option<f32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    run.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge_row_html(app_id: u32, name: &str, hours: &str, progress: &str) -> String {
        format!(
            r#"<div class="badge_title_stats_content">
                <div class="badge_title_stats_playtime">{hours} hrs on record</div>
                <span class="progress_info_bold">{progress}</span>
                <div class="card_drop_info_dialog" id="card_drop_info_dialog_{app_id}">
                    <div class="card_drop_info_body">Earn more cards by playing {name}.</div>
                </div>
            </div>"#
        )
    }

    #[test]
    fn parses_full_row() {
        let html = badge_row_html(440, "Team Fortress 2", "2.2", "5 card drops remaining");
        let page = parse_badge_page(&html);

        assert_eq!(page.last_page, 1);
        assert_eq!(page.rows.len(), 1);
        let row = &page.rows[0];
        assert_eq!(row.app_id, AppId::new(440));
        assert_eq!(row.name, "Team Fortress 2");
        assert!((row.hours_played - 2.2).abs() < f32::EPSILON);
        assert_eq!(row.cards_remaining, 5);
    }

    #[test]
    fn no_drops_phrasing_yields_zero_and_name() {
        let html = format!(
            r#"<div class="badge_title_stats_content">
                <div class="badge_title_stats_playtime">12 hrs on record</div>
                <span class="progress_info_bold">No card drops remaining</span>
                <div class="card_drop_info_dialog" id="card_drop_info_dialog_570">
                    <div class="card_drop_info_body">You don't have any more drops remaining for Dota 2.</div>
                </div>
            </div>"#
        );
        let page = parse_badge_page(&html);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].cards_remaining, 0);
        assert_eq!(page.rows[0].name, "Dota 2");
    }

    #[test]
    fn malformed_row_is_skipped() {
        let good = badge_row_html(440, "Team Fortress 2", "1.0", "3 card drops remaining");
        let bad = r#"<div class="badge_title_stats_content"><span class="progress_info_bold">3</span></div>"#;
        let page = parse_badge_page(&format!("{bad}{good}"));
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].app_id, AppId::new(440));
    }

    #[test]
    fn pagination_takes_highest_link() {
        let html = format!(
            r#"<a class="pagelink" href="?p=2">2</a>
               <a class="pagelink" href="?p=3">3</a>
               {}"#,
            badge_row_html(1, "One", "0", "1 card drop remaining")
        );
        assert_eq!(parse_badge_page(&html).last_page, 3);
    }

    #[test]
    fn hours_with_group_separator() {
        let html = badge_row_html(10, "Counter-Strike", "1,024.5", "2 card drops remaining");
        let page = parse_badge_page(&html);
        assert!((page.rows[0].hours_played - 1024.5).abs() < 0.01);
    }

    #[test]
    fn cards_remaining_from_game_page() {
        let html = r#"<span class="progress_info_bold">4 card drops remaining</span>"#;
        assert_eq!(parse_cards_remaining(html), Some(4));

        let done = r#"<span class="progress_info_bold">No card drops remaining</span>"#;
        assert_eq!(parse_cards_remaining(done), Some(0));

        assert_eq!(parse_cards_remaining("<html></html>"), None);
    }

    #[test]
    fn cards_earned_from_game_page() {
        let html = r#"<div class="card_drop_info_header">Card drops earned: 2</div>"#;
        assert_eq!(parse_cards_earned(html), Some(2));
        assert_eq!(parse_cards_earned("<html></html>"), None);
    }

    #[test]
    fn name_extraction_edge_cases() {
        assert_eq!(
            extract_name("Earn cards by playing Half-Life 2."),
            Some("Half-Life 2".to_string())
        );
        // Game names may themselves contain periods; the last one wins.
        assert_eq!(
            extract_name("Earn cards by playing Dr. Langeskov."),
            Some("Dr. Langeskov".to_string())
        );
        assert_eq!(extract_name("no marker here."), None);
        assert_eq!(extract_name("Earn cards by playing "), None);
    }
}
