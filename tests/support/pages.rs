//! Badge and game-page HTML builders.

/// One badge row in the community markup shape.
pub fn badge_row(app_id: u32, name: &str, hours: f32, remaining: u16) -> String {
    let progress = if remaining == 0 {
        "No card drops remaining".to_string()
    } else {
        format!("{remaining} card drops remaining")
    };
    format!(
        r#"<div class="badge_title_stats_content">
            <div class="badge_title_stats_playtime">{hours} hrs on record</div>
            <span class="progress_info_bold">{progress}</span>
            <div class="card_drop_info_dialog" id="card_drop_info_dialog_{app_id}">
                <div class="card_drop_info_body">Earn trading cards by playing {name}.</div>
            </div>
        </div>"#
    )
}

pub fn badge_page(rows: &[String]) -> String {
    format!("<html><body>{}</body></html>", rows.concat())
}

pub fn badge_page_with_links(rows: &[String], last_page: u32) -> String {
    let links: String = (2..=last_page)
        .map(|page| format!(r#"<a class="pagelink" href="?p={page}">{page}</a>"#))
        .collect();
    format!("<html><body>{}{links}</body></html>", rows.concat())
}

pub fn empty_badge_page() -> String {
    badge_page(&[])
}

/// A per-game cards page reporting `remaining` drops.
pub fn game_page(remaining: u16) -> String {
    let progress = if remaining == 0 {
        "No card drops remaining".to_string()
    } else {
        format!("{remaining} card drops remaining")
    };
    format!(r#"<html><body><span class="progress_info_bold">{progress}</span></body></html>"#)
}

/// A per-game cards page with an earned-drops header.
pub fn game_page_with_earned(remaining: u16, earned: u16) -> String {
    let progress = if remaining == 0 {
        "No card drops remaining".to_string()
    } else {
        format!("{remaining} card drops remaining")
    };
    format!(
        r#"<html><body>
            <div class="card_drop_info_header">Card drops earned: {earned}</div>
            <span class="progress_info_bold">{progress}</span>
        </body></html>"#
    )
}
