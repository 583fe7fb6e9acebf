//! `list` command rendering

use tsync_common::Testimonial;

use crate::error::SyncResult;
use crate::types::{ContentStore, TESTIMONIALS_SECTION};

const QUOTE_DISPLAY_LIMIT: usize = 120;
const QUOTE_TRUNCATED_LEN: usize = 117;

/// Stored testimonials, in stored order
pub async fn fetch_testimonials(store: &dyn ContentStore) -> SyncResult<Vec<Testimonial>> {
    let section = store.fetch_section(TESTIMONIALS_SECTION).await?;
    Ok(section.decode_content()?)
}

/// Shorten a quote to the display limit, on character boundaries
fn truncate_quote(quote: &str) -> String {
    if quote.chars().count() <= QUOTE_DISPLAY_LIMIT {
        return quote.to_string();
    }

    let mut shortened: String = quote.chars().take(QUOTE_TRUNCATED_LEN).collect();
    shortened.push_str("...");
    shortened
}

/// Human-readable listing
pub fn format_testimonials(testimonials: &[Testimonial]) -> String {
    if testimonials.is_empty() {
        return "No testimonials found.\n".to_string();
    }

    let mut out = String::new();
    for (i, t) in testimonials.iter().enumerate() {
        out.push_str(&format!("{}. {} — {} @ {}\n", i + 1, t.name, t.role, t.company));
        out.push_str(&format!("   \"{}\"\n\n", truncate_quote(&t.quote)));
    }
    out
}
