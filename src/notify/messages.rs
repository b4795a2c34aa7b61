// src/notify/messages.rs
//! Telegram-HTML message bodies. All user-supplied text is escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::listing::{site_label, Listing};

pub fn listing(l: &Listing) -> String {
    let mut out = format!("🆕 <b>{}</b>\n💶 {}", encode_text(&l.title), encode_text(&l.price));
    if let Some(loc) = &l.location {
        out.push_str(&format!("\n📍 {}", encode_text(loc)));
    }
    out.push_str(&format!(
        "\n🔗 <a href=\"{}\">View on {}</a>",
        encode_double_quoted_attribute(&l.url),
        encode_text(&site_label(&l.url))
    ));
    out
}

pub fn summary(count: usize) -> String {
    format!("🔔 <b>{count} new listings found</b>")
}

pub fn initialized(count: usize) -> String {
    format!(
        "✅ <b>Watcher initialized</b>\n{count} current listings recorded. \
         You will be notified about new ones from the next run on."
    )
}

pub fn zero_listings(addresses: usize) -> String {
    format!(
        "⚠️ <b>No listings found</b> on any of {addresses} search page(s). \
         The page markup may have changed."
    )
}

pub fn run_failed(err: &str) -> String {
    format!("❌ <b>Run failed</b>\n<code>{}</code>", encode_text(err))
}
