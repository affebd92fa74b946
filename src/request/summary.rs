//! Human-readable request summary

use super::RequestAggregate;
use chrono::NaiveDate;
use std::fmt::Write;

/// Longest message the chat transport accepts, in characters
pub const MESSAGE_LIMIT: usize = 4096;

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Render the full request as shown at review time
pub fn render_summary(request: &RequestAggregate) -> String {
    let header = &request.header;
    let mut out = String::from("Your current request:\n\n");
    let _ = writeln!(
        out,
        "Project: {}",
        header.category.map_or("not set", |c| c.label())
    );
    let _ = writeln!(
        out,
        "Location: {}",
        header.location.as_deref().unwrap_or("not set")
    );
    out.push('\n');

    if let Some(date) = header.global_due_date {
        let _ = writeln!(out, "Global delivery date: {}\n", format_date(date));
    }

    if request.is_empty() {
        out.push_str("No items added yet.\n");
        return out;
    }

    for (i, item) in request.items().iter().enumerate() {
        let _ = writeln!(out, "Item {}:", i + 1);
        let _ = writeln!(out, "  Name: {}", item.name);
        let _ = writeln!(out, "  Unit: {}", item.unit);
        let _ = writeln!(out, "  Quantity: {}", item.quantity);
        let _ = writeln!(out, "  Module: {}", item.module);
        let _ = writeln!(
            out,
            "  Delivery date: {}",
            item.due_date.map_or_else(|| "not set".to_string(), format_date)
        );
        for attachment in &item.attachments {
            let _ = writeln!(out, "  Attachment: {}", attachment.describe());
        }
        out.push('\n');
    }
    out
}

/// Split text into chunks of at most `limit` characters, on char boundaries
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(limit).map(|c| c.iter().collect()).collect()
}
