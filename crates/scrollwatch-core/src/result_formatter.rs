//! Presentation-ready labels, pages, and report text for match records.

use serde::Serialize;

use crate::scan_model::MatchRecord;

pub const LABEL_MAX_CHARS: usize = 80;
pub const LINKS_PER_PAGE: usize = 25;
pub const REPORT_TITLE: &str = "Unacknowledged scrolls";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One outbound message worth of link buttons.
pub struct ReportPage {
    pub links: Vec<ReportLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Summary header posted before the link pages.
pub struct ReportIntro {
    pub title: String,
    pub description: String,
    pub footer: Option<String>,
}

/// `#channel · HH:MM • preview`, clamped to [`LABEL_MAX_CHARS`].
pub fn format_label(record: &MatchRecord) -> String {
    let label = format!(
        "{} · {} • {}",
        record.container_label,
        record.created_at_utc.format("%H:%M"),
        record.preview
    );
    clamp_label(&label)
}

fn clamp_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return label.to_string();
    }
    let mut clamped: String = label.chars().take(LABEL_MAX_CHARS - 3).collect();
    clamped.push('…');
    clamped
}

pub fn paginate(records: &[MatchRecord]) -> Vec<ReportPage> {
    records
        .chunks(LINKS_PER_PAGE)
        .map(|chunk| ReportPage {
            links: chunk
                .iter()
                .map(|record| ReportLink {
                    label: format_label(record),
                    url: record.permalink.clone(),
                })
                .collect(),
        })
        .collect()
}

pub fn render_intro(total: usize, window_hours: i64) -> ReportIntro {
    if total == 0 {
        return ReportIntro {
            title: REPORT_TITLE.to_string(),
            description: format!("No matching messages in the last {window_hours} hours. 🎉"),
            footer: None,
        };
    }
    ReportIntro {
        title: REPORT_TITLE.to_string(),
        description: format!(
            "Tap a button to jump to a message. Window: last {window_hours} hours."
        ),
        footer: Some(format!("Total: {total}")),
    }
}

/// Plain-text report used when posting is suppressed.
pub fn render_text_summary(records: &[MatchRecord], window_hours: i64) -> String {
    let intro = render_intro(records.len(), window_hours);
    let mut lines = vec![intro.title, intro.description];
    if let Some(footer) = intro.footer {
        lines.push(footer);
    }
    for (index, page) in paginate(records).iter().enumerate() {
        lines.push(format!("-- page {} --", index + 1));
        for link in &page.links {
            lines.push(format!("{} -> {}", link.label, link.url));
        }
    }
    lines.join("\n")
}
