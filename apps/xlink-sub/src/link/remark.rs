use chrono::DateTime;
use xlink_db::models::inbound::Inbound;

pub const DEFAULT_REMARK_MODEL: &str = "-ieo";

/// Builds the display name attached to every rendered link.
///
/// The model's first character is the separator; the rest orders the parts:
/// `i` inbound remark, `e` client email, `o` extra (external proxy remark).
#[derive(Debug, Clone)]
pub struct RemarkFormatter<'a> {
    model: &'a str,
    show_info: bool,
}

impl<'a> RemarkFormatter<'a> {
    pub fn new(model: &'a str, show_info: bool) -> Self {
        let model = if model.chars().count() < 2 {
            DEFAULT_REMARK_MODEL
        } else {
            model
        };
        Self { model, show_info }
    }

    pub fn compose(&self, inbound_remark: &str, email: &str, extra: &str) -> String {
        let mut chars = self.model.chars();
        let separator = chars.next().map(String::from).unwrap_or_default();

        let parts: Vec<&str> = chars
            .filter_map(|c| match c {
                'i' => Some(inbound_remark),
                'e' => Some(email),
                'o' => Some(extra),
                _ => None,
            })
            .filter(|part| !part.is_empty())
            .collect();

        parts.join(&separator)
    }

    pub fn render(&self, inbound: &Inbound, email: &str, extra: &str) -> String {
        let mut remark = self.compose(&inbound.remark, email, extra);
        if self.show_info {
            remark.push_str(&traffic_suffix(inbound, email));
        }
        remark
    }
}

fn traffic_suffix(inbound: &Inbound, email: &str) -> String {
    let Some(stats) = inbound.traffic_for(email) else {
        return String::new();
    };

    let mut suffix = String::new();
    if stats.total > 0 {
        suffix.push_str(" | ");
        suffix.push_str(&format_bytes(
            stats.total.saturating_sub(stats.up).saturating_sub(stats.down),
        ));
    }
    if stats.expiry_time > 0 {
        if let Some(date) = DateTime::from_timestamp(stats.expiry_time / 1000, 0) {
            suffix.push_str(" | ");
            suffix.push_str(&date.format("%Y-%m-%d").to_string());
        }
    }
    suffix
}

pub fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1}GB", bytes as f64 / GB as f64)
    }
}
