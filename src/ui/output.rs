use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_json(&self) -> bool {
        *self == OutputMode::Json
    }
}

pub fn header(text: &str) {
    println!("{} {}", Icons::BOOK, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn asset_saved(kind: crate::AssetKind, id: i64, title: &str) {
    println!(
        "{} {} {} {} {}",
        Icons::NEW.style(theme().success.clone()),
        Icons::for_kind(kind),
        kind,
        format!("#{}", id).style(theme().id.clone()),
        title.style(theme().title.clone())
    );
}

pub fn asset_deleted(kind: crate::AssetKind, id: i64) {
    println!(
        "{} {} {}",
        Icons::DEL.style(theme().error.clone()),
        kind,
        format!("#{}", id).style(theme().id.clone())
    );
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
