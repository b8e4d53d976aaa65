use tabled::{settings::Style, Table, Tabled};
use crate::record::{FairyTale, Image, Music, Text, Voice};
use crate::storage::DbStats;

/// One line of an asset listing
#[derive(Tabled)]
pub struct AssetRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Details")]
    pub details: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

fn id_cell(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Epoch millis as local `YYYY-MM-DD HH:MM`
pub fn format_millis(millis: i64) -> String {
    use chrono::TimeZone;
    match chrono::Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => millis.to_string(),
    }
}

impl From<&FairyTale> for AssetRow {
    fn from(tale: &FairyTale) -> Self {
        Self {
            id: id_cell(tale.id),
            title: tale.title.clone(),
            details: format!(
                "voice {} image {} text {} music {}",
                tale.voice_id, tale.image_id, tale.text_id, tale.music_id
            ),
            created: format_millis(tale.created_at),
        }
    }
}

impl From<&Voice> for AssetRow {
    fn from(voice: &Voice) -> Self {
        Self {
            id: id_cell(voice.id),
            title: voice.title.clone(),
            details: voice.voice_path.clone(),
            created: format_millis(voice.created_at),
        }
    }
}

impl From<&Image> for AssetRow {
    fn from(image: &Image) -> Self {
        Self {
            id: id_cell(image.id),
            title: image.title.clone(),
            details: image.image_path.clone(),
            created: format_millis(image.created_at),
        }
    }
}

impl From<&Text> for AssetRow {
    fn from(text: &Text) -> Self {
        Self {
            id: id_cell(text.id),
            title: String::new(),
            details: text.text_path.clone(),
            created: format_millis(text.created_at),
        }
    }
}

impl From<&Music> for AssetRow {
    fn from(music: &Music) -> Self {
        Self {
            id: id_cell(music.id),
            title: music.title.clone(),
            details: format!("[{}] {}", music.attribute, music.music_path),
            created: format_millis(music.created_at),
        }
    }
}

pub fn asset_table(rows: &[AssetRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
}

pub fn stats_table(stats: &DbStats) -> String {
    let rows = [
        CountRow { table: "fairy_tales", rows: stats.fairy_tales },
        CountRow { table: "voices", rows: stats.voices },
        CountRow { table: "images", rows: stats.images },
        CountRow { table: "texts", rows: stats.texts },
        CountRow { table: "musics", rows: stats.musics },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}
