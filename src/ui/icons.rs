/// Emoji markers used in human-readable output
pub struct Icons;

impl Icons {
    pub const BOOK: &str = "📖";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const DATABASE: &str = "🗄️";
    pub const FOLDER: &str = "📂";
    pub const NEW: &str = "✨";
    pub const DEL: &str = "🗑️";
    pub const VOICE: &str = "🎙️";
    pub const IMAGE: &str = "🖼️";
    pub const TEXT: &str = "📄";
    pub const MUSIC: &str = "🎵";
    pub const STAR: &str = "⭐";
}

impl Icons {
    pub fn for_kind(kind: crate::AssetKind) -> &'static str {
        use crate::AssetKind;
        match kind {
            AssetKind::FairyTale => Self::BOOK,
            AssetKind::Voice => Self::VOICE,
            AssetKind::Image => Self::IMAGE,
            AssetKind::Text => Self::TEXT,
            AssetKind::Music => Self::MUSIC,
        }
    }
}
