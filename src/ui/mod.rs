pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    asset_deleted, asset_saved, error, header, section, status, success, summary_row, warn,
    OutputMode,
};
pub use table::{asset_table, format_millis, stats_table, AssetRow};
pub use theme::{theme, Theme};
