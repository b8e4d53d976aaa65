use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for terminal output; every field is a no-op style when plain
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    /// Asset titles
    pub title: Style,
    /// Record identities such as `#12`
    pub id: Style,
}

impl Theme {
    /// Colored only when stdout is a terminal and colors are not disabled
    /// (`NO_COLOR`, `CLICOLOR=0`).
    pub fn detect() -> Self {
        let colored = console::Term::stdout().is_term() && console::colors_enabled();
        Self::for_terminal(colored)
    }

    pub fn for_terminal(colored: bool) -> Self {
        if !colored {
            return Self {
                header: Style::new(),
                success: Style::new(),
                error: Style::new(),
                warn: Style::new(),
                dim: Style::new(),
                title: Style::new(),
                id: Style::new(),
            };
        }
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().bright_black(),
            title: Style::new().bold(),
            id: Style::new().magenta(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
