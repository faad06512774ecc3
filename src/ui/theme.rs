use crate::core::theme::{PresentationSink, ThemeMode};
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub bot_prefix_style: Style,
    pub bot_text_style: Style,
    pub error_text_style: Style,
    pub placeholder_style: Style,

    // Chrome
    pub title_style: Style,
    pub typing_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_disabled_style: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Theme {
            background_color: Color::Rgb(0x11, 0x18, 0x27),
            user_prefix_style: Style::default()
                .fg(Color::Rgb(0x60, 0xa5, 0xfa))
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Rgb(0x93, 0xc5, 0xfd)),
            bot_prefix_style: Style::default()
                .fg(Color::Rgb(0xd1, 0xd5, 0xdb))
                .add_modifier(Modifier::BOLD),
            bot_text_style: Style::default().fg(Color::White),
            error_text_style: Style::default().fg(Color::Rgb(0xf8, 0x71, 0x71)),
            placeholder_style: Style::default().fg(Color::Rgb(0x9c, 0xa3, 0xaf)),

            title_style: Style::default()
                .fg(Color::Rgb(0xf3, 0xf4, 0xf6))
                .add_modifier(Modifier::BOLD),
            typing_indicator_style: Style::default()
                .fg(Color::Rgb(0x9c, 0xa3, 0xaf))
                .add_modifier(Modifier::ITALIC),
            input_border_style: Style::default().fg(Color::Rgb(0x37, 0x41, 0x51)),
            input_title_style: Style::default().fg(Color::Rgb(0x9c, 0xa3, 0xaf)),

            input_text_style: Style::default().fg(Color::Rgb(0xf3, 0xf4, 0xf6)),
            input_disabled_style: Style::default().fg(Color::Rgb(0x6b, 0x72, 0x80)),
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::Rgb(0xf9, 0xfa, 0xfb),
            user_prefix_style: Style::default()
                .fg(Color::Rgb(0x25, 0x63, 0xeb))
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Rgb(0x1d, 0x4e, 0xd8)),
            bot_prefix_style: Style::default()
                .fg(Color::Rgb(0x37, 0x41, 0x51))
                .add_modifier(Modifier::BOLD),
            bot_text_style: Style::default().fg(Color::Rgb(0x11, 0x18, 0x27)),
            error_text_style: Style::default().fg(Color::Rgb(0xb9, 0x1c, 0x1c)),
            placeholder_style: Style::default().fg(Color::Rgb(0x6b, 0x72, 0x80)),

            title_style: Style::default()
                .fg(Color::Rgb(0x11, 0x18, 0x27))
                .add_modifier(Modifier::BOLD),
            typing_indicator_style: Style::default()
                .fg(Color::Rgb(0x6b, 0x72, 0x80))
                .add_modifier(Modifier::ITALIC),
            input_border_style: Style::default().fg(Color::Rgb(0xd1, 0xd5, 0xdb)),
            input_title_style: Style::default().fg(Color::Rgb(0x6b, 0x72, 0x80)),

            input_text_style: Style::default().fg(Color::Rgb(0x11, 0x18, 0x27)),
            input_disabled_style: Style::default().fg(Color::Rgb(0x93, 0xc5, 0xfd)),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }
}

/// Terminal side of the theme flag: holds the palette the renderer draws with.
#[derive(Debug, Clone)]
pub struct ThemeState {
    mode: ThemeMode,
    theme: Theme,
}

impl ThemeState {
    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
            theme: Theme::light(),
        }
    }
}

impl PresentationSink for ThemeState {
    fn apply_theme(&mut self, mode: ThemeMode) {
        self.mode = mode;
        self.theme = Theme::for_mode(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::{MemoryStore, THEME_KEY};
    use crate::core::theme::ThemeController;
    use std::sync::Arc;

    #[test]
    fn palettes_differ_in_background() {
        assert_ne!(Theme::dark().background_color, Theme::light().background_color);
    }

    #[test]
    fn controller_swaps_the_terminal_palette() {
        let backend = Arc::new(MemoryStore::with_entry(THEME_KEY, "true"));
        let mut controller = ThemeController::load(backend, ThemeState::default());
        assert_eq!(controller.sink().theme(), &Theme::dark());

        controller.toggle();
        assert_eq!(controller.sink().mode(), ThemeMode::Light);
        assert_eq!(controller.sink().theme(), &Theme::light());
    }
}
