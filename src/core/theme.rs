use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::persistence::PersistenceAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    pub fn is_dark(self) -> bool {
        self == ThemeMode::Dark
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Light => "Light mode",
            ThemeMode::Dark => "Dark mode",
        }
    }
}

/// Whatever renders the chat; receives the theme on load and every change.
pub trait PresentationSink {
    fn apply_theme(&mut self, mode: ThemeMode);
}

pub struct ThemeController<S: PresentationSink> {
    dark: bool,
    persistence: Arc<dyn PersistenceAdapter>,
    sink: S,
}

impl<S: PresentationSink> ThemeController<S> {
    /// Reads the stored flag (light when absent) and applies it to `sink`.
    pub fn load(persistence: Arc<dyn PersistenceAdapter>, mut sink: S) -> Self {
        let dark = persistence.load_theme();
        sink.apply_theme(ThemeMode::from_dark(dark));
        Self {
            dark,
            persistence,
            sink,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    pub fn mode(&self) -> ThemeMode {
        ThemeMode::from_dark(self.dark)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn toggle(&mut self) -> ThemeMode {
        self.set(!self.dark)
    }

    pub fn set(&mut self, dark: bool) -> ThemeMode {
        self.dark = dark;
        let mode = self.mode();
        debug!(theme = mode.as_str(), "Theme changed");
        if let Err(err) = self.persistence.save_theme(dark) {
            warn!(error = %err, "Failed to persist theme preference");
        }
        self.sink.apply_theme(mode);
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::{MemoryStore, THEME_KEY};
    use crate::utils::test_utils::RecordingSink;

    #[test]
    fn absent_preference_loads_light() {
        let controller = ThemeController::load(Arc::new(MemoryStore::new()), RecordingSink::default());
        assert!(!controller.is_dark());
        assert_eq!(controller.sink().applied, vec![ThemeMode::Light]);
    }

    #[test]
    fn stored_preference_is_applied_on_load() {
        let backend = Arc::new(MemoryStore::with_entry(THEME_KEY, "true"));
        let controller = ThemeController::load(backend, RecordingSink::default());
        assert_eq!(controller.mode(), ThemeMode::Dark);
        assert_eq!(controller.sink().applied, vec![ThemeMode::Dark]);
    }

    #[test]
    fn toggle_flips_persists_and_reapplies() {
        let backend = Arc::new(MemoryStore::new());
        let mut controller = ThemeController::load(backend.clone(), RecordingSink::default());

        assert_eq!(controller.toggle(), ThemeMode::Dark);
        assert!(backend.load_theme());
        assert_eq!(controller.toggle(), ThemeMode::Light);
        assert!(!backend.load_theme());

        assert_eq!(
            controller.sink().applied,
            vec![ThemeMode::Light, ThemeMode::Dark, ThemeMode::Light]
        );
    }
}
