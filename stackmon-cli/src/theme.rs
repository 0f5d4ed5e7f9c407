//! Color palette and style helpers for the TUI renderer.

use ratatui::style::{Color, Modifier, Style};

use stackmon_core::classify::Severity;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Success state (running, healthy, reachable)
    pub success: Color,
    /// Warning state (starting, restarting, partial)
    pub warn: Color,
    /// Error state (down, unhealthy, unreachable)
    pub error: Color,
    /// Group header labels
    pub group: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    /// VS Code-esque dark theme
    pub fn dark() -> Self {
        Self {
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            success: Color::Rgb(78, 201, 176),
            warn: Color::Rgb(220, 180, 100),
            error: Color::Rgb(244, 135, 113),
            group: Color::Rgb(220, 180, 100),
            key_hint: Color::Rgb(206, 145, 120),
        }
    }

    /// Cell style for a classified severity; unclassified cells keep
    /// the plain text color.
    pub fn severity_style(&self, severity: Option<Severity>) -> Style {
        match severity {
            Some(Severity::Normal) => Style::default().fg(self.success),
            Some(Severity::Warn) => Style::default().fg(self.warn),
            Some(Severity::Critical) => Style::default().fg(self.error),
            None => Style::default().fg(self.text),
        }
    }

    pub fn group_header(&self) -> Style {
        Style::default().fg(self.group).add_modifier(Modifier::BOLD)
    }
}
