//! Neon-on-charcoal palette for the RunScope viewer.
//!
//! # Color Palette
//! - **Background**: deep charcoal
//! - **Accent**: electric cyan (focus, highlights)
//! - **Positive**: neon green (buy markers, gains)
//! - **Negative**: hot pink (sell markers, errors)
//! - **Warning**: neon orange (stale data, partial refreshes)
//! - **Neutral**: cool purple (oscillator, secondary info)
//! - **Muted**: steel blue (hints, disabled)

use ratatui::style::{Color, Modifier, Style};

use runscope_core::Tint;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub neutral: Color,
    pub muted: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    /// Price series line.
    pub series: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::parrot_neon()
    }
}

impl Theme {
    pub fn parrot_neon() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            positive: Color::Rgb(0, 255, 128),
            negative: Color::Rgb(255, 20, 147),
            warning: Color::Rgb(255, 140, 0),
            neutral: Color::Rgb(147, 112, 219),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
            text_secondary: Color::Rgb(170, 170, 170),
            series: Color::Rgb(41, 98, 255),
        }
    }

    /// Terminal colour for a chart tint.
    pub fn tint(&self, tint: Tint) -> Color {
        match tint {
            Tint::Green => self.positive,
            Tint::Red => self.negative,
            Tint::Blue => self.series,
            Tint::Purple => self.neutral,
            Tint::Gray => self.text_secondary,
        }
    }
}

pub fn accent() -> Style {
    Style::default().fg(Theme::default().accent)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn positive() -> Style {
    Style::default().fg(Theme::default().positive)
}

pub fn negative() -> Style {
    Style::default().fg(Theme::default().negative)
}

pub fn warning() -> Style {
    Style::default().fg(Theme::default().warning)
}

pub fn neutral() -> Style {
    Style::default().fg(Theme::default().neutral)
}

pub fn muted() -> Style {
    Style::default().fg(Theme::default().muted)
}

pub fn text() -> Style {
    Style::default().fg(Theme::default().text_primary)
}

pub fn text_secondary() -> Style {
    Style::default().fg(Theme::default().text_secondary)
}

/// Border of a pane; focused panes use the accent.
pub fn panel_border(focused: bool) -> Style {
    if focused {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(focused: bool) -> Style {
    if focused {
        accent_bold()
    } else {
        text_secondary()
    }
}
