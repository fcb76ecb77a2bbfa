//! Phosphor-era color palettes
//!
//! Themes map semantic roles to foreground/background pairs; panels never
//! pick raw colors. The active theme name persists to config.json.

use ratatui::style::{Color, Modifier, Style};

/// Semantic color roles used by the panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Normal,
    Highlight,
    Warning,
    Error,
    Dim,
    Header,
    Footer,
    Nmap,
}

/// A named palette: role to (fg, bg) plus bold flags
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    normal: (Color, Color),
    highlight: (Color, Color),
    warning: (Color, Color),
    error: (Color, Color),
    dim: (Color, Color),
    header: (Color, Color),
    footer: (Color, Color),
    nmap: (Color, Color),
}

impl Theme {
    pub fn style(&self, role: Role) -> Style {
        let (fg, bg) = match role {
            Role::Normal => self.normal,
            Role::Highlight => self.highlight,
            Role::Warning => self.warning,
            Role::Error => self.error,
            Role::Dim => self.dim,
            Role::Header => self.header,
            Role::Footer => self.footer,
            Role::Nmap => self.nmap,
        };
        let mut style = Style::default().fg(fg).bg(bg);
        match role {
            Role::Highlight | Role::Header | Role::Error | Role::Nmap => {
                style = style.add_modifier(Modifier::BOLD);
            }
            Role::Dim => {
                style = style.add_modifier(Modifier::DIM);
            }
            _ => {}
        }
        style
    }
}

/// CRT green
const PHOSPHOR: Theme = Theme {
    name: "phosphor",
    normal: (Color::Green, Color::Reset),
    highlight: (Color::LightGreen, Color::Reset),
    warning: (Color::Yellow, Color::Reset),
    error: (Color::Red, Color::Reset),
    dim: (Color::Green, Color::Reset),
    header: (Color::LightGreen, Color::Reset),
    footer: (Color::Green, Color::Reset),
    nmap: (Color::Magenta, Color::Reset),
};

/// Amber monochrome
const AMBER: Theme = Theme {
    name: "amber",
    normal: (Color::Yellow, Color::Reset),
    highlight: (Color::LightYellow, Color::Reset),
    warning: (Color::LightRed, Color::Reset),
    error: (Color::Red, Color::Reset),
    dim: (Color::Yellow, Color::Reset),
    header: (Color::LightYellow, Color::Reset),
    footer: (Color::Yellow, Color::Reset),
    nmap: (Color::Magenta, Color::Reset),
};

/// Cyan-on-black
const BLUE: Theme = Theme {
    name: "blue",
    normal: (Color::Cyan, Color::Reset),
    highlight: (Color::LightCyan, Color::Reset),
    warning: (Color::Yellow, Color::Reset),
    error: (Color::Red, Color::Reset),
    dim: (Color::Cyan, Color::Reset),
    header: (Color::LightCyan, Color::Reset),
    footer: (Color::Cyan, Color::Reset),
    nmap: (Color::Magenta, Color::Reset),
};

const THEMES: [&Theme; 3] = [&PHOSPHOR, &AMBER, &BLUE];

pub const DEFAULT_THEME: &str = "phosphor";

/// Resolve a theme by name, falling back to phosphor
pub fn theme(name: &str) -> &'static Theme {
    THEMES
        .iter()
        .find(|t| t.name == name)
        .copied()
        .unwrap_or(&PHOSPHOR)
}

/// Next theme in the cycle: phosphor -> amber -> blue -> phosphor
pub fn next_theme_name(current: &str) -> &'static str {
    let idx = THEMES
        .iter()
        .position(|t| t.name == current)
        .unwrap_or(0);
    THEMES[(idx + 1) % THEMES.len()].name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_cycle() {
        assert_eq!(next_theme_name("phosphor"), "amber");
        assert_eq!(next_theme_name("amber"), "blue");
        assert_eq!(next_theme_name("blue"), "phosphor");
        // Unknown names restart the cycle.
        assert_eq!(next_theme_name("mystery"), "amber");
    }

    #[test]
    fn test_three_presses_wrap_around() {
        let mut name = "phosphor";
        for _ in 0..3 {
            name = next_theme_name(name);
        }
        assert_eq!(name, "phosphor");
    }

    #[test]
    fn test_theme_lookup_fallback() {
        assert_eq!(theme("amber").name, "amber");
        assert_eq!(theme("nope").name, "phosphor");
    }

    #[test]
    fn test_error_role_is_bold() {
        let style = theme("phosphor").style(Role::Error);
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(style.fg, Some(Color::Red));
    }
}
