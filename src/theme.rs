/// Color palettes for the UI, selected by id and persisted in the config
use crate::sequencer::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemeId {
    #[default]
    Mystical,
    Earthy,
    Modern,
    Dark,
}

pub const THEME_ORDER: [ThemeId; 4] = [ThemeId::Mystical, ThemeId::Earthy, ThemeId::Modern, ThemeId::Dark];

impl ThemeId {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeId::Mystical => "mystical",
            ThemeId::Earthy => "earthy",
            ThemeId::Modern => "modern",
            ThemeId::Dark => "dark",
        }
    }

    /// Next theme in display order, wrapping around
    pub fn cycle(self) -> Self {
        let index = THEME_ORDER.iter().position(|&t| t == self).unwrap_or(0);
        THEME_ORDER[(index + 1) % THEME_ORDER.len()]
    }

    pub fn theme(self) -> &'static Theme {
        match self {
            ThemeId::Mystical => &MYSTICAL,
            ThemeId::Earthy => &EARTHY,
            ThemeId::Modern => &MODERN,
            ThemeId::Dark => &DARK,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown theme {0:?}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemeId {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        THEME_ORDER
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

impl From<String> for ThemeId {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_else(|err| {
            tracing::warn!("{}, using default theme", err);
            ThemeId::default()
        })
    }
}

impl From<ThemeId> for String {
    fn from(id: ThemeId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub accent: Rgb,
    pub background: Rgb,
    pub background_alt: Rgb,
    pub surface: Rgb,
    pub text: Rgb,
    pub text_muted: Rgb,
    pub glow: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub id: ThemeId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub colors: Palette,
}

impl Theme {
    /// Named style variables in application order
    pub fn style_variables(&self) -> [(&'static str, Rgb); 9] {
        let c = &self.colors;
        [
            ("--color-primary", c.primary),
            ("--color-secondary", c.secondary),
            ("--color-accent", c.accent),
            ("--color-background", c.background),
            ("--color-background-alt", c.background_alt),
            ("--color-surface", c.surface),
            ("--color-text", c.text),
            ("--color-text-muted", c.text_muted),
            ("--color-glow", c.glow),
        ]
    }

    /// Light themes need dark widget visuals flipped
    pub fn is_light(&self) -> bool {
        luminance(self.colors.background) > 0.5
    }
}

impl Rgb {
    /// Parse `#rrggbb`
    pub const fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.as_bytes();
        if bytes.len() != 7 || bytes[0] != b'#' {
            return None;
        }
        let (Some(r), Some(g), Some(b)) = (
            hex_byte(bytes[1], bytes[2]),
            hex_byte(bytes[3], bytes[4]),
            hex_byte(bytes[5], bytes[6]),
        ) else {
            return None;
        };
        Some(Rgb(r, g, b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

const fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    match (hex_digit(hi), hex_digit(lo)) {
        (Some(h), Some(l)) => Some(h << 4 | l),
        _ => None,
    }
}

const fn hex(s: &str) -> Rgb {
    match Rgb::from_hex(s) {
        Some(rgb) => rgb,
        None => panic!("bad palette color"),
    }
}

fn luminance(c: Rgb) -> f32 {
    (0.2126 * c.0 as f32 + 0.7152 * c.1 as f32 + 0.0722 * c.2 as f32) / 255.0
}

pub static MYSTICAL: Theme = Theme {
    id: ThemeId::Mystical,
    name: "Mystical",
    description: "Ethereal cosmic journey",
    icon: "🌌",
    colors: Palette {
        primary: hex("#7c3aed"),
        secondary: hex("#c084fc"),
        accent: hex("#fbbf24"),
        background: hex("#0f0a1a"),
        background_alt: hex("#1a1025"),
        surface: hex("#251a35"),
        text: hex("#f5f3ff"),
        text_muted: hex("#a78bfa"),
        glow: hex("#8b5cf6"),
    },
};

pub static EARTHY: Theme = Theme {
    id: ThemeId::Earthy,
    name: "Earthy",
    description: "Grounded natural spirit",
    icon: "🌿",
    colors: Palette {
        primary: hex("#b45309"),
        secondary: hex("#22c55e"),
        accent: hex("#d4a574"),
        background: hex("#1a1512"),
        background_alt: hex("#251f1a"),
        surface: hex("#2d2620"),
        text: hex("#fef3c7"),
        text_muted: hex("#a3a38a"),
        glow: hex("#84cc16"),
    },
};

pub static MODERN: Theme = Theme {
    id: ThemeId::Modern,
    name: "Modern",
    description: "Clean spiritual minimalism",
    icon: "✨",
    colors: Palette {
        primary: hex("#18181b"),
        secondary: hex("#71717a"),
        accent: hex("#d4af37"),
        background: hex("#fafafa"),
        background_alt: hex("#f4f4f5"),
        surface: hex("#ffffff"),
        text: hex("#18181b"),
        text_muted: hex("#71717a"),
        glow: hex("#d4af37"),
    },
};

pub static DARK: Theme = Theme {
    id: ThemeId::Dark,
    name: "Immersive",
    description: "Fire and shadow",
    icon: "🔥",
    colors: Palette {
        primary: hex("#ea580c"),
        secondary: hex("#dc2626"),
        accent: hex("#fbbf24"),
        background: hex("#030303"),
        background_alt: hex("#0a0a0a"),
        surface: hex("#171717"),
        text: hex("#fef2f2"),
        text_muted: hex("#a8a29e"),
        glow: hex("#f97316"),
    },
};
