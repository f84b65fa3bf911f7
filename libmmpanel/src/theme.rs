//! Theme mode, seed color and derived accent palette
//!
//! The user picks a [`ThemeMode`]; `Auto` follows the live system
//! preference. Whenever either input changes the store reapplies the theme,
//! producing an [`AppliedTheme`] whose [`Palette`] is derived from the seed
//! color and the effective dark flag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in seed used until (and unless) the system supplies an accent color
pub const DEFAULT_SEED: &str = "#6750a4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    /// Next mode in the toggle cycle: auto → light → dark → auto
    pub fn next(self) -> Self {
        match self {
            ThemeMode::Auto => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Auto,
        }
    }

    pub fn is_dark(self, system_prefers_dark: bool) -> bool {
        match self {
            ThemeMode::Auto => system_prefers_dark,
            ThemeMode::Light => false,
            ThemeMode::Dark => true,
        }
    }

    /// Resolve a persisted preference; anything unrecognized means `Auto`
    pub fn from_preference(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ThemeMode::Auto),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            _ => Err(format!(
                "Invalid theme mode: '{}'. Valid options: auto, light, dark",
                s
            )),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Auto => write!(f, "auto"),
            ThemeMode::Light => write!(f, "light"),
            ThemeMode::Dark => write!(f, "dark"),
        }
    }
}

/// Inputs of the theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeState {
    pub mode: ThemeMode,
    pub seed: String,
    pub system_prefers_dark: bool,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Auto,
            seed: DEFAULT_SEED.to_string(),
            system_prefers_dark: false,
        }
    }
}

impl ThemeState {
    pub fn effective_dark(&self) -> bool {
        self.mode.is_dark(self.system_prefers_dark)
    }

    /// Advance the mode one step and return the new mode
    pub fn toggle(&mut self) -> ThemeMode {
        self.mode = self.mode.next();
        self.mode
    }

    /// Replace the seed if `candidate` is a usable `#rrggbb` color
    pub fn offer_seed(&mut self, candidate: &str) -> bool {
        match Rgb::parse_hex(candidate) {
            Some(rgb) => {
                self.seed = rgb.to_hex();
                true
            }
            None => false,
        }
    }

    pub fn apply(&self) -> AppliedTheme {
        let dark = self.effective_dark();
        AppliedTheme {
            mode: self.mode,
            dark,
            seed: self.seed.clone(),
            palette: Palette::from_seed(&self.seed, dark),
        }
    }
}

/// Result of applying the theme, what a renderer consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTheme {
    pub mode: ThemeMode,
    pub dark: bool,
    pub seed: String,
    pub palette: Palette,
}

impl AppliedTheme {
    /// Value for the document's `data-theme` attribute
    pub fn data_theme(&self) -> &'static str {
        if self.dark {
            "dark"
        } else {
            "light"
        }
    }
}

/// Accent palette roles, all `#rrggbb`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: String,
    pub on_primary: String,
    pub primary_container: String,
    pub on_primary_container: String,
    pub secondary: String,
    pub surface: String,
    pub on_surface: String,
    pub outline: String,
}

impl Palette {
    /// Derive tonal roles from a seed. Unparsable seeds use [`DEFAULT_SEED`].
    pub fn from_seed(seed: &str, dark: bool) -> Self {
        let rgb = Rgb::parse_hex(seed)
            .or_else(|| Rgb::parse_hex(DEFAULT_SEED))
            .unwrap_or(Rgb { r: 0x67, g: 0x50, b: 0xa4 });
        let (hue, sat, _) = rgb.to_hsl();
        let accent_sat = sat.clamp(0.35, 0.9);
        let secondary_hue = (hue + 30.0) % 360.0;
        let neutral_sat = (sat * 0.15).min(0.12);

        let tone = |h: f64, s: f64, l: f64| Rgb::from_hsl(h, s, l).to_hex();

        if dark {
            Self {
                primary: tone(hue, accent_sat, 0.80),
                on_primary: tone(hue, accent_sat, 0.20),
                primary_container: tone(hue, accent_sat, 0.30),
                on_primary_container: tone(hue, accent_sat, 0.90),
                secondary: tone(secondary_hue, accent_sat * 0.4, 0.80),
                surface: tone(hue, neutral_sat, 0.07),
                on_surface: tone(hue, neutral_sat, 0.90),
                outline: tone(hue, neutral_sat, 0.60),
            }
        } else {
            Self {
                primary: tone(hue, accent_sat, 0.40),
                on_primary: "#ffffff".to_string(),
                primary_container: tone(hue, accent_sat, 0.90),
                on_primary_container: tone(hue, accent_sat, 0.10),
                secondary: tone(secondary_hue, accent_sat * 0.4, 0.40),
                surface: tone(hue, neutral_sat, 0.98),
                on_surface: tone(hue, neutral_sat, 0.10),
                outline: tone(hue, neutral_sat, 0.50),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` or `rrggbb` (case-insensitive)
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Hue in degrees, saturation and lightness in `0..=1`
    pub fn to_hsl(self) -> (f64, f64, f64) {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let delta = max - min;
        if delta == 0.0 {
            return (0.0, 0.0, l);
        }

        let s = delta / (1.0 - (2.0 * l - 1.0).abs());
        let h = if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        (h, s, l)
    }

    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self {
            r: to_u8(r1),
            g: to_u8(g1),
            b: to_u8(b1),
        }
    }
}
