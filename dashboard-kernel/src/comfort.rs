/**
 * CONFORT - Échelles de couleur pour température / humidité / batterie
 *
 * RÔLE : Transforme une mesure continue en palier d'affichage (couleur + icône).
 *
 * FONCTIONNEMENT :
 * - Deux tables de paliers ordonnées (intérieur / extérieur), palier supérieur ouvert
 * - Ajustement été : on retire un offset fixe (intérieur 3, extérieur 6) avant lookup
 * - Humidité : couleur continue, interpolation RVB linéaire entre deux références
 */

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid hex color: {0}")]
pub struct ColorParseError(String);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(ColorParseError(s.to_string()));
        }
        let v = u32::from_str_radix(hex, 16).map_err(|_| ColorParseError(s.to_string()))?;
        Ok(Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Mélange linéaire par canal, poids borné à [0, 1] (NaN => 0)
pub fn interpolate(from: Color, to: Color, weight: f64) -> Color {
    let w = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
    let mix = |a: u8, b: u8| -> u8 {
        let v = (a as f64 + (b as f64 - a as f64) * w).round();
        v.clamp(0.0, 255.0) as u8
    };
    Color::rgb(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
}

/// Couleur des valeurs indisponibles ("N/A")
pub const NEUTRAL_GRAY: Color = Color::rgb(0x80, 0x80, 0x80);

pub const HUMIDITY_DRY: Color = Color::rgb(0xfa, 0xf3, 0xca);
pub const HUMIDITY_WET: Color = Color::rgb(0x11, 0x9a, 0xf5);

pub fn humidity_color(value: f64) -> Color {
    interpolate(HUMIDITY_DRY, HUMIDITY_WET, value / 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Indoor,
    Outdoor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortIcon {
    ThermometerSnow,
    ThermometerLow,
    ThermometerHalf,
    ThermometerHigh,
    ThermometerSun,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComfortTier {
    /// Position du palier dans sa table, croissante avec la valeur
    pub index: usize,
    pub color: Color,
    pub icon: ComfortIcon,
}

struct Step {
    below: f64,
    color: Color,
    icon: ComfortIcon,
}

struct TierTable {
    steps: [Step; 5],
    top_color: Color,
    top_icon: ComfortIcon,
}

const OUTDOOR: TierTable = TierTable {
    steps: [
        Step { below: 0.0, color: Color::rgb(0xaa, 0xf7, 0xff), icon: ComfortIcon::ThermometerSnow },
        Step { below: 14.0, color: Color::rgb(0x3f, 0xa0, 0xff), icon: ComfortIcon::ThermometerLow },
        Step { below: 22.0, color: Color::rgb(0x2c, 0xde, 0x73), icon: ComfortIcon::ThermometerHalf },
        Step { below: 30.0, color: Color::rgb(0xff, 0xad, 0x72), icon: ComfortIcon::ThermometerHigh },
        Step { below: 33.0, color: Color::rgb(0xf7, 0x6d, 0x5e), icon: ComfortIcon::ThermometerSun },
    ],
    top_color: Color::rgb(0xd8, 0x26, 0x32),
    top_icon: ComfortIcon::ThermometerSun,
};

/// Intérieur : froid en bleu saturé puis frais en cyan pâle (ordre inverse de OUTDOOR), confort vert, chaud orange à rouge.
const INDOOR: TierTable = TierTable {
    steps: [
        Step { below: 15.0, color: Color::rgb(0x3f, 0xa0, 0xff), icon: ComfortIcon::ThermometerSnow },
        Step { below: 19.0, color: Color::rgb(0xaa, 0xf7, 0xff), icon: ComfortIcon::ThermometerLow },
        Step { below: 22.0, color: Color::rgb(0x2c, 0xde, 0x73), icon: ComfortIcon::ThermometerHalf },
        Step { below: 23.0, color: Color::rgb(0xff, 0xad, 0x72), icon: ComfortIcon::ThermometerHigh },
        Step { below: 25.0, color: Color::rgb(0xf7, 0x6d, 0x5e), icon: ComfortIcon::ThermometerSun },
    ],
    top_color: Color::rgb(0xd8, 0x26, 0x32),
    top_icon: ComfortIcon::ThermometerSun,
};

impl Domain {
    fn table(self) -> &'static TierTable {
        match self {
            Domain::Indoor => &INDOOR,
            Domain::Outdoor => &OUTDOOR,
        }
    }

    pub fn summer_offset(self) -> f64 {
        match self {
            Domain::Indoor => 3.0,
            Domain::Outdoor => 6.0,
        }
    }
}

pub fn temperature_tier(value: f64, domain: Domain, season_adjusted: bool) -> ComfortTier {
    let effective = if season_adjusted { value - domain.summer_offset() } else { value };
    let table = domain.table();

    for (index, step) in table.steps.iter().enumerate() {
        if effective < step.below {
            return ComfortTier { index, color: step.color, icon: step.icon };
        }
    }
    ComfortTier { index: table.steps.len(), color: table.top_color, icon: table.top_icon }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryIcon {
    Empty,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

pub fn battery_icon(level: f64) -> BatteryIcon {
    if level < 12.5 {
        BatteryIcon::Empty
    } else if level < 37.5 {
        BatteryIcon::Quarter
    } else if level < 62.5 {
        BatteryIcon::Half
    } else if level < 87.5 {
        BatteryIcon::ThreeQuarters
    } else {
        BatteryIcon::Full
    }
}

/// Mois d'été (1-12) pour l'ajustement de confort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonPolicy {
    summer_months: Vec<u8>,
}

impl Default for SeasonPolicy {
    fn default() -> Self {
        Self::new(5..=10)
    }
}

impl SeasonPolicy {
    pub fn new(months: impl IntoIterator<Item = u8>) -> Self {
        Self { summer_months: months.into_iter().collect() }
    }

    pub fn is_summer(&self, date: Date) -> bool {
        self.summer_months.contains(&(date.month() as u8))
    }

    pub fn is_summer_now(&self) -> bool {
        self.is_summer(OffsetDateTime::now_utc().date())
    }
}
