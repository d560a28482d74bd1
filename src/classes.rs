//! Fixed weather class set and per-class display metadata.

/// Weather condition the classifier can predict.
///
/// The set is closed; the classifier's output vector carries one probability
/// per variant, in [`WeatherClass::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherClass {
    /// Frozen precipitation as ice pellets.
    Hail,
    /// Electrical discharge during a thunderstorm.
    Lightning,
    /// Water droplets falling from clouds.
    Rain,
    /// Strong winds carrying sand particles.
    Sandstorm,
    /// Frozen water vapor falling as white flakes.
    Snow,
}

impl WeatherClass {
    /// Every class, in the order the classifier's output vector uses.
    pub const ALL: [WeatherClass; 5] = [
        WeatherClass::Hail,
        WeatherClass::Lightning,
        WeatherClass::Rain,
        WeatherClass::Sandstorm,
        WeatherClass::Snow,
    ];

    /// Stable lowercase identifier used in payloads and training data.
    pub fn label(self) -> &'static str {
        match self {
            WeatherClass::Hail => "hail",
            WeatherClass::Lightning => "lightning",
            WeatherClass::Rain => "rain",
            WeatherClass::Sandstorm => "sandstorm",
            WeatherClass::Snow => "snow",
        }
    }

    /// Display symbol shown next to the predicted class.
    pub fn symbol(self) -> &'static str {
        match self {
            WeatherClass::Hail => "🧊",
            WeatherClass::Lightning => "⚡",
            WeatherClass::Rain => "🌧️",
            WeatherClass::Sandstorm => "🌪️",
            WeatherClass::Snow => "❄️",
        }
    }

    /// One-line human description of the condition.
    pub fn description(self) -> &'static str {
        match self {
            WeatherClass::Hail => "Hail - Frozen precipitation in the form of ice pellets",
            WeatherClass::Lightning => "Lightning - Electrical discharge during a thunderstorm",
            WeatherClass::Rain => "Rain - Water droplets falling from clouds",
            WeatherClass::Sandstorm => "Sandstorm - Strong winds carrying sand particles",
            WeatherClass::Snow => "Snow - Frozen water vapor falling as white flakes",
        }
    }
}
