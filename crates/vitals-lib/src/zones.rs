use serde::{Deserialize, Serialize};

/// Clinical intensity band a heart rate falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    TooLow,
    Resting,
    Moderate,
    Vigorous,
}

/// Heart-rate thresholds derived from an age-adjusted maximum.
///
/// The four scalars partition the rate axis into too-low / resting /
/// moderate / vigorous bands. They are used for shading and labelling only;
/// the rolling average never consults them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBoundaries {
    pub resting_floor: f64,
    pub moderate: f64,
    pub vigorous: f64,
    pub peak: f64,
}

impl ZoneBoundaries {
    /// Boundaries for a patient of the given age in years.
    ///
    /// Total for finite `age >= 0`; the catalog loader rejects anything else
    /// before it can reach here.
    pub fn for_age(age: f64) -> Self {
        let max_heart_rate = 220.0 - age;
        let resting_floor = if age < 5.0 {
            80.0
        } else if age < 10.0 {
            70.0
        } else {
            40.0
        };
        Self {
            resting_floor,
            moderate: 0.5 * max_heart_rate,
            vigorous: 0.7 * max_heart_rate,
            peak: 0.85 * max_heart_rate,
        }
    }

    pub fn classify(&self, rate: f64) -> Zone {
        if rate < self.resting_floor {
            Zone::TooLow
        } else if rate < self.moderate {
            Zone::Resting
        } else if rate < self.vigorous {
            Zone::Moderate
        } else {
            Zone::Vigorous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_floor_follows_age_brackets() {
        assert_eq!(ZoneBoundaries::for_age(4.0).resting_floor, 80.0);
        assert_eq!(ZoneBoundaries::for_age(9.0).resting_floor, 70.0);
        assert_eq!(ZoneBoundaries::for_age(30.0).resting_floor, 40.0);
    }

    #[test]
    fn fractions_of_age_adjusted_max() {
        let zones = ZoneBoundaries::for_age(30.0);
        assert_eq!(zones.moderate, 95.0);
        assert_eq!(zones.vigorous, 133.0);
        assert_eq!(zones.peak, 161.5);
    }

    #[test]
    fn classification_bands() {
        let zones = ZoneBoundaries::for_age(30.0);
        assert_eq!(zones.classify(35.0), Zone::TooLow);
        assert_eq!(zones.classify(60.0), Zone::Resting);
        assert_eq!(zones.classify(100.0), Zone::Moderate);
        assert_eq!(zones.classify(150.0), Zone::Vigorous);
    }
}
