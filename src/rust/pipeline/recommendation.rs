use serde::{Deserialize, Serialize};
use log::debug;

use super::diagnostics::DriverRow;
use super::direction::Influence;

/// Message shown when no ranked driver pulls the prediction down
pub const AFFIRMATION_MESSAGE: &str =
    "Seluruh indikator utama berpengaruh positif terhadap peluang opini WTP. \
     Pertahankan kinerja pengelolaan keuangan daerah saat ini.";

/// Financial indicators with a known remediation advisory.
///
/// Variants are listed in matching priority: a feature name is tested
/// against each variant in this order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    KemandirianKeuangan,
    SolvabilitasAnggaran,
    SolvabilitasJangkaPanjang,
    Efektivitas,
}

impl Indicator {
    pub const PRIORITY: [Indicator; 4] = [
        Indicator::KemandirianKeuangan,
        Indicator::SolvabilitasAnggaran,
        Indicator::SolvabilitasJangkaPanjang,
        Indicator::Efektivitas,
    ];

    /// Case-sensitive substrings that identify this indicator in a feature name
    pub fn patterns(self) -> &'static [&'static str] {
        match self {
            Indicator::KemandirianKeuangan => &["Kemandirian Keuangan"],
            Indicator::SolvabilitasAnggaran => &["Solvabilitas Anggaran"],
            Indicator::SolvabilitasJangkaPanjang => &["Solvabilitas Jangka Panjang"],
            Indicator::Efektivitas => &["Efektifitas", "Efektivitas"],
        }
    }

    /// Advisory template; `{feature}` is replaced with the feature name
    fn template(self) -> &'static str {
        match self {
            Indicator::KemandirianKeuangan =>
                "{feature} menekan peluang opini WTP. Tingkatkan Pendapatan Asli Daerah \
                 agar ketergantungan pada dana transfer pusat berkurang.",
            Indicator::SolvabilitasAnggaran =>
                "{feature} menekan peluang opini WTP. Jaga keseimbangan antara pendapatan \
                 dan belanja agar anggaran tidak defisit.",
            Indicator::SolvabilitasJangkaPanjang =>
                "{feature} menekan peluang opini WTP. Kendalikan kewajiban jangka panjang \
                 dan pastikan aset daerah cukup untuk menutupnya.",
            Indicator::Efektivitas =>
                "{feature} menekan peluang opini WTP. Evaluasi realisasi terhadap target \
                 anggaran dan perbaiki perencanaan pendapatan.",
        }
    }

    /// Finds the first indicator, in priority order, whose pattern occurs in `feature`
    pub fn match_feature(feature: &str) -> Option<Indicator> {
        Self::PRIORITY.into_iter()
            .find(|indicator| indicator.patterns().iter().any(|p| feature.contains(p)))
    }

    pub fn advise(self, feature: &str) -> String {
        self.template().replace("{feature}", feature)
    }
}

/// One advisory message tied to the driver that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub indicator: Indicator,
    pub feature: String,
    pub message: String,
}

/// Outcome of the recommendation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "messages", rename_all = "snake_case")]
pub enum Recommendations {
    /// The bundle cannot tell which direction any feature pushes
    Unavailable,
    /// No ranked driver has a negative influence
    Affirmation(String),
    /// Advisories for negative drivers, in driver rank order
    Advisories(Vec<Recommendation>),
}

impl Recommendations {
    /// All message texts, in display order
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Recommendations::Unavailable => Vec::new(),
            Recommendations::Affirmation(message) => vec![message.as_str()],
            Recommendations::Advisories(items) => items.iter().map(|r| r.message.as_str()).collect(),
        }
    }
}

/// Maps negatively-signed drivers to advisory messages.
///
/// Negative drivers whose names match no known indicator produce no
/// message. At most one message is produced per indicator; the
/// highest-ranked driver supplies the feature name.
pub fn recommend(drivers: &[DriverRow]) -> Recommendations {
    if drivers.is_empty() || drivers.iter().all(|d| d.influence.is_none()) {
        return Recommendations::Unavailable;
    }

    let negative: Vec<&DriverRow> = drivers.iter()
        .filter(|d| d.influence == Some(Influence::Negative))
        .collect();
    if negative.is_empty() {
        return Recommendations::Affirmation(AFFIRMATION_MESSAGE.to_string());
    }

    let mut advisories: Vec<Recommendation> = Vec::new();
    for driver in negative {
        match Indicator::match_feature(&driver.feature) {
            Some(indicator) if advisories.iter().all(|r| r.indicator != indicator) => {
                advisories.push(Recommendation {
                    indicator,
                    feature: driver.feature.clone(),
                    message: indicator.advise(&driver.feature),
                });
            }
            Some(_) => {}
            None => debug!("No advisory for negative driver '{}'", driver.feature),
        }
    }
    Recommendations::Advisories(advisories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(feature: &str, influence: Option<Influence>) -> DriverRow {
        DriverRow {
            feature: feature.to_string(),
            importance: 0.1,
            influence,
            input: None,
            benchmark: None,
        }
    }

    #[test]
    fn test_match_priority() {
        assert_eq!(Indicator::match_feature("Rasio Kemandirian Keuangan"), Some(Indicator::KemandirianKeuangan));
        assert_eq!(Indicator::match_feature("Rasio Solvabilitas Anggaran"), Some(Indicator::SolvabilitasAnggaran));
        assert_eq!(Indicator::match_feature("Solvabilitas Jangka Panjang"), Some(Indicator::SolvabilitasJangkaPanjang));
        assert_eq!(Indicator::match_feature("Rasio Efektifitas PAD"), Some(Indicator::Efektivitas));
        assert_eq!(Indicator::match_feature("Rasio Efektivitas Belanja"), Some(Indicator::Efektivitas));
        // first pattern in priority order wins
        assert_eq!(
            Indicator::match_feature("Efektifitas Kemandirian Keuangan"),
            Some(Indicator::KemandirianKeuangan)
        );
        // matching is case-sensitive
        assert_eq!(Indicator::match_feature("rasio kemandirian keuangan"), None);
        assert_eq!(Indicator::match_feature("Rasio Belanja Modal"), None);
    }

    #[test]
    fn test_no_negative_drivers_gives_single_affirmation() {
        let drivers = vec![
            driver("Rasio Kemandirian Keuangan", Some(Influence::Positive)),
            driver("Rasio Efektifitas PAD", Some(Influence::Positive)),
        ];
        let result = recommend(&drivers);
        assert_eq!(result, Recommendations::Affirmation(AFFIRMATION_MESSAGE.to_string()));
        assert_eq!(result.messages().len(), 1);
    }

    #[test]
    fn test_negative_drivers_in_rank_order() {
        let drivers = vec![
            driver("Rasio Kemandirian Keuangan", Some(Influence::Positive)),
            driver("Rasio Solvabilitas Anggaran", Some(Influence::Negative)),
            driver("Rasio Efektifitas PAD", Some(Influence::Negative)),
            driver("Rasio Belanja Modal", Some(Influence::Negative)),
        ];
        match recommend(&drivers) {
            Recommendations::Advisories(items) => {
                let indicators: Vec<Indicator> = items.iter().map(|r| r.indicator).collect();
                assert_eq!(indicators, vec![Indicator::SolvabilitasAnggaran, Indicator::Efektivitas]);
                assert!(items[0].message.starts_with("Rasio Solvabilitas Anggaran"));
                assert!(items[1].message.contains("Rasio Efektifitas PAD"));
            }
            other => panic!("expected advisories, got {:?}", other),
        }
    }

    #[test]
    fn test_one_message_per_indicator() {
        let drivers = vec![
            driver("Rasio Efektifitas PAD", Some(Influence::Negative)),
            driver("Rasio Efektivitas Belanja", Some(Influence::Negative)),
        ];
        let result = recommend(&drivers);
        assert_eq!(result.messages().len(), 1);
        assert!(result.messages()[0].contains("Rasio Efektifitas PAD"));
    }

    #[test]
    fn test_unmatched_negative_drivers_are_dropped() {
        let drivers = vec![
            driver("Rasio Belanja Modal", Some(Influence::Negative)),
            driver("Rasio Kemandirian Keuangan", Some(Influence::Positive)),
        ];
        assert_eq!(recommend(&drivers), Recommendations::Advisories(Vec::new()));
    }

    #[test]
    fn test_without_direction_nothing_is_said() {
        let drivers = vec![driver("Rasio Kemandirian Keuangan", None)];
        assert_eq!(recommend(&drivers), Recommendations::Unavailable);
        assert!(recommend(&drivers).messages().is_empty());
    }
}
