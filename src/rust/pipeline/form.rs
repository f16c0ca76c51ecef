use log::warn;

use super::bulk::TableFormat;
use super::error::PipelineError;
use super::preprocess::InputRecord;

/// Collects indicator values for a single assessment the way the input form
/// does: every indicator starts at 0.0 and later sources override earlier ones.
///
/// Numbers typed as text are read with the configured [`TableFormat`], so a
/// regional `1.234,5` works when the format says `,` is the decimal separator.
///
/// ```
/// use wtp_predictor::{FormInput, TableFormat};
///
/// let features = vec!["Rasio A".to_string(), "Rasio B".to_string()];
/// let format = TableFormat { decimal_separator: ',', delimiter: ';', ..TableFormat::default() };
/// let mut form = FormInput::new(&features, &format);
/// form.apply_json(r#"{"Rasio A": 0.5, "Rasio B": null}"#).unwrap();
/// form.apply_value("Rasio A", "0,75").unwrap();
///
/// let record = form.into_record();
/// assert_eq!(record.get("Rasio A"), Some(0.75));
/// assert!(record.get("Rasio B").unwrap().is_nan());
/// ```
#[derive(Debug, Clone)]
pub struct FormInput<'a> {
    features: &'a [String],
    format: &'a TableFormat,
    record: InputRecord,
    ignored: Vec<String>,
}

impl<'a> FormInput<'a> {
    pub fn new(features: &'a [String], format: &'a TableFormat) -> Self {
        let record = features.iter().map(|name| (name.as_str(), 0.0)).collect();
        Self { features, format, record, ignored: Vec::new() }
    }

    /// Merges a JSON object of indicator values; `null` marks a value as missing
    pub fn apply_json(&mut self, raw: &str) -> Result<(), PipelineError> {
        let parsed: InputRecord = serde_json::from_str(raw).map_err(|e| {
            PipelineError::ValidationError(format!("Expected a JSON object of indicator values: {}", e))
        })?;
        for (name, value) in parsed.iter() {
            self.set(name, value);
        }
        Ok(())
    }

    /// Sets one indicator from text written in the configured number format
    pub fn apply_value(&mut self, name: &str, raw: &str) -> Result<(), PipelineError> {
        let value = self.format.parse_number(raw.trim()).ok_or_else(|| {
            PipelineError::ValidationError(format!("Value '{}' for '{}' is not a number", raw, name))
        })?;
        self.set(name, value);
        Ok(())
    }

    /// Names that were supplied but are not indicators of the bundle
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn into_record(self) -> InputRecord {
        self.record
    }

    fn set(&mut self, name: &str, value: f64) {
        let name = name.trim();
        if !self.features.iter().any(|f| f == name) {
            warn!("Ignoring unknown indicator '{}'", name);
            self.ignored.push(name.to_string());
            return;
        }
        self.record.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> Vec<String> {
        vec!["Rasio A".to_string(), "Rasio B".to_string(), "Rasio C".to_string()]
    }

    fn regional() -> TableFormat {
        TableFormat {
            delimiter: ';',
            decimal_separator: ',',
            thousands_separator: Some('.'),
            ..TableFormat::default()
        }
    }

    #[test]
    fn test_untouched_indicators_start_at_zero() {
        let features = features();
        let format = TableFormat::default();
        let record = FormInput::new(&features, &format).into_record();
        assert_eq!(record.len(), 3);
        assert!(record.iter().all(|(_, value)| value == 0.0));
    }

    #[test]
    fn test_values_override_json() {
        let features = features();
        let format = regional();
        let mut form = FormInput::new(&features, &format);
        form.apply_json(r#"{"Rasio A": 0.5, "Rasio B": 2.0}"#).unwrap();
        form.apply_value("Rasio A", "1.234,5").unwrap();

        let record = form.into_record();
        assert_eq!(record.get("Rasio A"), Some(1234.5));
        assert_eq!(record.get("Rasio B"), Some(2.0));
        assert_eq!(record.get("Rasio C"), Some(0.0));
    }

    #[test]
    fn test_unknown_names_ignored() {
        let features = features();
        let format = TableFormat::default();
        let mut form = FormInput::new(&features, &format);
        form.apply_json(r#"{"Rasio Z": 9.0}"#).unwrap();
        form.apply_value(" Rasio Y ", "1.5").unwrap();
        assert_eq!(form.ignored(), ["Rasio Z".to_string(), "Rasio Y".to_string()]);
        assert_eq!(form.into_record().get("Rasio Z"), None);
    }

    #[test]
    fn test_value_uses_configured_separator() {
        let features = features();
        let format = TableFormat::default();
        let mut form = FormInput::new(&features, &format);
        // A comma is not a decimal separator in the default format
        assert!(matches!(form.apply_value("Rasio A", "0,5"), Err(PipelineError::ValidationError(_))));
        assert!(matches!(form.apply_value("Rasio A", "NaN"), Err(PipelineError::ValidationError(_))));
        form.apply_value("Rasio A", "0.5").unwrap();
        assert_eq!(form.into_record().get("Rasio A"), Some(0.5));
    }

    #[test]
    fn test_json_must_be_an_object() {
        let features = features();
        let format = TableFormat::default();
        let mut form = FormInput::new(&features, &format);
        assert!(matches!(form.apply_json("[1, 2]"), Err(PipelineError::ValidationError(_))));
    }
}
