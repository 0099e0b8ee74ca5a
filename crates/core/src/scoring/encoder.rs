use serde::{Deserialize, Serialize};

use super::ScoringError;

/// Maps a closed vocabulary of labels to integer codes.
///
/// Classes are kept sorted, so a label's code is its position in
/// lexicographic order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> =
            values.into_iter().map(|value| value.as_ref().to_ascii_lowercase()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, field: &'static str, value: &str) -> Result<usize, ScoringError> {
        let normalized = value.to_ascii_lowercase();
        self.classes
            .binary_search(&normalized)
            .map_err(|_| ScoringError::UnknownLabel { field, value: value.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::LabelEncoder;
    use crate::scoring::ScoringError;

    #[test]
    fn codes_follow_sorted_class_order() {
        let encoder = LabelEncoder::fit(["north", "south", "east", "west", "north"]);

        assert_eq!(encoder.classes(), ["east", "north", "south", "west"]);
        assert_eq!(encoder.transform("region", "east"), Ok(0));
        assert_eq!(encoder.transform("region", "West"), Ok(3));
    }

    #[test]
    fn unseen_labels_are_rejected() {
        let encoder = LabelEncoder::fit(["summer", "winter"]);

        assert_eq!(
            encoder.transform("season", "autumn"),
            Err(ScoringError::UnknownLabel { field: "season", value: "autumn".to_string() })
        );
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_label() {
        let encoder = LabelEncoder::fit(["north", "south"]);

        assert!(matches!(
            encoder.transform("region", " north"),
            Err(ScoringError::UnknownLabel { field: "region", .. })
        ));
    }
}
