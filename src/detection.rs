//! Detection results returned by the masking service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One piece of PII found in the submitted text.
///
/// `start` and `end` are half-open character offsets into the text that was
/// submitted, not into the masked output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Category id this detection belongs to
    #[serde(rename = "type")]
    pub category: String,
    /// Literal value that was found
    pub original: String,
    pub start: usize,
    pub end: usize,
}

/// Masking service response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskResponse {
    pub masked_text: String,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// Count detections per category in a single pass.
pub fn tally_detections(detections: &[Detection]) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    for detection in detections {
        *tally.entry(detection.category.clone()).or_insert(0) += 1;
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(category: &str, original: &str, start: usize, end: usize) -> Detection {
        Detection {
            category: category.into(),
            original: original.into(),
            start,
            end,
        }
    }

    #[test]
    fn test_tally_counts_per_type() {
        let detections = vec![
            det("name", "Alice", 0, 5),
            det("phone", "555-0100", 20, 28),
            det("name", "Bob", 13, 16),
        ];
        let tally = tally_detections(&detections);
        assert_eq!(tally.get("name"), Some(&2));
        assert_eq!(tally.get("phone"), Some(&1));
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn test_tally_ignores_order() {
        let mut detections = vec![
            det("email", "a@b.c", 0, 5),
            det("name", "Al", 6, 8),
            det("email", "d@e.f", 9, 14),
        ];
        let forward = tally_detections(&detections);
        detections.reverse();
        assert_eq!(tally_detections(&detections), forward);
    }

    #[test]
    fn test_tally_empty() {
        assert!(tally_detections(&[]).is_empty());
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "masked_text": "████ called ████",
            "detections": [
                {"type": "name", "original": "Alice", "start": 0, "end": 5},
                {"type": "name", "original": "Bob", "start": 13, "end": 16}
            ]
        }"#;
        let response: MaskResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.masked_text, "████ called ████");
        assert_eq!(response.detections[1], det("name", "Bob", 13, 16));

        let back = serde_json::to_value(&response.detections[0]).unwrap();
        assert_eq!(back["type"], "name");
    }

    #[test]
    fn test_missing_detections_defaults_to_empty() {
        let response: MaskResponse = serde_json::from_str(r#"{"masked_text": "ok"}"#).unwrap();
        assert!(response.detections.is_empty());
    }
}
