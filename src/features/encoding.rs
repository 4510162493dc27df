//! Label encodings for categorical student attributes

use serde::{Deserialize, Serialize};

/// Code used for any value the encoder was not fit on
pub const UNKNOWN_CATEGORY_CODE: u32 = 0;

/// Maps categorical values to small integer codes
///
/// Classes are kept sorted, so a value's code is its index in the sorted
/// class list. This matches encoders fit offline on the training set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl From<Vec<String>> for LabelEncoder {
    fn from(classes: Vec<String>) -> Self {
        LabelEncoder::fit(classes)
    }
}

impl From<LabelEncoder> for Vec<String> {
    fn from(encoder: LabelEncoder) -> Self {
        encoder.classes
    }
}

impl LabelEncoder {
    /// Build an encoder from the observed values
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        LabelEncoder { classes }
    }

    /// Encode a value, falling back to [`UNKNOWN_CATEGORY_CODE`]
    pub fn encode(&self, value: &str) -> u32 {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as u32)
            .unwrap_or(UNKNOWN_CATEGORY_CODE)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Encoders for the three categorical inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoders {
    #[serde(default)]
    pub gender: LabelEncoder,
    #[serde(default)]
    pub nationality: LabelEncoder,
    #[serde(default, rename = "ethnic.group")]
    pub ethnic_group: LabelEncoder,
}
