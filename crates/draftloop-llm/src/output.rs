use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text returned by one generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// Generated message content
    pub content: String,
    /// Model that served the request, when the endpoint reports it
    pub model: Option<String>,
    /// Duration of the call
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl Generation {
    pub fn new(content: String, model: Option<String>, duration: Duration) -> Self {
        Self {
            content,
            model,
            duration,
        }
    }

    /// Number of characters (not bytes) in the content
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_count_counts_chars_not_bytes() {
        let generation = Generation::new("Coffee ☕ é".to_string(), None, Duration::ZERO);
        assert_eq!(generation.char_count(), 10);
        assert!(generation.content.len() > 10);
    }
}
