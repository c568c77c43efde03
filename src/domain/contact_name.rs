use unicode_segmentation::UnicodeSegmentation;

const MAX_GRAPHEMES: usize = 256;

#[derive(Debug, Clone)]
pub struct ContactName(String);

impl ContactName {
    pub fn parse(s: String) -> Result<Self, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        if trimmed.graphemes(true).count() > MAX_GRAPHEMES {
            return Err("Name is too long".to_string());
        }
        // The name ends up in the notification subject line.
        if trimmed.chars().any(char::is_control) {
            return Err("Name contains control characters".to_string());
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
