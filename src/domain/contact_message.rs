use unicode_segmentation::UnicodeSegmentation;

use super::{ContactName, SubscriberEmail};

const MAX_ORGANIZATION_GRAPHEMES: usize = 256;
const MAX_MESSAGE_GRAPHEMES: usize = 5000;

#[derive(Debug)]
pub struct NewContactMessage {
    pub name: ContactName,
    pub email: SubscriberEmail,
    pub organization: Option<Organization>,
    pub interest: Interest,
    pub message: MessageBody,
}

/// What the visitor wants to talk to us about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Funding,
    Partnership,
    Volunteer,
    Media,
    Other,
}

impl Interest {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Funding => "funding",
            Self::Partnership => "partnership",
            Self::Volunteer => "volunteer",
            Self::Media => "media",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Funding => "Funding a Micro-Pilot",
            Self::Partnership => "NGO Partnership",
            Self::Volunteer => "Volunteering",
            Self::Media => "Media Inquiry",
            Self::Other => "Other",
        }
    }
}

impl TryFrom<String> for Interest {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "funding" => Ok(Self::Funding),
            "partnership" => Ok(Self::Partnership),
            "volunteer" => Ok(Self::Volunteer),
            "media" => Ok(Self::Media),
            "other" => Ok(Self::Other),
            other => Err(format!("{other} is not a supported interest")),
        }
    }
}

impl std::fmt::Display for Interest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Organization(String);

impl Organization {
    /// Blank input means the field was left empty on the form.
    pub fn parse(s: Option<String>) -> Result<Option<Self>, String> {
        let Some(s) = s else { return Ok(None) };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.graphemes(true).count() > MAX_ORGANIZATION_GRAPHEMES {
            return Err("Organization is too long".to_string());
        }
        Ok(Some(Self(trimmed.to_owned())))
    }
}

impl AsRef<str> for Organization {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn parse(s: String) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("Message cannot be empty".to_string());
        }
        if s.graphemes(true).count() > MAX_MESSAGE_GRAPHEMES {
            return Err("Message is too long".to_string());
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for MessageBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
