//! Announcement and CMS page validation.

use serde::Deserialize;

use bazaar_core::{ANNOUNCEMENT_MIN_LEN, FieldErrors};

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementForm {
    pub text: String,
}

impl AnnouncementForm {
    /// The trimmed text.
    ///
    /// # Errors
    ///
    /// Returns a `text` error when the text is too short.
    pub fn validate(&self) -> Result<&str, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("text", &self.text, ANNOUNCEMENT_MIN_LEN, "Announcement");
        errors.into_result()?;
        Ok(self.text.trim())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageForm {
    pub title: String,
    pub content: String,
}

/// A page edit ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPage {
    pub title: String,
    /// HTML with scripts, event handlers and unsafe URLs removed.
    pub content: String,
}

impl PageForm {
    /// # Errors
    ///
    /// Returns a `title` error when the title is blank.
    pub fn validate(&self) -> Result<CleanPage, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("title", &self.title, 1, "Title");
        errors.into_result()?;

        Ok(CleanPage {
            title: self.title.trim().to_owned(),
            content: ammonia::clean(&self.content),
        })
    }
}
