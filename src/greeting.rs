//! Greeting text produced by the worker-side computation.
//!
//! The wording is configuration, not protocol: only the shape matters to
//! callers (a phrase, the subject, then a suffix that is louder when
//! emphasized).

use serde::{Deserialize, Serialize};

use crate::error::{HelloError, HelloResult};

pub const DEFAULT_SUBJECT: &str = "world";
pub const DEFAULT_PHRASE: &str = "...threads are busy async bees...hello ";
pub const DEFAULT_LOUDER_SUFFIX: &str = "!!!!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Greeting {
    /// Who gets greeted
    pub subject: String,
    /// Text placed before the subject
    pub phrase: String,
    /// Appended when not emphasized
    pub calm_suffix: String,
    /// Appended when emphasized
    pub louder_suffix: String,
}

impl Default for Greeting {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            phrase: DEFAULT_PHRASE.to_string(),
            calm_suffix: String::new(),
            louder_suffix: DEFAULT_LOUDER_SUFFIX.to_string(),
        }
    }
}

impl Greeting {
    pub fn with_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Render the greeting. Pure and deterministic.
    pub fn render(&self, emphasize: bool) -> HelloResult<String> {
        if self.subject.trim().is_empty() {
            return Err(HelloError::computation("greeting subject must not be empty"));
        }

        let suffix = if emphasize {
            &self.louder_suffix
        } else {
            &self.calm_suffix
        };

        let mut out =
            String::with_capacity(self.phrase.len() + self.subject.len() + suffix.len());
        out.push_str(&self.phrase);
        out.push_str(&self.subject);
        out.push_str(suffix);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_render() {
        let text = Greeting::default().render(false).unwrap();
        assert_eq!(text, "...threads are busy async bees...hello world");
        assert!(!text.ends_with('!'));
    }

    #[test]
    fn test_louder_only_changes_suffix() {
        let greeting = Greeting::default();
        let calm = greeting.render(false).unwrap();
        let loud = greeting.render(true).unwrap();

        assert!(loud.starts_with(&calm));
        assert_eq!(&loud[calm.len()..], "!!!!");
    }

    #[test]
    fn test_render_is_deterministic() {
        let greeting = Greeting::with_subject("bees");
        assert_eq!(greeting.render(true).unwrap(), greeting.render(true).unwrap());
    }

    #[test]
    fn test_empty_subject_is_an_error() {
        let err = Greeting::with_subject("  ").render(false).unwrap_err();
        assert!(matches!(err, HelloError::Computation(_)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let greeting: Greeting = toml::from_str(r#"subject = "moon""#).unwrap();
        assert_eq!(greeting.subject, "moon");
        assert_eq!(greeting.phrase, DEFAULT_PHRASE);
        assert_eq!(greeting.louder_suffix, DEFAULT_LOUDER_SUFFIX);
    }
}
