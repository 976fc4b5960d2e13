//! Tag representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::objects::{Oid, Signature};

/// An immutable named pointer to a single commit.
///
/// Its target commit must stay reachable from at least one branch head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// The commit this tag points to.
    commit: Oid,
    /// When the tag was created.
    date: DateTime<Utc>,
    /// The tag message.
    #[serde(default)]
    description: String,
    /// Who created the tag.
    tagger: Signature,
}

impl Tag {
    /// Creates a new Tag.
    pub fn new(
        commit: Oid,
        date: DateTime<Utc>,
        description: impl Into<String>,
        tagger: Signature,
    ) -> Self {
        Tag {
            commit,
            date,
            description: description.into(),
            tagger,
        }
    }

    /// Returns the target commit ID.
    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    /// Returns the creation date.
    pub fn date(&self) -> &DateTime<Utc> {
        &self.date
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tagger.
    pub fn tagger(&self) -> &Signature {
        &self.tagger
    }

    /// Returns a copy with a new description; target and tagger are kept.
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Tag {
            description: description.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_description_preserves_identity() {
        let tagger = Signature::new("Ann", "ann@example.org");
        let tag = Tag::new(Oid::from_bytes([7; 32]), Utc::now(), "first", tagger.clone());
        let updated = tag.with_description("second");

        assert_eq!(updated.description(), "second");
        assert_eq!(updated.commit(), tag.commit());
        assert_eq!(updated.tagger(), &tagger);
        assert_eq!(updated.date(), tag.date());
    }
}
