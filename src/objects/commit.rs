//! Commit object implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::oid::Oid;
use super::tree::Tree;
use crate::infra::hash;

/// A signature identifying an author, committer, tagger or releaser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// The display name of the person.
    name: String,
    /// The email address.
    email: String,
}

impl Signature {
    /// Creates a new Signature.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the email address.
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// An immutable snapshot of a database.
///
/// The ID is the content hash of every other field, so a commit is never
/// mutated after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    id: Oid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<Oid>,
    author: Signature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    committer: Option<Signature>,
    message: String,
    timestamp: DateTime<Utc>,
    tree: Tree,
}

impl Commit {
    /// Starts building a commit recording `tree`.
    pub fn builder(tree: Tree) -> CommitBuilder {
        CommitBuilder {
            tree,
            parent: None,
            author: Signature::new("", ""),
            committer: None,
            message: String::new(),
            timestamp: None,
        }
    }

    /// Returns the commit ID.
    pub fn id(&self) -> &Oid {
        &self.id
    }

    /// Returns the parent commit ID, `None` for a root commit.
    pub fn parent(&self) -> Option<&Oid> {
        self.parent.as_ref()
    }

    /// Returns the author signature.
    pub fn author(&self) -> &Signature {
        &self.author
    }

    /// Returns the committer signature, if it differs from the author.
    pub fn committer(&self) -> Option<&Signature> {
        self.committer.as_ref()
    }

    /// Returns the commit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the first line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Returns the commit time (UTC).
    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    /// Returns the tree recorded by this commit.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns `true` if this commit has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if the stored ID matches the content.
    pub fn verify(&self) -> bool {
        self.tree.verify() && hash::commit_id(self) == self.id
    }
}

/// Builder for [`Commit`]; `build` computes the content-addressed ID.
#[derive(Debug, Clone)]
pub struct CommitBuilder {
    tree: Tree,
    parent: Option<Oid>,
    author: Signature,
    committer: Option<Signature>,
    message: String,
    timestamp: Option<DateTime<Utc>>,
}

impl CommitBuilder {
    /// Sets the parent commit.
    pub fn parent(mut self, parent: Oid) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets or clears the parent commit.
    pub fn maybe_parent(mut self, parent: Option<Oid>) -> Self {
        self.parent = parent;
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: Signature) -> Self {
        self.author = author;
        self
    }

    /// Sets the committer.
    pub fn committer(mut self, committer: Signature) -> Self {
        self.committer = Some(committer);
        self
    }

    /// Sets the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the timestamp. Defaults to now.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Finishes the commit.
    pub fn build(self) -> Commit {
        let mut commit = Commit {
            id: Oid::from_bytes([0; 32]),
            parent: self.parent,
            author: self.author,
            committer: self.committer,
            message: self.message,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            tree: self.tree,
        };
        commit.id = hash::commit_id(&commit);
        commit
    }
}
