//! Content addressing for trees and commits (SHA-256).

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::objects::{Commit, Oid, TreeEntry};

/// Computes the SHA-256 hash of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Oid {
    Oid::from_bytes(Sha256::digest(data).into())
}

/// Canonical timestamp rendering used inside hashed content.
fn canonical_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Feeds one field into `hasher` as a big-endian `u64` length followed by
/// the field bytes, so no value can run into its neighbour.
fn field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Feeds an optional field: a presence byte, then the field when present.
fn optional_field(hasher: &mut Sha256, bytes: Option<&[u8]>) {
    match bytes {
        Some(bytes) => {
            hasher.update([1]);
            field(hasher, bytes);
        }
        None => hasher.update([0]),
    }
}

/// Computes the ID of a tree from its entries.
///
/// The entry count comes first, then for each entry the length-prefixed
/// fields `type`, `licence` (optional), `sha256`, `name`, `last modified`
/// and `size`.
pub fn tree_id(entries: &[TreeEntry]) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update((entries.len() as u64).to_be_bytes());
    for entry in entries {
        field(&mut hasher, entry.entry_type().as_str().as_bytes());
        let licence = entry.licence().map(Oid::to_hex);
        optional_field(&mut hasher, licence.as_deref().map(str::as_bytes));
        field(&mut hasher, entry.sha256().to_hex().as_bytes());
        field(&mut hasher, entry.name().as_bytes());
        field(&mut hasher, canonical_time(entry.last_modified()).as_bytes());
        hasher.update(entry.size().to_be_bytes());
    }
    Oid::from_bytes(hasher.finalize().into())
}

/// Computes the ID of a commit from every field except its own ID.
///
/// Fields are hashed in order, each length-prefixed: `"commit"`, tree ID,
/// parent (optional), author name, author email, committer name and email
/// (optional), timestamp, message. Optional fields carry a presence byte, so
/// a commit without a committer never hashes like one with a committer.
pub fn commit_id(commit: &Commit) -> Oid {
    let mut hasher = Sha256::new();
    field(&mut hasher, b"commit");
    field(&mut hasher, commit.tree().id().to_hex().as_bytes());
    let parent = commit.parent().map(Oid::to_hex);
    optional_field(&mut hasher, parent.as_deref().map(str::as_bytes));

    let author = commit.author();
    field(&mut hasher, author.name().as_bytes());
    field(&mut hasher, author.email().as_bytes());
    match commit.committer() {
        Some(committer) => {
            hasher.update([1]);
            field(&mut hasher, committer.name().as_bytes());
            field(&mut hasher, committer.email().as_bytes());
        }
        None => hasher.update([0]),
    }

    field(&mut hasher, canonical_time(commit.timestamp()).as_bytes());
    field(&mut hasher, commit.message().as_bytes());
    Oid::from_bytes(hasher.finalize().into())
}
