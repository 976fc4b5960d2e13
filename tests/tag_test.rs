//! Integration tests for tags and releases.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::*;
use dbgraph::error::RefKind;
use dbgraph::{Engine, Error, ErrorKind, MemoryStore, Upload};

// =============================================================================
// Tags
// =============================================================================

#[test]
fn test_create_tag_records_tagger() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let ids = append(&repo, "master", 1, 2);

    let tag = repo.create_tag("v1", &ids[0], "first survey", &bob()).unwrap();

    assert_eq!(tag.commit(), &ids[0]);
    assert_eq!(tag.description(), "first survey");
    assert_eq!(tag.tagger().name(), "Bob Example");
    assert_eq!(tag.tagger().email(), "bob@example.org");
    assert_eq!(repo.tag("v1").unwrap(), tag);
}

#[test]
fn test_create_tag_errors() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    repo.create_tag("v1", &root, "", &ann()).unwrap();

    assert!(matches!(
        repo.create_tag("v1", &root, "", &ann()),
        Err(Error::RefAlreadyExists { kind: RefKind::Tag, .. })
    ));
    let ghost = dbgraph::sha256(b"ghost");
    let err = repo.create_tag("v2", &ghost, "", &ann()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidReference);
    assert!(matches!(
        repo.create_tag("bad:name", &root, "", &ann()),
        Err(Error::InvalidRefName(_))
    ));
    assert_eq!(repo.tags().unwrap().len(), 1);
}

/// Renaming keeps the target, tagger and date.
#[test]
fn test_update_tag_renames() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    let original = repo.create_tag("v1", &root, "old", &ann()).unwrap();

    let updated = repo.update_tag("v1", "v1.0", "new", &bob()).unwrap();

    assert_eq!(updated.description(), "new");
    assert_eq!(updated.commit(), original.commit());
    assert_eq!(updated.tagger(), original.tagger());
    assert_eq!(updated.date(), original.date());
    assert!(matches!(
        repo.tag("v1"),
        Err(Error::RefNotFound { kind: RefKind::Tag, .. })
    ));
    assert_eq!(repo.tag("v1.0").unwrap(), updated);
}

#[test]
fn test_update_tag_description_only() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    repo.create_tag("v1", &root, "old", &ann()).unwrap();

    repo.update_tag("v1", "v1", "new", &ann()).unwrap();

    let tags = repo.tags().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags["v1"].description(), "new");
}

#[test]
fn test_update_tag_errors() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    repo.create_tag("a", &root, "", &ann()).unwrap();
    repo.create_tag("b", &root, "", &ann()).unwrap();

    assert!(matches!(
        repo.update_tag("missing", "c", "", &ann()),
        Err(Error::RefNotFound { .. })
    ));
    assert!(matches!(
        repo.update_tag("a", "b", "", &ann()),
        Err(Error::RefAlreadyExists { .. })
    ));
    assert_eq!(repo.tags().unwrap().len(), 2);
}

#[test]
fn test_delete_tag() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    repo.create_tag("v1", &root, "", &ann()).unwrap();
    let commits = repo.commits().unwrap();

    repo.delete_tag("v1", &ann()).unwrap();

    assert!(repo.tags().unwrap().is_empty());
    // removing a name never touches history
    assert_eq!(repo.commits().unwrap(), commits);
    assert!(matches!(
        repo.delete_tag("v1", &ann()),
        Err(Error::RefNotFound { .. })
    ));
}

// =============================================================================
// Releases
// =============================================================================

#[test]
fn test_create_release_sizes_from_tree() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let id = repo
        .commit_upload("master", Upload::new(DB, b"twelve bytes"), &ann())
        .unwrap();

    let release = repo.create_release("r1", &id, "notes", &bob()).unwrap();

    assert_eq!(release.size(), 12);
    assert_eq!(release.commit(), &id);
    assert_eq!(release.description(), "notes");
    assert_eq!(release.releaser().name(), "Bob Example");
    assert_eq!(repo.release("r1").unwrap(), release);
}

#[test]
fn test_create_release_sizes_from_blob_store() {
    let data = b"database bytes";
    let mut blobs = SizedBlobs::default();
    blobs.sizes.insert(dbgraph::sha256(data), 4096);
    let engine = Engine::new(Arc::new(MemoryStore::new())).with_blob_store(Arc::new(blobs));
    let repo = engine.init(repo_id(), Upload::new(DB, data), &ann()).unwrap();
    let root = head(&repo, "master");

    let release = repo.create_release("r1", &root, "", &ann()).unwrap();

    assert_eq!(release.size(), 4096);
}

#[test]
fn test_create_release_missing_blob() {
    let engine = Engine::new(Arc::new(MemoryStore::new()))
        .with_blob_store(Arc::new(SizedBlobs::default()));
    let repo = engine.init(repo_id(), upload(0), &ann()).unwrap();
    let root = head(&repo, "master");
    let sha = *repo.commit(&root).unwrap().tree().database().unwrap().sha256();

    let err = repo.create_release("r1", &root, "", &ann()).unwrap_err();

    assert!(matches!(err, Error::InvalidReference(id) if id == sha));
    assert!(repo.releases().unwrap().is_empty());
}

#[test]
fn test_update_and_delete_release() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    let original = repo.create_release("r1", &root, "old", &ann()).unwrap();

    let updated = repo.update_release("r1", "2024-q1", "new", &bob()).unwrap();
    assert_eq!(updated.description(), "new");
    assert_eq!(updated.size(), original.size());
    assert_eq!(updated.releaser(), original.releaser());
    assert_eq!(
        repo.releases().unwrap().keys().collect::<Vec<_>>(),
        vec!["2024-q1"]
    );

    repo.delete_release("2024-q1", &ann()).unwrap();
    assert!(repo.releases().unwrap().is_empty());
    assert!(matches!(
        repo.delete_release("2024-q1", &ann()),
        Err(Error::RefNotFound { kind: RefKind::Release, .. })
    ));
}

/// Tags and releases live in separate namespaces.
#[test]
fn test_tag_and_release_may_share_a_name() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");

    repo.create_tag("v1", &root, "", &ann()).unwrap();
    repo.create_release("v1", &root, "", &ann()).unwrap();

    assert_eq!(repo.tags().unwrap().len(), 1);
    assert_eq!(repo.releases().unwrap().len(), 1);
}

// =============================================================================
// Reachability
// =============================================================================

/// After any sequence of history edits, every tag and release still
/// points at a stored commit reachable from some branch.
#[test]
fn test_tags_stay_reachable_through_history_edits() {
    let (engine, _) = engine();
    let repo = init(&engine);
    let root = head(&repo, "master");
    let master = append(&repo, "master", 1, 3);
    repo.create_branch("dev", &master[0], "", &ann()).unwrap();
    let dev = append(&repo, "dev", 10, 2);
    repo.create_tag("m", &master[1], "", &ann()).unwrap();
    repo.create_release("d", &dev[0], "", &ann()).unwrap();

    // blocked: each would strand a name
    assert!(repo.rewind_branch("master", &master[0], &ann()).is_err());
    assert!(repo.delete_branch("dev", &ann()).is_err());

    // allowed: the tagged commits stay reachable
    repo.rewind_branch("master", &master[1], &ann()).unwrap();
    repo.rewind_branch("dev", &dev[0], &ann()).unwrap();
    repo.commit_upload_at("master", &master[1], upload(20), &ann())
        .unwrap();

    let commits = repo.commits().unwrap();
    let branches = repo.branches().unwrap();
    let mut reachable = BTreeMap::new();
    for (name, branch) in &branches {
        for commit in repo.history(name).unwrap() {
            reachable.insert(*commit.id(), name.clone());
        }
        assert!(commits.contains_key(branch.commit()));
    }
    for tag in repo.tags().unwrap().values() {
        assert!(reachable.contains_key(tag.commit()));
    }
    for release in repo.releases().unwrap().values() {
        assert!(reachable.contains_key(release.commit()));
    }
    // nothing unreachable is kept either
    assert_eq!(commits.len(), reachable.len());
    assert!(commits.contains_key(&root));
}
