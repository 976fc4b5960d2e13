//! Safe removal of history: isolation checks and orphan detection.

use std::collections::HashSet;

use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::log::Walker;
use crate::objects::{CommitMap, Oid};
use crate::refs::{BranchMap, ReleaseMap, TagMap};
use crate::store::{Documents, Versioned};

/// Works out which of `dropped` can be deleted when branch `branch` stops
/// reaching them.
///
/// Every other branch is walked to completion. Fails with
/// `Error::IsolationConflict` naming each tag and release whose commit is in
/// `dropped` and reachable from no other branch. Otherwise returns the
/// dropped commits no other branch reaches, sorted.
pub(crate) fn plan(
    walker: &Walker<'_>,
    branches: &BranchMap,
    tags: &TagMap,
    releases: &ReleaseMap,
    branch: &str,
    dropped: &HashSet<Oid>,
) -> Result<Vec<Oid>> {
    let mut elsewhere = HashSet::new();
    for (name, other) in branches {
        if name == branch {
            continue;
        }
        elsewhere.extend(walker.commit_ids(other.commit())?);
    }

    let isolated = |commit: &Oid| dropped.contains(commit) && !elsewhere.contains(commit);

    let isolated_tags: Vec<String> = tags
        .iter()
        .filter(|(_, tag)| isolated(tag.commit()))
        .map(|(name, _)| name.clone())
        .collect();
    let isolated_releases: Vec<String> = releases
        .iter()
        .filter(|(_, release)| isolated(release.commit()))
        .map(|(name, _)| name.clone())
        .collect();

    if !isolated_tags.is_empty() || !isolated_releases.is_empty() {
        return Err(Error::IsolationConflict {
            tags: isolated_tags,
            releases: isolated_releases,
        });
    }

    let mut orphans: Vec<Oid> = dropped.difference(&elsewhere).copied().collect();
    orphans.sort();
    debug!(branch, dropped = dropped.len(), orphans = orphans.len(), "planned history removal");
    Ok(orphans)
}

/// Stores the new branch map, then deletes `orphans` from the commit map.
///
/// `tags` and `releases` are the versions [`plan`] checked. They are written
/// back unchanged before any commit is deleted, so a tag or release created
/// meanwhile by another writer makes one side fail with
/// `Error::ConcurrentModification`. Creating a tag or release touches the
/// commit map for the same reason. If anything after the branch write
/// fails, the branch map is put back to `previous`.
pub(crate) fn apply(
    docs: &Documents<'_>,
    previous: &BranchMap,
    branches: &Versioned<BranchMap>,
    tags: &Versioned<TagMap>,
    releases: &Versioned<ReleaseMap>,
    commits: Versioned<CommitMap>,
    orphans: &[Oid],
) -> Result<()> {
    let version = docs.put_branches(&branches.value, branches.version)?;
    if orphans.is_empty() {
        return Ok(());
    }

    if let Err(e) = remove_orphans(docs, tags, releases, commits, orphans) {
        warn!(repo = %docs.repo(), error = %e, "history removal interrupted, restoring branches");
        if let Err(restore) = docs.put_branches(previous, version) {
            error!(repo = %docs.repo(), error = %restore, "failed to restore branches");
        }
        return Err(e);
    }
    Ok(())
}

fn remove_orphans(
    docs: &Documents<'_>,
    tags: &Versioned<TagMap>,
    releases: &Versioned<ReleaseMap>,
    mut commits: Versioned<CommitMap>,
    orphans: &[Oid],
) -> Result<()> {
    docs.put_tags(&tags.value, tags.version)?;
    docs.put_releases(&releases.value, releases.version)?;
    for id in orphans {
        commits.value.remove(id);
    }
    docs.put_commits(&commits.value, commits.version)?;
    Ok(())
}
