//! Property tests for content-addressed commit IDs.

use chrono::{TimeZone, Utc};
use dbgraph::objects::EntryType;
use dbgraph::{Commit, Oid, Signature, Tree, TreeEntry};
use proptest::prelude::*;

fn build(data: &[u8], message: &str, seconds: i64, parent: Option<Oid>) -> Commit {
    build_signed(
        data,
        message,
        seconds,
        parent,
        Signature::new("Ann Example", "ann@example.org"),
        None,
    )
}

fn build_signed(
    data: &[u8],
    message: &str,
    seconds: i64,
    parent: Option<Oid>,
    author: Signature,
    committer: Option<Signature>,
) -> Commit {
    let at = Utc.timestamp_opt(seconds, 0).unwrap();
    let entry = TreeEntry::new(
        EntryType::Database,
        "birds.sqlite",
        dbgraph::sha256(data),
        data.len() as u64,
        at,
        None,
    );
    let builder = Commit::builder(Tree::single(entry))
        .maybe_parent(parent)
        .author(author)
        .message(message)
        .timestamp(at);
    match committer {
        Some(committer) => builder.committer(committer).build(),
        None => builder.build(),
    }
}

proptest! {
    #[test]
    fn commit_id_is_deterministic(
        data in prop::collection::vec(any::<u8>(), 0..256),
        message in ".{0,64}",
        seconds in 0i64..4_000_000_000,
    ) {
        let a = build(&data, &message, seconds, None);
        let b = build(&data, &message, seconds, None);
        prop_assert_eq!(a.id(), b.id());
        prop_assert!(a.verify());
    }

    #[test]
    fn commit_id_covers_every_field(
        data in prop::collection::vec(any::<u8>(), 1..256),
        message in "[a-z ]{0,32}",
        seconds in 0i64..4_000_000_000,
    ) {
        let base = build(&data, &message, seconds, None);

        let mut other = data.clone();
        other[0] ^= 1;
        let c1 = build(&other, &message, seconds, None);
        prop_assert_ne!(c1.id(), base.id());
        let c2 = build(&data, &format!("{}!", message), seconds, None);
        prop_assert_ne!(c2.id(), base.id());
        let c3 = build(&data, &message, seconds + 1, None);
        prop_assert_ne!(c3.id(), base.id());
        let c4 = build(&data, &message, seconds, Some(*base.id()));
        prop_assert_ne!(c4.id(), base.id());
    }

    #[test]
    fn commit_id_covers_every_signature_field(
        name in ".{0,24}",
        email in ".{0,24}",
        extra in "[a-z<> \n]{1,8}",
        seconds in 0i64..4_000_000_000,
    ) {
        let sign = |author: Signature, committer: Option<Signature>| {
            *build_signed(b"v1", "msg", seconds, None, author, committer).id()
        };
        let base = sign(Signature::new(name.clone(), email.clone()), None);

        prop_assert_ne!(sign(Signature::new(format!("{name}{extra}"), email.clone()), None), base);
        prop_assert_ne!(sign(Signature::new(name.clone(), format!("{email}{extra}")), None), base);
        // moving text between name and email changes the ID
        prop_assert_ne!(
            sign(Signature::new(format!("{name}{extra}"), email.clone()), None),
            sign(Signature::new(name.clone(), format!("{extra}{email}")), None)
        );

        let signed = sign(
            Signature::new(name.clone(), email.clone()),
            Some(Signature::new(name.clone(), email.clone())),
        );
        prop_assert_ne!(signed, base);
        prop_assert_ne!(
            sign(
                Signature::new(name.clone(), email.clone()),
                Some(Signature::new(format!("{name}{extra}"), email.clone())),
            ),
            signed
        );
        prop_assert_ne!(
            sign(
                Signature::new(name.clone(), email.clone()),
                Some(Signature::new(name.clone(), format!("{email}{extra}"))),
            ),
            signed
        );
    }

    #[test]
    fn stored_commit_keeps_its_id(
        data in prop::collection::vec(any::<u8>(), 0..64),
        message in ".{0,32}",
    ) {
        let commit = build(&data, &message, 1_700_000_000, None);
        let json = serde_json::to_string(&commit).unwrap();
        let back: Commit = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.id(), commit.id());
        prop_assert!(back.verify());
    }
}

/// An author email shaped like a committer line hashes differently from a
/// real committer.
#[test]
fn test_author_email_cannot_imitate_committer() {
    let real = build_signed(
        b"v1",
        "same",
        1_704_067_200,
        None,
        Signature::new("N", "e"),
        Some(Signature::new("N", "e")),
    );
    let forged = build_signed(
        b"v1",
        "same",
        1_704_067_200,
        None,
        Signature::new("N", "e> 2024-01-01T00:00:00Z\ncommitter N <e"),
        None,
    );
    assert_ne!(real.id(), forged.id());
    assert!(real.verify());
    assert!(forged.verify());
}

#[test]
fn test_tampered_commit_fails_verification() {
    let commit = build(b"v1", "first", 0, None);
    let json = serde_json::to_string(&commit).unwrap();
    let tampered = json.replace("first", "forged");
    let back: Commit = serde_json::from_str(&tampered).unwrap();

    assert_eq!(back.id(), commit.id());
    assert!(!back.verify());
}
