mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use gbs_sync::{InMemoryMetrics, Operation, SyncOutcome, OPS_ERROR_TOTAL, OPS_TOTAL};
use gbs_types::{BundleOptions, RemoteRepoRef};

use common::{git, git_available, remote_tip, Fixture, OLD_DATE};

fn repo(url: &str) -> RemoteRepoRef {
    RemoteRepoRef::anonymous(url, "main")
}

#[tokio::test]
async fn push_is_idempotent() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", None);
    let tip = work.commit("b", None);
    let bundle = work.bundle("main");

    let engine = fx.engine();
    for _ in 0..2 {
        let mut body: &[u8] = &bundle;
        let outcome = engine.push(repo(&sink), &mut body).await;
        let receipt = outcome.success().expect("push succeeds");
        assert_eq!(receipt.head.as_deref(), Some(tip.as_str()));
        assert_eq!(receipt.bytes_received, bundle.len() as u64);
    }
    assert_eq!(remote_tip(&sink), tip);
}

#[tokio::test]
async fn partial_bundle_conflicts_until_prerequisite_arrives() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", None);
    let complete = work.bundle("main");
    let tip = work.commit("b", None);
    let partial = work.bundle("main~1..main");

    let engine = fx.engine();
    let mut body: &[u8] = &partial;
    let outcome = engine.push(repo(&sink), &mut body).await;
    assert!(matches!(outcome, SyncOutcome::Conflict(_)), "{outcome:?}");

    let mirror = engine.mirror(repo(&sink)).unwrap();
    assert!(!engine.registry().is_suspect(mirror.workdir()));

    let mut body: &[u8] = &complete;
    assert!(engine.push(repo(&sink), &mut body).await.is_success());

    let mut body: &[u8] = &partial;
    assert!(engine.push(repo(&sink), &mut body).await.is_success());
    assert_eq!(remote_tip(&sink), tip);
}

#[tokio::test]
async fn partial_bundle_conflicts_with_unrelated_history() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let sink = fx.bare("sink.git");
    let other = fx.work("other");
    let unrelated = other.commit("x", None);
    other.push_to(&sink);

    let work = fx.work("src");
    work.commit("a", None);
    work.commit("b", None);
    let partial = work.bundle("main~1..main");

    let engine = fx.engine();
    let mut body: &[u8] = &partial;
    let outcome = engine.push(repo(&sink), &mut body).await;
    assert!(matches!(outcome, SyncOutcome::Conflict(_)), "{outcome:?}");

    let mirror = engine.mirror(repo(&sink)).unwrap();
    assert!(mirror.exists_locally().await);
    assert!(!engine.registry().is_suspect(mirror.workdir()));
    assert_eq!(remote_tip(&sink), unrelated);
}

#[tokio::test]
async fn push_of_merge_with_two_prerequisites() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", None);
    work.commit("c", None);
    work.push_to(&sink);

    work.branch("side", "main~1");
    work.commit("d", None);
    work.checkout("main");
    let merge = work.merge("side", None);
    let bundle = work.bundle("main~1..main");

    let engine = fx.engine();
    let mut body: &[u8] = &bundle;
    let outcome = engine.push(repo(&sink), &mut body).await;
    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(remote_tip(&sink), merge);
}

#[tokio::test]
async fn window_cutting_through_a_merge_is_exported() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", Some(OLD_DATE));
    work.branch("side", "main");
    work.commit("b", Some(OLD_DATE));
    work.checkout("main");
    work.commit("c", Some(OLD_DATE));
    let merge = work.merge("side", None);
    work.push_to(&source);

    let engine = fx.engine();
    let recent = engine
        .pull(repo(&source), &BundleOptions::since(Duration::from_secs(86_400)))
        .await
        .success()
        .expect("pull succeeds");
    assert_eq!(recent.head.commit_id, merge);
    assert!(recent.is_partial);

    // The window only applies on top of a sink that already has both parents.
    let full = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    let mut body: &[u8] = &full.bytes;
    assert!(engine.push(repo(&sink), &mut body).await.is_success());
    let mut body: &[u8] = &recent.bytes;
    assert!(engine.push(repo(&sink), &mut body).await.is_success());
    assert_eq!(remote_tip(&sink), merge);
}

#[tokio::test]
async fn empty_remote_pull_has_no_commits() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("empty.git");
    let outcome = fx.engine().pull(repo(&source), &BundleOptions::default()).await;
    assert_eq!(outcome, SyncOutcome::NoContent("no commits".into()));
}

#[tokio::test]
async fn absent_remote_is_not_found() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let missing = fx.missing("nope.git");
    let engine = fx.engine();

    let outcome = engine.pull(repo(&missing), &BundleOptions::default()).await;
    assert!(matches!(outcome, SyncOutcome::NotFound(_)), "{outcome:?}");

    let work = fx.work("src");
    work.commit("a", None);
    let bundle = work.bundle("main");
    let mut body: &[u8] = &bundle;
    let outcome = engine.push(repo(&missing), &mut body).await;
    assert!(matches!(outcome, SyncOutcome::NotFound(_)), "{outcome:?}");
}

#[tokio::test]
async fn filter_covering_all_history_hashes_like_no_filter() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    let tip = work.commit("a", None);
    work.push_to(&source);

    let engine = fx.engine();
    let full = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    assert_eq!(full.head.commit_id, tip);
    assert!(!full.is_partial);

    let week = engine
        .pull(repo(&source), &BundleOptions::since(Duration::from_secs(7 * 86_400)))
        .await
        .success()
        .unwrap();
    assert_eq!(week.idempotency_hash, full.idempotency_hash);
    assert!(week.is_partial);

    let after = engine
        .pull(repo(&source), &BundleOptions::after(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()))
        .await
        .success()
        .unwrap();
    assert_eq!(after.idempotency_hash, full.idempotency_hash);
    assert!(after.is_partial);
}

#[tokio::test]
async fn window_older_than_history_has_nothing_new() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    work.commit("a", Some(OLD_DATE));
    work.push_to(&source);

    let outcome = fx
        .engine()
        .pull(repo(&source), &BundleOptions::since(Duration::from_secs(3600)))
        .await;
    match outcome {
        SyncOutcome::NoContent(reason) => assert!(reason.starts_with("no new commits since "), "{reason}"),
        other => panic!("expected no content, got {other:?}"),
    }
}

#[tokio::test]
async fn partial_pull_is_flagged_and_hashed_with_filter() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    work.commit("old", Some(OLD_DATE));
    let tip = work.commit("new", None);
    work.push_to(&source);

    let engine = fx.engine();
    let full = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    let recent = engine
        .pull(repo(&source), &BundleOptions::since(Duration::from_secs(86_400)))
        .await
        .success()
        .unwrap();
    assert_eq!(recent.head.commit_id, tip);
    assert!(recent.is_partial);
    assert_ne!(recent.idempotency_hash, full.idempotency_hash);
}

#[tokio::test]
async fn pulled_bundle_has_one_head() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    work.commit("a", None);
    work.push_to(&source);

    let pulled = fx.engine().pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    let file = fx.path().join("pulled.bundle");
    std::fs::write(&file, &pulled.bytes).unwrap();
    let listing = git(fx.path(), &["bundle", "list-heads", &file.to_string_lossy()], None);
    assert_eq!(listing.lines().count(), 1);
    assert_eq!(pulled.head.ref_name, "refs/heads/main");
}

#[tokio::test]
async fn pull_push_pull_round_trip() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", None);
    let tip = work.commit("b", None);
    work.push_to(&source);

    let engine = fx.engine();
    let pulled = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();

    let mut body: &[u8] = &pulled.bytes;
    assert!(engine.push(repo(&sink), &mut body).await.is_success());

    let back = engine.pull(repo(&sink), &BundleOptions::default()).await.success().unwrap();
    assert_eq!(back.head.commit_id, tip);
    assert_eq!(back.idempotency_hash, pulled.idempotency_hash);
}

#[tokio::test]
async fn pull_sees_new_commits_on_existing_mirror() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    work.commit("a", None);
    work.push_to(&source);

    let engine = fx.engine();
    let first = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();

    let tip = work.commit("b", None);
    work.push_to(&source);
    let second = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    assert_eq!(second.head.commit_id, tip);
    assert_ne!(second.idempotency_hash, first.idempotency_hash);
}

#[tokio::test]
async fn branches_of_one_remote_use_separate_mirrors() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    let main_tip = work.commit("a", None);
    work.push_to(&source);

    let engine = fx.engine();
    let main = engine.mirror(repo(&source)).unwrap();
    let dev = engine.mirror(RemoteRepoRef::anonymous(&source, "dev")).unwrap();
    assert_ne!(main.workdir(), dev.workdir());

    let outcome = engine.pull(RemoteRepoRef::anonymous(&source, "dev"), &BundleOptions::default()).await;
    assert_eq!(outcome, SyncOutcome::NoContent("no commits".into()));
    let pulled = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    assert_eq!(pulled.head.commit_id, main_tip);
}

#[tokio::test]
async fn suspect_mirror_is_rebuilt() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("source.git");
    let work = fx.work("src");
    let tip = work.commit("a", None);
    work.push_to(&source);

    let engine = fx.engine();
    assert!(engine.pull(repo(&source), &BundleOptions::default()).await.is_success());

    let mirror = engine.mirror(repo(&source)).unwrap();
    let marker = mirror.workdir().join("left-behind");
    std::fs::write(&marker, "x").unwrap();
    engine.registry().mark_suspect(mirror.workdir());

    let pulled = engine.pull(repo(&source), &BundleOptions::default()).await.success().unwrap();
    assert_eq!(pulled.head.commit_id, tip);
    assert!(!marker.exists());
}

#[tokio::test]
async fn concurrent_pushes_to_one_mirror_serialize() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let sink = fx.bare("sink.git");
    let work = fx.work("src");
    work.commit("a", None);
    let tip = work.commit("b", None);
    let bundle = Arc::new(work.bundle("main"));

    let engine = fx.engine();
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let bundle = Arc::clone(&bundle);
        let sink = sink.clone();
        tasks.push(tokio::spawn(async move {
            let mut body: &[u8] = &bundle;
            engine.push(repo(&sink), &mut body).await
        }));
    }
    for t in tasks {
        let outcome = t.await.unwrap();
        assert!(outcome.is_success(), "{outcome:?}");
    }
    assert_eq!(remote_tip(&sink), tip);
}

#[tokio::test]
async fn outcomes_are_counted() {
    if !git_available() {
        return;
    }
    let fx = Fixture::new();
    let source = fx.bare("empty.git");
    let missing = fx.missing("nope.git");
    let metrics = Arc::new(InMemoryMetrics::new());
    let engine = fx.engine().with_metrics(metrics.clone());

    engine.pull(repo(&source), &BundleOptions::default()).await;
    engine.pull(repo(&missing), &BundleOptions::default()).await;

    let s = metrics.snapshot();
    assert_eq!(s.get(OPS_TOTAL, Operation::Pull, &source), 1);
    assert_eq!(s.get(OPS_ERROR_TOTAL, Operation::Pull, &source), 0);
    assert_eq!(s.get(OPS_TOTAL, Operation::Pull, &missing), 1);
    assert_eq!(s.get(OPS_ERROR_TOTAL, Operation::Pull, &missing), 1);
}
