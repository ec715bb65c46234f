//! Concurrent mutation of the shared rule store.

mod common;

use std::sync::Arc;

use std::time::Duration;

use nat_webui::rules::{encode, RulePatch, RuleRecord, RuleStore};

async fn seeded_store(dir: &tempfile::TempDir) -> Arc<RuleStore> {
    let path = dir.path().join("nat.conf");
    std::fs::write(&path, common::SEED_RULES).unwrap();
    Arc::new(RuleStore::open(path).await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_remove_each_rule_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.delete_at(0).await }));
    }

    let mut removed = Vec::new();
    let mut failed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(rule) => removed.push(rule.start_port),
            Err(_) => failed += 1,
        }
    }

    removed.sort_unstable();
    assert_eq!(removed, vec![2222, 8080, 9000]);
    assert_eq!(failed, 2);
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_whole_snapshots_during_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for port in 1..=50u16 {
                let patch = RulePatch {
                    start_port: Some(port),
                    end_port: Some(Some(port)),
                    ..RulePatch::default()
                };
                store.edit_at(0, &patch).await.unwrap();
                store.persist_then_reload().await.unwrap();
            }
        })
    };

    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let snapshot = store.list();
                assert_eq!(snapshot.len(), 3);
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(store.list()[0].start_port, 50);
    let on_disk = std::fs::read_to_string(store.path()).unwrap();
    assert!(on_disk.starts_with("SINGLE,50,50,10.0.0.5\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_save_is_not_split_by_queued_delete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nat.conf");
    let big: String = (1..=20_000u32)
        .map(|i| format!("SINGLE,{i},{i},10.0.{}.{}\n", i / 250, i % 250))
        .collect();
    std::fs::write(&path, big).unwrap();
    let store = Arc::new(RuleStore::open(path.clone()).await.unwrap());

    let submitted: Vec<RuleRecord> = (1..=5u16)
        .map(|i| RuleRecord::single(1000 + i, format!("10.1.0.{i}"), None).unwrap())
        .collect();

    // Keep the lock busy writing the large file so both requests queue.
    let persist = {
        let store = store.clone();
        tokio::spawn(async move { store.persist().await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let save = {
        let store = store.clone();
        let rules = submitted.clone();
        tokio::spawn(async move { store.replace_and_persist(rules).await })
    };
    tokio::time::sleep(Duration::from_millis(2)).await;

    let delete = {
        let store = store.clone();
        tokio::spawn(async move { store.delete_at(0).await })
    };

    persist.await.unwrap().unwrap();
    save.await.unwrap().unwrap();
    delete.await.unwrap().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), encode(&submitted));

    let rules = store.list();
    assert!(
        *rules == submitted || *rules == submitted[1..],
        "unexpected rules after save: {} entries",
        rules.len()
    );
}
