//! Tests for StateManager

use super::*;
use tempfile::tempdir;

const STREAM: &str = "video_time_updates";

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path().to_str().unwrap(), "/tmp/test-state.json");
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
}

#[test]
fn test_from_file_nonexistent_is_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("missing.json")).unwrap();
    assert!(!manager.is_in_memory());
}

#[test]
fn test_from_json() {
    let manager = StateManager::from_json(
        r#"{"streams": {"video_time_updates": {"replication_key_value": "2022-03-15T06:00:02+00:00"}}}"#,
    )
    .unwrap();
    assert!(manager.is_in_memory());

    let value = tokio_block_on(manager.replication_value(STREAM));
    assert_eq!(value, Some("2022-03-15T06:00:02+00:00".to_string()));
}

#[test]
fn test_from_json_invalid() {
    assert!(StateManager::from_json("{ invalid json }").is_err());
}

// ============================================================================
// Replication Value Tests
// ============================================================================

#[tokio::test]
async fn test_advance_and_read() {
    let manager = StateManager::in_memory();

    assert!(manager.replication_value(STREAM).await.is_none());

    manager
        .advance(STREAM, "2022-03-15T01:00:02+00:00")
        .await
        .unwrap();

    assert_eq!(
        manager.replication_value(STREAM).await,
        Some("2022-03-15T01:00:02+00:00".to_string())
    );
}

#[tokio::test]
async fn test_advance_rejects_earlier_value() {
    let manager = StateManager::in_memory();

    manager
        .advance(STREAM, "2022-03-15T02:00:02+00:00")
        .await
        .unwrap();

    let result = manager.advance(STREAM, "2022-03-15T01:00:02+00:00").await;
    assert!(result.is_err());

    assert_eq!(
        manager.replication_value(STREAM).await,
        Some("2022-03-15T02:00:02+00:00".to_string())
    );
}

#[tokio::test]
async fn test_overwrite_allows_earlier_value() {
    let manager = StateManager::in_memory();

    manager
        .advance(STREAM, "2022-03-15T23:00:00+00:00")
        .await
        .unwrap();

    // A full-refresh commit may rewind the cursor
    manager
        .overwrite(STREAM, "2022-03-15T01:00:00+00:00")
        .await
        .unwrap();

    assert_eq!(
        manager.replication_value(STREAM).await,
        Some("2022-03-15T01:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn test_overwrite_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::from_file(&path).unwrap();
    manager
        .overwrite(STREAM, "2022-03-15T01:00:00+00:00")
        .await
        .unwrap();

    let manager2 = StateManager::from_file(&path).unwrap();
    assert_eq!(
        manager2.replication_value(STREAM).await,
        Some("2022-03-15T01:00:00+00:00".to_string())
    );
}

#[tokio::test]
async fn test_multiple_streams() {
    let manager = StateManager::in_memory();

    manager.advance("a", "2022-03-15T02:00:00Z").await.unwrap();
    manager.advance("b", "2022-03-15T01:00:00Z").await.unwrap();

    assert_eq!(
        manager.replication_value("a").await,
        Some("2022-03-15T02:00:00Z".to_string())
    );
    assert_eq!(
        manager.replication_value("b").await,
        Some("2022-03-15T01:00:00Z".to_string())
    );
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_advance_persists_before_returning() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::from_file(&path).unwrap();
    manager
        .advance(STREAM, "2022-03-15T01:00:02+00:00")
        .await
        .unwrap();

    // A fresh manager reading the same file sees the committed value.
    let manager2 = StateManager::from_file(&path).unwrap();
    assert_eq!(
        manager2.replication_value(STREAM).await,
        Some("2022-03-15T01:00:02+00:00".to_string())
    );
}

#[tokio::test]
async fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::in_memory();
    manager
        .advance(STREAM, "2022-03-16T00:00:02+00:00")
        .await
        .unwrap();
    manager.save_to_file(&path).await.unwrap();

    let manager2 = StateManager::new(&path);
    manager2.load().await.unwrap();

    assert_eq!(
        manager2.replication_value(STREAM).await,
        Some("2022-03-16T00:00:02+00:00".to_string())
    );
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");

    let manager = StateManager::new(&path);
    // Should not error on nonexistent file
    manager.load().await.unwrap();

    assert!(manager.replication_value(STREAM).await.is_none());
}

#[tokio::test]
async fn test_save_in_memory_noop() {
    let manager = StateManager::in_memory();
    manager.advance(STREAM, "2022-03-15T01:00:02Z").await.unwrap();
    // Should not error
    manager.save().await.unwrap();
}

#[tokio::test]
async fn test_load_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.json");

    tokio::fs::write(&path, "{ invalid json }").await.unwrap();

    let manager = StateManager::new(&path);
    let result = manager.load().await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_no_leftover_temp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::from_file(&path).unwrap();
    manager.advance(STREAM, "2022-03-15T01:00:02Z").await.unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("state.tmp").exists());
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[tokio::test]
async fn test_snapshot_shape() {
    let manager = StateManager::in_memory();
    manager
        .advance(STREAM, "2022-03-16T00:00:02+00:00")
        .await
        .unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(
        snapshot,
        serde_json::json!({
            "streams": {
                "video_time_updates": {
                    "replication_key_value": "2022-03-16T00:00:02+00:00"
                }
            }
        })
    );
}

// ============================================================================
// State Access Tests
// ============================================================================

#[tokio::test]
async fn test_state_read_access() {
    let manager = StateManager::in_memory();
    manager.advance(STREAM, "2022-03-15T01:00:02Z").await.unwrap();

    let state = manager.state().await;
    assert_eq!(state.replication_value(STREAM), Some("2022-03-15T01:00:02Z"));
}

// ============================================================================
// Clone Tests
// ============================================================================

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let cloned = manager.clone();

    manager.advance(STREAM, "2022-03-15T01:00:02Z").await.unwrap();

    // Clone should see the same state
    assert_eq!(
        cloned.replication_value(STREAM).await,
        Some("2022-03-15T01:00:02Z".to_string())
    );
}

/// Run a future to completion on a fresh runtime (for non-async tests)
fn tokio_block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}
