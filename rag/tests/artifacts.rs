//! Integration tests for saving and restoring built corpora.

mod common;

use common::{SKY_DOCUMENT, ScriptedGenerator, VocabularyEmbedder};
use docqa_rag::{ArtifactKey, ArtifactStore, Rag, RagConfig, RagError, RedbStore, RkyvStore};
use tempfile::tempdir;

fn rag() -> Rag<VocabularyEmbedder, ScriptedGenerator> {
    Rag::builder(VocabularyEmbedder::sky(), ScriptedGenerator::replying("ok"))
        .config(RagConfig::builder().window(4).build())
        .build()
        .unwrap()
}

async fn round_trip(store: &dyn ArtifactStore) {
    let key = ArtifactKey::new("alice", "sky.txt").unwrap();

    let original = rag();
    let built = original.ingest(SKY_DOCUMENT.as_bytes()).await.unwrap();
    let exported = original.export(store, &key).unwrap();
    assert_eq!(exported, built);

    let restored = rag();
    let report = restored.restore(store, &key).await.unwrap();
    assert_eq!(report.fingerprint, built.fingerprint);
    assert_eq!(report.chunks, 3);

    let hits = restored.retrieve("What color is the sky?", 3).await.unwrap();
    let expected = original.retrieve("What color is the sky?", 3).await.unwrap();
    assert_eq!(hits, expected);
}

#[tokio::test]
async fn rkyv_round_trip() {
    let dir = tempdir().unwrap();
    round_trip(&RkyvStore::new(dir.path())).await;
}

#[tokio::test]
async fn redb_round_trip() {
    let dir = tempdir().unwrap();
    round_trip(&RedbStore::new(dir.path().join("artifacts.redb")).unwrap()).await;
}

#[tokio::test]
async fn restore_does_not_re_embed_chunks() {
    let dir = tempdir().unwrap();
    let store = RkyvStore::new(dir.path());
    let key = ArtifactKey::new("alice", "sky.txt").unwrap();

    let original = rag();
    original.ingest(SKY_DOCUMENT.as_bytes()).await.unwrap();
    original.export(&store, &key).unwrap();

    let restored = rag();
    restored.restore(&store, &key).await.unwrap();
    assert_eq!(restored.embedding_model().calls(), 0);

    restored.ask("sky").await.unwrap();
    assert_eq!(restored.embedding_model().calls(), 1);
}

#[tokio::test]
async fn export_without_document() {
    let dir = tempdir().unwrap();
    let store = RkyvStore::new(dir.path());
    let key = ArtifactKey::new("alice", "sky.txt").unwrap();

    assert!(matches!(
        rag().export(&store, &key),
        Err(RagError::NoCorpus)
    ));
}

#[tokio::test]
async fn restore_missing_artifact_keeps_current_document() {
    let dir = tempdir().unwrap();
    let store = RkyvStore::new(dir.path());
    let rag = rag();
    rag.ingest(SKY_DOCUMENT.as_bytes()).await.unwrap();

    let key = ArtifactKey::new("alice", "missing.txt").unwrap();
    assert!(matches!(
        rag.restore(&store, &key).await,
        Err(RagError::ArtifactNotFound(_))
    ));
    assert_eq!(rag.corpus_info().unwrap().chunks, 3);
}

#[tokio::test]
async fn restore_with_other_model_is_rejected() {
    let dir = tempdir().unwrap();
    let store = RedbStore::new(dir.path().join("artifacts.redb")).unwrap();
    let key = ArtifactKey::new("alice", "sky.txt").unwrap();

    let original = rag();
    original.ingest(SKY_DOCUMENT.as_bytes()).await.unwrap();
    original.export(&store, &key).unwrap();

    let other = Rag::builder(
        VocabularyEmbedder::new(&["only", "three", "words"]),
        ScriptedGenerator::replying("ok"),
    )
    .build()
    .unwrap();

    let err = other.restore(&store, &key).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 3,
            actual: 10
        }
    ));
    assert!(other.corpus_info().is_none());
}
