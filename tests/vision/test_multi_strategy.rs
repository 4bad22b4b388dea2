// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Multi-strategy recognizer tests over real image files
//!
//! A scripted detector stands in for the OCR engine so each test controls
//! what every strategy reports.

use std::sync::Arc;
use std::time::Duration;

use handwriting_ocr_node::vision::{
    preprocessed_path, EngineError, MultiStrategyRecognizer, RecognizeError, NO_TEXT_DETECTED,
};

use crate::common::{item, png_bytes, write_png, ScriptedDetector};

fn recognizer(detector: &Arc<ScriptedDetector>) -> MultiStrategyRecognizer {
    MultiStrategyRecognizer::new(detector.clone())
}

#[tokio::test]
async fn test_runs_four_strategies_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::default());

    recognizer(&detector).recognize(&image).await.unwrap();

    let calls = detector.calls();
    assert_eq!(calls.len(), 4);

    let enhanced = preprocessed_path(&image);
    let expected = [
        (&image, 1.5f32),
        (&image, 2.0),
        (&enhanced, 1.5),
        (&enhanced, 2.0),
    ];
    for (call, (path, mag)) in calls.iter().zip(expected) {
        assert_eq!(&call.image, path);
        assert_eq!(call.options.mag_ratio, mag);
        assert!(!call.options.paragraph);
        assert!(call.image_existed);
    }
}

#[tokio::test]
async fn test_identical_detections_pick_first_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::repeating(vec![item("Dear Sir", 0.7)], 4));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "Dear Sir");
    assert_eq!(recognition.trace.len(), 4);
    assert!(recognition
        .trace
        .iter()
        .all(|c| (c.mean_confidence - 0.7).abs() < 1e-6));
}

#[tokio::test]
async fn test_single_strategy_with_text_wins_regardless_of_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![]),
        Ok(vec![]),
        Ok(vec![item("faint", 0.05)]),
        Ok(vec![]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "faint");
    assert_eq!(recognition.trace[2].strategy, "preprocessed_mag1.5");
}

#[tokio::test]
async fn test_no_text_anywhere_yields_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "blank.png");
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![]),
        Ok(vec![item("   ", 0.9)]),
        Err(EngineError::InvalidResponse("garbled".to_string())),
        Ok(vec![]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "(No text detected in image)");
    assert_eq!(recognition.text, NO_TEXT_DETECTED);
    assert!(recognition.is_empty());
}

#[tokio::test]
async fn test_higher_mean_confidence_wins() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![item("Hello", 0.4)]),
        Ok(vec![item("Hello", 0.5), item("World", 1.0)]),
        Ok(vec![item("Hell0", 0.6)]),
        Ok(vec![]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "Hello World");
    assert_eq!(recognition.trace[1].strategy, "original_mag2.0");
}

#[tokio::test]
async fn test_fragments_trimmed_and_joined() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::new(vec![Ok(vec![
        item(" hi", 0.9),
        item("there", 0.3),
    ])]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "hi there");
    assert!((recognition.trace[0].mean_confidence - 0.6).abs() < 1e-6);
}

#[tokio::test]
async fn test_tie_keeps_earliest_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![]),
        Ok(vec![item("first", 0.8)]),
        Ok(vec![item("second", 0.8)]),
        Ok(vec![item("third", 0.8)]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();
    assert_eq!(recognition.text, "first");
}

#[tokio::test]
async fn test_undecodable_image_falls_back_to_original_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("corrupt.png");
    std::fs::write(&image, b"\x89PNG but not really").unwrap();
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![item("from original", 0.3)]),
        Ok(vec![]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "from original");
    assert_eq!(recognition.trace.len(), 2);
    assert!(detector.calls().iter().all(|c| c.image == image));
}

#[tokio::test]
async fn test_unwritable_preprocessed_path_falls_back_to_original_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    // A directory squatting on the output path makes the PNG write fail
    let blocked = preprocessed_path(&image);
    std::fs::create_dir(&blocked).unwrap();
    let detector = Arc::new(ScriptedDetector::new(vec![
        Ok(vec![]),
        Ok(vec![item("from original", 0.4)]),
    ]));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert_eq!(recognition.text, "from original");
    let strategies: Vec<_> = recognition.trace.iter().map(|c| c.strategy.as_str()).collect();
    assert_eq!(strategies, vec!["original_mag1.5", "original_mag2.0"]);
    assert!(detector.calls().iter().all(|c| c.image == image));
    assert!(blocked.is_dir());
    assert!(image.exists());
}

#[tokio::test]
async fn test_preprocessed_file_removed_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::repeating(vec![item("ok", 0.9)], 4));

    recognizer(&detector).recognize(&image).await.unwrap();

    assert!(!preprocessed_path(&image).exists());
    assert!(image.exists());
}

#[tokio::test]
async fn test_preprocessed_file_removed_after_engine_failures() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "note.png");
    let detector = Arc::new(ScriptedDetector::new(
        (0..4)
            .map(|_| Err(EngineError::InvalidResponse("down".to_string())))
            .collect(),
    ));

    let recognition = recognizer(&detector).recognize(&image).await.unwrap();

    assert!(recognition.is_empty());
    assert!(!preprocessed_path(&image).exists());
}

#[tokio::test]
async fn test_missing_input_never_calls_engine() {
    let dir = tempfile::tempdir().unwrap();
    let detector = Arc::new(ScriptedDetector::default());

    let result = recognizer(&detector)
        .recognize(&dir.path().join("absent.png"))
        .await;

    assert!(matches!(result, Err(RecognizeError::InputNotFound(_))));
    assert!(detector.calls().is_empty());
}

#[tokio::test]
async fn test_directory_is_not_an_input() {
    let dir = tempfile::tempdir().unwrap();
    let detector = Arc::new(ScriptedDetector::default());

    let result = recognizer(&detector).recognize(dir.path()).await;
    assert!(matches!(result, Err(RecognizeError::InputNotFound(_))));
}

#[test]
fn test_abandoned_recognition_leaves_no_preprocessed_file() {
    // One blocking thread, so a task queued after the preprocessing job
    // only runs once that job and its output are gone
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("large.png");
    std::fs::write(&image, png_bytes(3000, 3000)).unwrap();
    let detector = Arc::new(ScriptedDetector::default());

    runtime.block_on(async {
        let outcome = tokio::time::timeout(
            Duration::from_millis(5),
            recognizer(&detector).recognize(&image),
        )
        .await;
        assert!(outcome.is_err(), "recognition finished before the timeout");

        tokio::task::spawn_blocking(|| ()).await.unwrap();
    });

    assert!(!preprocessed_path(&image).exists());
    assert!(detector.calls().is_empty());
    assert!(image.exists());
}
