//! Integration tests for content propagation
//!
//! These tests validate how content moves through a pipe:
//! - Encoding and decoding between neighbouring buckets
//! - Selection relocation after structural edits
//! - Viewers rendering and submitting content
//! - Recoverable brick errors

mod common;

use brickpipe::pipe::{BrickError, BrickSpec, PipeError};
use brickpipe::Chain;
use common::builders::{caesar_spec, vigenere_spec, PipeBuilder};
use common::plugins::RecordingPresenter;
use common::{bucket_texts, run_local, settle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

#[tokio::test]
async fn test_chain_of_encoders() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .caesar(1)
            .caesar(2)
            .text()
            .content("abc", 0)
            .build();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["abc", "bcd", "def"]);

        pipe.set_content("xyz", 2, None).unwrap();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["uvw", "vwx", "xyz"]);
    })
    .await;
}

#[tokio::test]
async fn test_replacement_keeps_selected_plaintext() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .affine(7, 7)
            .text()
            .content("hello", 0)
            .build();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["hello", "ejggb"]);

        let affine = pipe.brick(1).unwrap();
        let vigenere = pipe.replace_brick(&affine, vigenere_spec("key")).unwrap();
        settle(&pipe).await;

        assert_eq!(vigenere.name(), "vigenere-cipher");
        assert_eq!(pipe.selected_bucket(), 0);
        assert_eq!(bucket_texts(&pipe), vec!["hello", "rijvs"]);
        assert!(affine.pipe().is_none());
    })
    .await;
}

#[tokio::test]
async fn test_replacement_below_selection_keeps_ciphertext() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .affine(7, 7)
            .text()
            .content("ejggb", 1)
            .build();
        settle(&pipe).await;
        assert_eq!(pipe.content(0).unwrap(), Chain::from("hello"));

        let affine = pipe.brick(1).unwrap();
        pipe.replace_brick(&affine, vigenere_spec("key")).unwrap();
        settle(&pipe).await;

        assert_eq!(pipe.selected_bucket(), 1);
        assert_eq!(bucket_texts(&pipe), vec!["ufiwx", "ejggb"]);
    })
    .await;
}

#[tokio::test]
async fn test_removing_selected_region_selects_predecessor() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .caesar(1)
            .caesar(2)
            .text()
            .content("xyz", 2)
            .build();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["uvw", "vwx", "xyz"]);

        let removed = pipe.splice_bricks(1, 2, Vec::new()).unwrap();
        settle(&pipe).await;

        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|b| b.pipe().is_none()));
        assert_eq!(pipe.selected_bucket(), 0);
        assert_eq!(bucket_texts(&pipe), vec!["uvw"]);
    })
    .await;
}

#[tokio::test]
async fn test_insert_before_selection_recomputes_front() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .caesar(1)
            .text()
            .caesar(2)
            .text()
            .content("abc", 2)
            .build();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["xyz", "yza", "abc"]);

        pipe.insert_brick(1, caesar_spec(3)).unwrap();
        settle(&pipe).await;

        assert_eq!(pipe.selected_bucket(), 3);
        assert_eq!(bucket_texts(&pipe), vec!["uvw", "xyz", "yza", "abc"]);
    })
    .await;
}

#[tokio::test]
async fn test_bucket_count_after_random_splices() {
    run_local(async {
        let pipe = PipeBuilder::new().text().content("the quick brown fox", 0).build();
        let mut rng = StdRng::seed_from_u64(0xb41c);

        for _ in 0..40 {
            let count = pipe.brick_count();
            let index = rng.gen_range(0..=count);
            let remove = rng.gen_range(0..=(count - index).min(2));
            let inputs = (0..rng.gen_range(0..3))
                .map(|_| match rng.gen_range(0..3) {
                    0 => BrickSpec::new("text"),
                    _ => caesar_spec(rng.gen_range(-5..=5)),
                })
                .map(Into::into)
                .collect();

            pipe.splice_bricks(index, remove, inputs).unwrap();
            assert_eq!(pipe.bucket_count(), pipe.encoder_count() + 1);
            assert!(pipe.selected_bucket() < pipe.bucket_count());
            settle(&pipe).await;
        }
    })
    .await;
}

#[tokio::test]
async fn test_viewer_renders_and_submits() {
    run_local(async {
        let pipe = PipeBuilder::new().text().caesar(1).text().build();
        let recorder = Rc::new(RecordingPresenter::default());
        let last = pipe.brick(2).unwrap();
        let viewer = last.as_viewer().unwrap();
        viewer.attach(recorder.clone()).await.unwrap();

        pipe.set_content("abc", 0, None).unwrap();
        settle(&pipe).await;
        assert_eq!(recorder.last().as_deref(), Some("bcd"));

        viewer.submit("zzz").unwrap();
        settle(&pipe).await;
        assert_eq!(pipe.selected_bucket(), 1);
        assert_eq!(pipe.content(0).unwrap(), Chain::from("yyy"));
        // The submitting viewer already shows what it sent.
        assert_eq!(recorder.last().as_deref(), Some("bcd"));
    })
    .await;
}

#[tokio::test]
async fn test_invalid_setting_is_recoverable() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .text()
            .affine(7, 7)
            .text()
            .content("hello", 0)
            .build();
        settle(&pipe).await;
        let affine = pipe.brick(1).unwrap();

        assert!(!affine.set_setting_value("a", 2).unwrap());
        settle(&pipe).await;
        assert!(matches!(affine.last_error(), Some(BrickError::InvalidInput(_))));
        assert_eq!(pipe.content(1).unwrap(), Chain::from("ejggb"));

        assert!(affine.set_setting_value("a", 1).unwrap());
        settle(&pipe).await;
        assert!(affine.last_error().is_none());
        assert_eq!(bucket_texts(&pipe), vec!["hello", "olssv"]);
    })
    .await;
}

#[tokio::test]
async fn test_reversed_encoder_decodes_forward() {
    run_local(async {
        let pipe = PipeBuilder::new()
            .spec(caesar_spec(1).reversed())
            .content("bcd", 0)
            .build();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["bcd", "abc"]);

        let cipher = pipe.brick(0).unwrap();
        cipher.as_encoder().unwrap().set_reversed(false).unwrap();
        settle(&pipe).await;
        assert_eq!(bucket_texts(&pipe), vec!["bcd", "cde"]);
    })
    .await;
}

#[tokio::test]
async fn test_submit_after_removal_fails() {
    run_local(async {
        let pipe = PipeBuilder::new().text().build();
        let text = pipe.brick(0).unwrap();
        pipe.remove_brick(&text).unwrap();
        assert_eq!(
            text.as_viewer().unwrap().submit("late"),
            Err(PipeError::BrickNotInPipe)
        );
    })
    .await;
}
