//! Orchestrator lifecycle integration tests.
//!
//! These tests drive candidates through discovery, location, tag validation,
//! the per-format jobs and the ledger, with mock collaborators:
//! located -> tags validated -> encoded -> packaged -> uploaded -> recorded

use std::sync::Arc;

use tempfile::TempDir;

use morebetter_core::{
    config::TwentyFourBitBehaviour,
    encoder::SourceInfo,
    orchestrator::{CandidateOutcome, JobStage, SkipReason},
    testing::{fixtures, MockConfirmer, MockEncoder, MockPackager, MockTagChecker, MockTracker},
    Candidate, CandidateBatch, CandidateSource, FormatKey, Ledger, MediaType, OrchestratorConfig,
    RunReport, Selection, SelectionMode, TranscodeOrchestrator,
};

/// Test helper wiring mocks, a source tree and a ledger in a temp directory.
struct TestHarness {
    tracker: Arc<MockTracker>,
    encoder: Arc<MockEncoder>,
    packager: Arc<MockPackager>,
    tag_checker: Arc<MockTagChecker>,
    config: OrchestratorConfig,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new(supported: &[FormatKey]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source_root = temp_dir.path().join("sources");
        std::fs::create_dir_all(&source_root).expect("Failed to create source root");

        let mut config = OrchestratorConfig {
            source_dirs: vec![source_root],
            supported: supported.to_vec(),
            output_dirs: Default::default(),
            torrent_dirs: Default::default(),
            announce_url: "https://tracker.example/".to_string(),
            source_flag: Some("OPS".to_string()),
            temp_dir: Some(temp_dir.path().to_path_buf()),
            max_workers: 2,
            single_format: false,
            upload: true,
            twenty_four_bit: TwentyFourBitBehaviour::Ignore,
            check_twenty_four_bit: true,
        };
        for key in supported {
            config
                .output_dirs
                .insert(*key, temp_dir.path().join("transcodes"));
            config
                .torrent_dirs
                .insert(*key, temp_dir.path().join("watch").join(key.as_str()));
        }

        Self {
            tracker: Arc::new(MockTracker::new()),
            encoder: Arc::new(MockEncoder::new()),
            packager: Arc::new(MockPackager::new()),
            tag_checker: Arc::new(MockTagChecker::new()),
            config,
            temp_dir,
        }
    }

    /// Adds a group whose FLAC source torrent `group_id * 10` exists on disk,
    /// alongside torrents in `others` as `(format, encoding)` pairs.
    async fn add_release(&self, group_id: u64, others: &[(&str, &str)]) -> Candidate {
        let torrent_id = group_id * 10;
        let dir_name = format!("Album {} [FLAC]", group_id);
        let dir = self.config.source_dirs[0].join(&dir_name);
        std::fs::create_dir_all(&dir).expect("Failed to create source dir");
        std::fs::write(dir.join("01 - Track.flac"), b"flac").expect("Failed to write track");

        let mut source = fixtures::torrent(torrent_id, "CD", "FLAC", "Lossless");
        source.file_path = dir_name;
        let mut torrents = vec![source];
        for (i, (format, encoding)) in others.iter().enumerate() {
            torrents.push(fixtures::torrent(
                torrent_id + 1 + i as u64,
                "CD",
                format,
                encoding,
            ));
        }
        self.tracker
            .add_group(fixtures::release_group(group_id, torrents))
            .await;

        Candidate::new(group_id, torrent_id)
    }

    fn ledger_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("state").join("ledger.json")
    }

    async fn ledger(&self) -> Ledger {
        Ledger::load(self.ledger_path()).await
    }

    fn orchestrator(&self) -> TranscodeOrchestrator {
        TranscodeOrchestrator::new(
            self.config.clone(),
            Arc::clone(&self.tracker) as Arc<dyn morebetter_core::TrackerApi>,
            Arc::clone(&self.encoder) as Arc<dyn morebetter_core::Encoder>,
            Arc::clone(&self.packager) as Arc<dyn morebetter_core::Packager>,
            Arc::clone(&self.tag_checker) as Arc<dyn morebetter_core::TagChecker>,
            Arc::new(MockConfirmer::new(false)),
        )
    }

    async fn discover(&self, ledger: &Ledger) -> CandidateBatch {
        CandidateSource::new(self.tracker.as_ref(), MediaType::all())
            .resolve(&Selection::Mode(SelectionMode::Snatched), ledger.ids())
            .await
            .expect("Discovery failed")
    }

    async fn discover_and_run(&self) -> RunReport {
        let mut ledger = self.ledger().await;
        let batch = self.discover(&ledger).await;
        self.orchestrator().run(&batch, &mut ledger).await
    }
}

fn produced(outcome: &CandidateOutcome) -> Vec<FormatKey> {
    match outcome {
        CandidateOutcome::Completed { produced, .. } => produced.iter().map(|p| p.format).collect(),
        CandidateOutcome::Skipped { .. } => Vec::new(),
    }
}

#[tokio::test]
async fn test_flac_and_320_present_produces_only_v0() {
    let harness = TestHarness::new(&[FormatKey::Flac, FormatKey::V0, FormatKey::Mp3_320]).await;
    let candidate = harness.add_release(1, &[("MP3", "320")]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(report.processed(), 1);
    assert_eq!(produced(&report.outcomes[0]), vec![FormatKey::V0]);
    assert_eq!(harness.encoder.transcode_calls().await, vec![FormatKey::V0]);

    let uploads = harness.tracker.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].format, FormatKey::V0);
    assert_eq!(uploads[0].source_torrent_id, 10);
    assert!(uploads[0].description.iter().any(|l| l.contains("lame")));

    let watched = harness.temp_dir.path().join("watch").join("V0");
    assert_eq!(std::fs::read_dir(&watched).unwrap().count(), 1);

    assert!(harness.ledger().await.contains("10"));
}

#[tokio::test]
async fn test_second_run_finds_nothing_new() {
    let harness = TestHarness::new(&[FormatKey::V0, FormatKey::Mp3_320]).await;
    let a = harness.add_release(1, &[]).await;
    let b = harness.add_release(2, &[("MP3", "V0 (VBR)")]).await;
    harness.tracker.set_listed(vec![a, b]).await;

    let first = harness.discover_and_run().await;
    assert_eq!(first.processed(), 2);
    assert_eq!(first.formats_produced(), 3);

    let ledger = harness.ledger().await;
    assert_eq!(ledger.len(), 2);
    let second = harness.discover(&ledger).await;
    assert!(second.is_empty());
    assert_eq!(harness.tracker.list_calls().await, 2);
}

#[tokio::test]
async fn test_single_format_mode_stops_after_first_success() {
    let mut harness =
        TestHarness::new(&[FormatKey::V0, FormatKey::V2, FormatKey::Mp3_320]).await;
    harness.config.single_format = true;
    let candidate = harness.add_release(1, &[]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(produced(&report.outcomes[0]), vec![FormatKey::V0]);
    assert_eq!(harness.encoder.transcode_calls().await, vec![FormatKey::V0]);
    assert_eq!(harness.packager.packaged().await.len(), 1);
    assert!(harness.ledger().await.contains("10"));
}

#[tokio::test]
async fn test_single_format_mode_moves_past_failures() {
    let mut harness = TestHarness::new(&[FormatKey::V0, FormatKey::Mp3_320]).await;
    harness.config.single_format = true;
    harness.encoder.fail_format(FormatKey::V0).await;
    let candidate = harness.add_release(1, &[]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(produced(&report.outcomes[0]), vec![FormatKey::Mp3_320]);
    assert_eq!(report.formats_failed(), 1);
}

#[tokio::test]
async fn test_interrupted_run_leaves_completed_prefix_in_ledger() {
    let harness = TestHarness::new(&[FormatKey::V0]).await;
    let mut candidates = Vec::new();
    for group_id in 1..=4 {
        candidates.push(harness.add_release(group_id, &[]).await);
    }
    harness.tracker.set_listed(candidates.clone()).await;

    // Only the first two candidates get processed before the process dies.
    {
        let mut ledger = harness.ledger().await;
        let mut batch = harness.discover(&ledger).await;
        batch.candidates.truncate(2);
        harness.orchestrator().run(&batch, &mut ledger).await;
    }

    let ledger = harness.ledger().await;
    assert_eq!(
        ledger.ids().iter().cloned().collect::<Vec<_>>(),
        vec!["10".to_string(), "20".to_string()]
    );

    let resumed = harness.discover(&ledger).await;
    assert_eq!(resumed.candidates, candidates[2..].to_vec());
}

#[tokio::test]
async fn test_skip_mode_records_without_collaborator_calls() {
    let harness = TestHarness::new(&[FormatKey::V0]).await;
    let a = harness.add_release(1, &[]).await;
    let b = harness.add_release(2, &[]).await;
    harness.tracker.set_listed(vec![a, b]).await;

    let mut ledger = harness.ledger().await;
    let marked = ledger
        .mark_processed(&[
            "https://tracker.example/torrents.php?id=1&torrentid=10".to_string(),
            "not a permalink".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(marked, vec![a]);
    assert!(harness.tracker.fetch_calls().await.is_empty());
    assert!(harness.encoder.transcode_calls().await.is_empty());
    assert!(harness.packager.packaged().await.is_empty());
    assert!(harness.tracker.uploads().await.is_empty());

    let reloaded = harness.ledger().await;
    assert!(reloaded.contains("10"));
    assert_eq!(harness.discover(&reloaded).await.candidates, vec![b]);
}

#[tokio::test]
async fn test_24bit_auto_correct_relabels_once_and_continues() {
    let mut harness = TestHarness::new(&[FormatKey::Flac, FormatKey::V0]).await;
    harness.config.twenty_four_bit = TwentyFourBitBehaviour::AutoCorrect;
    harness
        .encoder
        .set_source_info(SourceInfo {
            tracks: 2,
            max_channels: 2,
            max_bit_depth: 24,
            max_sample_rate: 96_000,
        })
        .await;
    let candidate = harness.add_release(1, &[]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(harness.tracker.marked().await, vec![10]);
    assert_eq!(harness.tracker.fetch_calls().await, vec![1, 1]);
    // The relabelled source no longer counts as a 16-bit FLAC.
    assert_eq!(
        produced(&report.outcomes[0]),
        vec![FormatKey::Flac, FormatKey::V0]
    );

    let group = harness.tracker.group(1).await.unwrap();
    assert_eq!(group.torrent(10).unwrap().encoding, "24bit Lossless");

    // A forced reprocess does not issue a second correction.
    let batch = CandidateBatch {
        candidates: vec![candidate],
        media_filter: None,
    };
    harness.orchestrator().process_candidate(candidate, &batch).await;
    assert_eq!(harness.tracker.marked().await, vec![10]);
}

#[tokio::test]
async fn test_failed_format_does_not_block_siblings() {
    let harness = TestHarness::new(&[FormatKey::V0, FormatKey::Mp3_320]).await;
    harness.encoder.fail_format(FormatKey::V0).await;
    let candidate = harness.add_release(1, &[]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    match &report.outcomes[0] {
        CandidateOutcome::Completed {
            produced, failed, ..
        } => {
            assert_eq!(produced.len(), 1);
            assert_eq!(produced[0].format, FormatKey::Mp3_320);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].format, FormatKey::V0);
            assert_eq!(failed[0].stage, JobStage::Encode);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let uploads = harness.tracker.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].format, FormatKey::Mp3_320);
    assert_eq!(harness.packager.packaged().await.len(), 1);
    assert!(harness.ledger().await.contains("10"));
}

#[tokio::test]
async fn test_nothing_needed_is_still_recorded() {
    let harness = TestHarness::new(&[FormatKey::V0]).await;
    let candidate = harness.add_release(1, &[("MP3", "V0 (VBR)")]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(report.processed(), 1);
    assert_eq!(report.formats_produced(), 0);
    assert!(harness.encoder.transcode_calls().await.is_empty());
    assert!(harness.ledger().await.contains("10"));
}

#[tokio::test]
async fn test_abandoned_candidates_are_retried_later() {
    let harness = TestHarness::new(&[FormatKey::V0]).await;
    let tagged = harness.add_release(1, &[]).await;
    let missing = Candidate::new(2, 20);
    harness
        .tracker
        .add_group(fixtures::release_group(
            2,
            vec![{
                let mut t = fixtures::torrent(20, "CD", "FLAC", "Lossless");
                t.file_path = "Not On Disk".to_string();
                t
            }],
        ))
        .await;
    harness
        .tag_checker
        .set_failure(Some("missing tags: artist".to_string()))
        .await;
    harness.tracker.set_listed(vec![tagged, missing]).await;

    let report = harness.discover_and_run().await;

    let reasons: Vec<(Candidate, SkipReason)> = report
        .skipped()
        .map(|(c, r)| (c, r.clone()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (tagged, SkipReason::TagValidation("missing tags: artist".to_string())),
            (missing, SkipReason::SourceNotFound),
        ]
    );
    assert_eq!(report.processed(), 0);

    let ledger = harness.ledger().await;
    assert!(ledger.is_empty());
    assert_eq!(harness.discover(&ledger).await.len(), 2);
}

#[tokio::test]
async fn test_upload_disabled_delivers_packages() {
    let mut harness = TestHarness::new(&[FormatKey::V0]).await;
    harness.config.upload = false;
    let candidate = harness.add_release(1, &[]).await;
    harness.tracker.set_listed(vec![candidate]).await;

    let report = harness.discover_and_run().await;

    assert_eq!(report.formats_produced(), 1);
    assert!(harness.tracker.uploads().await.is_empty());
    let watched = harness.temp_dir.path().join("watch").join("V0");
    let entries: Vec<_> = std::fs::read_dir(&watched)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].extension().unwrap(), "torrent");
}
