//! Workbench load / generate / save loop

mod helpers;

use helpers::{complete_draft, DatasetFixture};
use std::fs;
use vmark_an::models::{AnnotationDraft, ValidationError};
use vmark_an::services::{CopyOutcome, DatasetScanner, LlmClient};
use vmark_an::{AnnotatorError, Workbench};
use vmark_common::config::ApiConfig;

fn three_folder_fixture() -> DatasetFixture {
    DatasetFixture::new("clinic")
        .folder("p01", &["v1.mp4", "front.jpg"])
        .folder("p02", &["v2.avi"])
        .folder("p03", &["v3.mkv", "a.png", "b.bmp"])
}

fn open(fixture: &DatasetFixture) -> Workbench {
    Workbench::open(&fixture.root, &fixture.output, &DatasetScanner::new()).unwrap()
}

#[test]
fn test_open_without_video_folders_fails() {
    let fixture = DatasetFixture::new("empty").folder("docs", &["readme.txt"]);
    let result = Workbench::open(&fixture.root, &fixture.output, &DatasetScanner::new());
    assert!(matches!(result, Err(AnnotatorError::NoVideoFolders(_))));
}

#[test]
fn test_open_binds_ledger_to_dataset_name() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    assert_eq!(bench.ledger().dataset_name(), "clinic");
    assert_eq!(bench.ledger().ledger_path(), fixture.ledger_path());
    assert_eq!(bench.folders().len(), 3);
    assert_eq!(bench.start_index(), 0);
}

#[test]
fn test_load_unsaved_folder() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);

    let loaded = bench.load_folder(2).unwrap();
    assert_eq!(loaded.name, "p03");
    assert_eq!(loaded.video, Some(fixture.root.join("p03/v3.mkv")));
    assert_eq!(loaded.images.len(), 2);
    assert_eq!(loaded.saved_id, None);
    assert_eq!(loaded.draft, AnnotationDraft::default());

    assert!(matches!(
        bench.load_folder(3),
        Err(AnnotatorError::FolderIndexOutOfRange { index: 3, count: 3 })
    ));
}

#[tokio::test]
async fn test_save_copies_video_and_advances() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let api = ApiConfig::default();

    let outcome = bench.save(0, &complete_draft(), &api, false).await.unwrap();
    assert_eq!(outcome.id, 1);
    assert!(!outcome.replaced);
    assert_eq!(outcome.copy, Some(CopyOutcome::Copied));
    assert_eq!(outcome.next_index, 1);

    let copied = bench.ledger().videos_dir().join("v1.mp4");
    assert_eq!(fs::read(&copied).unwrap(), fs::read(fixture.root.join("p01/v1.mp4")).unwrap());

    let entry = bench.ledger().find_by_video("v1.mp4").unwrap().unwrap();
    assert_eq!(entry.turn("human"), Some(api.human_prompt_template.as_str()));
    assert!(entry.duration >= 0.0);
    assert!(entry
        .raw_description
        .ends_with("Final diagnosis: Label 1, Label 2"));
}

#[tokio::test]
async fn test_resave_replaces_entry_and_skips_up_to_date_copy() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let api = ApiConfig::default();

    bench.save(0, &complete_draft(), &api, false).await.unwrap();
    let mut draft = complete_draft();
    draft.answer = "Revised answer".to_string();
    let outcome = bench.save(0, &draft, &api, false).await.unwrap();

    assert_eq!(outcome.id, 1);
    assert!(outcome.replaced);
    assert_eq!(outcome.copy, Some(CopyOutcome::UpToDate));
    assert_eq!(bench.ledger().read_entries().unwrap().len(), 1);
    assert_eq!(bench.load_folder(0).unwrap().draft.answer, "Revised answer");
}

#[tokio::test]
async fn test_saved_folder_reloads_into_same_draft() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);

    bench
        .save(1, &complete_draft(), &ApiConfig::default(), false)
        .await
        .unwrap();

    let loaded = bench.load_folder(1).unwrap();
    assert_eq!(loaded.saved_id, Some(1));
    assert_eq!(loaded.draft, complete_draft());
}

#[tokio::test]
async fn test_invalid_draft_is_rejected_before_any_write() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let draft = AnnotationDraft {
        answer: String::new(),
        ..complete_draft()
    };

    let result = bench.save(0, &draft, &ApiConfig::default(), false).await;
    assert!(matches!(
        result,
        Err(AnnotatorError::Validation(ValidationError::MissingAnswer))
    ));
    assert!(!fixture.ledger_path().exists());
    assert!(!bench.ledger().videos_dir().exists());
}

#[tokio::test]
async fn test_next_index_after_save_and_from_history() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let api = ApiConfig::default();

    // Saving folder 1 first leaves folder 0 open behind the cursor
    let outcome = bench.save(1, &complete_draft(), &api, false).await.unwrap();
    assert_eq!(outcome.next_index, 2);

    // A history re-save looks from the start again
    let outcome = bench.save(1, &complete_draft(), &api, true).await.unwrap();
    assert_eq!(outcome.next_index, 0);

    bench.save(0, &complete_draft(), &api, false).await.unwrap();
    let outcome = bench.save(2, &complete_draft(), &api, false).await.unwrap();
    assert_eq!(outcome.next_index, 3);
    assert!(bench.summary().is_done());
}

#[tokio::test]
async fn test_failed_video_copy_still_saves_entry() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);

    // A plain file where the videos directory should be
    fs::create_dir_all(bench.ledger().dataset_dir()).unwrap();
    fs::write(bench.ledger().videos_dir(), b"not a directory").unwrap();

    let outcome = bench
        .save(0, &complete_draft(), &ApiConfig::default(), false)
        .await
        .unwrap();
    assert_eq!(outcome.copy, None);
    assert_eq!(outcome.id, 1);
    assert!(bench.ledger().find_by_video("v1.mp4").unwrap().is_some());
}

#[tokio::test]
async fn test_history_maps_entries_to_folders() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let api = ApiConfig::default();
    bench.save(2, &complete_draft(), &api, false).await.unwrap();
    bench.save(0, &complete_draft(), &api, false).await.unwrap();

    // Entry for a video this dataset no longer has
    bench
        .ledger()
        .upsert(helpers::entry("videos/gone.mp4", "old"))
        .unwrap();

    let history = bench.history().unwrap();
    let summary: Vec<(u64, Option<usize>)> = history
        .iter()
        .map(|item| (item.entry.id, item.folder_index))
        .collect();
    assert_eq!(summary, vec![(1, Some(2)), (2, Some(0)), (3, None)]);

    assert_eq!(bench.locate_entry(2).unwrap().folder_index, Some(0));
    assert!(matches!(
        bench.locate_entry(42),
        Err(AnnotatorError::EntryNotFound(42))
    ));
}

#[tokio::test]
async fn test_generate_validates_then_falls_back_without_key() {
    let fixture = three_folder_fixture();
    let bench = open(&fixture);
    let client = LlmClient::new(ApiConfig::default()).unwrap();

    let short = AnnotationDraft {
        description: "short".to_string(),
        ..complete_draft()
    };
    assert!(matches!(
        bench.generate(&short, &client).await,
        Err(AnnotatorError::Validation(ValidationError::DescriptionTooShort(10)))
    ));

    let answer = bench.generate(&complete_draft(), &client).await.unwrap();
    assert!(answer.failed);
}
