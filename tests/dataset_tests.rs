use std::fs;

use datadock::dataset::{Dataset, DatasetError, DEFAULT_NAME, META_ID, META_NAME};
use datadock::store::{Stream, StreamStore};
use datadock::table::codec::DataFormat;
use datadock::table::{Column, Table};
use tempfile::TempDir;

fn setup() -> (StreamStore, TempDir) {
    let temp = TempDir::new().unwrap();
    (StreamStore::new(temp.path()), temp)
}

fn sample_table() -> Table {
    Table::new(vec![
        Column::numeric("a", vec![Some(1.0), Some(2.0)]),
        Column::text("b", vec![Some("x".to_string()), Some("y".to_string())]),
    ])
    .unwrap()
}

#[test]
fn create_persists_all_four_streams() {
    let (store, _temp) = setup();
    let dataset = Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();

    for stream in Stream::ALL {
        assert!(
            store.stream_path(dataset.id(), stream).exists(),
            "missing {} stream",
            stream
        );
    }
}

#[test]
fn create_then_open_roundtrips_the_table() {
    let (store, _temp) = setup();
    let table = sample_table();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, table.clone(), Some("trades")).unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Parquet, dataset.id());
    assert_eq!(reopened.table().unwrap(), &table);
    assert_eq!(reopened.name().unwrap(), "trades");
    assert_eq!(reopened.row_count().unwrap(), 2);
}

#[test]
fn metadata_carries_id_and_default_name() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store, DataFormat::Parquet, sample_table(), None).unwrap();

    let id = dataset.id();
    let metadata = dataset.metadata().unwrap();
    assert_eq!(metadata.get(META_ID), Some(&id.to_string()));
    assert_eq!(metadata.get(META_NAME), Some(&DEFAULT_NAME.to_string()));
}

#[test]
fn open_is_lazy_until_first_access() {
    let (store, _temp) = setup();
    let id = uuid::Uuid::new_v4();

    // Opening an unknown id succeeds; the failure surfaces on access.
    let mut dataset = Dataset::open(store, DataFormat::Parquet, id);
    let err = dataset.metadata().unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn set_name_persists_without_rewriting_data() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();
    let id = dataset.id();

    let data_before = fs::read(store.stream_path(id, Stream::Data)).unwrap();
    let export_before = fs::read(store.stream_path(id, Stream::Export)).unwrap();

    dataset.set_name("Sales").unwrap();

    // A fresh handle sees the new name; the table streams are untouched.
    let mut reopened = Dataset::open(store.clone(), DataFormat::Parquet, id);
    assert_eq!(reopened.name().unwrap(), "Sales");
    assert_eq!(fs::read(store.stream_path(id, Stream::Data)).unwrap(), data_before);
    assert_eq!(
        fs::read(store.stream_path(id, Stream::Export)).unwrap(),
        export_before
    );
}

#[test]
fn set_metadata_field_keeps_extra_keys() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();

    dataset.set_metadata_field("source", "upload.csv").unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Parquet, dataset.id());
    assert_eq!(
        reopened.metadata().unwrap().get("source"),
        Some(&"upload.csv".to_string())
    );
}

#[test]
fn set_table_rewrites_data_and_regenerates_derived_artifacts() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();
    let id = dataset.id();

    let export_before = fs::read(store.stream_path(id, Stream::Export)).unwrap();

    let replacement = Table::new(vec![Column::numeric(
        "v",
        vec![Some(10.0), Some(20.0), Some(30.0)],
    )])
    .unwrap();
    dataset.set_table(replacement.clone()).unwrap();

    let mut reopened = Dataset::open(store.clone(), DataFormat::Parquet, id);
    assert_eq!(reopened.table().unwrap(), &replacement);

    // Derived artifacts must reflect the new table, never the old one.
    let export_after = fs::read(store.stream_path(id, Stream::Export)).unwrap();
    assert_ne!(export_after, export_before);
}

#[test]
fn save_is_idempotent_for_metadata_and_data() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), Some("x")).unwrap();
    let id = dataset.id();

    let metadata_first = fs::read(store.stream_path(id, Stream::Metadata)).unwrap();
    let data_first = fs::read(store.stream_path(id, Stream::Data)).unwrap();

    dataset.save(&[]).unwrap();

    assert_eq!(
        fs::read(store.stream_path(id, Stream::Metadata)).unwrap(),
        metadata_first
    );
    assert_eq!(fs::read(store.stream_path(id, Stream::Data)).unwrap(), data_first);
}

#[test]
fn sync_normalizes_through_the_encoding() {
    let (store, _temp) = setup();
    let mut dataset =
        Dataset::create(store, DataFormat::Parquet, sample_table(), None).unwrap();

    dataset.sync(&[]).unwrap();
    assert_eq!(dataset.table().unwrap(), &sample_table());
}

#[test]
fn delete_then_metadata_is_not_found() {
    let (store, _temp) = setup();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();
    let id = dataset.id();

    dataset.delete().unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Parquet, id);
    assert!(reopened.metadata().unwrap_err().is_not_found());
}

#[test]
fn delete_unknown_dataset_is_not_found() {
    let (store, _temp) = setup();
    let dataset = Dataset::open(store, DataFormat::Parquet, uuid::Uuid::new_v4());
    assert!(dataset.delete().unwrap_err().is_not_found());
}

#[test]
fn dataset_without_metadata_does_not_exist() {
    let (store, _temp) = setup();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), None).unwrap();
    let id = dataset.id();

    fs::remove_file(store.stream_path(id, Stream::Metadata)).unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Parquet, id);
    assert!(reopened.metadata().unwrap_err().is_not_found());
    // Derived streams are gated on metadata presence too.
    assert!(reopened
        .stream_bytes(Stream::Export)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn corrupt_data_fails_table_access_but_not_metadata() {
    let (store, _temp) = setup();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), Some("ok")).unwrap();
    let id = dataset.id();

    fs::write(store.stream_path(id, Stream::Data), b"garbage").unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Parquet, id);
    assert_eq!(reopened.name().unwrap(), "ok");
    let err = reopened.table().unwrap_err();
    assert!(err.is_storage_failure(), "unexpected error: {}", err);
}

#[test]
fn empty_table_reports_zero_count_statistics() {
    let (store, _temp) = setup();
    let table = Table::new(vec![Column::numeric("v", vec![])]).unwrap();
    let mut dataset = Dataset::create(store.clone(), DataFormat::Parquet, table, None).unwrap();

    assert_eq!(dataset.row_count().unwrap(), 0);
    let stats = dataset.summary_statistics().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name, "v");
    assert_eq!(stats[0].count, 0);

    // The plot still carries one page for the numeric column.
    let plot = dataset.stream_bytes(Stream::Plot).unwrap();
    assert_eq!(&plot[..5], b"%PDF-");
}

#[test]
fn json_format_roundtrips() {
    let (store, _temp) = setup();
    let table = sample_table();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Json, table.clone(), None).unwrap();

    let mut reopened = Dataset::open(store, DataFormat::Json, dataset.id());
    assert_eq!(reopened.table().unwrap(), &table);
}

#[test]
fn independent_handles_share_no_state() {
    let (store, _temp) = setup();
    let dataset =
        Dataset::create(store.clone(), DataFormat::Parquet, sample_table(), Some("first")).unwrap();
    let id = dataset.id();

    let mut handle_a = Dataset::open(store.clone(), DataFormat::Parquet, id);
    let mut handle_b = Dataset::open(store, DataFormat::Parquet, id);

    assert_eq!(handle_a.name().unwrap(), "first");
    handle_b.set_name("second").unwrap();

    // handle_a already loaded its metadata and stays as-is until reloaded.
    assert_eq!(handle_a.name().unwrap(), "first");
    handle_a.load(&[Stream::Metadata]).unwrap();
    assert_eq!(handle_a.name().unwrap(), "second");
}

#[test]
fn not_found_error_matches_variant() {
    let (store, _temp) = setup();
    let id = uuid::Uuid::new_v4();
    let mut dataset = Dataset::open(store, DataFormat::Parquet, id);
    assert!(matches!(
        dataset.metadata().unwrap_err(),
        DatasetError::NotFound(missing) if missing == id
    ));
}
