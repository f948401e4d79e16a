use datadock::dataset::Dataset;
use datadock::ingest::{parse_csv, IngestWorker};
use datadock::store::StreamStore;
use datadock::table::codec::DataFormat;
use datadock::table::ColumnValues;
use tempfile::TempDir;

fn setup() -> (IngestWorker, StreamStore, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = StreamStore::new(temp.path());
    (
        IngestWorker::new(store.clone(), DataFormat::Parquet),
        store,
        temp,
    )
}

#[test]
fn ingest_parses_and_persists_the_upload() {
    let (worker, store, _temp) = setup();

    let id = worker.ingest(b"a,b\n1,x\n2,y\n", Some("upload.csv")).unwrap();

    let mut dataset = Dataset::open(store, DataFormat::Parquet, id);
    assert_eq!(dataset.name().unwrap(), "upload.csv");
    assert_eq!(dataset.row_count().unwrap(), 2);

    let table = dataset.table().unwrap();
    assert_eq!(
        table.column("a").unwrap().values,
        ColumnValues::Numeric(vec![Some(1.0), Some(2.0)])
    );
    assert_eq!(
        table.column("b").unwrap().values,
        ColumnValues::Text(vec![Some("x".to_string()), Some("y".to_string())])
    );
}

#[test]
fn ingest_without_name_defaults_to_unnamed() {
    let (worker, store, _temp) = setup();

    let id = worker.ingest(b"v\n1\n", None).unwrap();

    let mut dataset = Dataset::open(store, DataFormat::Parquet, id);
    assert_eq!(dataset.name().unwrap(), "Unnamed");
}

#[test]
fn ingest_computes_spec_statistics() {
    let (worker, store, _temp) = setup();

    let id = worker.ingest(b"a,b\n1,x\n2,y\n", None).unwrap();

    let mut dataset = Dataset::open(store, DataFormat::Parquet, id);
    let stats = dataset.summary_statistics().unwrap();
    assert_eq!(stats.len(), 1);
    let a = &stats[0];
    assert_eq!(a.name, "a");
    assert_eq!(a.count, 2);
    assert_eq!(a.mean, Some(1.5));
    assert_eq!(a.min, Some(1.0));
    assert_eq!(a.max, Some(2.0));
}

#[test]
fn ingest_rejects_ragged_rows() {
    let (worker, _store, _temp) = setup();
    let err = worker.ingest(b"a,b\n1\n", None).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn ingest_rejects_empty_input() {
    let (worker, _store, _temp) = setup();
    let err = worker.ingest(b"", None).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn parse_csv_infers_quoted_numbers_as_numeric() {
    let table = parse_csv(b"v\n\"1.5\"\n\"2\"\n").unwrap();
    assert_eq!(
        table.column("v").unwrap().values,
        ColumnValues::Numeric(vec![Some(1.5), Some(2.0)])
    );
}

#[test]
fn parse_csv_mixed_column_falls_back_to_text() {
    let table = parse_csv(b"v\n1\nn/a\n").unwrap();
    assert_eq!(
        table.column("v").unwrap().values,
        ColumnValues::Text(vec![Some("1".to_string()), Some("n/a".to_string())])
    );
}
