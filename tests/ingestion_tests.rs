use kpiline::ingestion::RawSourceSettings;
use kpiline::record::CanonicalField;
use kpiline::schema::ColumnMapping;
use kpiline::source::directory::list_csv_files;
use kpiline::source::file::read_csv_file;
use kpiline::source::SourceConfig;
use kpiline::{compute_kpis, load_dataset, Period, PipelineError};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use tempfile::{NamedTempFile, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn single_file(path: PathBuf, batch_size: Option<usize>) -> SourceConfig {
    SourceConfig::SingleFile {
        path,
        batch_size: batch_size.and_then(NonZeroUsize::new),
    }
}

#[test]
fn test_single_file_with_mapping() {
    let temp_file = NamedTempFile::new().unwrap();
    let csv_content = r#"sold_on,item,family,total,customer
2024-01-05,A,cat1,100.50,c1
2024-01-20, B ,cat1,-50.25,c2
garbage,C,cat2,10,c3
2024-02-01,A,cat2,200,c1"#;
    fs::write(&temp_file, csv_content).unwrap();

    let mapping = ColumnMapping::empty()
        .with(CanonicalField::Date, "sold_on")
        .with(CanonicalField::Product, "item")
        .with(CanonicalField::Category, "family")
        .with(CanonicalField::Amount, "total")
        .with(CanonicalField::Client, "customer");

    let records = load_dataset(
        &single_file(temp_file.path().to_path_buf(), None),
        &mapping,
        &Period::unbounded(),
    )
    .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].date, date(2024, 1, 5));
    assert_eq!(records[0].amount, Decimal::from_str("100.50").unwrap());
    assert_eq!(records[1].product, "B");
    assert_eq!(records[1].amount, Decimal::from_str("-50.25").unwrap());
}

#[test]
fn test_missing_column_names_the_file() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(&temp_file, "date,product,amount\n2024-01-05,A,100\n").unwrap();

    let result = load_dataset(
        &single_file(temp_file.path().to_path_buf(), None),
        &ColumnMapping::default(),
        &Period::unbounded(),
    );

    match result {
        Err(PipelineError::Schema { origin, missing }) => {
            assert_eq!(origin, temp_file.path().display().to_string());
            assert_eq!(missing, ["category", "client"]);
        }
        other => panic!("Expected Schema error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_not_found() {
    let result = read_csv_file(
        &PathBuf::from("nonexistent_file.csv"),
        &ColumnMapping::default(),
        &Period::unbounded(),
        None,
    );
    assert!(matches!(result, Err(PipelineError::NotFound(_))));
}

#[test]
fn test_batched_read_matches_whole_read() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut csv_content = String::from("date,product,category,amount,client\n");
    for i in 1..=25 {
        let day = (i % 28) + 1;
        let amount = if i % 7 == 0 { "oops".to_string() } else { (i * 10).to_string() };
        csv_content.push_str(&format!("2024-03-{:02},P{},cat{},{},c{}\n", day, i % 4, i % 3, amount, i));
    }
    fs::write(&temp_file, csv_content).unwrap();

    let period = Period::new(Some(date(2024, 3, 3)), Some(date(2024, 3, 20)));
    let whole = read_csv_file(temp_file.path(), &ColumnMapping::default(), &period, None).unwrap();

    for size in [1, 4, 10, 25, 100] {
        let batched =
            read_csv_file(temp_file.path(), &ColumnMapping::default(), &period, NonZeroUsize::new(size))
                .unwrap();
        assert_eq!(batched, whole, "batch size {}", size);
    }

    assert!(!whole.is_empty());
    assert!(whole.iter().all(|r| period.contains(r.date)));
}

#[test]
fn test_header_only_file_is_empty_but_valid() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(&temp_file, "date,product,category,amount,client").unwrap();

    for batch_size in [None, Some(10)] {
        let records = load_dataset(
            &single_file(temp_file.path().to_path_buf(), batch_size),
            &ColumnMapping::default(),
            &Period::unbounded(),
        )
        .unwrap();
        assert!(records.is_empty());
    }
}

#[test]
fn test_header_only_file_still_validated_in_batches() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(&temp_file, "date,product").unwrap();

    let result = read_csv_file(
        temp_file.path(),
        &ColumnMapping::default(),
        &Period::unbounded(),
        NonZeroUsize::new(10),
    );
    assert!(matches!(result, Err(PipelineError::Schema { .. })));
}

#[test]
fn test_directory_reads_sorted_csv_files_only() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("b_feb.csv"),
        "date,product,category,amount,client\n2024-02-01,A,cat2,200,c1\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("a_jan.CSV"),
        "date,product,category,amount,client\n2024-01-05,A,cat1,100,c1\n2024-01-20,B,cat1,50,c2\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not a csv").unwrap();
    fs::create_dir(dir.path().join("nested.csv")).unwrap();

    let files = list_csv_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["a_jan.CSV", "b_feb.csv"]);

    let source = SourceConfig::Directory {
        path: dir.path().to_path_buf(),
        batch_size: None,
    };
    let first = load_dataset(&source, &ColumnMapping::default(), &Period::unbounded()).unwrap();
    let second = load_dataset(&source, &ColumnMapping::default(), &Period::unbounded()).unwrap();

    assert_eq!(first, second);
    let products: Vec<_> = first.iter().map(|r| r.product.as_str()).collect();
    assert_eq!(products, ["A", "B", "A"]);
}

#[test]
fn test_directory_without_csv_files_is_not_found() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("readme.md"), "nothing here").unwrap();

    let source = SourceConfig::Directory {
        path: dir.path().to_path_buf(),
        batch_size: None,
    };
    let result = load_dataset(&source, &ColumnMapping::default(), &Period::unbounded());

    assert!(matches!(result, Err(PipelineError::NotFound(_))));
}

#[test]
fn test_missing_directory_is_not_found() {
    let temp_file = NamedTempFile::new().unwrap();

    for path in [PathBuf::from("/no/such/dir"), temp_file.path().to_path_buf()] {
        let source = SourceConfig::Directory {
            path,
            batch_size: None,
        };
        let result = load_dataset(&source, &ColumnMapping::default(), &Period::unbounded());
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }
}

#[test]
fn test_one_bad_file_aborts_directory_read() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.csv"),
        "date,product,category,amount,client\n2024-01-05,A,cat1,100,c1\n",
    )
    .unwrap();
    fs::write(dir.path().join("b.csv"), "date,amount\n2024-01-06,5\n").unwrap();

    let source = SourceConfig::Directory {
        path: dir.path().to_path_buf(),
        batch_size: Some(NonZeroUsize::new(1).unwrap()),
    };
    let result = load_dataset(&source, &ColumnMapping::default(), &Period::unbounded());

    match result {
        Err(PipelineError::Schema { origin, .. }) => assert!(origin.ends_with("b.csv")),
        other => panic!("Expected Schema error, got {:?}", other),
    }
}

#[test]
fn test_filtering_everything_out_is_not_an_error() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(
        &temp_file,
        "date,product,category,amount,client\n2024-01-05,A,cat1,100,c1\n",
    )
    .unwrap();

    let period = Period::new(Some(date(2025, 1, 1)), None);
    let records = load_dataset(
        &single_file(temp_file.path().to_path_buf(), None),
        &ColumnMapping::default(),
        &period,
    )
    .unwrap();

    assert!(records.is_empty());
}

#[test]
fn test_unknown_source_type_fails_before_io() {
    let settings = RawSourceSettings {
        kind: "excel".to_string(),
        path: Some(PathBuf::from("/no/such/file.xlsx")),
        batch_size: None,
    };

    assert!(matches!(settings.validate(None), Err(PipelineError::Config(_))));
}

#[test]
fn test_end_to_end_scenario() {
    let temp_file = NamedTempFile::new().unwrap();
    let csv_content = r#"date,product,category,amount,client
2024-01-05,A,cat1,100,c1
2024-01-20,B,cat1,50,c2
2024-02-01,A,cat2,200,c1"#;
    fs::write(&temp_file, csv_content).unwrap();

    let records = load_dataset(
        &single_file(temp_file.path().to_path_buf(), Some(2)),
        &ColumnMapping::default(),
        &Period::unbounded(),
    )
    .unwrap();
    let kpis = compute_kpis(&records, 1).unwrap();

    assert_eq!(kpis.row_count, 3);
    assert_eq!(kpis.current_month, date(2024, 2, 1));
    assert_eq!(kpis.previous_month_amount, Decimal::from(150));
    assert_eq!(
        kpis.growth_ratio.unwrap().round_dp(4),
        Decimal::from_str("0.3333").unwrap()
    );
    assert_eq!(kpis.top_products[0].key, "A");
    assert_eq!(kpis.pivot_product.columns, ["A"]);
}
