use std::io::Write;

use camino::Utf8Path;
use varstar::observations::{MagnitudeModifier, SeriesType};
use varstar::retrievers::text_format::{TextFormatOptions, TextFormatRetriever};
use varstar::retrievers::{ObservationRetriever, RetrievalContext};
use varstar::ObservationReadError;

#[test]
fn test_simple_visual_file() {
    let result = TextFormatRetriever::from_path(Utf8Path::new("tests/data/simple_visual.txt"))
        .unwrap()
        .retrieve(&RetrievalContext::new())
        .unwrap();

    assert_eq!(result.source_name, "simple_visual");
    assert_eq!(result.source_type, "Text file");
    assert_eq!(result.valid.len(), 4);
    assert_eq!(result.invalid.len(), 1);
    assert!(result.valid.iter().all(|o| o.band == SeriesType::VISUAL));

    let limit = &result.valid[2];
    assert_eq!(limit.magnitude.modifier, MagnitudeModifier::FainterThan);
    assert!(limit.magnitude.is_uncertain);
    assert!(limit.is_discrepant());
    assert_eq!(limit.magnitude.to_string(), "<5:");

    assert_eq!(result.invalid[0].record_number, 5);
    assert_eq!(result.invalid[0].input, "2459003.25\tfour");
}

#[test]
fn test_download_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rcar_download.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "2459000.25\t4.5\t0.1\t\tV\tABC\t\t\t\t\t\tno\t\tV\t\t\t\tR Car\t\tSTD").unwrap();
    writeln!(file, "2459001.25\t4.6\t0.2\t\tB\tABC\t\t\t\t\t\tno\t\tV\t\t\t\tR Car\t\tSTEP").unwrap();
    drop(file);

    let path = Utf8Path::from_path(&path).unwrap();
    let keep = TextFormatRetriever::from_path(path)
        .unwrap()
        .with_options(TextFormatOptions::default().keep_non_std(true))
        .retrieve(&RetrievalContext::new())
        .unwrap();
    assert_eq!(keep.source_type, "AAVSO download file");
    assert_eq!(keep.valid.len(), 2);
    assert_eq!(keep.valid[1].band, SeriesType::JOHNSON_B);

    let std_only = TextFormatRetriever::from_path(path)
        .unwrap()
        .retrieve(&RetrievalContext::new())
        .unwrap();
    assert_eq!(std_only.valid.len(), 1);
    assert_eq!(std_only.valid[0].name, "R Car");
}

#[test]
fn test_missing_file() {
    match TextFormatRetriever::from_path(Utf8Path::new("tests/data/does_not_exist.txt")) {
        Err(ObservationReadError::Io(_)) => {}
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("file should not exist"),
    }
}
