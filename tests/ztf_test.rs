use camino::Utf8Path;
use varstar::observations::display::{InvalidObservationsDisplay, ObservationsDisplay};
use varstar::observations::{DetailValue, JdFlavour};
use varstar::retrievers::ztf::ZtfRetriever;
use varstar::retrievers::{CountingProgress, ObservationRetriever, RetrievalContext};

#[test]
fn test_irsa_light_curve() {
    let mut retriever = ZtfRetriever::from_path(Utf8Path::new("tests/data/ztf_lc.tsv")).unwrap();
    assert_eq!(retriever.number_of_records(), Some(5));

    let progress = CountingProgress::new();
    let result = retriever
        .retrieve(&RetrievalContext::new().with_progress(&progress))
        .unwrap();
    assert_eq!(progress.count(), 5);

    assert_eq!(result.valid.len(), 3);
    assert_eq!(result.invalid.len(), 1);
    assert_eq!(result.jd_flavour, JdFlavour::Hjd);
    assert_eq!(result.source_name, "ZTF object 633108300001234");

    let bands: Vec<&str> = result.valid.iter().map(|o| o.band.short_name.as_ref()).collect();
    assert_eq!(bands, vec!["ZTF zg", "ZTF zr", "ZTF zi"]);
    assert_eq!(result.valid[2].detail("CATFLAGS"), Some(&DetailValue::Int(32768)));
    assert_eq!(result.valid[1].detail("AIRMASS"), Some(&DetailValue::Real(1.63)));
    assert!(retriever.registry().by_short_name("ZTF unknown").is_some());

    let rejected = &result.invalid[0];
    assert_eq!(rejected.record_number, 5);
    assert!(rejected.error.contains("uncertainty"));

    let table = ObservationsDisplay::new(&result.valid).to_string();
    assert!(table.contains("ZTF zr"));
    assert!(InvalidObservationsDisplay::new(&result.invalid).to_string().contains("uncertainty"));
}
