mod common;

use std::io::Write;

use approx::assert_relative_eq;
use camino::Utf8Path;
use common::{fits_light_curve, int_card, real_card, text_card};
use varstar::fits::FitsFile;
use varstar::observations::{DetailValue, JdFlavour};
use varstar::retrievers::tess::{FitsOptions, QlpLightCurve, SpocLightCurve, TessRetriever};
use varstar::retrievers::{ObservationRetriever, RetrievalContext};

const SPOC_COLUMNS: [(&str, char); 10] = [
    ("TIME", 'D'),
    ("TIMECORR", 'E'),
    ("CADENCENO", 'J'),
    ("SAP_FLUX", 'E'),
    ("SAP_FLUX_ERR", 'E'),
    ("SAP_BKG", 'E'),
    ("SAP_BKG_ERR", 'E'),
    ("PDCSAP_FLUX", 'E'),
    ("PDCSAP_FLUX_ERR", 'E'),
    ("QUALITY", 'J'),
];

fn sector(object: &str, start: f64, fluxes: &[f64]) -> Vec<u8> {
    let rows: Vec<Vec<f64>> = fluxes
        .iter()
        .enumerate()
        .map(|(i, f)| vec![start + i as f64 * 0.02, 0.0, i as f64, f * 0.98, 2.0, 0.0, 0.0, *f, 2.0, 0.0])
        .collect();
    fits_light_curve(
        &[
            text_card("TELESCOP", "TESS"),
            text_card("OBJECT", object),
            real_card("TESSMAG", 9.5),
        ],
        &[int_card("BJDREFI", 2_457_000), real_card("BJDREFF", 0.0)],
        &SPOC_COLUMNS,
        &rows,
    )
}

#[test]
fn test_spoc_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tess2019_s0010_lc.fits");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&sector("TIC 140206488", 1569.5, &[1000.0, 2000.0, 4000.0]))
        .unwrap();

    let path = Utf8Path::from_path(&path).unwrap();
    let mut retriever = TessRetriever::from_path(SpocLightCurve, path).unwrap();
    assert_eq!(retriever.number_of_records(), Some(3));

    let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
    assert_eq!(result.source_name, "TIC 140206488");
    assert_eq!(result.jd_flavour, JdFlavour::Bjd);
    assert_eq!(result.valid.len(), 3);

    // the median flux lands on TESSMAG
    assert_relative_eq!(result.valid[1].mag(), 9.5, epsilon = 1e-6);
    assert_relative_eq!(result.valid[1].jd(), 2_458_569.52, epsilon = 1e-6);
    assert_relative_eq!(result.valid[2].uncertainty(), 1.086 * 2.0 / 4000.0, epsilon = 1e-9);
    assert_eq!(result.valid[0].detail("QUALITY"), Some(&DetailValue::Int(0)));
}

#[test]
fn test_two_sectors() {
    let first = FitsFile::from_bytes(&sector("TIC 7", 1569.5, &[100.0, 100.0])).unwrap();
    let second = FitsFile::from_bytes(&sector("TIC 7", 1596.5, &[100.0, f64::NAN, 100.0])).unwrap();
    let mut retriever = TessRetriever::new(SpocLightCurve, "s10", first)
        .add_file("s11", second)
        .with_options(FitsOptions::default().mag_shift(Some(12.0)));

    let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
    assert_eq!(result.valid.len(), 4);
    assert_eq!(result.invalid.len(), 1);
    assert_eq!(result.invalid[0].record_number, 4);
    assert_eq!(result.invalid[0].error, "Invalid flux or flux error");
    assert!(result.valid.iter().all(|o| (o.mag() - 7.0).abs() < 1e-9));
    assert_eq!(result.valid[0].band.short_name, "TESS");
}

#[test]
fn test_qlp_detrended_flux() {
    let bytes = fits_light_curve(
        &[text_card("TELESCOP", "TESS"), text_card("OBJECT", "TIC 99"), real_card("TESSMAG", 11.0)],
        &[int_card("BJDREFI", 2_457_000), real_card("BJDREFR", 0.0)],
        &[
            ("TIME", 'D'),
            ("CADENCENO", 'J'),
            ("SAP_FLUX", 'E'),
            ("DET_FLUX", 'E'),
            ("DET_FLUX_ERR", 'E'),
            ("QUALITY", 'J'),
        ],
        &[vec![2000.0, 1.0, 0.9, 1.0, 0.001, 0.0], vec![2000.1, 2.0, 0.9, 1.0, 0.001, 4096.0]],
    );
    let result = TessRetriever::from_bytes(QlpLightCurve, "qlp", &bytes)
        .unwrap()
        .with_options(FitsOptions::default().drop_flagged(true))
        .retrieve(&RetrievalContext::new())
        .unwrap();

    assert_eq!(result.valid.len(), 1);
    assert_relative_eq!(result.valid[0].mag(), 11.0, epsilon = 1e-9);
    assert_eq!(result.valid[0].band.short_name, "QLP");
    assert_eq!(result.source_type, "QLP FITS File");
}
