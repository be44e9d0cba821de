use pz_plots::{
    specz_plots, train_valid_plots, PlotError, SpeczFields, TrainValidFields,
};
use pz_server::{Catalog, CatalogError};

fn specz_catalog() -> Catalog {
    Catalog::from_f64_columns(&[
        ("ra", vec![150.1, 150.3, 149.9, 150.0]),
        ("dec", vec![2.2, 2.1, 2.4, f64::NAN]),
        ("redshift", vec![0.31, 0.87, 1.52, 0.44]),
    ])
}

fn training_catalog(offset: f64) -> Catalog {
    let z: Vec<f64> = (0..50).map(|i| offset + i as f64 * 0.03).collect();
    let mag: Vec<f64> = z.iter().map(|z| 20.0 + 2.5 * z).collect();
    Catalog::from_f64_columns(&[("z", z), ("mag_cModel_i", mag)])
}

fn is_blank(rgb: &[u8]) -> bool {
    rgb.iter().all(|&b| b == 255)
}

#[test]
fn test_specz_plots_renders_in_memory() {
    let figure = specz_plots(&specz_catalog(), &SpeczFields::default(), None).unwrap();

    assert_eq!(figure.size(), (900, 400));
    assert_eq!(figure.rgb.len(), 900 * 400 * 3);
    assert!(figure.saved_to.is_none());
    assert_eq!(figure.pixel(0, 0), Some([255, 255, 255]));
    assert!(!is_blank(&figure.rgb));
    assert_eq!(figure.pixel(900, 0), None);
}

#[test]
fn test_specz_plots_single_row() {
    let catalog = Catalog::from_f64_columns(&[
        ("ra", vec![10.0]),
        ("dec", vec![-5.0]),
        ("redshift", vec![0.5]),
    ]);
    assert!(specz_plots(&catalog, &SpeczFields::default(), None).is_ok());
}

#[test]
fn test_specz_plots_empty_catalog() {
    let catalog = Catalog::new(
        vec!["ra".to_string(), "dec".to_string(), "redshift".to_string()],
        vec![],
    )
    .unwrap();

    let result = specz_plots(&catalog, &SpeczFields::default(), None);
    assert!(matches!(result, Err(PlotError::EmptyCatalog)));
}

#[test]
fn test_specz_plots_missing_column() {
    let fields = SpeczFields::new("ra", "dec", "z_spec");
    match specz_plots(&specz_catalog(), &fields, None) {
        Err(PlotError::Catalog(CatalogError::MissingColumn(column))) => {
            assert_eq!(column, "z_spec")
        }
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn test_specz_plots_without_finite_redshift() {
    let catalog = Catalog::from_f64_columns(&[
        ("ra", vec![1.0, 2.0]),
        ("dec", vec![1.0, 2.0]),
        ("redshift", vec![f64::NAN, f64::NAN]),
    ]);
    match specz_plots(&catalog, &SpeczFields::default(), None) {
        Err(PlotError::NoFiniteValues { column }) => assert_eq!(column, "redshift"),
        other => panic!("expected no finite values, got {other:?}"),
    }
}

#[test]
fn test_specz_plots_saves_png_and_svg() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("figures").join("specz_catalog.png");
    let svg = dir.path().join("specz_catalog.svg");

    let figure = specz_plots(&specz_catalog(), &SpeczFields::default(), Some(&png)).unwrap();
    assert_eq!(figure.saved_to.as_deref(), Some(png.as_path()));
    let bytes = std::fs::read(&png).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");

    specz_plots(&specz_catalog(), &SpeczFields::default(), Some(&svg)).unwrap();
    let text = std::fs::read_to_string(&svg).unwrap();
    assert!(text.contains("<svg"));
    assert!(text.contains("R.A. (deg)"));
}

#[test]
fn test_train_valid_plots_both_sets() {
    let train = training_catalog(0.0);
    let valid = training_catalog(0.2);

    let figure =
        train_valid_plots(Some(&train), Some(&valid), &TrainValidFields::default(), None).unwrap();
    assert_eq!(figure.size(), (1200, 400));
    assert!(!is_blank(&figure.rgb));
}

#[test]
fn test_train_valid_plots_one_set() {
    let valid = training_catalog(0.0);
    let fields = TrainValidFields::new("mag_cModel_i", "z");

    assert!(train_valid_plots(None, Some(&valid), &fields, None).is_ok());
    assert!(train_valid_plots(Some(&valid), None, &fields, None).is_ok());
}

#[test]
fn test_train_valid_plots_requires_a_set() {
    let result = train_valid_plots(None, None, &TrainValidFields::default(), None);
    assert!(matches!(result, Err(PlotError::NoData)));
}

#[test]
fn test_train_valid_plots_svg_has_legend() {
    let dir = tempfile::tempdir().unwrap();
    let svg = dir.path().join("train_valid_set.svg");
    let train = training_catalog(0.0);
    let valid = training_catalog(0.1);

    train_valid_plots(
        Some(&train),
        Some(&valid),
        &TrainValidFields::default(),
        Some(&svg),
    )
    .unwrap();

    let text = std::fs::read_to_string(&svg).unwrap();
    assert!(text.contains("train"));
    assert!(text.contains("valid"));
    assert!(text.contains("magnitude mag_cModel_i"));
}

#[test]
fn test_train_valid_plots_missing_magnitude() {
    let train = Catalog::from_f64_columns(&[("z", vec![0.1, 0.2])]);
    let result = train_valid_plots(Some(&train), None, &TrainValidFields::default(), None);
    assert!(matches!(
        result,
        Err(PlotError::Catalog(CatalogError::MissingColumn(_)))
    ));
}
