//! End-to-end checks of the public hybrid-image pipeline.

use ndarray::{Array2, Array3, ArrayView2, Axis};

use hybrid_face::{
    hybrid_merge, FaceAwareFilter, FaceBox, FixedDetector, FnDetector, HybridConfig, HybridError,
    SpectralFilter,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bright ellipse on a darker textured background.
fn portrait(height: usize, width: usize) -> Array3<u8> {
    let (cy, cx) = (height as f64 * 0.55, width as f64 * 0.5);
    let (ry, rx) = (height as f64 * 0.25, width as f64 * 0.2);
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        let dy = (y as f64 - cy) / ry;
        let dx = (x as f64 - cx) / rx;
        if dy * dy + dx * dx <= 1.0 {
            200 - (c as u8) * 20
        } else {
            ((x * 7 + y * 3) % 64) as u8
        }
    })
}

/// Stand-in for a face detector: returns the tight box around the ellipse.
fn ellipse_detector(luma: ArrayView2<u8>) -> hybrid_face::Result<Vec<FaceBox>> {
    let (h, w) = luma.dim();
    let (h, w) = (h as f64, w as f64);
    Ok(vec![FaceBox::new(
        (h * 0.45) as i64,
        (w * 0.65) as i64,
        (h * 0.75) as i64,
        (w * 0.35) as i64,
    )])
}

#[test]
fn black_image_low_pass_is_black() {
    init_logging();
    let mut filter = SpectralFilter::low_pass(0.002).unwrap();
    let out = filter.filter(Array2::<f64>::zeros((100, 100)).view()).unwrap();

    assert_eq!(out.dim(), (100, 100));
    assert!(out.iter().all(|v| v.abs() < 1e-9));
}

#[test]
fn whole_frame_filters_keep_size() {
    init_logging();
    let img = portrait(90, 70);
    for mut filter in [
        SpectralFilter::low_pass(0.0015).unwrap(),
        SpectralFilter::high_pass(0.0015).unwrap(),
    ] {
        let out = filter.apply(img.view()).unwrap();
        assert_eq!(out.dim(), (90, 70, 4));
        assert!(out.index_axis(Axis(2), 3).iter().all(|&a| a == 255));
    }
}

#[test]
fn face_crop_is_within_source() {
    init_logging();
    let img = portrait(240, 180);
    let mut filter = FaceAwareFilter::low_pass(0.002, FnDetector(ellipse_detector)).unwrap();
    let out = filter.apply(img.view(), None).unwrap();

    let (h, w, c) = out.dim();
    assert!(h > 10 && h <= 240);
    assert!(w > 10 && w <= 180);
    assert_eq!(c, 4);
}

#[test]
fn hybrid_matches_trimmed_low_pass_face() {
    init_logging();
    let far = portrait(240, 180);
    let near = portrait(200, 260);
    let config = HybridConfig::default();

    let mut low = FaceAwareFilter::low_pass(config.sigma, FnDetector(ellipse_detector)).unwrap();
    let (low_h, low_w, _) = low.apply(far.view(), None).unwrap().dim();

    let out = hybrid_merge(far.view(), near.view(), FnDetector(ellipse_detector), &config).unwrap();

    let margin = config.crop_margin;
    assert_eq!(out.dim(), (low_h - 2 * margin, low_w - 2 * margin, 4));
    assert!(out.dim().0 > 10 && out.dim().1 > 10);
}

#[test]
fn hybrid_ignoring_faces() {
    init_logging();
    let far = portrait(80, 120);
    let near = portrait(60, 60);
    let config = HybridConfig {
        ignore_faces: true,
        ..HybridConfig::default()
    };

    let out = hybrid_merge(far.view(), near.view(), FixedDetector::default(), &config).unwrap();
    assert_eq!(out.dim(), (50, 90, 4));
}

#[test]
fn two_faces_are_rejected() {
    init_logging();
    let img = portrait(120, 120);
    let detector = FixedDetector::new(vec![
        FaceBox::new(10, 50, 50, 10),
        FaceBox::new(60, 110, 100, 70),
    ]);

    let err = hybrid_merge(img.view(), img.view(), detector, &HybridConfig::default()).unwrap_err();
    assert!(matches!(err, HybridError::UnsupportedMultiSubject { count: 2 }));
}

#[test]
fn config_file_drives_pipeline() {
    init_logging();
    let config = HybridConfig::from_toml_str("ignore_faces = true\ncrop_margin = 2\nalpha = 1.0")
        .unwrap();
    let img = portrait(30, 40);

    let out = hybrid_merge(img.view(), img.view(), FixedDetector::default(), &config).unwrap();
    let mut high = SpectralFilter::high_pass(config.sigma).unwrap();
    let expected = high.apply(img.view()).unwrap();

    // alpha = 1 keeps only the high-pass branch, same size so no resampling
    let inner = expected.slice(ndarray::s![2..28, 2..38, ..]);
    assert_eq!(out.dim(), (26, 36, 4));
    for (a, b) in out.iter().zip(inner.iter()) {
        assert!((*a as i16 - *b as i16).abs() <= 1);
    }
}
