//! Property-based tests for print pricing and sizing

use darkroom::pricing::{compute_final_price, compute_physical_dimensions, Orientation};
use proptest::prelude::*;

/// Prices never fall below cost plus minimum margin, VAT included.
#[test]
fn test_price_covers_minimum_margin() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(0.0f64..5000.0, any::<bool>()),
            |(gross, extra_large)| {
                let price = compute_final_price(gross, extra_large, 100.0, 0.2);
                let floor = ((gross + 100.0) * 1.2).round() as i64;
                prop_assert!(price >= floor);
                Ok(())
            },
        )
        .unwrap();
}

/// A larger gross cost never yields a smaller price.
#[test]
fn test_price_is_monotonic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0.0f64..5000.0, 0.0f64..500.0), |(gross, extra)| {
            let low = compute_final_price(gross, false, 100.0, 0.2);
            let high = compute_final_price(gross + extra, false, 100.0, 0.2);
            prop_assert!(high >= low);
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Sizes land on half-centimetre steps and keep the image's orientation.
    #[test]
    fn dimensions_on_half_cm_grid(width in 1u32..20000, height in 1u32..20000, dpi in 100.0f64..400.0) {
        let dims = compute_physical_dimensions(width, height, dpi);
        prop_assert!(dims.long_side >= dims.short_side);
        prop_assert_eq!((dims.long_side * 2.0).fract(), 0.0);
        prop_assert_eq!((dims.short_side * 2.0).fract(), 0.0);
        let expected = if width >= height { Orientation::Landscape } else { Orientation::Portrait };
        prop_assert_eq!(dims.orientation, expected);
    }
}
