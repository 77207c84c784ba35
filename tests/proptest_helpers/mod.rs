#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use labelhub::label::{OrientedBox, Point, RectBox};

/// Tolerance after a six-decimal text round trip.
pub const EPS_TEXT: f64 = 2e-6;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A rectangle fully inside the unit square.
pub fn arb_rect_in_unit() -> BoxedStrategy<RectBox> {
    (0.001f64..0.999, 0.001f64..0.999, 0.0f64..=1.0, 0.0f64..=1.0)
        .prop_map(|(cx, cy, wf, hf)| {
            let max_w = 2.0 * cx.min(1.0 - cx);
            let max_h = 2.0 * cy.min(1.0 - cy);
            RectBox::new(cx, cy, max_w * wf, max_h * hf)
        })
        .boxed()
}

/// Any finite rectangle, including ones that spill outside the unit square.
pub fn arb_rect_any() -> BoxedStrategy<RectBox> {
    (-2.0f64..3.0, -2.0f64..3.0, 0.0f64..4.0, 0.0f64..4.0)
        .prop_map(|(cx, cy, w, h)| RectBox::new(cx, cy, w, h))
        .boxed()
}

pub fn arb_oriented() -> BoxedStrategy<OrientedBox> {
    proptest::array::uniform8(0.0f64..=1.0)
        .prop_map(|v| {
            OrientedBox::new([
                Point::new(v[0], v[1]),
                Point::new(v[2], v[3]),
                Point::new(v[4], v[5]),
                Point::new(v[6], v[7]),
            ])
        })
        .boxed()
}

pub fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}
