use nalgebra as na;

#[inline]
pub fn lerp(a: na::Point2<f32>, b: na::Point2<f32>, alpha: f32) -> na::Point2<f32> {
    (a.coords + (b.coords - a.coords) * alpha).into()
}

/// Population standard deviation (divides by `n`). Zero for an empty slice.
pub fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    var.sqrt() as f32
}
