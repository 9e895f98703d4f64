use glam::UVec3;
use voxel_store::{Cube, Element};

use crate::error::Error;
use crate::interpolation::check_divisible;

/// Edge replicas added on each side of a line before cubic prefiltering.
const PREFILTER_PAD: usize = 12;

const CUBIC_POLE: f64 = -0.267_949_192_431_122_7;

const PREFILTER_TOLERANCE: f64 = 1e-12;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SplineOrder {
    Nearest = 0,
    Linear = 1,
    Cubic = 3,
}

/// Resamples a cube with a B-spline of the given order.
///
/// Only isotropic factors are supported. Anisotropic factors are logged and the x factor is used
/// for all axes. Samples beyond the border replicate the edge value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SplineResampleFilter {
    order: SplineOrder,
}

impl SplineResampleFilter {
    pub fn new(order: SplineOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> SplineOrder {
        self.order
    }

    pub fn apply<T: Element>(&self, cube: &Cube<T>, factors: UVec3) -> Result<Cube<T>, Error> {
        let factor = factors.x;
        if factors.cmpne(UVec3::splat(factor)).any() {
            log::debug!(
                "spline resampling does not support anisotropic factors {:?}, using {} for all axes",
                factors.to_array(),
                factor
            );
        }
        let out_shape = check_divisible(cube.shape(), UVec3::splat(factor)).map_err(|_| {
            Error::ShapeMismatch {
                shape: cube.shape(),
                factors,
            }
        })?;

        let mut shape = cube.shape().to_array().map(|s| s as usize);
        let mut data: Vec<f64> = cube.data().iter().map(|v| v.to_f64()).collect();
        for (axis, out_len) in out_shape.to_array().into_iter().enumerate() {
            data = self.resample_axis(&data, shape, axis, out_len as usize);
            shape[axis] = out_len as usize;
        }

        Cube::from_vec(out_shape, data.into_iter().map(T::from_f64_rounded).collect()).map_err(
            |_| Error::ShapeMismatch {
                shape: cube.shape(),
                factors,
            },
        )
    }

    /// Resamples every line along `axis` to `out_len` samples.
    fn resample_axis(
        &self,
        data: &[f64],
        shape: [usize; 3],
        axis: usize,
        out_len: usize,
    ) -> Vec<f64> {
        let strides = [1, shape[0], shape[0] * shape[1]];
        let mut out_shape = shape;
        out_shape[axis] = out_len;
        let out_strides = [1, out_shape[0], out_shape[0] * out_shape[1]];
        let mut out = vec![0.0; out_shape.iter().product()];

        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut line = Vec::with_capacity(shape[axis]);
        for j in 0..shape[b] {
            for i in 0..shape[a] {
                let base = i * strides[a] + j * strides[b];
                line.clear();
                line.extend((0..shape[axis]).map(|k| data[base + k * strides[axis]]));
                let out_base = i * out_strides[a] + j * out_strides[b];
                for (k, value) in resample_line(&line, out_len, self.order).into_iter().enumerate() {
                    out[out_base + k * out_strides[axis]] = value;
                }
            }
        }
        out
    }
}

/// Output sample `o` is taken at input coordinate `o * (n - 1) / (out_len - 1)`, so the first
/// and last samples coincide with the first and last input values.
fn resample_line(line: &[f64], out_len: usize, order: SplineOrder) -> Vec<f64> {
    let n = line.len();
    if n == 0 {
        return vec![0.0; out_len];
    }
    let step = if out_len > 1 {
        (n - 1) as f64 / (out_len - 1) as f64
    } else {
        0.0
    };
    let coordinates = (0..out_len).map(|o| o as f64 * step);

    match order {
        SplineOrder::Nearest => coordinates
            .map(|c| line[clamp_index((c + 0.5).floor(), n)])
            .collect(),
        SplineOrder::Linear => coordinates
            .map(|c| {
                let i = c.floor();
                let t = c - i;
                (1.0 - t) * line[clamp_index(i, n)] + t * line[clamp_index(i + 1.0, n)]
            })
            .collect(),
        SplineOrder::Cubic => {
            let mut coefficients = Vec::with_capacity(n + 2 * PREFILTER_PAD);
            coefficients.extend(std::iter::repeat(line[0]).take(PREFILTER_PAD));
            coefficients.extend_from_slice(line);
            coefficients.extend(std::iter::repeat(line[n - 1]).take(PREFILTER_PAD));
            prefilter_cubic(&mut coefficients);
            coordinates
                .map(|c| evaluate_cubic(&coefficients, c + PREFILTER_PAD as f64))
                .collect()
        }
    }
}

fn clamp_index(i: f64, n: usize) -> usize {
    i.max(0.0).min((n - 1) as f64) as usize
}

fn evaluate_cubic(coefficients: &[f64], c: f64) -> f64 {
    let n = coefficients.len();
    let i = c.floor();
    let t = c - i;
    let weights = [
        (1.0 - t).powi(3) / 6.0,
        (4.0 - 6.0 * t * t + 3.0 * t * t * t) / 6.0,
        (1.0 + 3.0 * t + 3.0 * t * t - 3.0 * t * t * t) / 6.0,
        t * t * t / 6.0,
    ];
    weights
        .iter()
        .enumerate()
        .map(|(k, w)| w * coefficients[mirror_index(i as i64 - 1 + k as i64, n)])
        .sum()
}

fn mirror_index(mut i: i64, n: usize) -> usize {
    let last = n as i64 - 1;
    if last <= 0 {
        return 0;
    }
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

/// Converts samples to cubic B-spline coefficients in place (mirror-symmetric boundaries).
fn prefilter_cubic(c: &mut [f64]) {
    let n = c.len();
    if n < 2 {
        return;
    }
    let z = CUBIC_POLE;
    let gain = (1.0 - z) * (1.0 - 1.0 / z);
    c.iter_mut().for_each(|v| *v *= gain);

    c[0] = initial_causal_coefficient(c, z);
    for k in 1..n {
        c[k] += z * c[k - 1];
    }
    c[n - 1] = (z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1]);
    for k in (0..n - 1).rev() {
        c[k] = z * (c[k + 1] - c[k]);
    }
}

fn initial_causal_coefficient(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = (PREFILTER_TOLERANCE.ln() / z.abs().ln()).ceil() as usize;
    if horizon < n {
        let mut zn = z;
        let mut sum = c[0];
        for v in c.iter().take(horizon).skip(1) {
            sum += zn * v;
            zn *= z;
        }
        sum
    } else {
        let mut zn = z;
        let iz = 1.0 / z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for v in c.iter().take(n - 1).skip(1) {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [SplineOrder; 3] = [SplineOrder::Nearest, SplineOrder::Linear, SplineOrder::Cubic];

    #[test]
    fn unit_factor_is_identity() {
        let cube = Cube::from_fn(UVec3::new(5, 4, 3), |v| (v.x * 13 + v.y * 7 + v.z * 3) as u16);
        for order in ORDERS {
            let out = SplineResampleFilter::new(order).apply(&cube, UVec3::ONE).unwrap();
            assert_eq!(out, cube, "{order:?}");
        }
    }

    #[test]
    fn constant_cube_stays_constant() {
        let cube = Cube::from_fn(UVec3::splat(8), |_| 42u8);
        for order in ORDERS {
            let out = SplineResampleFilter::new(order)
                .apply(&cube, UVec3::splat(2))
                .unwrap();
            assert_eq!(out.shape(), UVec3::splat(4));
            assert!(out.data().iter().all(|&v| v == 42), "{order:?}");
        }
    }

    #[test]
    fn endpoints_are_kept() {
        let line = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(resample_line(&line, 2, SplineOrder::Nearest), vec![10.0, 40.0]);
        assert_eq!(resample_line(&line, 2, SplineOrder::Linear), vec![10.0, 40.0]);
        assert_eq!(resample_line(&line, 1, SplineOrder::Linear), vec![10.0]);
    }

    #[test]
    fn linear_ramp() {
        let cube = Cube::from_fn(UVec3::new(8, 2, 2), |v| v.x as u8);
        let out = SplineResampleFilter::new(SplineOrder::Linear)
            .apply(&cube, UVec3::splat(2))
            .unwrap();
        assert_eq!(out.shape(), UVec3::new(4, 1, 1));
        assert_eq!(out.data(), &[0, 2, 5, 7]);
    }

    #[test]
    fn cubic_prefilter_interpolates_samples() {
        let samples = [3.0, -1.0, 4.0, 1.0, -5.0, 9.0, 2.0];
        let mut coefficients = samples.to_vec();
        prefilter_cubic(&mut coefficients);
        for (k, sample) in samples.iter().enumerate() {
            let value = evaluate_cubic(&coefficients, k as f64);
            assert!((value - sample).abs() < 1e-9, "{k}: {value} != {sample}");
        }
    }

    #[test]
    fn anisotropic_factors_use_the_x_factor() {
        let cube = Cube::from_fn(UVec3::splat(8), |v| (v.x + v.y + v.z) as u8);
        let out = SplineResampleFilter::new(SplineOrder::Nearest)
            .apply(&cube, UVec3::new(2, 2, 1))
            .unwrap();
        assert_eq!(out.shape(), UVec3::splat(4));
    }

    #[test]
    fn float_cubes_keep_fractional_values() {
        let cube = Cube::from_fn(UVec3::new(4, 2, 2), |v| v.x as f32 * 0.5);
        let out = SplineResampleFilter::new(SplineOrder::Linear)
            .apply(&cube, UVec3::splat(2))
            .unwrap();
        assert_eq!(out.shape(), UVec3::new(2, 1, 1));
        assert_eq!(out.data(), &[0.0, 1.5]);
    }

    #[test]
    fn mirror_index_reflects_at_both_ends() {
        assert_eq!(mirror_index(-1, 5), 1);
        assert_eq!(mirror_index(5, 5), 3);
        assert_eq!(mirror_index(3, 2), 1);
        assert_eq!(mirror_index(7, 1), 0);
    }
}
