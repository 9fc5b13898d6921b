//! Linear Kalman filter with a piecewise constant-velocity model.
//!
//! The state is laid out as `K` independent `[value, rate]` pairs
//! (`N = 2K`). Prediction propagates every pair with the same sample time;
//! process noise is the discrete white-acceleration model per pair:
//!
//! ```text
//!        ┌ dt⁴/4  dt³/2 ┐
//! Q = σ² │              │
//!        └ dt³/2  dt²   ┘
//! ```

use nalgebra::{SMatrix, SVector};

/// Process/measurement noise for one filter.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterNoise {
    /// White acceleration variance σ² of the process model.
    pub process: f32,
    /// Measurement variance (same for every observed component).
    pub measurement: f32,
    /// Initial state variance.
    pub initial: f32,
}

impl Default for FilterNoise {
    fn default() -> Self {
        Self::new(100.0, 1.0, 100.0)
    }
}

impl FilterNoise {
    /// Construct from process, measurement and initial variances.
    pub const fn new(process: f32, measurement: f32, initial: f32) -> Self {
        Self {
            process,
            measurement,
            initial,
        }
    }
}

/// Kalman filter over `N` states observed through `M` measurements.
#[derive(Debug, Clone)]
pub struct KalmanFilter<const N: usize, const M: usize> {
    x: SVector<f32, N>,
    p: SMatrix<f32, N, N>,
    h: SMatrix<f32, M, N>,
    r: SMatrix<f32, M, M>,
    accel_var: f32,
}

/// Angle + rate filter observing the angle only.
pub type Kf21 = KalmanFilter<2, 1>;
/// Two value/rate pairs observing the values only.
pub type Kf42 = KalmanFilter<4, 2>;
/// Two value/rate pairs observing values and rates.
pub type Kf44 = KalmanFilter<4, 4>;

impl<const N: usize, const M: usize> KalmanFilter<N, M> {
    /// Create a filter at `x0` with observation model `h`.
    pub fn new(x0: SVector<f32, N>, h: SMatrix<f32, M, N>, noise: FilterNoise) -> Self {
        Self {
            x: x0,
            p: SMatrix::<f32, N, N>::identity() * noise.initial,
            h,
            r: SMatrix::<f32, M, M>::identity() * noise.measurement,
            accel_var: noise.process,
        }
    }

    /// Create a filter that observes only the value of every pair.
    pub fn observing_values(x0: SVector<f32, N>, noise: FilterNoise) -> Self {
        Self::new(x0, value_observation::<N, M>(), noise)
    }

    /// Create a filter that observes the full state.
    pub fn observing_all(x0: SVector<f32, N>, noise: FilterNoise) -> Self {
        Self::new(x0, SMatrix::<f32, M, N>::identity(), noise)
    }

    /// Current state estimate.
    pub fn state(&self) -> &SVector<f32, N> {
        &self.x
    }

    /// Replace the state estimate, keeping the covariance.
    pub fn set_state(&mut self, x: SVector<f32, N>) {
        self.x = x;
    }

    /// Current state covariance.
    pub fn covariance(&self) -> &SMatrix<f32, N, N> {
        &self.p
    }

    /// Propagate the state by `dt` seconds.
    pub fn predict(&mut self, dt: f32) -> SVector<f32, N> {
        let f = constant_velocity::<N>(dt);
        let q = process_noise::<N>(dt, self.accel_var);
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + q;
        self.x
    }

    /// Correct the state with measurement `z`.
    ///
    /// A singular innovation covariance skips the correction.
    pub fn correct(&mut self, z: &SVector<f32, M>) -> SVector<f32, N> {
        let innovation = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let Some(s_inv) = s.try_inverse() else {
            tracing::trace!("singular innovation covariance, correction skipped");
            return self.x;
        };
        let k = self.p * self.h.transpose() * s_inv;
        self.x += k * innovation;
        self.p = (SMatrix::<f32, N, N>::identity() - k * self.h) * self.p;
        self.x
    }
}

/// Transition matrix of `N / 2` constant-velocity pairs.
pub fn constant_velocity<const N: usize>(dt: f32) -> SMatrix<f32, N, N> {
    let mut f = SMatrix::<f32, N, N>::identity();
    for i in (0..N.saturating_sub(1)).step_by(2) {
        f[(i, i + 1)] = dt;
    }
    f
}

fn process_noise<const N: usize>(dt: f32, accel_var: f32) -> SMatrix<f32, N, N> {
    let mut q = SMatrix::<f32, N, N>::zeros();
    let (dt2, dt3, dt4) = (dt * dt, dt * dt * dt, dt * dt * dt * dt);
    for i in (0..N.saturating_sub(1)).step_by(2) {
        q[(i, i)] = accel_var * dt4 / 4.0;
        q[(i, i + 1)] = accel_var * dt3 / 2.0;
        q[(i + 1, i)] = accel_var * dt3 / 2.0;
        q[(i + 1, i + 1)] = accel_var * dt2;
    }
    q
}

/// Observation matrix picking the value of each `[value, rate]` pair.
pub fn value_observation<const N: usize, const M: usize>() -> SMatrix<f32, M, N> {
    SMatrix::<f32, M, N>::from_fn(|r, c| if c == 2 * r { 1.0 } else { 0.0 })
}
