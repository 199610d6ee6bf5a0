//! Leaky-integrator recurrent cell.
//!
//! The cell keeps two views of its hidden state. The internal view is the raw
//! integrator value and feeds the next step's recursion. The observable view
//! is `squash(state)` returned as a fresh owned array; no training signal
//! flows from it back into the cell's parameters.
//!
//! ```text
//! first step:  h_t = W_ih x_t + b_ih
//! later steps: h_t = (1 - a) * h_{t-1} + a * (W_ih x_t + b_ih + W_hh tanh(h_{t-1}) + b_hh)
//! ```
//!
//! with `a = 1 / tau` per unit.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dimension, CtrnnError, CtrnnResult};
use crate::neural::activation::squash;
use crate::neural::linear::Linear;

/// Time constant of the integrator, shared or per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeConstant {
    /// One `tau` for every hidden unit
    Uniform(f32),
    /// One `tau` per hidden unit (multi-timescale network)
    PerUnit(Array1<f32>),
}

impl TimeConstant {
    /// Validated shared time constant.
    pub fn uniform(tau: f32) -> CtrnnResult<Self> {
        check_tau("tau", tau)?;
        Ok(TimeConstant::Uniform(tau))
    }

    /// Validated per-unit time constants.
    pub fn per_unit(taus: Vec<f32>) -> CtrnnResult<Self> {
        if taus.is_empty() {
            return Err(CtrnnError::empty_sequence("per-unit time constants"));
        }
        for &tau in &taus {
            check_tau("tau_per_unit", tau)?;
        }
        Ok(TimeConstant::PerUnit(Array1::from_vec(taus)))
    }

    /// Per-unit constants built from `(units, tau)` groups, e.g. a fast and a
    /// slow population: `&[(3, 2.0), (2, 20.0)]`.
    pub fn grouped(groups: &[(usize, f32)]) -> CtrnnResult<Self> {
        let taus = groups
            .iter()
            .flat_map(|&(units, tau)| std::iter::repeat(tau).take(units))
            .collect();
        Self::per_unit(taus)
    }

    /// Checks every constant and, for per-unit constants, the unit count.
    pub fn validate(&self, n_hidden: usize) -> CtrnnResult<()> {
        match self {
            TimeConstant::Uniform(tau) => check_tau("tau", *tau),
            TimeConstant::PerUnit(taus) => {
                ensure_dimension(n_hidden, taus.len(), "per-unit time constants")?;
                taus.iter().try_for_each(|&tau| check_tau("tau_per_unit", tau))
            }
        }
    }

    /// Mixing coefficients `a = 1 / tau`, one per hidden unit.
    pub fn mixing(&self, n_hidden: usize) -> Array1<f32> {
        match self {
            TimeConstant::Uniform(tau) => Array1::from_elem(n_hidden, 1.0 / tau),
            TimeConstant::PerUnit(taus) => taus.mapv(|tau| 1.0 / tau),
        }
    }
}

/// `a = 1/tau` must lie in `(0, 1]`.
fn check_tau(parameter: &str, tau: f32) -> CtrnnResult<()> {
    if !tau.is_finite() || tau < 1.0 {
        return Err(CtrnnError::invalid_config(
            parameter,
            tau,
            "must be finite and >= 1 so that 1/tau lies in (0, 1]",
        ));
    }
    Ok(())
}

/// Bank of leaky-integrator units.
#[derive(Debug, Clone)]
pub struct LeakyCell {
    input_to_hidden: Linear,
    hidden_to_hidden: Linear,
    time_constant: TimeConstant,
    alpha: Array1<f32>,
    state: Option<Array1<f32>>,
}

impl LeakyCell {
    /// Randomly initialized cell.
    pub fn new<R: Rng + ?Sized>(
        n_in: usize,
        n_hidden: usize,
        time_constant: TimeConstant,
        rng: &mut R,
    ) -> CtrnnResult<Self> {
        let input_to_hidden = Linear::new(n_in, n_hidden, rng);
        let hidden_to_hidden = Linear::new(n_hidden, n_hidden, rng);
        Self::from_parameters(input_to_hidden, hidden_to_hidden, time_constant)
    }

    /// Cell from explicit affine maps. The recurrent map must be square and
    /// agree with the input map's output width.
    pub fn from_parameters(
        input_to_hidden: Linear,
        hidden_to_hidden: Linear,
        time_constant: TimeConstant,
    ) -> CtrnnResult<Self> {
        let n_hidden = input_to_hidden.out_features();
        if n_hidden == 0 {
            return Err(CtrnnError::invalid_config(
                "n_hidden",
                0,
                "at least one hidden unit is required",
            ));
        }
        ensure_dimension(
            n_hidden,
            hidden_to_hidden.in_features(),
            "hidden-to-hidden input width",
        )?;
        ensure_dimension(
            n_hidden,
            hidden_to_hidden.out_features(),
            "hidden-to-hidden output width",
        )?;
        time_constant.validate(n_hidden)?;

        let alpha = time_constant.mixing(n_hidden);
        Ok(Self {
            input_to_hidden,
            hidden_to_hidden,
            time_constant,
            alpha,
            state: None,
        })
    }

    /// Forgets the hidden state; the next step starts from the input drive only.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Advances the integrator by one input and returns the observable state.
    ///
    /// `input` must have `n_in` components. Callers validate shapes up front.
    pub fn step(&mut self, input: &Array1<f32>) -> Array1<f32> {
        debug_assert_eq!(input.len(), self.n_in(), "cell input width");

        let input_drive = self.input_to_hidden.forward(input);
        let new_state = match self.state.take() {
            None => input_drive,
            Some(previous) => {
                let drive = input_drive + self.hidden_to_hidden.forward(&squash(&previous));
                let retain = self.alpha.mapv(|a| 1.0 - a);
                &retain * &previous + &self.alpha * &drive
            }
        };

        let observable = squash(&new_state);
        self.state = Some(new_state);
        observable
    }

    /// Installs an explicit internal state, as if a previous step produced it.
    pub fn prime(&mut self, state: Array1<f32>) -> CtrnnResult<()> {
        ensure_dimension(self.n_hidden(), state.len(), "primed hidden state")?;
        if let Some(&value) = state.iter().find(|v| !v.is_finite()) {
            return Err(CtrnnError::invalid_config(
                "primed hidden state",
                value,
                "must be finite",
            ));
        }
        self.state = Some(state);
        Ok(())
    }

    /// First NaN or infinite component of the internal state, if any.
    ///
    /// `squash` saturates, so a blown-up state still yields a finite
    /// observable view; this is the only place it shows.
    pub fn non_finite_state(&self) -> Option<f32> {
        self.state
            .as_ref()
            .and_then(|state| state.iter().copied().find(|v| !v.is_finite()))
    }

    /// Raw integrator value, for diagnostics. `None` after a reset.
    pub fn internal_state(&self) -> Option<&Array1<f32>> {
        self.state.as_ref()
    }

    pub fn is_primed(&self) -> bool {
        self.state.is_some()
    }

    pub fn n_in(&self) -> usize {
        self.input_to_hidden.in_features()
    }

    pub fn n_hidden(&self) -> usize {
        self.input_to_hidden.out_features()
    }

    pub fn input_to_hidden(&self) -> &Linear {
        &self.input_to_hidden
    }

    pub fn hidden_to_hidden(&self) -> &Linear {
        &self.hidden_to_hidden
    }

    /// Both affine maps, mutably, for the optimizer.
    pub(crate) fn affine_maps_mut(&mut self) -> (&mut Linear, &mut Linear) {
        (&mut self.input_to_hidden, &mut self.hidden_to_hidden)
    }

    pub fn time_constant(&self) -> &TimeConstant {
        &self.time_constant
    }

    /// Per-unit mixing coefficients `1/tau`.
    pub fn mixing(&self) -> &Array1<f32> {
        &self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::SeedableRng;

    fn fixed_cell(tau: f32) -> LeakyCell {
        let i2h = Linear::from_parts(array![[1.0], [-0.5]], array![0.1, 0.2]).unwrap();
        let h2h = Linear::from_parts(array![[0.5, 0.0], [0.0, 0.5]], array![0.0, 0.0]).unwrap();
        LeakyCell::from_parameters(i2h, h2h, TimeConstant::Uniform(tau)).unwrap()
    }

    #[test]
    fn first_step_uses_input_drive_only() {
        let mut cell = fixed_cell(2.0);
        let out = cell.step(&array![1.0]);
        let state = cell.internal_state().unwrap().clone();
        assert!((state[0] - 1.1).abs() < 1e-6);
        assert!((state[1] + 0.3).abs() < 1e-6);
        assert_eq!(out, squash(&state));
    }

    #[test]
    fn later_steps_blend_previous_state() {
        let mut cell = fixed_cell(2.0);
        cell.step(&array![1.0]);
        cell.step(&array![0.0]);
        let state = cell.internal_state().unwrap();

        let prev = array![1.1_f32, -0.3];
        let drive = array![0.1_f32, 0.2] + squash(&prev) * 0.5;
        let expected = &prev * 0.5 + &drive * 0.5;
        for (a, b) in state.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn tau_one_discards_previous_state() {
        let mut cell = fixed_cell(1.0);
        cell.prime(array![100.0, -100.0]).unwrap();
        cell.step(&array![0.0]);
        let state = cell.internal_state().unwrap();
        let expected = array![0.1_f32, 0.2] + squash(&array![100.0, -100.0]) * 0.5;
        for (a, b) in state.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn reset_clears_state() {
        let mut cell = fixed_cell(2.0);
        cell.step(&array![1.0]);
        assert!(cell.is_primed());
        cell.reset();
        assert!(cell.internal_state().is_none());
    }

    #[test]
    fn rejects_invalid_time_constants() {
        for tau in [0.0, -1.0, 0.5, f32::NAN, f32::INFINITY] {
            let err = TimeConstant::uniform(tau).unwrap_err();
            assert!(err.is_configuration(), "tau = {tau}");
        }
        assert!(TimeConstant::uniform(1.0).is_ok());
    }

    #[test]
    fn per_unit_constants_must_match_width() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let taus = TimeConstant::grouped(&[(3, 2.0), (2, 20.0)]).unwrap();
        assert!(LeakyCell::new(1, 5, taus.clone(), &mut rng).is_ok());
        let err = LeakyCell::new(1, 4, taus, &mut rng).unwrap_err();
        assert!(matches!(err, CtrnnError::DimensionMismatch { .. }));
    }

    #[test]
    fn grouped_mixing_is_per_unit() {
        let taus = TimeConstant::grouped(&[(2, 2.0), (1, 10.0)]).unwrap();
        assert_eq!(taus.mixing(3), array![0.5, 0.5, 0.1]);
    }

    #[test]
    fn prime_checks_width() {
        let mut cell = fixed_cell(2.0);
        assert!(cell.prime(array![0.0, 0.0, 0.0]).is_err());
        assert!(cell.prime(array![0.0, 0.0]).is_ok());
    }

    #[test]
    fn prime_rejects_non_finite_state() {
        let mut cell = fixed_cell(2.0);
        let err = cell.prime(array![f32::INFINITY, 0.0]).unwrap_err();
        assert!(err.is_configuration());
        assert!(!cell.is_primed());
    }

    #[test]
    fn overflowing_state_stays_saturated_but_is_visible() {
        let i2h = Linear::from_parts(array![[f32::MAX], [0.0]], array![f32::MAX, 0.0]).unwrap();
        let h2h = Linear::from_parts(Array2::zeros((2, 2)), Array1::zeros(2)).unwrap();
        let mut cell = LeakyCell::from_parameters(i2h, h2h, TimeConstant::Uniform(2.0)).unwrap();

        assert_eq!(cell.non_finite_state(), None);
        let observable = cell.step(&array![1.0]);
        assert!(observable.iter().all(|v| v.is_finite()));
        assert_eq!(cell.non_finite_state(), Some(f32::INFINITY));

        cell.step(&array![0.0]);
        assert_eq!(cell.non_finite_state(), Some(f32::INFINITY));
    }
}
