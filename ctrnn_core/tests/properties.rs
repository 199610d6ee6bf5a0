use ctrnn_core::neural::squash;
use ctrnn_core::{
    CtrnnError, LeakyCell, Linear, ModelConfig, Predictor, Readout, Sequence, SequenceModel,
    SineSource, TimeConstant, Trainer, TrainingConfig,
};
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sine_sequence() -> Sequence {
    Sequence::from_source(&SineSource::clean(25, 0.8).expect("valid source")).expect("sequence")
}

#[test]
fn zero_state_is_a_fixed_point_without_biases() {
    let mut rng = StdRng::seed_from_u64(11);
    for tau in [1.0, 2.0, 7.5] {
        let cell = LeakyCell::from_parameters(
            Linear::new(2, 6, &mut rng).without_bias(),
            Linear::new(6, 6, &mut rng).without_bias(),
            TimeConstant::Uniform(tau),
        )
        .expect("valid cell");
        let readout = Readout::new(6, 2, &mut rng).expect("valid readout");
        let mut model = SequenceModel::from_parts(cell, readout).expect("valid model");

        model
            .cell_mut()
            .prime(Array1::zeros(6))
            .expect("matching width");
        for _ in 0..100 {
            model.step(&Array1::zeros(2));
            let state = model.cell().internal_state().expect("primed");
            assert!(state.iter().all(|&h| h == 0.0), "tau = {tau}");
        }
    }
}

#[test]
fn update_is_a_convex_combination() {
    let mut rng = StdRng::seed_from_u64(3);
    let time_constant = TimeConstant::grouped(&[(2, 1.0), (2, 3.0), (2, 25.0)]).expect("valid");
    let mut cell = LeakyCell::new(1, 6, time_constant, &mut rng).expect("valid cell");
    let alpha = cell.mixing().clone();

    cell.step(&array![0.4]);
    for _ in 0..60 {
        let previous = cell.internal_state().expect("primed").clone();
        let input = array![rng.gen_range(-1.0_f32..=1.0)];
        let drive = cell.input_to_hidden().forward(&input)
            + cell.hidden_to_hidden().forward(&squash(&previous));

        cell.step(&input);
        let next = cell.internal_state().expect("primed");
        for i in 0..6 {
            let bound = (1.0 - alpha[i]) * previous[i].abs() + alpha[i] * drive[i].abs();
            assert!(next[i].abs() <= bound + 1e-5, "unit {i}: {} > {bound}", next[i]);
        }
    }
}

#[test]
fn training_changes_only_the_readout() {
    let mut model = SequenceModel::new(ModelConfig::default()).expect("valid model");
    let before = model.parameters();

    let mut trainer = Trainer::new(TrainingConfig::new(1, 0.01)).expect("valid config");
    trainer
        .train(&mut model, &sine_sequence())
        .expect("training succeeds");
    let after = model.parameters();

    assert_eq!(after.input_to_hidden, before.input_to_hidden);
    assert_eq!(after.hidden_to_hidden, before.hidden_to_hidden);
    assert_eq!(after.time_constant, before.time_constant);
    assert_ne!(after.hidden_to_output, before.hidden_to_output);
}

#[test]
fn repeated_reset_matches_a_fresh_model() {
    let config = ModelConfig::new(1, 5, 1, 3.0).with_seed(19);
    let mut fresh = SequenceModel::new(config.clone()).expect("valid model");
    let mut used = SequenceModel::new(config).expect("valid model");

    for x in [0.1, -0.4, 0.7] {
        used.step(&array![x]);
    }
    used.reset();
    used.reset();

    assert_eq!(used.step(&array![0.25]), fresh.step(&array![0.25]));
    assert_eq!(used.cell().internal_state(), fresh.cell().internal_state());
}

#[test]
fn rollout_length_matches_request() {
    let mut model = SequenceModel::new(ModelConfig::default()).expect("valid model");
    for steps in [0, 1, 200] {
        model.reset();
        let rollout = Predictor::new(&mut model)
            .rollout(&array![0.0], steps)
            .expect("rollout succeeds");
        assert_eq!(rollout.len(), steps);
    }
}

#[test]
fn zero_tau_is_rejected_before_training() {
    let err = SequenceModel::new(ModelConfig::new(1, 5, 1, 0.0)).unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        CtrnnError::InvalidConfiguration { ref parameter, .. } if parameter == "tau"
    ));
}

#[test]
fn non_finite_loss_stops_training() {
    let mut model = SequenceModel::new(ModelConfig::default()).expect("valid model");
    model.readout_mut().affine_mut().weight[[0, 2]] = f32::NAN;

    let mut trainer = Trainer::new(TrainingConfig::new(5, 0.01)).expect("valid config");
    let err = trainer.train(&mut model, &sine_sequence()).unwrap_err();

    assert!(err.is_divergence());
    assert!(trainer.loss_history().is_empty());
}

#[test]
fn mismatched_shapes_are_rejected() {
    let mut model = SequenceModel::new(ModelConfig::new(2, 4, 2, 2.0)).expect("valid model");
    let mut trainer = Trainer::new(TrainingConfig::new(1, 0.01)).expect("valid config");
    let err = trainer.train(&mut model, &sine_sequence()).unwrap_err();
    assert!(matches!(err, CtrnnError::DimensionMismatch { .. }));

    let err = Predictor::new(&mut model)
        .rollout(&array![0.0], 3)
        .unwrap_err();
    assert!(matches!(err, CtrnnError::DimensionMismatch { .. }));
}
