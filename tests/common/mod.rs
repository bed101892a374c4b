//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use frapper_core::engine::{Network, ParameterEvent};
use crossbeam_channel::Receiver;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Collect everything a subscriber has received so far
pub fn drain(events: &Receiver<ParameterEvent>) -> Vec<ParameterEvent> {
    events.try_iter().collect()
}

/// Float value of a parameter without triggering evaluation
pub fn float_of(network: &Network, id: frapper_core::ParameterId) -> f64 {
    network
        .value(id)
        .and_then(|v| v.as_float())
        .unwrap_or(f64::NAN)
}
