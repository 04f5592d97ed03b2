//! Shared test helpers for configuration tests.

use ortho_config::MergeComposer;
use serde_json::Value;

use crate::RevwatchConfig;

/// One configuration source, in ascending precedence order.
#[derive(Debug, Clone)]
pub enum Layer {
    Defaults(Value),
    File(Value),
    Environment(Value),
    Cli(Value),
}

/// Merges `layers` in the order given.
pub fn merge_layers(layers: Vec<Layer>) -> RevwatchConfig {
    let mut composer = MergeComposer::new();

    for layer in layers {
        match layer {
            Layer::Defaults(value) => composer.push_defaults(value),
            Layer::File(value) => composer.push_file(value, None),
            Layer::Environment(value) => composer.push_environment(value),
            Layer::Cli(value) => composer.push_cli(value),
        }
    }

    RevwatchConfig::merge_from_layers(composer.layers()).expect("layers should merge")
}
