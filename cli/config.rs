/*!
This module defines the `Config` struct, which is read from the YAML file passed to `maxent train --config`. Every field is optional. Command line flags take precedence over the config file, and the config file takes precedence over the defaults.
*/

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub optim_method: Option<String>,
	pub l1_regularization: Option<f64>,
	pub l2_regularization: Option<f64>,
	pub num_heldout: Option<usize>,
	pub sgd: Option<SgdConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgdConfig {
	pub max_epochs: Option<usize>,
	pub learning_rate: Option<f64>,
	pub decay: Option<f64>,
	pub seed: Option<u64>,
}

pub fn load_config(config_path: Option<&Path>) -> Result<Option<Config>> {
	if let Some(config_path) = config_path {
		let config = std::fs::read_to_string(config_path)
			.with_context(|| format!("failed to read config file {}", config_path.display()))?;
		let config = serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?;
		Ok(Some(config))
	} else {
		Ok(None)
	}
}

#[test]
fn test_parse_config() {
	let config: Config = serde_yaml::from_str(
		r#"
l1_regularization: 0.5
num_heldout: 10
sgd:
  max_epochs: 20
  seed: 7
"#,
	)
	.unwrap();
	insta::assert_debug_snapshot!(config, @r###"
 Config {
     optim_method: None,
     l1_regularization: Some(
         0.5,
     ),
     l2_regularization: None,
     num_heldout: Some(
         10,
     ),
     sgd: Some(
         SgdConfig {
             max_epochs: Some(
                 20,
             ),
             learning_rate: None,
             decay: None,
             seed: Some(
                 7,
             ),
         },
     ),
 }
 "###);
	assert!(serde_yaml::from_str::<Config>("l3_regularization: 1.0").is_err());
}
