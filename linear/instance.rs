use std::{fmt, str::FromStr};
use thiserror::Error;

/**
An `Instance` is a labeled training example before it is compiled against a [`FeatureTable`](struct.FeatureTable.html): a class label and a sparse list of named feature values.

The text format is one instance per line, `label feature[:value] feature[:value] ...`, separated by whitespace. A feature without a value has the value `1.0`. The value follows the last `:` in the token.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
	pub label: String,
	pub features: Vec<(String, f64)>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseInstanceError {
	#[error("the instance has no label")]
	MissingLabel,
	#[error("the feature \"{0}\" has an empty name")]
	EmptyFeatureName(String),
	#[error("the feature \"{0}\" has an invalid value")]
	InvalidValue(String),
	#[error("the feature \"{0}\" has a value that is not finite")]
	NonFiniteValue(String),
}

impl Instance {
	pub fn new(label: impl Into<String>, features: Vec<(String, f64)>) -> Self {
		Self {
			label: label.into(),
			features,
		}
	}
}

impl FromStr for Instance {
	type Err = ParseInstanceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut tokens = s.split_whitespace();
		let label = tokens.next().ok_or(ParseInstanceError::MissingLabel)?;
		let features = tokens.map(parse_feature).collect::<Result<_, _>>()?;
		Ok(Self::new(label, features))
	}
}

fn parse_feature(token: &str) -> Result<(String, f64), ParseInstanceError> {
	let (name, value) = match token.rfind(':') {
		Some(index) => {
			let value = token[index + 1..]
				.parse::<f64>()
				.map_err(|_| ParseInstanceError::InvalidValue(token.to_owned()))?;
			(&token[..index], value)
		}
		None => (token, 1.0),
	};
	if name.is_empty() {
		return Err(ParseInstanceError::EmptyFeatureName(token.to_owned()));
	}
	if !value.is_finite() {
		return Err(ParseInstanceError::NonFiniteValue(token.to_owned()));
	}
	Ok((name.to_owned(), value))
}

impl fmt::Display for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.label)?;
		for (name, value) in self.features.iter() {
			write!(f, " {}:{}", name, value)?;
		}
		Ok(())
	}
}

#[test]
fn test_parse() {
	let instance: Instance = "outdoor sunny temp:0.5 windy:-2".parse().unwrap();
	insta::assert_debug_snapshot!(instance, @r###"
 Instance {
     label: "outdoor",
     features: [
         (
             "sunny",
             1.0,
         ),
         (
             "temp",
             0.5,
         ),
         (
             "windy",
             -2.0,
         ),
     ],
 }
 "###);
	assert_eq!(instance.to_string(), "outdoor sunny:1 temp:0.5 windy:-2");
	assert_eq!(instance.to_string().parse::<Instance>().unwrap(), instance);
}

#[test]
fn test_parse_errors() {
	assert_eq!(
		"   ".parse::<Instance>(),
		Err(ParseInstanceError::MissingLabel)
	);
	assert_eq!(
		"a b:x".parse::<Instance>(),
		Err(ParseInstanceError::InvalidValue("b:x".to_owned()))
	);
	assert_eq!(
		"a :1".parse::<Instance>(),
		Err(ParseInstanceError::EmptyFeatureName(":1".to_owned()))
	);
	assert_eq!(
		"a b:nan".parse::<Instance>(),
		Err(ParseInstanceError::NonFiniteValue("b:nan".to_owned()))
	);
	assert_eq!(
		"a b:inf".parse::<Instance>(),
		Err(ParseInstanceError::NonFiniteValue("b:inf".to_owned()))
	);
	assert_eq!(
		"label-only".parse::<Instance>().unwrap(),
		Instance::new("label-only", vec![])
	);
}
