use anyhow::{Context, Result};
use maxent_linear::Instance;
use std::{
	fs::File,
	io::{BufRead, BufReader},
	path::Path,
};

/// Read the instances in the file at `path`, one per line. Blank lines and lines starting with `#` are ignored, and lines that fail to parse are skipped with a warning.
pub fn load_instances(path: &Path) -> Result<Vec<Instance>> {
	let file =
		File::open(path).with_context(|| format!("failed to open data file {}", path.display()))?;
	let reader = BufReader::new(file);
	let mut instances = Vec::new();
	for (index, line) in reader.lines().enumerate() {
		let line = line.with_context(|| format!("failed to read data file {}", path.display()))?;
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		match line.parse::<Instance>() {
			Ok(instance) => instances.push(instance),
			Err(error) => log::warn!(
				"{}:{}: skipping unparseable line: {}",
				path.display(),
				index + 1,
				error
			),
		}
	}
	Ok(instances)
}

#[test]
fn test_load_instances() {
	let path = std::env::temp_dir().join(format!("maxent_load_{}.txt", std::process::id()));
	std::fs::write(
		&path,
		"# weather\nout sunny warm:2\n\nin rainy:x\n  in rainy  \n",
	)
	.unwrap();
	let instances = load_instances(&path).unwrap();
	std::fs::remove_file(&path).unwrap();
	assert_eq!(
		instances,
		vec![
			Instance::new("out", vec![("sunny".to_owned(), 1.0), ("warm".to_owned(), 2.0)]),
			Instance::new("in", vec![("rainy".to_owned(), 1.0)]),
		]
	);
	assert!(load_instances(Path::new("/nonexistent/maxent/data.txt")).is_err());
}
