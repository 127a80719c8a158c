use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/**
A `Vocabulary` assigns dense ids to strings in the order they are first seen. A model has two: one for the class labels and one for the feature names.

Only the list of names is serialized. The lookup map is rebuilt when a `Vocabulary` is deserialized.
*/
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
	names: Vec<String>,
	ids: FnvHashMap<String, usize>,
}

impl Vocabulary {
	pub fn new() -> Self {
		Self::default()
	}

	/// Retrieve the id for `name`, assigning the next id if `name` has not been seen before.
	pub fn get_or_insert(&mut self, name: &str) -> usize {
		if let Some(id) = self.ids.get(name) {
			return *id;
		}
		let id = self.names.len();
		self.names.push(name.to_owned());
		self.ids.insert(name.to_owned(), id);
		id
	}

	pub fn get(&self, name: &str) -> Option<usize> {
		self.ids.get(name).copied()
	}

	pub fn name(&self, id: usize) -> &str {
		&self.names[id]
	}

	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}
}

impl PartialEq for Vocabulary {
	fn eq(&self, other: &Self) -> bool {
		self.names == other.names
	}
}

impl From<Vec<String>> for Vocabulary {
	fn from(names: Vec<String>) -> Self {
		let ids = names
			.iter()
			.enumerate()
			.map(|(id, name)| (name.clone(), id))
			.collect();
		Self { names, ids }
	}
}

impl From<Vocabulary> for Vec<String> {
	fn from(vocabulary: Vocabulary) -> Self {
		vocabulary.names
	}
}

#[test]
fn test_vocabulary() {
	let mut vocabulary = Vocabulary::new();
	assert_eq!(vocabulary.get_or_insert("sunny"), 0);
	assert_eq!(vocabulary.get_or_insert("rainy"), 1);
	assert_eq!(vocabulary.get_or_insert("sunny"), 0);
	assert_eq!(vocabulary.get("rainy"), Some(1));
	assert_eq!(vocabulary.get("cloudy"), None);
	assert_eq!(vocabulary.name(1), "rainy");
	assert_eq!(vocabulary.len(), 2);
	let reloaded = Vocabulary::from(Vec::<String>::from(vocabulary.clone()));
	assert_eq!(reloaded, vocabulary);
	assert_eq!(reloaded.get("rainy"), Some(1));
}
