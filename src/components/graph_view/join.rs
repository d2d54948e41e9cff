use std::collections::HashSet;

/// Outcome of matching previously rendered keys against the next keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyedDiff {
	/// Keys only present in the next set, in next order.
	pub added: Vec<String>,
	/// Keys present in both, in next order.
	pub retained: Vec<String>,
	/// Keys only present in the previous set, in previous order.
	pub removed: Vec<String>,
}

impl KeyedDiff {
	pub fn is_unchanged(&self) -> bool {
		self.added.is_empty() && self.removed.is_empty()
	}
}

/// Split keys into added / retained / removed. Repeated keys in `next` count once.
pub fn diff<'p, 'n, P, N>(previous: P, next: N) -> KeyedDiff
where
	P: IntoIterator<Item = &'p str>,
	N: IntoIterator<Item = &'n str>,
{
	let previous: Vec<&str> = previous.into_iter().collect();
	let before: HashSet<&str> = previous.iter().copied().collect();
	let mut after = HashSet::new();
	let mut out = KeyedDiff::default();

	for key in next {
		if !after.insert(key) {
			continue;
		}
		if before.contains(key) {
			out.retained.push(key.to_owned());
		} else {
			out.added.push(key.to_owned());
		}
	}
	out.removed = previous
		.into_iter()
		.filter(|key| !after.contains(*key))
		.map(str::to_owned)
		.collect();
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_keys_three_ways() {
		let d = diff(["a", "b", "c"], ["c", "d", "a"]);
		assert_eq!(d.added, ["d"]);
		assert_eq!(d.retained, ["c", "a"]);
		assert_eq!(d.removed, ["b"]);
		assert!(!d.is_unchanged());
	}

	#[test]
	fn repeated_next_keys_count_once() {
		let d = diff(Vec::<&str>::new(), ["x", "x", "y"]);
		assert_eq!(d.added, ["x", "y"]);
		assert!(d.removed.is_empty());
	}

	#[test]
	fn same_keys_are_unchanged() {
		let d = diff(["a", "b"], ["b", "a"]);
		assert!(d.is_unchanged());
		assert_eq!(d.retained.len(), 2);
	}
}
