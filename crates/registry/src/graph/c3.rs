//! C3 merge of parent linearizations.

use smallvec::SmallVec;

use super::DescriptorId;

/// Merges `seqs` into one order that keeps every input sequence's relative
/// order, picking at each step the first head (in sequence order) that does
/// not appear in the tail of any other sequence.
///
/// Returns `None` when no such order exists.
pub(crate) fn merge(mut seqs: SmallVec<[&[DescriptorId]; 4]>) -> Option<Vec<DescriptorId>> {
	let mut out = Vec::new();
	loop {
		seqs.retain(|seq| !seq.is_empty());
		if seqs.is_empty() {
			return Some(out);
		}

		let candidate = seqs
			.iter()
			.map(|seq| seq[0])
			.find(|head| !seqs.iter().any(|seq| seq[1..].contains(head)))?;

		out.push(candidate);
		for seq in seqs.iter_mut() {
			let current = *seq;
			if current[0] == candidate {
				*seq = &current[1..];
			}
		}
	}
}

/// Linearizes a node from its parents' linearizations and the parent list.
///
/// `head` (the node itself) is placed first when given; anonymous
/// capability sets such as those of objects pass `None`.
pub(crate) fn linearize(
	head: Option<DescriptorId>,
	parent_linearizations: &[&[DescriptorId]],
	parents: &[DescriptorId],
) -> Option<Vec<DescriptorId>> {
	let mut seqs: SmallVec<[&[DescriptorId]; 4]> = parent_linearizations.iter().copied().collect();
	seqs.push(parents);

	let merged = merge(seqs)?;
	let mut out = Vec::with_capacity(merged.len() + 1);
	out.extend(head);
	out.extend(merged);
	Some(out)
}
