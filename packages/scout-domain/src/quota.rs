/// Number of sends granted to one template given the remaining run cap.
///
/// A template that fits under the cap keeps its own ceiling. When the cap cuts the ceiling and the
/// portal only accepts fixed bulk sizes, the grant snaps down to the largest accepted size; zero
/// means the cap is exhausted for this run.
pub fn allot(ceiling: u32, remaining: u32, increments: &[u32]) -> u32 {
	let wanted = ceiling.min(remaining);

	if wanted == ceiling || increments.is_empty() {
		return wanted;
	}

	increments.iter().copied().filter(|step| *step <= wanted).max().unwrap_or(0)
}
