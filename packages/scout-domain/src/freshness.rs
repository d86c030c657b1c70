use time::{Duration, OffsetDateTime};

/// A send older than the window before the run started is reported as failed.
pub fn is_stale(
	last_send_at: Option<OffsetDateTime>,
	run_started_at: OffsetDateTime,
	window: Duration,
) -> bool {
	match last_send_at {
		Some(at) => run_started_at - at > window,
		None => true,
	}
}

/// Count shown for a template: a stale send is void.
pub fn reported_count(
	last_send_at: Option<OffsetDateTime>,
	last_send_count: i32,
	run_started_at: OffsetDateTime,
	window: Duration,
) -> i32 {
	if is_stale(last_send_at, run_started_at, window) { 0 } else { last_send_count }
}

/// True when every template has been idle for at least `idle`; the service total restarts then.
pub fn all_idle<I>(last_sends: I, now: OffsetDateTime, idle: Duration) -> bool
where
	I: IntoIterator<Item = Option<OffsetDateTime>>,
{
	last_sends.into_iter().all(|last| match last {
		Some(at) => now - at >= idle,
		None => true,
	})
}
