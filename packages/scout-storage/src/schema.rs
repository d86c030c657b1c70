pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_agent_robots.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_agent_robots.sql")),
				"tables/002_scout_services.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_scout_services.sql")),
				"tables/003_scout_service_templates.sql" => out
					.push_str(include_str!("../../../sql/tables/003_scout_service_templates.sql")),
				"tables/004_pending_entries.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_pending_entries.sql")),
				"tables/005_job_seekers.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_job_seekers.sql")),
				"tables/006_job_seeker_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_job_seeker_documents.sql")),
				"tables/007_message_groups.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_message_groups.sql")),
				"tables/008_task_groups.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_task_groups.sql")),
				"tables/009_tasks.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_tasks.sql")),
				_ => {},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_include_is_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in [
			"agent_robots",
			"scout_services",
			"scout_service_templates",
			"pending_entries",
			"job_seekers",
			"job_seeker_documents",
			"message_groups",
			"task_groups",
			"tasks",
		] {
			assert!(
				sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
				"Missing table {table}."
			);
		}
	}
}
