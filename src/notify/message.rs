use std::collections::HashSet;

use crate::models::job::Job;

/// Render the single update body shared by every recipient. Every display
/// field appears; the ones in the change-set are wrapped in `**` markers.
pub fn render_update_body(job: &Job, changed_fields: &[String]) -> String {
    let changed: HashSet<&str> = changed_fields.iter().map(|name| name.as_str()).collect();

    let mut lines = vec![format!("Job update: {}", job.reference)];
    lines.push(field_line(&changed, "status", "Status", job.status.as_str().to_string()));
    lines.push(field_line(
        &changed,
        "service_date",
        "Service date",
        job.service_date.to_rfc3339(),
    ));
    lines.push(field_line(
        &changed,
        "pax_adults",
        "Adults",
        job.pax_adults.to_string(),
    ));
    lines.push(field_line(
        &changed,
        "pax_children",
        "Children",
        job.pax_children.to_string(),
    ));
    lines.push(field_line(&changed, "origin", "From", job.origin.clone()));
    lines.push(field_line(&changed, "destination", "To", job.destination.clone()));
    lines.push(field_line(
        &changed,
        "flight_number",
        "Flight",
        job.flight_number.clone().unwrap_or_else(|| "-".to_string()),
    ));
    lines.push(field_line(
        &changed,
        "agent_name",
        "Agent",
        job.agent_name.clone().unwrap_or_else(|| "-".to_string()),
    ));
    lines.push(field_line(
        &changed,
        "customer_name",
        "Customer",
        job.customer_name.clone().unwrap_or_else(|| "-".to_string()),
    ));

    lines.join("\n")
}

fn field_line(changed: &HashSet<&str>, name: &str, label: &str, value: String) -> String {
    if changed.contains(name) {
        format!("** {label}: {value} **")
    } else {
        format!("{label}: {value}")
    }
}
