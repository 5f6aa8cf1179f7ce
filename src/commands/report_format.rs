use chrono::NaiveDate;

use crate::domain::work_item::SimulationStats;
use crate::services::capacity::PeriodCapacity;
use crate::services::simulation_types::{SimulationOutput, SimulationReport};

pub fn format_simulation_report(output: &SimulationOutput) -> String {
    let mut lines = format_report_header(&output.report);
    lines.push(String::new());
    lines.push("Forecast:".to_string());
    lines.push("Item | Due | Start P50 | P10 | P50 | P90 | On time".to_string());
    lines.push("-----|-----|-----------|-----|-----|-----|--------".to_string());
    lines.extend(output.items.iter().map(format_item_row));

    lines.join("\n")
}

fn format_report_header(report: &SimulationReport) -> Vec<String> {
    let seed = match report.seed {
        Some(value) => value.to_string(),
        None => "random".to_string(),
    };

    vec![
        "Simulation Report".to_string(),
        format!("Data source: {}", report.data_source),
        format!("Start date: {}", report.start_date),
        format!("Iterations: {}", report.iterations),
        format!("Period type: {}", report.period_type),
        format!(
            "Default capacity per quarter: {:.1}",
            report.default_capacity_per_quarter
        ),
        format!("Seed: {seed}"),
        format!("Simulated items: {}", report.simulated_items),
    ]
}

fn format_item_row(stats: &SimulationStats) -> String {
    format!(
        "{item} | {due} | {start} | {p10} | {p50} | {p90} | {on_time:.1}%",
        item = stats.item,
        due = stats.due_date,
        start = format_optional_date(stats.start_p50),
        p10 = stats.p10,
        p50 = stats.p50,
        p90 = stats.p90,
        on_time = stats.on_time_probability
    )
}

fn format_optional_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "n/a".to_string(),
    }
}

pub fn format_capacity_timeline(timeline: &[PeriodCapacity]) -> String {
    let mut lines = Vec::with_capacity(timeline.len() + 3);
    lines.push("Capacity Timeline".to_string());
    lines.push("Period | Working days | Capacity | Source".to_string());
    lines.push("-------|--------------|----------|-------".to_string());
    for period in timeline {
        let source = if period.overridden { "override" } else { "default" };
        lines.push(format!(
            "{} | {} | {:.1} | {}",
            period.label, period.working_days, period.capacity, source
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::period::TimePeriodType;
    use crate::test_support::on_date;

    fn build_output() -> SimulationOutput {
        SimulationOutput {
            report: SimulationReport {
                data_source: "roadmap.yaml".to_string(),
                start_date: "2025-01-06".to_string(),
                iterations: 100,
                period_type: TimePeriodType::Quarterly,
                default_capacity_per_quarter: 1300.0,
                seed: Some(7),
                simulated_items: 1,
            },
            items: vec![SimulationStats {
                position: 1,
                item: "Platform".to_string(),
                due_date: on_date(2025, 3, 31),
                on_time_probability: 87.5,
                p10: on_date(2025, 2, 3),
                p50: on_date(2025, 2, 17),
                p90: on_date(2025, 3, 10),
                start_p10: Some(on_date(2025, 1, 6)),
                start_p50: Some(on_date(2025, 1, 6)),
                start_p90: Some(on_date(2025, 1, 6)),
                best_effort: 100.0,
                likely_effort: 150.0,
                worst_effort: 250.0,
            }],
        }
    }

    #[test]
    fn format_simulation_report_includes_header_and_table() {
        let output = format_simulation_report(&build_output());

        assert!(output.contains("Simulation Report"));
        assert!(output.contains("Data source: roadmap.yaml"));
        assert!(output.contains("Start date: 2025-01-06"));
        assert!(output.contains("Iterations: 100"));
        assert!(output.contains("Period type: quarterly"));
        assert!(output.contains("Default capacity per quarter: 1300.0"));
        assert!(output.contains("Seed: 7"));
        assert!(output.contains("Item | Due | Start P50 | P10 | P50 | P90 | On time"));
        assert!(output.contains(
            "Platform | 2025-03-31 | 2025-01-06 | 2025-02-03 | 2025-02-17 | 2025-03-10 | 87.5%"
        ));
    }

    #[test]
    fn format_simulation_report_marks_unseeded_runs() {
        let mut output = build_output();
        output.report.seed = None;
        output.items[0].start_p50 = None;

        let text = format_simulation_report(&output);
        assert!(text.contains("Seed: random"));
        assert!(text.contains("Platform | 2025-03-31 | n/a |"));
    }

    #[test]
    fn format_capacity_timeline_lists_each_period() {
        let timeline = vec![
            PeriodCapacity {
                period: "2025-Q1".to_string(),
                label: "Q1 2025".to_string(),
                capacity: 1000.0,
                working_days: 64,
                overridden: true,
            },
            PeriodCapacity {
                period: "2025-Q2".to_string(),
                label: "Q2 2025".to_string(),
                capacity: 1300.0,
                working_days: 65,
                overridden: false,
            },
        ];

        let output = format_capacity_timeline(&timeline);
        assert!(output.contains("Period | Working days | Capacity | Source"));
        assert!(output.contains("Q1 2025 | 64 | 1000.0 | override"));
        assert!(output.contains("Q2 2025 | 65 | 1300.0 | default"));
    }
}
