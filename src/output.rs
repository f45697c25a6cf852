//! Output serializers for the log buffer and the summary.

use std::io::Write;

use tabled::{Table, Tabled};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::metrics::MetricRecord;
use crate::stats::{MilestoneRow, Summary};

/// Header line emitted before CSV data rows.
pub const CSV_HEADER: &str = "timestamp,milestone,duration_ms,memory_rss_kb,\
memory_virt_kb,thread_count,iteration,convergence_metric,cpu_percent,label,context";

/// Write every record to `writer` in `format`, with a header for the
/// column-oriented formats. JSON output is one document (an array of
/// records); the other formats emit one line per record.
pub(crate) fn write_records<'a, W, I>(writer: &mut W, format: OutputFormat, records: I) -> Result<()>
where
    W: Write,
    I: Iterator<Item = &'a MetricRecord>,
{
    match format {
        OutputFormat::Csv => {
            writeln!(writer, "{}", CSV_HEADER)?;
            for record in records {
                writeln!(writer, "{}", fields(record, ',').join(","))?;
            }
        }
        OutputFormat::Tsv => {
            writeln!(writer, "{}", CSV_HEADER.replace(',', "\t"))?;
            for record in records {
                writeln!(writer, "{}", fields(record, '\t').join("\t"))?;
            }
        }
        OutputFormat::Json => {
            let records: Vec<&MetricRecord> = records.collect();
            let json = serde_json::to_string_pretty(&records)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
            writeln!(writer, "{}", json)?;
        }
        OutputFormat::Human => {
            for record in records {
                writeln!(writer, "{}", human_line(record))?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

// Fixed 11-field order shared by CSV and TSV.
fn fields(record: &MetricRecord, separator: char) -> [String; 11] {
    [
        format!("{}.{:09}", record.timestamp.secs, record.timestamp.nanos),
        record.milestone.name().to_string(),
        format!("{:.3}", record.duration_ms),
        record.memory.rss_kb.to_string(),
        record.memory.virt_kb.to_string(),
        record.thread_count.to_string(),
        record.iteration.unwrap_or(0).to_string(),
        format!("{:.6}", record.convergence_metric.unwrap_or(0.0)),
        format!("{:.2}", record.cpu.cpu_percent),
        sanitize(&record.label, separator),
        sanitize(&record.context, separator),
    ]
}

// Labels are caller-supplied; keep them from breaking the row structure.
fn sanitize(text: &str, separator: char) -> String {
    text.replace([separator, '\n', '\r'], " ")
}

fn human_line(record: &MetricRecord) -> String {
    format!(
        "[{}.{:09}] {}: {:.3} ms, RSS: {} KB, Threads: {}, {}",
        record.timestamp.secs,
        record.timestamp.nanos,
        record.milestone.name(),
        record.duration_ms,
        record.memory.rss_kb,
        record.thread_count,
        record.label,
    )
}

/// Render the human-readable summary block.
pub(crate) fn summary_text(summary: &Summary) -> String {
    let mut text = String::new();
    text.push_str("=== Performance Summary ===\n");
    text.push_str(&format!(
        "Total Runtime: {}\n",
        format_duration(summary.total_runtime_ms)
    ));
    text.push_str(&format!(
        "Peak Memory Usage: {} KB\n",
        summary.peak_memory_kb
    ));
    text.push_str(&format!("Max Threads Used: {}\n", summary.max_threads));
    text.push_str(&format!("Total Log Entries: {}\n", summary.log_entries));
    text.push_str(&format!(
        "Dropped Records: {}\n",
        summary.dropped_records
    ));
    text.push_str(&format!(
        "Total Allocations: {}\n",
        summary.total_allocations
    ));
    text.push_str(&format!(
        "Total Bytes Allocated: {}\n",
        format_memory_size(summary.total_bytes_allocated)
    ));
    text.push_str("===========================\n");
    text
}

#[derive(Tabled)]
struct StatisticsRow {
    #[tabled(rename = "milestone")]
    milestone: &'static str,
    #[tabled(rename = "samples")]
    samples: usize,
    #[tabled(rename = "min (ms)")]
    min: String,
    #[tabled(rename = "mean (ms)")]
    mean: String,
    #[tabled(rename = "max (ms)")]
    max: String,
    #[tabled(rename = "std dev")]
    std_dev: String,
    #[tabled(rename = "p95 (ms)")]
    p95: String,
    #[tabled(rename = "p99 (ms)")]
    p99: String,
}

/// Render the per-milestone statistics table of a detailed report.
pub(crate) fn statistics_table(rows: &[MilestoneRow]) -> String {
    let display_rows: Vec<StatisticsRow> = rows
        .iter()
        .map(|row| StatisticsRow {
            milestone: row.milestone.name(),
            samples: row.stats.sample_count,
            min: format!("{:.3}", row.stats.min),
            mean: format!("{:.3}", row.stats.mean),
            max: format!("{:.3}", row.stats.max),
            std_dev: format!("{:.3}", row.stats.std_dev),
            p95: format!("{:.3}", row.stats.percentile_95),
            p99: format!("{:.3}", row.stats.percentile_99),
        })
        .collect();
    Table::new(display_rows).to_string()
}

/// Human-friendly duration rendering, scaled to ms/s/min.
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1.0 {
        format!("{:.3} ms", duration_ms)
    } else if duration_ms < 1000.0 {
        format!("{:.1} ms", duration_ms)
    } else if duration_ms < 60_000.0 {
        format!("{:.2} s", duration_ms / 1000.0)
    } else {
        format!("{:.1} min", duration_ms / 60_000.0)
    }
}

/// Human-friendly byte-size rendering.
pub fn format_memory_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{} B", bytes)
    } else if bytes_f < MB {
        format!("{:.1} KB", bytes_f / KB)
    } else if bytes_f < GB {
        format!("{:.1} MB", bytes_f / MB)
    } else {
        format!("{:.1} GB", bytes_f / GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::metrics::{CpuSnapshot, MemorySnapshot};
    use crate::milestone::MilestoneKind;
    use crate::stats::MilestoneStatistics;

    fn sample_record() -> MetricRecord {
        MetricRecord {
            milestone: MilestoneKind::ClusteringIteration,
            timestamp: Timestamp { secs: 12, nanos: 345 },
            duration_ms: 125.3456,
            memory: MemorySnapshot {
                rss_kb: 1056,
                virt_kb: 2048,
                ..MemorySnapshot::default()
            },
            cpu: CpuSnapshot {
                cpu_percent: 18.666,
                ..CpuSnapshot::default()
            },
            thread_count: 4,
            iteration: Some(1),
            convergence_metric: Some(0.85),
            label: "iteration_1".to_string(),
            context: "convergence=0.850000".to_string(),
        }
    }

    #[test]
    fn csv_row_has_eleven_fields_with_fixed_precision() {
        let row = fields(&sample_record(), ',');
        assert_eq!(row.len(), 11);
        assert_eq!(row[0], "12.000000345");
        assert_eq!(row[1], "CLUSTERING_ITERATION");
        assert_eq!(row[2], "125.346");
        assert_eq!(row[3], "1056");
        assert_eq!(row[6], "1");
        assert_eq!(row[7], "0.850000");
        assert_eq!(row[8], "18.67");
    }

    #[test]
    fn csv_output_starts_with_the_documented_header() {
        let records = [sample_record()];
        let mut out = Vec::new();
        write_records(&mut out, OutputFormat::Csv, records.iter()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER);
        assert_eq!(lines.next().unwrap().matches(',').count(), 10);
    }

    #[test]
    fn labels_cannot_break_the_row_structure() {
        let mut record = sample_record();
        record.label = "a,b\nc".to_string();
        let row = fields(&record, ',');
        assert_eq!(row[9], "a b c");
    }

    #[test]
    fn tsv_mirrors_csv_fields() {
        let records = [sample_record()];
        let mut out = Vec::new();
        write_records(&mut out, OutputFormat::Tsv, records.iter()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("timestamp\tmilestone"));
        assert_eq!(text.lines().nth(1).unwrap().matches('\t').count(), 10);
    }

    #[test]
    fn json_output_is_an_array_of_records() {
        let records = [sample_record()];
        let mut out = Vec::new();
        write_records(&mut out, OutputFormat::Json, records.iter()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["milestone"], "CLUSTERING_ITERATION");
    }

    #[test]
    fn human_line_is_condensed() {
        let line = human_line(&sample_record());
        assert!(line.starts_with("[12.000000345] CLUSTERING_ITERATION: 125.346 ms"));
        assert!(line.contains("Threads: 4"));
    }

    #[test]
    fn duration_formatting_scales_units() {
        assert_eq!(format_duration(0.5), "0.500 ms");
        assert_eq!(format_duration(12.34), "12.3 ms");
        assert_eq!(format_duration(2500.0), "2.50 s");
        assert_eq!(format_duration(120_000.0), "2.0 min");
    }

    #[test]
    fn memory_formatting_scales_units() {
        assert_eq!(format_memory_size(512), "512 B");
        assert_eq!(format_memory_size(2048), "2.0 KB");
        assert_eq!(format_memory_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_memory_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn statistics_table_lists_each_milestone() {
        let rows = vec![MilestoneRow {
            milestone: MilestoneKind::DistanceCalculation,
            stats: MilestoneStatistics::from_samples(vec![1.0, 2.0, 3.0]).unwrap(),
        }];
        let table = statistics_table(&rows);
        assert!(table.contains("DISTANCE_CALCULATION"));
        assert!(table.contains("samples"));
    }
}
