use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use mebo_codecs::CodecRegistry;
use mebo_core::{
    CompressionCodec, EncoderOptions, NumericDecoder, NumericEncoder, NumericReader, TextDecoder, TextEncoder,
    TextReader, TimestampEncodingOption, ValueEncoding,
};

#[derive(Parser)]
#[command(
    name = "mebo",
    about = "Encode a metric stream into a mebo blob, inspect a blob's header/index, and dump a metric's points back out",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a CSV or JSON-lines metric stream into a numeric or text blob
    Encode {
        /// Source metric stream ("-" reads stdin)
        input: PathBuf,
        /// Destination blob file
        output: PathBuf,
        /// Blob family: numeric | text
        #[arg(long, default_value = "numeric")]
        kind: String,
        /// Input record format: csv | jsonl
        #[arg(long, default_value = "csv")]
        format: String,
        /// Treat the metric column/field as a numeric id instead of a name
        #[arg(long)]
        ids: bool,
        /// Carry a per-point tag column/field
        #[arg(long)]
        tags: bool,
        /// Timestamp encoding: raw | delta
        #[arg(long, default_value = "delta")]
        ts_encoding: String,
        /// Value encoding (numeric blobs only): raw | gorilla
        #[arg(long, default_value = "raw")]
        value_encoding: String,
        /// Timestamp payload compression: none | zstd | s2 | lz4
        #[arg(long, default_value = "zstd")]
        ts_codec: String,
        /// Value/data payload compression: none | zstd | s2 | lz4
        #[arg(long, default_value = "zstd")]
        value_codec: String,
        /// Byte order written into the blob: little | big
        #[arg(long, default_value = "little")]
        endian: String,
        /// Zstd compression level, when a zstd codec is selected
        #[arg(long, default_value_t = 3)]
        zstd_level: i32,
    },
    /// Print header fields and blob-level statistics
    Inspect {
        /// Blob file to inspect
        file: PathBuf,
        /// Blob family: numeric | text
        #[arg(long, default_value = "numeric")]
        kind: String,
        /// Print every index entry
        #[arg(long)]
        index: bool,
    },
    /// Decode a blob and print one metric's points
    Dump {
        /// Blob file to read
        file: PathBuf,
        /// Blob family: numeric | text
        #[arg(long, default_value = "numeric")]
        kind: String,
        /// Metric name, or a numeric id when --id is given
        metric: String,
        /// Treat `metric` as a numeric id instead of a name
        #[arg(long)]
        id: bool,
    },
}

// ── Record model: the CLI's own parsing layer, not part of the wire format ──

enum Value {
    Numeric(f64),
    Text(String),
}

struct Record {
    metric: String,
    ts: i64,
    value: Value,
    tag: Option<String>,
}

fn parse_csv_line(line: &str, numeric: bool) -> anyhow::Result<Record> {
    let parts: Vec<&str> = line.splitn(4, ',').collect();
    if parts.len() < 3 {
        bail!("malformed CSV row (need metric,timestamp_us,value[,tag]): {line:?}");
    }
    let ts: i64 = parts[1].trim().parse().with_context(|| format!("parsing timestamp in row {line:?}"))?;
    let value = if numeric {
        Value::Numeric(parts[2].trim().parse().with_context(|| format!("parsing value in row {line:?}"))?)
    } else {
        Value::Text(parts[2].trim().to_string())
    };
    let tag = parts.get(3).map(|t| t.trim().to_string());
    Ok(Record {
        metric: parts[0].trim().to_string(),
        ts,
        value,
        tag,
    })
}

fn parse_jsonl_line(line: &str, numeric: bool) -> anyhow::Result<Record> {
    let row: serde_json::Value = serde_json::from_str(line).with_context(|| format!("parsing JSON row {line:?}"))?;
    let metric = match &row["metric"] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => bail!("row {line:?} has no usable \"metric\" field, got {other:?}"),
    };
    let ts = row["ts"].as_i64().ok_or_else(|| anyhow::anyhow!("row {line:?} has no integer \"ts\" field"))?;
    let value = if numeric {
        let v = row["value"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("row {line:?} has no numeric \"value\" field"))?;
        Value::Numeric(v)
    } else {
        let v = row["value"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("row {line:?} has no string \"value\" field"))?;
        Value::Text(v.to_string())
    };
    let tag = row["tag"].as_str().map(|s| s.to_string());
    Ok(Record { metric, ts, value, tag })
}

fn read_records(input: &PathBuf, format: &str, numeric: bool) -> anyhow::Result<Vec<Record>> {
    let lines: Box<dyn Iterator<Item = io::Result<String>>> = if input.to_str() == Some("-") {
        Box::new(BufReader::new(io::stdin()).lines())
    } else {
        let file = File::open(input).with_context(|| format!("opening input file {input:?}"))?;
        Box::new(BufReader::new(file).lines())
    };

    let mut records = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = match format {
            "csv" => parse_csv_line(&line, numeric)?,
            "jsonl" | "json-lines" | "ndjson" => parse_jsonl_line(&line, numeric)?,
            other => bail!("unknown input format '{other}'. Valid options: csv, jsonl"),
        };
        records.push(record);
    }
    Ok(records)
}

/// Groups records by metric, preserving first-appearance order (the order
/// metrics are started in matters for the blob's index but not its
/// semantics).
fn group_by_metric(records: Vec<Record>) -> Vec<(String, Vec<Record>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for record in records {
        if !groups.contains_key(&record.metric) {
            order.push(record.metric.clone());
        }
        groups.entry(record.metric.clone()).or_default().push(record);
    }
    order
        .into_iter()
        .map(|name| {
            let rows = groups.remove(&name).unwrap();
            (name, rows)
        })
        .collect()
}

fn codec_from_name(name: &str) -> anyhow::Result<CompressionCodec> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Ok(CompressionCodec::None),
        "zstd" => Ok(CompressionCodec::Zstd),
        "s2" => Ok(CompressionCodec::S2),
        "lz4" => Ok(CompressionCodec::Lz4),
        other => bail!("unknown codec '{other}'. Valid options: none, zstd, s2, lz4"),
    }
}

fn ts_encoding_from_name(name: &str) -> anyhow::Result<TimestampEncodingOption> {
    match name.to_ascii_lowercase().as_str() {
        "raw" => Ok(TimestampEncodingOption::Raw),
        "delta" => Ok(TimestampEncodingOption::Delta),
        other => bail!("unknown timestamp encoding '{other}'. Valid options: raw, delta"),
    }
}

fn value_encoding_from_name(name: &str) -> anyhow::Result<ValueEncoding> {
    match name.to_ascii_lowercase().as_str() {
        "raw" => Ok(ValueEncoding::Raw),
        "gorilla" => Ok(ValueEncoding::Gorilla),
        other => bail!("unknown value encoding '{other}'. Valid options: raw, gorilla"),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ──────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_encode(
    input: PathBuf,
    output: PathBuf,
    kind: &str,
    format: &str,
    ids: bool,
    tags: bool,
    ts_encoding: &str,
    value_encoding: &str,
    ts_codec: &str,
    value_codec: &str,
    endian: &str,
    zstd_level: i32,
) -> anyhow::Result<()> {
    let numeric = match kind {
        "numeric" => true,
        "text" => false,
        other => bail!("unknown blob kind '{other}'. Valid options: numeric, text"),
    };

    let t0 = Instant::now();
    let records = read_records(&input, format, numeric)?;
    if records.is_empty() {
        bail!("no records read from {input:?}");
    }
    let start_time_us = records.iter().map(|r| r.ts).min().unwrap();
    let groups = group_by_metric(records);
    let metric_count = groups.len();

    let options = EncoderOptions::default()
        .with_timestamp_encoding(ts_encoding_from_name(ts_encoding)?)
        .with_value_encoding(value_encoding_from_name(value_encoding)?)
        .with_timestamp_compression(codec_from_name(ts_codec)?)
        .with_value_compression(codec_from_name(value_codec)?)
        .with_data_compression(codec_from_name(value_codec)?)
        .with_endian_str(endian)
        .with_tags_enabled(tags);
    let registry = CodecRegistry::with_zstd_level(zstd_level);

    let bytes = if numeric {
        let mut enc = NumericEncoder::new(start_time_us, options);
        for (metric, rows) in groups {
            if ids {
                let id: u64 = metric.parse().with_context(|| format!("parsing metric id '{metric}'"))?;
                enc.start_metric_id(id, rows.len())?;
            } else {
                enc.start_metric_name(&metric, rows.len())?;
            }
            for row in &rows {
                let v = match row.value {
                    Value::Numeric(v) => v,
                    Value::Text(_) => bail!("row for metric '{metric}' carries a text value in a numeric blob"),
                };
                enc.add_data_point(row.ts, v, row.tag.as_deref())?;
            }
            enc.end_metric()?;
        }
        enc.finish(&registry)?
    } else {
        let mut enc = TextEncoder::new(start_time_us, options);
        for (metric, rows) in groups {
            if ids {
                let id: u64 = metric.parse().with_context(|| format!("parsing metric id '{metric}'"))?;
                enc.start_metric_id(id, rows.len())?;
            } else {
                enc.start_metric_name(&metric, rows.len())?;
            }
            for row in &rows {
                let v = match &row.value {
                    Value::Text(v) => v.as_str(),
                    Value::Numeric(_) => bail!("row for metric '{metric}' carries a numeric value in a text blob"),
                };
                enc.add_data_point(row.ts, v, row.tag.as_deref())?;
            }
            enc.end_metric()?;
        }
        enc.finish(&registry)?
    };

    std::fs::write(&output, &bytes).with_context(|| format!("writing output file {output:?}"))?;
    let elapsed = t0.elapsed();

    eprintln!("  kind        : {kind}");
    eprintln!("  metrics     : {metric_count}");
    eprintln!("  blob size   : {}", human_bytes(bytes.len() as u64));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, kind: &str, show_index: bool) -> anyhow::Result<()> {
    let buf = std::fs::read(&file).with_context(|| format!("reading blob file {file:?}"))?;
    let registry = CodecRegistry::new();

    println!("=== mebo blob: {file:?} ===");
    println!();
    match kind {
        "numeric" => {
            let decoder = NumericDecoder::open(&buf, &registry)?;
            println!("  kind           : numeric");
            println!("  start time     : {} us", decoder.start_time_us());
            println!("  endian         : {:?}", decoder.endian());
            println!("  timestamp enc  : {:?}", decoder.timestamp_encoding());
            println!("  has tag        : {}", decoder.has_tag());
            println!("  metric count   : {}", decoder.metric_count());
            println!("  raw size       : {}", human_bytes(decoder.raw_size()));
            println!("  compressed     : {}", human_bytes(decoder.compressed_size()));
            println!("  file on disk   : {}", human_bytes(buf.len() as u64));
            println!("  ratio          : {:.2}x", decoder.compression_ratio());

            if show_index {
                println!();
                println!("  {:>4}  {:>20}  {:>6}  {:>10}  {:>10}  {:>10}", "idx", "metric id", "count", "ts delta", "val delta", "tag delta");
                println!("  {}", "-".repeat(70));
                for (i, e) in decoder.index_entries().iter().enumerate() {
                    println!(
                        "  {:>4}  {:>#20x}  {:>6}  {:>10}  {:>10}  {:>10}",
                        i, e.metric_id, e.count, e.ts_offset_delta, e.val_offset_delta, e.tag_offset_delta
                    );
                }
            }
        }
        "text" => {
            let decoder = TextDecoder::open(&buf, &registry)?;
            println!("  kind           : text");
            println!("  start time     : {} us", decoder.start_time_us());
            println!("  endian         : {:?}", decoder.endian());
            println!("  timestamp enc  : {:?}", decoder.timestamp_encoding());
            println!("  has tag        : {}", decoder.has_tag());
            println!("  metric count   : {}", decoder.metric_count());
            println!("  raw size       : {}", human_bytes(decoder.raw_size()));
            println!("  compressed     : {}", human_bytes(decoder.compressed_size()));
            println!("  file on disk   : {}", human_bytes(buf.len() as u64));
            println!("  ratio          : {:.2}x", decoder.compression_ratio());

            if show_index {
                println!();
                println!("  {:>4}  {:>20}  {:>6}  {:>12}", "idx", "metric id", "count", "offset delta");
                println!("  {}", "-".repeat(50));
                for (i, e) in decoder.index_entries().iter().enumerate() {
                    println!("  {:>4}  {:>#20x}  {:>6}  {:>12}", i, e.metric_id, e.count, e.offset_delta);
                }
            }
        }
        other => bail!("unknown blob kind '{other}'. Valid options: numeric, text"),
    }
    Ok(())
}

fn run_dump(file: PathBuf, kind: &str, metric: &str, by_id: bool) -> anyhow::Result<()> {
    let buf = std::fs::read(&file).with_context(|| format!("reading blob file {file:?}"))?;
    let registry = CodecRegistry::new();

    match kind {
        "numeric" => {
            let reader = NumericReader::open(&buf, &registry)?;
            let points: Vec<_> = if by_id {
                let id: u64 = metric.parse().with_context(|| format!("parsing metric id '{metric}'"))?;
                reader.all(id).collect()
            } else {
                reader.all_by_name(metric).collect()
            };
            if points.is_empty() {
                bail!("metric '{metric}' not found in {file:?}");
            }
            println!("{:>20}  {:>16}  tag", "timestamp_us", "value");
            for (ts, value, tag) in points {
                println!("{ts:>20}  {value:>16}  {}", tag.unwrap_or_default());
            }
        }
        "text" => {
            let reader = TextReader::open(&buf, &registry)?;
            let points: Vec<_> = if by_id {
                let id: u64 = metric.parse().with_context(|| format!("parsing metric id '{metric}'"))?;
                reader.all(id).collect()
            } else {
                reader.all_by_name(metric).collect()
            };
            if points.is_empty() {
                bail!("metric '{metric}' not found in {file:?}");
            }
            println!("{:>20}  {:<30}  tag", "timestamp_us", "value");
            for (ts, value, tag) in points {
                println!("{ts:>20}  {value:<30}  {}", tag.unwrap_or_default());
            }
        }
        other => bail!("unknown blob kind '{other}'. Valid options: numeric, text"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            input,
            output,
            kind,
            format,
            ids,
            tags,
            ts_encoding,
            value_encoding,
            ts_codec,
            value_codec,
            endian,
            zstd_level,
        } => run_encode(
            input,
            output,
            &kind,
            &format,
            ids,
            tags,
            &ts_encoding,
            &value_encoding,
            &ts_codec,
            &value_codec,
            &endian,
            zstd_level,
        ),
        Commands::Inspect { file, kind, index } => run_inspect(file, &kind, index),
        Commands::Dump { file, kind, metric, id } => run_dump(file, &kind, &metric, id),
    }
}
