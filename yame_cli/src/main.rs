use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use yame_core::column::{Column, Inflated, Serialized};
use yame_core::format::Format;
use yame_core::index::SampleIndex;
use yame_core::reader::Reader;
use yame_core::writer::Writer;
use yame_formats::fmt7;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "yame",
    about = "Whole-genome methylation column store — inspect, slice, and re-index YAME files",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-record format/row-count/size summary for a file
    Info { file: PathBuf },
    /// Pretty-print decoded values of one record
    Hprint {
        file: PathBuf,
        /// Zero-based record index
        #[arg(short, long, default_value_t = 0)]
        record: u64,
        /// Number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
    },
    /// Decode every record in a file to tab-separated text
    Unpack {
        file: PathBuf,
        /// Destination file ("-" writes to stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
    /// Ingest "chrom<TAB>pos0" lines into a format-7 coordinates record
    Pack {
        /// Text file of "chrom<TAB>pos0" lines ("-" reads stdin)
        input: PathBuf,
        output: PathBuf,
    },
    /// Turn one column of per-row floats into a format-0 call vector
    Binarize {
        /// Text file of one float per line ("-" reads stdin)
        input: PathBuf,
        output: PathBuf,
        /// Values strictly greater than this threshold set the bit
        #[arg(short, long, default_value_t = 0.5)]
        threshold: f32,
    },
    /// Keep only rows where a format-0 mask record is set
    Mask { file: PathBuf, mask_file: PathBuf, output: PathBuf },
    /// Row range `[begin, end]`, 1-based inclusive
    Subset {
        file: PathBuf,
        begin: u64,
        end: u64,
        output: PathBuf,
    },
    /// Select rows by 1-based index, one per line of `indices_file`
    Rowsub { file: PathBuf, indices_file: PathBuf, output: PathBuf },
    /// Keep every `stride`-th row starting at row 1
    Dsample {
        file: PathBuf,
        stride: u64,
        output: PathBuf,
    },
    /// Elementwise combine two same-shaped records
    Rowop {
        file_a: PathBuf,
        file_b: PathBuf,
        /// add | sub | min | max
        #[arg(short, long, default_value = "sub")]
        op: String,
        output: PathBuf,
    },
    /// Print mean absolute difference between two same-shaped float-beta records
    Pairwise { file_a: PathBuf, file_b: PathBuf },
    /// Summarize a file's records (format, row count, coverage/beta stats)
    Summary { file: PathBuf },
    /// Split a multi-record file into one file per record
    Split { file: PathBuf, out_dir: PathBuf },
    /// Re-chunk one record's rows into fixed-size pieces
    Chunk {
        file: PathBuf,
        #[arg(short, long)]
        rows_per_chunk: u64,
        output: PathBuf,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

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

fn read_all_records(file: &PathBuf) -> anyhow::Result<Vec<Column<Serialized>>> {
    let mut reader = Reader::open(file).with_context(|| format!("opening {:?}", file))?;
    let mut out = Vec::new();
    while let Some(col) = reader.read_next()? {
        out.push(col);
    }
    Ok(out)
}

fn read_one_record(file: &PathBuf, index: u64) -> anyhow::Result<Column<Serialized>> {
    let mut reader = Reader::open(file).with_context(|| format!("opening {:?}", file))?;
    let recs = reader.read_range(index, index + 1)?;
    recs.into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("record {index} not found in {:?}", file))
}

fn open_output(output: &PathBuf) -> anyhow::Result<Box<dyn Write>> {
    if output.to_str() == Some("-") {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(fs::File::create(output).with_context(|| format!("creating {:?}", output))?))
    }
}

fn write_records(output: &PathBuf, records: &[Column<Serialized>]) -> anyhow::Result<()> {
    let mut writer = Writer::create(output).with_context(|| format!("creating {:?}", output))?;
    for col in records {
        writer.write_one(col)?;
    }
    Ok(())
}

// ── hprint / unpack rendering ────────────────────────────────────────────

fn render_fixed_row(fmt: Format, inflated: &Column<Inflated>, row: u64) -> anyhow::Result<String> {
    Ok(match fmt {
        Format::Bit => {
            let bit = (inflated.payload()[(row >> 3) as usize] >> (row & 7)) & 1;
            bit.to_string()
        }
        Format::Rle => (inflated.payload()[row as usize] as char).to_string(),
        Format::Categorical => {
            let aux = yame_formats::fmt2::build_aux(inflated)?;
            let key = yame_formats::fmt2::f2_get_string(&aux, row as usize)?;
            String::from_utf8_lossy(key).into_owned()
        }
        Format::SequencingCounts => {
            let unit = inflated
                .unit()
                .ok_or_else(|| anyhow::anyhow!("sequencing-counts record missing unit"))?;
            let (m, u) = yame_formats::fmt3::get_mu(inflated.payload(), row as usize, unit);
            format!("M={m} U={u} cov={} beta={:.4}", yame_formats::fmt3::mu_to_cov(m, u), yame_formats::fmt3::mu_to_beta(m, u))
        }
        Format::FloatBeta => {
            let start = row as usize * 4;
            let bytes: [u8; 4] = inflated.payload()[start..start + 4].try_into().unwrap();
            f32::from_le_bytes(bytes).to_string()
        }
        Format::TernaryLegacy => inflated.payload()[row as usize].to_string(),
        Format::SetUniverse => {
            if !yame_formats::fmt6::in_uni(inflated, row) {
                "NA".to_string()
            } else if yame_formats::fmt6::in_set(inflated, row) {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        Format::Coordinates => unreachable!("format 7 renders via its own cursor, not row width"),
    })
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_info(file: PathBuf) -> anyhow::Result<()> {
    let records = read_all_records(&file)?;
    println!("=== {:?} ===", file);
    println!("  {:>6}  {:>4}  {:>12}  {:>12}", "record", "fmt", "rows", "bytes");
    let total = records.len();
    for (i, col) in records.into_iter().enumerate() {
        let fmt = col.fmt();
        let bytes = col.payload().len() as u64;
        // `col.rows()` is the raw header `n` field — a byte length, not a row
        // count, for every format but 0 and 6 — so decode to get the true
        // logical row count for display.
        let rows = if fmt == Format::Coordinates { fmt7::row_count(&col)? } else { yame_formats::decompress(col)?.rows() };
        println!("  {:>6}  {:>4}  {:>12}  {:>12}", i, fmt, rows, human_bytes(bytes));
    }
    println!("  total records: {}", total);

    let idx_path = SampleIndex::sidecar_path(&file);
    match SampleIndex::load(&idx_path) {
        Ok(index) => println!("  sample index: {:?} ({} names)", idx_path, index.len()),
        Err(_) => println!("  sample index: none"),
    }
    Ok(())
}

fn run_hprint(file: PathBuf, record: u64, limit: u64) -> anyhow::Result<()> {
    let serialized = read_one_record(&file, record)?;
    let fmt = serialized.fmt();
    println!("record {record}: format {fmt}");

    if fmt == Format::Coordinates {
        let mut cursor = fmt7::CoordCursor::new(serialized.payload());
        let mut shown = 0u64;
        while shown < limit {
            match cursor.next()? {
                Some((chrom, pos1, idx)) => {
                    println!("  {idx}\t{chrom}\t{pos1}");
                    shown += 1;
                }
                None => break,
            }
        }
        return Ok(());
    }

    let inflated = yame_formats::decompress(serialized)?;
    let n = inflated.rows().min(limit);
    for row in 0..n {
        println!("  {row}\t{}", render_fixed_row(fmt, &inflated, row)?);
    }
    Ok(())
}

fn run_unpack(file: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let mut out = open_output(&output)?;
    let records = read_all_records(&file)?;
    for (rec_idx, serialized) in records.into_iter().enumerate() {
        let fmt = serialized.fmt();
        if fmt == Format::Coordinates {
            let payload = serialized.into_payload();
            let mut cursor = fmt7::CoordCursor::new(&payload);
            while let Some((chrom, pos1, row)) = cursor.next()? {
                writeln!(out, "{rec_idx}\t{row}\t{chrom}\t{pos1}")?;
            }
            continue;
        }
        let inflated = yame_formats::decompress(serialized)?;
        for row in 0..inflated.rows() {
            writeln!(out, "{rec_idx}\t{row}\t{}", render_fixed_row(fmt, &inflated, row)?)?;
        }
    }
    Ok(())
}

fn run_pack(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let text = if input.to_str() == Some("-") {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(&input).with_context(|| format!("reading {:?}", input))?
    };
    let mut parsed = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, '\t');
        let chrom = parts.next().ok_or_else(|| anyhow::anyhow!("missing chromosome in line {line:?}"))?;
        let pos: u64 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing position in line {line:?}"))?
            .parse()
            .with_context(|| format!("parsing position in line {line:?}"))?;
        parsed.push((chrom.to_string(), pos));
    }
    let col = fmt7::raw_from_lines(parsed.iter().map(|(c, p)| (c.as_str(), *p)))?;
    write_records(&output, &[col])
}

fn run_binarize(input: PathBuf, output: PathBuf, threshold: f32) -> anyhow::Result<()> {
    let text = if input.to_str() == Some("-") {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(&input).with_context(|| format!("reading {:?}", input))?
    };
    let values: Vec<f32> = text
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| l.parse::<f32>().with_context(|| format!("parsing float {l:?}")))
        .collect::<anyhow::Result<_>>()?;

    let rows = values.len() as u64;
    let mut payload = vec![0u8; yame_core::record::nbytes(Format::Bit, rows) as usize];
    for (i, &v) in values.iter().enumerate() {
        if v > threshold {
            payload[i >> 3] |= 1 << (i & 7);
        }
    }
    let inflated = Column::new_inflated(Format::Bit, rows, None, payload);
    let serialized = yame_formats::fmt0::compress(inflated);
    write_records(&output, &[serialized])
}

fn run_mask(file: PathBuf, mask_file: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let data = read_one_record(&file, 0)?;
    let mask = read_one_record(&mask_file, 0)?;
    if mask.fmt() != Format::Bit {
        anyhow::bail!("mask record must be format 0, got {}", mask.fmt());
    }

    if data.fmt() == Format::Coordinates {
        let mask_inflated = yame_formats::fmt0::decompress(mask)?;
        let sliced = fmt7::slice_by_mask(&data, &mask_inflated)?;
        return write_records(&output, &[sliced]);
    }

    let data_inflated = yame_formats::decompress(data)?;
    let mask_inflated = yame_formats::fmt0::decompress(mask)?;
    let sliced = yame_core::slice::slice_by_mask(&data_inflated, &mask_inflated)?;
    let serialized = yame_formats::compress(sliced)?;
    write_records(&output, &[serialized])
}

fn run_subset(file: PathBuf, begin: u64, end: u64, output: PathBuf) -> anyhow::Result<()> {
    if begin == 0 || end < begin {
        anyhow::bail!("subset range must satisfy 1 <= begin <= end, got [{begin}, {end}]");
    }
    let data = read_one_record(&file, 0)?;
    if data.fmt() == Format::Coordinates {
        let sliced = fmt7::slice_range(&data, begin - 1, end - 1)?;
        return write_records(&output, &[sliced]);
    }
    let inflated = yame_formats::decompress(data)?;
    let sliced = yame_core::slice::slice_range(&inflated, begin, end)?;
    let serialized = yame_formats::compress(sliced)?;
    write_records(&output, &[serialized])
}

fn parse_index_file(path: &PathBuf) -> anyhow::Result<Vec<u64>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    text.lines()
        .filter(|l| !l.is_empty())
        .map(|l| l.trim().parse::<u64>().with_context(|| format!("parsing row index {l:?}")))
        .collect()
}

fn run_rowsub(file: PathBuf, indices_file: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let indices = parse_index_file(&indices_file)?;
    let data = read_one_record(&file, 0)?;
    if data.fmt() == Format::Coordinates {
        let sliced = fmt7::slice_by_indices(&data, &indices)?;
        return write_records(&output, &[sliced]);
    }
    let inflated = yame_formats::decompress(data)?;
    let sliced = yame_core::slice::slice_by_indices(&inflated, &indices)?;
    let serialized = yame_formats::compress(sliced)?;
    write_records(&output, &[serialized])
}

fn run_dsample(file: PathBuf, stride: u64, output: PathBuf) -> anyhow::Result<()> {
    if stride == 0 {
        anyhow::bail!("stride must be at least 1");
    }
    let data = read_one_record(&file, 0)?;
    if data.fmt() == Format::Coordinates {
        let rows = fmt7::row_count(&data)?;
        let indices: Vec<u64> = (1..=rows).step_by(stride as usize).collect();
        let sliced = fmt7::slice_by_indices(&data, &indices)?;
        return write_records(&output, &[sliced]);
    }
    // Sample over the decoded logical row count, not the serialized
    // column's `rows()` (a byte length for every format but 0 and 6).
    let inflated = yame_formats::decompress(data)?;
    let indices: Vec<u64> = (1..=inflated.rows()).step_by(stride as usize).collect();
    let sliced = yame_core::slice::slice_by_indices(&inflated, &indices)?;
    let serialized = yame_formats::compress(sliced)?;
    write_records(&output, &[serialized])
}

fn run_rowop(file_a: PathBuf, file_b: PathBuf, op: String, output: PathBuf) -> anyhow::Result<()> {
    let a = yame_formats::decompress(read_one_record(&file_a, 0)?)?;
    let b = yame_formats::decompress(read_one_record(&file_b, 0)?)?;
    if a.fmt() != b.fmt() || a.rows() != b.rows() {
        anyhow::bail!("rowop requires two records of the same format and row count");
    }

    let combine: fn(f32, f32) -> f32 = match op.as_str() {
        "add" => |x, y| x + y,
        "sub" => |x, y| x - y,
        "min" => f32::min,
        "max" => f32::max,
        other => anyhow::bail!("unknown rowop '{other}'; expected add, sub, min, or max"),
    };

    let result = match a.fmt() {
        Format::FloatBeta => {
            let mut out = Vec::with_capacity(a.payload().len());
            for (chunk_a, chunk_b) in a.payload().chunks_exact(4).zip(b.payload().chunks_exact(4)) {
                let va = f32::from_le_bytes(chunk_a.try_into().unwrap());
                let vb = f32::from_le_bytes(chunk_b.try_into().unwrap());
                out.extend_from_slice(&combine(va, vb).to_le_bytes());
            }
            Column::new_inflated(Format::FloatBeta, a.rows(), None, out)
        }
        Format::SequencingCounts => {
            let unit = a.unit().ok_or_else(|| anyhow::anyhow!("sequencing-counts record missing unit"))?;
            let mut out = vec![0u8; a.payload().len()];
            for row in 0..a.rows() as usize {
                let (ma, ua) = yame_formats::fmt3::get_mu(a.payload(), row, unit);
                let (mb, ub) = yame_formats::fmt3::get_mu(b.payload(), row, unit);
                let cov_a = ma + ua;
                let cov_b = mb + ub;
                let combined = combine(cov_a as f32, cov_b as f32).max(0.0) as u64;
                yame_formats::fmt3::set_mu(&mut out, row, unit, combined, 0);
            }
            Column::new_inflated(Format::SequencingCounts, a.rows(), Some(unit), out)
        }
        other => anyhow::bail!("rowop is only supported for format 3 and format 4 records, got {other}"),
    };

    let serialized = yame_formats::compress(result)?;
    write_records(&output, &[serialized])
}

fn run_pairwise(file_a: PathBuf, file_b: PathBuf) -> anyhow::Result<()> {
    let a = yame_formats::decompress(read_one_record(&file_a, 0)?)?;
    let b = yame_formats::decompress(read_one_record(&file_b, 0)?)?;
    if a.fmt() != Format::FloatBeta || b.fmt() != Format::FloatBeta {
        anyhow::bail!("pairwise currently compares format-4 (float beta) records only");
    }
    if a.rows() != b.rows() {
        anyhow::bail!("pairwise requires equal row counts, got {} vs {}", a.rows(), b.rows());
    }

    let mut sum_abs_diff = 0f64;
    let mut compared = 0u64;
    for (chunk_a, chunk_b) in a.payload().chunks_exact(4).zip(b.payload().chunks_exact(4)) {
        let va = f32::from_le_bytes(chunk_a.try_into().unwrap());
        let vb = f32::from_le_bytes(chunk_b.try_into().unwrap());
        if va == -1.0 || vb == -1.0 {
            continue;
        }
        sum_abs_diff += (va - vb).abs() as f64;
        compared += 1;
    }

    println!("rows compared   : {compared}");
    if compared > 0 {
        println!("mean |a - b|    : {:.6}", sum_abs_diff / compared as f64);
    } else {
        println!("mean |a - b|    : n/a (no overlapping non-NA rows)");
    }
    Ok(())
}

fn run_summary(file: PathBuf) -> anyhow::Result<()> {
    let records = read_all_records(&file)?;
    for (i, serialized) in records.into_iter().enumerate() {
        let fmt = serialized.fmt();
        print!("record {i} [{fmt}]: ");
        match fmt {
            Format::Coordinates => {
                let n = fmt7::row_count(&serialized)?;
                println!("{n} rows");
            }
            Format::FloatBeta => {
                let inflated = yame_formats::decompress(serialized)?;
                let (mut sum, mut count) = (0f64, 0u64);
                for chunk in inflated.payload().chunks_exact(4) {
                    let v = f32::from_le_bytes(chunk.try_into().unwrap());
                    if v != -1.0 {
                        sum += v as f64;
                        count += 1;
                    }
                }
                if count > 0 {
                    println!("{} rows, mean beta {:.4} over {} non-NA", inflated.rows(), sum / count as f64, count);
                } else {
                    println!("{} rows, all NA", inflated.rows());
                }
            }
            Format::SequencingCounts => {
                let inflated = yame_formats::decompress(serialized)?;
                let unit = inflated.unit().ok_or_else(|| anyhow::anyhow!("missing unit"))?;
                let mut total_cov = 0u64;
                for row in 0..inflated.rows() as usize {
                    let (m, u) = yame_formats::fmt3::get_mu(inflated.payload(), row, unit);
                    total_cov += m + u;
                }
                println!(
                    "{} rows, mean coverage {:.2}",
                    inflated.rows(),
                    total_cov as f64 / inflated.rows().max(1) as f64
                );
            }
            _ => {
                let inflated = yame_formats::decompress(serialized)?;
                println!("{} rows", inflated.rows());
            }
        }
    }
    Ok(())
}

fn run_split(file: PathBuf, out_dir: PathBuf) -> anyhow::Result<()> {
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {:?}", out_dir))?;
    let idx_path = SampleIndex::sidecar_path(&file);
    let names = SampleIndex::load(&idx_path).ok().map(|idx| idx.names().iter().map(|s| s.to_string()).collect::<Vec<_>>());

    let records = read_all_records(&file)?;
    for (i, col) in records.into_iter().enumerate() {
        let name = names.as_ref().and_then(|n| n.get(i)).cloned().unwrap_or_else(|| i.to_string());
        let path = out_dir.join(format!("{name}.ydb"));
        write_records(&path, &[col])?;
        eprintln!("wrote {:?}", path);
    }
    Ok(())
}

fn run_chunk(file: PathBuf, rows_per_chunk: u64, output: PathBuf) -> anyhow::Result<()> {
    if rows_per_chunk == 0 {
        anyhow::bail!("rows-per-chunk must be at least 1");
    }
    let data = read_one_record(&file, 0)?;
    let mut chunks = Vec::new();

    if data.fmt() == Format::Coordinates {
        let total = fmt7::row_count(&data)?;
        let mut beg = 0u64;
        while beg < total {
            let end = (beg + rows_per_chunk - 1).min(total - 1);
            chunks.push(fmt7::slice_range(&data, beg, end)?);
            beg = end + 1;
        }
    } else {
        let inflated = yame_formats::decompress(data)?;
        let total = inflated.rows();
        let mut beg = 1u64;
        while beg <= total {
            let end = (beg + rows_per_chunk - 1).min(total);
            let sliced = yame_core::slice::slice_range(&inflated, beg, end)?;
            chunks.push(yame_formats::compress(sliced)?);
            beg = end + 1;
        }
    }

    write_records(&output, &chunks)
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file } => run_info(file),
        Commands::Hprint { file, record, limit } => run_hprint(file, record, limit),
        Commands::Unpack { file, output } => run_unpack(file, output),
        Commands::Pack { input, output } => run_pack(input, output),
        Commands::Binarize { input, output, threshold } => run_binarize(input, output, threshold),
        Commands::Mask { file, mask_file, output } => run_mask(file, mask_file, output),
        Commands::Subset { file, begin, end, output } => run_subset(file, begin, end, output),
        Commands::Rowsub { file, indices_file, output } => run_rowsub(file, indices_file, output),
        Commands::Dsample { file, stride, output } => run_dsample(file, stride, output),
        Commands::Rowop { file_a, file_b, op, output } => run_rowop(file_a, file_b, op, output),
        Commands::Pairwise { file_a, file_b } => run_pairwise(file_a, file_b),
        Commands::Summary { file } => run_summary(file),
        Commands::Split { file, out_dir } => run_split(file, out_dir),
        Commands::Chunk { file, rows_per_chunk, output } => run_chunk(file, rows_per_chunk, output),
    }
}
