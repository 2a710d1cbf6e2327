//! Decompress command implementation.

use crate::utils::{
    CliResult, ContainerReader, FrameRecord, RECORD_PREFIX_LEN, create_progress_bar,
    write_raw_frame,
};
use oxiseis_seispeg::{ByteOrder, SeisPeg, SeisPegConfig};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Decode one record, replacing `codec` when the frame geometry changes.
///
/// The record is checked against its header before any trace is allocated.
fn decode_record(
    codec: &mut Option<SeisPeg>,
    record: &FrameRecord,
    order: ByteOrder,
) -> CliResult<Vec<Vec<f32>>> {
    let header = SeisPeg::read_header(&record.payload, order)?;
    if record.n_traces > header.n2 {
        return Err(format!(
            "record holds {} traces, its header allows {}",
            record.n_traces, header.n2
        )
        .into());
    }
    let wanted = SeisPegConfig::from_header(&header, order);
    if codec.as_ref().is_none_or(|c| *c.config() != wanted) {
        debug!(n1 = header.n1, n2 = header.n2, "new frame geometry");
        *codec = Some(SeisPeg::from_compressed(&record.payload, order)?);
    }
    let Some(codec) = codec.as_mut() else {
        return Err("no codec for frame".into());
    };

    let mut traces = vec![vec![0f32; header.n1]; record.n_traces];
    codec.uncompress(&record.payload, record.n_traces, &mut traces)?;
    Ok(traces)
}

pub fn cmd_decompress(input: &Path, output: &Path, progress: bool) -> CliResult<()> {
    let mut reader = ContainerReader::new(BufReader::new(File::open(input)?))?;
    let order = reader.order();
    let mut writer = BufWriter::new(File::create(output)?);
    let pb = create_progress_bar(std::fs::metadata(input)?.len(), progress);

    let mut codec: Option<SeisPeg> = None;
    let mut frames = 0usize;
    let mut traces_out = 0usize;
    while let Some(record) = reader.next_frame()? {
        let traces = decode_record(&mut codec, &record, order)
            .map_err(|e| format!("frame {}: {}", frames, e))?;
        write_raw_frame(&mut writer, &traces)?;

        frames += 1;
        traces_out += record.n_traces;
        pb.inc((RECORD_PREFIX_LEN + record.payload.len()) as u64);
    }
    writer.flush()?;
    pb.finish_and_clear();

    println!("Decompressed {} frames ({} traces)", frames, traces_out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiseis_seispeg::Policy;

    fn record(n1: usize, n2: usize, n_traces: usize) -> FrameRecord {
        let config = SeisPegConfig::with_policy(n1, n2, 0.1, Policy::Fastest);
        let mut codec = SeisPeg::new(config).unwrap();
        let traces: Vec<Vec<f32>> = (0..n2)
            .map(|t| (0..n1).map(|i| ((i + t) as f32 * 0.2).sin()).collect())
            .collect();
        let mut payload = vec![0u8; codec.max_compressed_bytes()];
        let n = codec.compress(&traces, n2, &mut payload).unwrap();
        payload.truncate(n);
        FrameRecord { n_traces, payload }
    }

    #[test]
    fn test_decode_record_switches_geometry() {
        let mut codec = None;
        let first = decode_record(&mut codec, &record(64, 8, 8), ByteOrder::BigEndian).unwrap();
        assert_eq!((first.len(), first[0].len()), (8, 64));
        let second = decode_record(&mut codec, &record(32, 4, 3), ByteOrder::BigEndian).unwrap();
        assert_eq!((second.len(), second[0].len()), (3, 32));
        assert_eq!(codec.unwrap().config().n1, 32);
    }

    #[test]
    fn test_decode_record_rejects_excess_traces() {
        let mut codec = None;
        let forged = record(64, 8, 1 << 20);
        assert!(decode_record(&mut codec, &forged, ByteOrder::BigEndian).is_err());
        assert!(codec.is_none());
    }
}
