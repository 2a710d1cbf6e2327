//! Edge case tests for the building blocks: Huffman tables, the block coder,
//! the header compressor and the fixed-ratio trace codecs.

use oxiseis_seispeg::{
    BlockCompressor, ByteOrder, HdrCompressor, HuffCoder, HuffTable, OxiSeisError, TraceCodec,
    TraceFormat,
};

/// Same LCG as the benches.
fn lcg(seed: u32, n: usize) -> Vec<u32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            state
        })
        .collect()
}

#[test]
fn test_huffman_all_tables_roundtrip() {
    let input: Vec<u8> = (0..=255u8).chain(lcg(7, 2000).iter().map(|v| (v >> 16) as u8)).collect();
    for table in [HuffTable::Data, HuffTable::Header, HuffTable::HeaderImproved] {
        let coder = HuffCoder::new(table).unwrap();
        let mut encoded = vec![0u8; coder.encoded_len(&input)];
        let n = coder.encode(&input, &mut encoded).unwrap();
        assert_eq!(n, encoded.len());

        let mut decoded = vec![0u8; input.len()];
        assert_eq!(coder.decode(&encoded, &mut decoded).unwrap(), input.len());
        assert_eq!(decoded, input, "{table:?}");
    }
}

#[test]
fn test_huffman_empty_input() {
    let coder = HuffCoder::new(HuffTable::Data).unwrap();
    let mut encoded = [0u8; 16];
    let n = coder.encode(&[], &mut encoded).unwrap();
    assert!(n >= 1);
    let mut decoded = [0u8; 4];
    assert_eq!(coder.decode(&encoded[..n], &mut decoded).unwrap(), 0);
}

#[test]
fn test_data_encode_buffer_too_small() {
    let data: Vec<f32> = lcg(3, 256)
        .iter()
        .map(|&v| (v >> 8) as f32 / 65536.0 - 128.0)
        .collect();
    let mut block = BlockCompressor::with_table(HuffTable::Data, ByteOrder::BigEndian).unwrap();

    let mut out = vec![0xABu8; 64];
    let err = block.data_encode(&data, 0.001, &mut out).unwrap_err();
    assert!(matches!(err, OxiSeisError::BufferTooSmall { .. }));
    assert!(out.iter().all(|&b| b == 0xAB));

    let mut out = vec![0u8; 8192];
    let n = block.data_encode(&data, 0.001, &mut out).unwrap();
    assert!(n > 64);
    let mut back = vec![0f32; 256];
    block.data_decode(&out[..n], &mut back).unwrap();
    let worst = data
        .iter()
        .zip(&back)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f32::max);
    assert!(worst < 1.0);
}

#[test]
fn test_data_encode_silent_block() {
    let mut block = BlockCompressor::with_table(HuffTable::Data, ByteOrder::LittleEndian).unwrap();
    let mut out = [0u8; 32];
    let n = block.data_encode(&[0.0; 128], 0.1, &mut out).unwrap();
    let mut back = [5f32; 128];
    block.data_decode(&out[..n], &mut back).unwrap();
    assert!(back.iter().all(|&v| v == 0.0));
}

#[test]
fn test_header_scenario_64x10() {
    let noise = lcg(11, 64);
    let headers: Vec<i32> = (0..64)
        .flat_map(|t| {
            let mut h = [0i32; 10];
            h[0] = 1;
            h[1] = t;
            h[2] = noise[t as usize] as i32;
            h[3] = 500 - 4 * t;
            h[9] = t / 8;
            h
        })
        .collect();

    let mut hdr = HdrCompressor::new(ByteOrder::BigEndian);
    let mut out = vec![0u8; 16 * 1024];
    let n = hdr.compress(&headers[..], 64, 10, &mut out).unwrap();
    assert!(n < headers.len() * 4);

    let frame = hdr.uncompress(&out[..n]).unwrap();
    assert_eq!(frame.n_traces, 64);
    assert_eq!(frame.hdr_length, 10);
    assert_eq!(frame.remute, None);
    assert_eq!(frame.headers, headers);
}

#[test]
fn test_header_extreme_values() {
    let headers: Vec<i32> = [i32::MIN, i32::MAX, 0, -1, i32::MIN + 1, i32::MIN + 2]
        .iter()
        .copied()
        .cycle()
        .take(6 * 40)
        .collect();
    let mut hdr = HdrCompressor::default();
    let mut out = vec![0u8; 16 * 1024];
    let n = hdr.compress(&headers[..], 40, 6, &mut out).unwrap();
    assert_eq!(hdr.uncompress(&out[..n]).unwrap().headers, headers);
}

#[test]
fn test_header_garbage_is_corrupted() {
    let mut hdr = HdrCompressor::default();
    let err = hdr.uncompress(&[0x78, 0x9C, 1, 2, 3, 4, 5]).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_trace_codecs_both_widths() {
    let trace: Vec<f32> = (0..333)
        .map(|i| (i as f32 * 0.05).sin() * 1000.0)
        .collect();
    for (format, limit) in [(TraceFormat::Int16, 32767.0f32), (TraceFormat::Int8, 127.0)] {
        let codec = TraceCodec::new(format, 333, ByteOrder::BigEndian).unwrap();
        assert_eq!(codec.record_length() % 4, 0);
        let mut record = vec![0u8; codec.record_length()];
        codec.encode_trace(&trace, &mut record).unwrap();
        let mut back = vec![0f32; 333];
        codec.decode_trace(&record, &mut back).unwrap();

        let step = 1000.0 / limit;
        for (a, b) in trace.iter().zip(&back) {
            assert!((a - b).abs() <= step, "{format:?}");
        }
    }
}
