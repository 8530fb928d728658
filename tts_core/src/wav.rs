/// Size in bytes of the header produced by [`build_stream_header`].
pub const STREAM_HEADER_LEN: usize = 44;

/// Build a 16-bit style PCM WAV (RIFF) header for a stream of unknown length.
///
/// The length fields are written as for an empty file (RIFF size 36, data
/// size 0), so clients must read the body as a continuous byte stream rather
/// than trusting the declared length.
pub fn build_stream_header(channels: u16, sample_width: u16, sample_rate: u32) -> Vec<u8> {
    let bits_per_sample: u16 = sample_width.saturating_mul(8);
    let block_align: u16 = channels.saturating_mul(sample_width);
    let byte_rate: u32 = sample_rate.saturating_mul(u32::from(block_align));
    let data_size: u32 = 0;
    let riff_size: u32 = 36 + data_size;

    let mut out = Vec::<u8>::with_capacity(STREAM_HEADER_LEN);

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk, payload follows as it is synthesized
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_header_layout_mono_16bit() {
        let header = build_stream_header(1, 2, 24_000);
        assert_eq!(header.len(), STREAM_HEADER_LEN);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(u32_at(&header, 4), 36);
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u16_at(&header, 22), 1);
        assert_eq!(u32_at(&header, 24), 24_000);
        assert_eq!(u32_at(&header, 28), 48_000);
        assert_eq!(u16_at(&header, 32), 2);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 40), 0);
    }

    #[test]
    fn test_header_tracks_sample_rate() {
        let header = build_stream_header(1, 2, 22_050);
        assert_eq!(u32_at(&header, 24), 22_050);
        assert_eq!(u32_at(&header, 28), 44_100);
    }

    #[test]
    fn test_header_stereo_fields() {
        let header = build_stream_header(2, 2, 48_000);
        assert_eq!(u16_at(&header, 22), 2);
        assert_eq!(u32_at(&header, 28), 192_000);
        assert_eq!(u16_at(&header, 32), 4);
    }

    #[test]
    fn test_header_saturates_oversized_rate() {
        let header = build_stream_header(u16::MAX, 2, u32::MAX);
        assert_eq!(header.len(), STREAM_HEADER_LEN);
        assert_eq!(u32_at(&header, 24), u32::MAX);
        assert_eq!(u32_at(&header, 28), u32::MAX);
        assert_eq!(u16_at(&header, 32), u16::MAX);
    }

    #[test]
    fn test_header_is_deterministic() {
        assert_eq!(build_stream_header(1, 2, 16_000), build_stream_header(1, 2, 16_000));
    }
}
