use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

pub const PLACEHOLDER_SAMPLE_RATE: u32 = 16_000;
pub const PLACEHOLDER_DURATION_SECS: u32 = 2;

/// Encode a silent mono 16-bit PCM clip as a complete WAV byte stream
pub fn silent_wav(duration_secs: u32, sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for _ in 0..duration_secs * sample_rate {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Check that a buffer is a self-contained WAV stream whose data chunk is fully present
pub fn is_valid_wav(bytes: &[u8]) -> bool {
    let reader = match WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => reader,
        Err(_) => return false,
    };

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 || spec.bits_per_sample == 0 {
        return false;
    }

    let bytes_per_sample = (spec.bits_per_sample as usize).div_ceil(8);
    let data_len = reader.len() as usize * bytes_per_sample;
    // The reader stops right after the `data` chunk header
    let data_offset = reader.into_inner().position() as usize;
    data_len > 0 && data_offset + data_len <= bytes.len()
}
