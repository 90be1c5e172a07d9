//! Replay blob decompression.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;

use super::FetchError;

const CHUNK_SIZE: usize = 8192;

/// Decompress a bzip2 replay blob to its playable form.
///
/// Blocking work runs on the tokio blocking pool. The caller owns removal
/// of the compressed source either way.
pub async fn decompress_bz2(src: &Path, dest: &Path) -> Result<u64, FetchError> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let input = File::open(&src)?;
        let mut decoder = BzDecoder::new(BufReader::new(input));
        let mut output = BufWriter::new(File::create(&dest)?);

        let mut buf = [0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = decoder
                .read(&mut buf)
                .map_err(|e| FetchError::Decompress(e.to_string()))?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n])?;
            written += n as u64;
        }
        output.flush()?;
        Ok(written)
    })
    .await
    .map_err(|e| FetchError::Decompress(format!("decompress task panicked: {}", e)))?
}
