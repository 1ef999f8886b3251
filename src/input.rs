use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Input stream from a file or, for `-`, from stdin.
pub struct InputReader {
    reader: Box<dyn Read>,
}

impl InputReader {
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        let is_pipe = path.as_os_str() == "-";

        let reader: Box<dyn Read> = if is_pipe {
            Box::new(io::stdin().lock())
        } else {
            let file =
                File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader })
    }

    /// Feeds the input to `callback` in chunks of at most `chunk_size` bytes
    /// until EOF or until the callback returns `Ok(false)`.
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let bytes_read = self.reader.read(&mut buffer)?;
            if bytes_read == 0 || !callback(&buffer[..bytes_read])? {
                break;
            }
        }

        Ok(())
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
