//! Container writer (C9): builds a container from scratch, writing the
//! header, one entry at a time, and finally the table-of-contents chain.
//!
//! Mirrors the reader's block format exactly so a freshly-built container
//! round-trips through [`super::Container::open`]. The table-of-contents
//! chaining in [`ContainerWriter::finish`] computes each subsequent block's
//! advertised `next_block_offset` as `DEFAULT_BLOCK_SIZE + 31` past the
//! previous one rather than recording the writer's actual file position —
//! see the design notes on bit-compatibility.

use std::io::{Seek, SeekFrom, Write};

use chrono::NaiveDateTime;

use crate::codec::encode_container_epoch;
use crate::container::header::END_MARKER;
use crate::error::{BizdbError, Result};

const DEFAULT_BLOCK_SIZE: u32 = 512;
const BLOCK_HEADER_SIZE: u32 = 31;

fn write_block<W: Write + Seek>(
    sink: &mut W,
    offset: u64,
    data: &[u8],
    doc_size: u32,
    block_size: u32,
    next_block_offset: i32,
) -> Result<u64> {
    sink.seek(SeekFrom::Start(offset))?;
    sink.write_all(b"\r\n")?;
    write!(
        sink,
        "{:08x} {:08x} {:08x} \r\n",
        doc_size, block_size, next_block_offset as u32
    )?;
    sink.write_all(data)?;
    let pad = block_size as usize - data.len();
    sink.write_all(&vec![0u8; pad])?;
    Ok(offset)
}

fn file_len<W: Write + Seek>(sink: &mut W) -> Result<u64> {
    let current = sink.stream_position()?;
    let end = sink.seek(SeekFrom::End(0))?;
    sink.seek(SeekFrom::Start(current))?;
    Ok(end)
}

/// Builds a container one entry at a time over an owned output sink.
///
/// `finish` must be called to flush the table of contents; dropping a
/// `ContainerWriter` without calling it leaves a container with no entries
/// readable (the TOC placeholder block stays all-zero).
pub struct ContainerWriter<W> {
    sink: W,
    toc: Vec<(u32, u32)>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Write the 16-byte header and reserve the first TOC block's
    /// `DEFAULT_BLOCK_SIZE + 31` bytes as a zeroed placeholder.
    pub fn create(mut sink: W) -> Result<Self> {
        sink.write_all(&END_MARKER.to_le_bytes())?;
        sink.write_all(&(DEFAULT_BLOCK_SIZE as i32).to_le_bytes())?;
        sink.write_all(&0i32.to_le_bytes())?;
        sink.write_all(&0i32.to_le_bytes())?;
        sink.write_all(&vec![0u8; (DEFAULT_BLOCK_SIZE + BLOCK_HEADER_SIZE) as usize])?;
        Ok(ContainerWriter { sink, toc: Vec::new() })
    }

    /// Add one file entry: an attribute document (timestamps + UTF-16LE
    /// name) and a data document (the payload, optionally raw-DEFLATEd).
    pub fn add_file(
        &mut self,
        name: &str,
        bytes: &[u8],
        created: NaiveDateTime,
        modified: NaiveDateTime,
        compress: bool,
    ) -> Result<()> {
        let mut attr = Vec::new();
        attr.extend_from_slice(&encode_container_epoch(created).to_le_bytes());
        attr.extend_from_slice(&encode_container_epoch(modified).to_le_bytes());
        attr.extend_from_slice(&0i32.to_le_bytes());
        attr.extend(name.encode_utf16().flat_map(|u| u.to_le_bytes()));
        attr.extend_from_slice(&[0, 0, 0, 0]);
        let attr_len = attr.len() as u32;
        let attr_offset = file_len(&mut self.sink)?;
        write_block(&mut self.sink, attr_offset, &attr, attr_len, attr_len, END_MARKER)?;

        let payload = if compress {
            crate::container::deflate_raw(bytes)?
        } else {
            bytes.to_vec()
        };
        let data_len = payload.len() as u32;
        let block_size = data_len.max(DEFAULT_BLOCK_SIZE);
        let data_offset = file_len(&mut self.sink)?;
        write_block(&mut self.sink, data_offset, &payload, data_len, block_size, END_MARKER)?;

        self.toc.push((attr_offset as u32, data_offset as u32));
        Ok(())
    }

    /// Serialize the table of contents as a chain of `DEFAULT_BLOCK_SIZE`
    /// blocks, then return the finished sink.
    pub fn finish(mut self) -> Result<W> {
        if self.toc.is_empty() {
            return Err(BizdbError::Empty("container has no entries to finalize".into()));
        }

        let mut toc_bytes = Vec::new();
        for (attr_offset, data_offset) in &self.toc {
            toc_bytes.extend_from_slice(&(*attr_offset as i32).to_le_bytes());
            toc_bytes.extend_from_slice(&(*data_offset as i32).to_le_bytes());
            toc_bytes.extend_from_slice(&END_MARKER.to_le_bytes());
        }

        let size = toc_bytes.len() as u32;
        let total_blocks = size / DEFAULT_BLOCK_SIZE + 1;
        const TOC_PLACEHOLDER_OFFSET: u64 = 16;

        if total_blocks == 1 {
            let block_size = size.max(DEFAULT_BLOCK_SIZE);
            write_block(&mut self.sink, TOC_PLACEHOLDER_OFFSET, &toc_bytes, size, block_size, END_MARKER)?;
        } else {
            let mut cursor = 0usize;
            let first_chunk_end = (DEFAULT_BLOCK_SIZE as usize).min(toc_bytes.len());
            let first_chunk = &toc_bytes[cursor..first_chunk_end];
            cursor = first_chunk_end;

            let mut next_block_offset = file_len(&mut self.sink)?;
            write_block(
                &mut self.sink,
                TOC_PLACEHOLDER_OFFSET,
                first_chunk,
                size,
                DEFAULT_BLOCK_SIZE,
                next_block_offset as i32,
            )?;

            for _ in 1..total_blocks {
                next_block_offset += (DEFAULT_BLOCK_SIZE + BLOCK_HEADER_SIZE) as u64;
                let chunk_end = (cursor + DEFAULT_BLOCK_SIZE as usize).min(toc_bytes.len());
                let chunk = &toc_bytes[cursor..chunk_end];
                cursor = chunk_end;
                let at = file_len(&mut self.sink)?;
                write_block(&mut self.sink, at, chunk, 0, DEFAULT_BLOCK_SIZE, next_block_offset as i32)?;
            }

            // Trailing terminal block: the reader's declared-size accounting
            // already stopped one block earlier, so this one is never read.
            let chunk_end = (cursor + DEFAULT_BLOCK_SIZE as usize).min(toc_bytes.len());
            let chunk = &toc_bytes[cursor..chunk_end];
            let at = file_len(&mut self.sink)?;
            write_block(&mut self.sink, at, chunk, 0, DEFAULT_BLOCK_SIZE, END_MARKER)?;
        }

        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use std::io::Cursor;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2020, 6, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn single_entry_roundtrip() {
        let mut writer = ContainerWriter::create(Cursor::new(Vec::new())).unwrap();
        writer.add_file("a.txt", b"hello", now(), now(), false).unwrap();
        let sink = writer.finish().unwrap();

        let container = Container::open(sink).unwrap();
        assert_eq!(container.entries().len(), 1);
        assert_eq!(container.entries()[0].name, "a.txt");
        assert_eq!(container.read_data("a.txt").unwrap(), b"hello");
    }

    #[test]
    fn multiple_entries_preserve_order_and_names() {
        let mut writer = ContainerWriter::create(Cursor::new(Vec::new())).unwrap();
        writer.add_file("a.txt", b"hello", now(), now(), false).unwrap();
        writer.add_file("b.bin", &[1, 2, 3, 4, 5], now(), now(), false).unwrap();
        let sink = writer.finish().unwrap();

        let container = Container::open(sink).unwrap();
        let names: Vec<&str> = container.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.bin"]);
        assert_eq!(container.read_data("b.bin").unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn compressed_entry_roundtrips() {
        let mut writer = ContainerWriter::create(Cursor::new(Vec::new())).unwrap();
        let payload = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        writer.add_file("c.txt", payload, now(), now(), true).unwrap();
        let sink = writer.finish().unwrap();

        let container = Container::open(sink).unwrap();
        let raw = container.read_data("c.txt").unwrap();
        let inflated = crate::container::inflate_raw(&raw).unwrap();
        assert_eq!(inflated, payload);
    }

    #[test]
    fn finishing_empty_writer_is_an_error() {
        let writer = ContainerWriter::create(Cursor::new(Vec::new())).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, BizdbError::Empty(_)));
    }

    #[test]
    fn many_entries_span_multiple_toc_blocks() {
        let mut writer = ContainerWriter::create(Cursor::new(Vec::new())).unwrap();
        for i in 0..100 {
            writer.add_file(&format!("file{i}.txt"), b"x", now(), now(), false).unwrap();
        }
        let sink = writer.finish().unwrap();

        let container = Container::open(sink).unwrap();
        assert_eq!(container.entries().len(), 100);
        assert_eq!(container.entries()[99].name, "file99.txt");
        assert_eq!(container.read_data("file50.txt").unwrap(), b"x");
    }
}
