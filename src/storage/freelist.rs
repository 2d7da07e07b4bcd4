//! Free-Space Allocator
//!
//! Pops reusable chunks off a file's free list, or grows the file.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::codec::{read_u64_at, write_u64_at, write_u8_at};
use crate::error::Result;

use super::{FileOffset, DAT_FREE_HEAD_POS, IDX_FREE_HEAD_POS};

/// How chunks are laid out in a file, which decides where its free-list
/// head lives and whether chunks carry a deleted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Index files: one chunk per block, no flag
    Block,

    /// Row-data files: one chunk per record, preceded by a deleted flag byte
    Record,
}

impl ChunkLayout {
    /// Where the free-list head pointer is stored
    pub fn head_pos(self) -> FileOffset {
        match self {
            ChunkLayout::Block => IDX_FREE_HEAD_POS,
            ChunkLayout::Record => DAT_FREE_HEAD_POS,
        }
    }

    /// Current free-list head (0 when the list is empty)
    pub fn head<F: Read + Seek>(self, file: &mut F) -> Result<FileOffset> {
        read_u64_at(file, self.head_pos())
    }

    /// Take a chunk ready for writing.
    ///
    /// Pops the free-list head when there is one; otherwise returns the end
    /// of the file. For `Block` the caller must write the block there to fix
    /// the new file size. For `Record` the deleted flag is written (appended
    /// or cleared) before returning.
    pub fn consume<F: Read + Write + Seek>(self, file: &mut F) -> Result<FileOffset> {
        let head = self.head(file)?;

        if head == 0 {
            let end = file.seek(SeekFrom::End(0))?;
            return match self {
                ChunkLayout::Block => Ok(end),
                ChunkLayout::Record => {
                    write_u8_at(file, end, 0)?;
                    Ok(end + 1)
                }
            };
        }

        // Unlink the head chunk
        let next = read_u64_at(file, head)?;
        write_u64_at(file, self.head_pos(), next)?;

        if self == ChunkLayout::Record {
            write_u8_at(file, head - 1, 0)?;
        }

        tracing::trace!(offset = head, ?self, "reusing free chunk");
        Ok(head)
    }

    /// Push a chunk onto the free list.
    ///
    /// The chunk must have the size every other chunk of this file has.
    pub fn release<F: Read + Write + Seek>(self, file: &mut F, offset: FileOffset) -> Result<()> {
        let head = self.head(file)?;

        if self == ChunkLayout::Record {
            write_u8_at(file, offset - 1, 1)?;
        }
        write_u64_at(file, offset, head)?;
        write_u64_at(file, self.head_pos(), offset)?;

        Ok(())
    }
}
