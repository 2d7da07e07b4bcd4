//! Storage Module
//!
//! File-level layout shared by index files and row-data files, and the
//! free-space allocator that hands out reusable chunks of either.
//!
//! ## Index File Header
//! ```text
//! ┌──────────────┬──────────┬──────────┬────────────┬──────────────┬──────────┐
//! │ FreeHead (8) │ KeySz(4) │ ValSz(4) │ BlockSz(4) │ RootOff (8)  │ Order(4) │
//! └──────────────┴──────────┴──────────┴────────────┴──────────────┴──────────┘
//!  0              8          12         16           20             28
//! ```
//! The first node lives at offset `block_size`; every node occupies exactly
//! one block.
//!
//! ## Row-Data File Header
//! ```text
//! ┌──────────────┬──────────────┬─────────┬───────────────────────────┐
//! │ NextId (8)   │ FreeHead (8) │ Del (1) │ Record 0 ...              │
//! └──────────────┴──────────────┴─────────┴───────────────────────────┘
//!  0              8              16        17
//! ```
//! Each record is preceded by a one-byte deleted flag; a record offset always
//! points just past its flag.
//!
//! ## Free List
//! Free chunks form a singly-linked list threaded through the chunks
//! themselves: the first 8 bytes of a free chunk hold the offset of the next
//! free chunk (0 = end). Chunk sizes are never recorded; every chunk of a
//! file is one block (index) or one record (data).

mod freelist;

pub use freelist::ChunkLayout;

/// Offset of a byte within a file
pub type FileOffset = u64;

// =============================================================================
// Index File Layout
// =============================================================================

/// Free-list head pointer (u64)
pub const IDX_FREE_HEAD_POS: FileOffset = 0;

/// Key byte width (u32)
pub const IDX_KEY_SIZE_POS: FileOffset = 8;

/// Value byte width (u32)
pub const IDX_VALUE_SIZE_POS: FileOffset = 12;

/// Block size (u32)
pub const IDX_BLOCK_SIZE_POS: FileOffset = 16;

/// Root node offset (u64)
pub const IDX_ROOT_POS: FileOffset = 20;

/// Tree order the nodes were laid out with (u32)
pub const IDX_ORDER_POS: FileOffset = 28;

/// Bytes of the index header actually in use
pub const IDX_HEADER_LEN: u64 = 32;

// =============================================================================
// Row-Data File Layout
// =============================================================================

/// Last primary id handed out (i64)
pub const DAT_NEXT_ID_POS: FileOffset = 0;

/// Free-list head pointer (u64)
pub const DAT_FREE_HEAD_POS: FileOffset = 8;

/// Length of an empty data file (the first flag byte is appended on insert)
pub const DAT_HEADER_LEN: u64 = 16;

/// Offset of the first record (just past its deleted flag at 16)
pub const DAT_RECORD_START: FileOffset = 17;
