//! Gamecard images: the root HFS0 and its `secure` partition.

use switch_shelf_core::ParseError;

use crate::bytes::{ReadAt, read_u64_le};
use crate::partition::{Partition, PartitionKind};

pub(crate) const HEAD_MAGIC: [u8; 4] = *b"HEAD";

const CARD_HEADER: u64 = 0x100;
const ROOT_OFFSET: usize = 0x30;

/// Locate the partition that holds the title NCAs.
pub(crate) fn secure_partition(src: &mut dyn ReadAt) -> Result<Partition, ParseError> {
    let header = src.read_at(CARD_HEADER, 0x100)?;
    if header[0..4] != HEAD_MAGIC {
        return Err(ParseError::corrupt("missing gamecard HEAD magic"));
    }
    let root_offset = read_u64_le(&header, ROOT_OFFSET);
    let root = Partition::read(src, root_offset, PartitionKind::Hfs0)?;
    let secure = root
        .find("secure")
        .ok_or_else(|| ParseError::corrupt("gamecard has no secure partition"))?;
    Partition::read(src, secure.offset, PartitionKind::Hfs0)
}
