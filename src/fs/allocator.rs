use std::fmt;

use crate::fs::{data_block_bitmap::DataBlockBitmap, inode_bitmap::InodeBitmap};

/// 分配失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    NoFreeInode,
    InsufficientBlocks { needed: usize, available: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFreeInode => write!(f, "no free inode"),
            Self::InsufficientBlocks { needed, available } => {
                write!(f, "{} blocks needed, {} free", needed, available)
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// 一次分配的结果：inode 槽位和按链表顺序排列的数据块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub inode_index: usize,
    pub blocks: Vec<u32>,
}

/// 首次适配分配。
///
/// 只读取两个位图的快照，不做任何修改；调用方确认分配结果后
/// 再自行更新位图并持久化。
pub fn allocate(
    inode_bitmap: &InodeBitmap,
    block_bitmap: &DataBlockBitmap,
    blocks_needed: usize,
) -> Result<Allocation, AllocError> {
    let inode_index = inode_bitmap.first_free().ok_or(AllocError::NoFreeInode)?;

    let free: Vec<u32> = block_bitmap.free_indices().collect();
    if free.len() < blocks_needed {
        return Err(AllocError::InsufficientBlocks {
            needed: blocks_needed,
            available: free.len(),
        });
    }

    Ok(Allocation {
        inode_index,
        blocks: free.into_iter().take(blocks_needed).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_lowest_free_slots() {
        let mut inodes = InodeBitmap::new(4, 0);
        inodes.set(0);
        let mut blocks = DataBlockBitmap::new(6, 0);
        blocks.set(0);
        blocks.set(2);

        let allocation = allocate(&inodes, &blocks, 3).unwrap();
        assert_eq!(allocation.inode_index, 1);
        assert_eq!(allocation.blocks, vec![1, 3, 4]);

        // 快照不被修改
        assert!(!inodes.is_used(1));
        assert_eq!(blocks.free_blocks, 4);
    }

    #[test]
    fn empty_request_needs_only_an_inode() {
        let inodes = InodeBitmap::new(1, 0);
        let mut blocks = DataBlockBitmap::new(1, 0);
        blocks.set(0);

        let allocation = allocate(&inodes, &blocks, 0).unwrap();
        assert_eq!(allocation.inode_index, 0);
        assert!(allocation.blocks.is_empty());
    }

    #[test]
    fn reports_missing_inode_before_blocks() {
        let mut inodes = InodeBitmap::new(1, 0);
        inodes.set(0);
        let blocks = DataBlockBitmap::new(0, 0);

        assert_eq!(allocate(&inodes, &blocks, 5), Err(AllocError::NoFreeInode));
    }

    #[test]
    fn reports_insufficient_blocks() {
        let inodes = InodeBitmap::new(2, 0);
        let mut blocks = DataBlockBitmap::new(3, 0);
        blocks.set(1);

        assert_eq!(
            allocate(&inodes, &blocks, 3),
            Err(AllocError::InsufficientBlocks {
                needed: 3,
                available: 2
            })
        );
    }
}
