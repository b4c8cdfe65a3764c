use crate::{disk::BlockDevice, fs::error::Result};

/// 数据块位图：每个数据块占 1 字节，非 0 表示已占用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlockBitmap {
    pub flags: Vec<bool>,  // 位图数据，下标即块号
    pub free_blocks: u64,  // 当前空闲块数
    pub offset: u64,       // 位图在镜像中的字节偏移
}

impl DataBlockBitmap {
    // 创建一个全空闲的位图
    pub fn new(total_blocks: u64, offset: u64) -> Self {
        Self {
            flags: vec![false; total_blocks as usize],
            free_blocks: total_blocks,
            offset,
        }
    }

    pub fn total_blocks(&self) -> u64 {
        self.flags.len() as u64
    }

    pub fn is_used(&self, block_index: u32) -> bool {
        self.flags
            .get(block_index as usize)
            .copied()
            .unwrap_or(false)
    }

    // 标记一个数据块为已占用
    pub fn set(&mut self, block_index: u32) {
        if let Some(flag) = self.flags.get_mut(block_index as usize) {
            if !*flag {
                *flag = true;
                self.free_blocks -= 1;
            }
        }
    }

    // 释放一个数据块
    pub fn free(&mut self, block_index: u32) {
        if let Some(flag) = self.flags.get_mut(block_index as usize) {
            if *flag {
                *flag = false;
                self.free_blocks += 1;
            }
        }
    }

    /// 按块号升序列出所有空闲块
    pub fn free_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(i, _)| i as u32)
    }

    /// 按块号升序列出所有已占用块
    pub fn used_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(i, _)| i as u32)
    }

    // 从磁盘加载数据块位图
    pub fn load(disk: &dyn BlockDevice, offset: u64, total_blocks: u64) -> Result<Self> {
        let mut bytes = vec![0u8; total_blocks as usize];
        disk.read_at(offset, &mut bytes)?;

        let flags: Vec<bool> = bytes.iter().map(|&b| b != 0).collect();
        let used = flags.iter().filter(|&&f| f).count() as u64;

        Ok(Self {
            flags,
            free_blocks: total_blocks - used,
            offset,
        })
    }

    // 将数据块位图整体写回磁盘
    pub fn sync(&self, disk: &dyn BlockDevice) -> Result<()> {
        let bytes: Vec<u8> = self.flags.iter().map(|&f| f as u8).collect();
        disk.write_at(self.offset, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_free_track_free_count() {
        let mut bitmap = DataBlockBitmap::new(8, 0);
        bitmap.set(2);
        bitmap.set(2);
        bitmap.set(5);
        assert_eq!(bitmap.free_blocks, 6);
        assert_eq!(bitmap.used_indices().collect::<Vec<_>>(), vec![2, 5]);

        bitmap.free(2);
        bitmap.free(2);
        assert_eq!(bitmap.free_blocks, 7);
        assert_eq!(bitmap.free_indices().take(3).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut bitmap = DataBlockBitmap::new(4, 0);
        bitmap.set(10);
        bitmap.free(10);
        assert!(!bitmap.is_used(10));
        assert_eq!(bitmap.free_blocks, 4);
    }
}
