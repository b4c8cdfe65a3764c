use crate::{disk::BlockDevice, fs::error::Result};

/// inode 位图：每个 inode 槽位占 1 字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeBitmap {
    pub flags: Vec<bool>, // 位图数据，下标即 inode 编号
    pub free_inodes: u64, // 当前空闲 inode 数
    pub offset: u64,      // 位图在镜像中的字节偏移（用于持久化）
}

impl InodeBitmap {
    // 创建一个新的 inode 位图（全部空闲）
    pub fn new(total_inodes: usize, offset: u64) -> Self {
        Self {
            flags: vec![false; total_inodes],
            free_inodes: total_inodes as u64,
            offset,
        }
    }

    /// 编号最小的空闲 inode
    pub fn first_free(&self) -> Option<usize> {
        self.flags.iter().position(|used| !used)
    }

    pub fn set(&mut self, inode_index: usize) {
        if let Some(flag) = self.flags.get_mut(inode_index) {
            if !*flag {
                *flag = true;
                self.free_inodes -= 1;
            }
        }
    }

    // 释放一个 inode
    pub fn free(&mut self, inode_index: usize) {
        if let Some(flag) = self.flags.get_mut(inode_index) {
            // 防止空释放
            if *flag {
                *flag = false;
                self.free_inodes += 1;
            }
        }
    }

    // 检查 inode 是否被占用
    pub fn is_used(&self, inode_index: usize) -> bool {
        self.flags.get(inode_index).copied().unwrap_or(false)
    }

    pub fn load(disk: &dyn BlockDevice, offset: u64, total_inodes: usize) -> Result<Self> {
        let mut bytes = vec![0u8; total_inodes];
        disk.read_at(offset, &mut bytes)?;

        let flags: Vec<bool> = bytes.iter().map(|&b| b != 0).collect();
        let used = flags.iter().filter(|&&f| f).count();

        Ok(Self {
            flags,
            free_inodes: (total_inodes - used) as u64,
            offset,
        })
    }

    // 将 inode 位图写回磁盘
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
    fn first_free_is_lowest_index() {
        let mut bitmap = InodeBitmap::new(4, 0);
        assert_eq!(bitmap.first_free(), Some(0));

        bitmap.set(0);
        bitmap.set(1);
        bitmap.set(3);
        assert_eq!(bitmap.first_free(), Some(2));
        assert_eq!(bitmap.free_inodes, 1);

        bitmap.set(2);
        assert_eq!(bitmap.first_free(), None);

        bitmap.free(1);
        assert_eq!(bitmap.first_free(), Some(1));
    }
}
