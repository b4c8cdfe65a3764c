use bincode::Options;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockDevice, BLOCK_SIZE, END_OF_CHAIN, MEGABYTE},
    fs::{
        codec,
        config::{
            BITMAP_ENTRY_SIZE, BLOCK_BITMAP_OFFSET, FIXED_OVERHEAD, HEADER_SIZE, INODE_SIZE, MAGIC,
            MAX_FILES,
        },
        error::{FileSystemError, Result},
    },
    utils::{current_timestamp, generate_volume_id},
};

/// 卷各区域在镜像中的字节偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub disk_size_mb: u32,
    pub disk_size_bytes: u64,
    pub num_blocks: u64,
    pub block_bitmap_offset: u64,
    pub inode_bitmap_offset: u64,
    pub inode_table_offset: u64,
    pub data_offset: u64,
}

impl Layout {
    /// 按磁盘大小（MB）计算布局，连一个数据块都放不下时报错
    pub fn for_disk(disk_size_mb: u32) -> Result<Self> {
        let disk_size_bytes = disk_size_mb as u64 * MEGABYTE;
        let num_blocks = count_blocks(disk_size_bytes);
        if num_blocks == 0 {
            return Err(FileSystemError::DiskTooSmall {
                size_mb: disk_size_mb,
            });
        }

        let layout = Self::with_blocks(disk_size_mb, num_blocks);
        debug!(
            "layout for {} MB: {} blocks, data region at {}",
            disk_size_mb, layout.num_blocks, layout.data_offset
        );
        Ok(layout)
    }

    fn with_blocks(disk_size_mb: u32, num_blocks: u64) -> Self {
        let block_bitmap_offset = BLOCK_BITMAP_OFFSET;
        let inode_bitmap_offset = block_bitmap_offset + num_blocks * BITMAP_ENTRY_SIZE;
        let inode_table_offset = inode_bitmap_offset + MAX_FILES as u64 * BITMAP_ENTRY_SIZE;
        let data_offset = inode_table_offset + MAX_FILES as u64 * INODE_SIZE;

        Self {
            disk_size_mb,
            disk_size_bytes: disk_size_mb as u64 * MEGABYTE,
            num_blocks,
            block_bitmap_offset,
            inode_bitmap_offset,
            inode_table_offset,
            data_offset,
        }
    }

    /// 由已写入的头部还原布局
    pub fn from_header(header: &SuperBlock) -> Self {
        Self::with_blocks(header.disk_size_mb, header.num_blocks as u64)
    }
}

/// 给定块数时元数据和数据区一共需要的字节数
pub fn reserved_space(num_blocks: u64) -> u64 {
    FIXED_OVERHEAD + num_blocks * BITMAP_ENTRY_SIZE + num_blocks * BLOCK_SIZE as u64
}

/// 计算磁盘能容纳的最大数据块数。
///
/// 先忽略块位图自身的大小估算块数，再用估算值重新计算保留空间，
/// 反复迭代直到估算值不再变化。磁盘放不下固定开销时返回 0。
pub fn count_blocks(disk_size_bytes: u64) -> u64 {
    if disk_size_bytes < FIXED_OVERHEAD {
        return 0;
    }

    let block_size = BLOCK_SIZE as u64;
    let mut estimate = (disk_size_bytes - FIXED_OVERHEAD) / block_size;
    let mut previous: Option<u64> = None;

    loop {
        let reserved = FIXED_OVERHEAD + estimate * BITMAP_ENTRY_SIZE;
        let next = disk_size_bytes.saturating_sub(reserved) / block_size;
        if next == estimate {
            break;
        }
        // 剩余空间恰好差一个位图字节时会在 N 和 N+1 之间来回跳
        if previous == Some(next) {
            estimate = estimate.min(next);
            break;
        }
        previous = Some(estimate);
        estimate = next;
    }

    while estimate > 0 && reserved_space(estimate) > disk_size_bytes {
        estimate -= 1;
    }

    // 块号必须能用 u32 表示，且不能与链表结束标记冲突
    estimate.min(END_OF_CHAIN as u64 - 1)
}

/// 卷头部，位于镜像偏移 0 处
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u32,           // 魔数，用于识别文件系统
    pub volume_id: [u8; 16],  // 卷 UUID
    pub created_at: u64,      // 格式化时间（Unix 秒）
    pub disk_size_mb: u32,    // 磁盘大小（MB）
    pub block_size: u16,      // 每块大小（字节）
    pub num_blocks: u32,      // 数据块总数
    pub data_offset: u64,     // 数据区起始字节偏移
    pub num_files: u16,       // 当前文件数
    pub max_files: u16,       // 最大文件数
}

impl SuperBlock {
    pub fn new(layout: &Layout) -> Self {
        Self {
            magic: MAGIC,
            volume_id: generate_volume_id(),
            created_at: current_timestamp(),
            disk_size_mb: layout.disk_size_mb,
            block_size: BLOCK_SIZE as u16,
            num_blocks: layout.num_blocks as u32,
            data_offset: layout.data_offset,
            num_files: 0,
            max_files: MAX_FILES as u16,
        }
    }

    pub fn is_directory_full(&self) -> bool {
        self.num_files >= self.max_files
    }

    /// 从磁盘读取头部并校验
    pub fn load(disk: &dyn BlockDevice) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        disk.read_at(0, &mut buf)?;
        let header: SuperBlock = codec().deserialize(&buf)?;
        header.validate(disk.len()?)?;
        Ok(header)
    }

    /// 将头部写回磁盘，整个头部区域一次写完
    pub fn sync(&self, disk: &dyn BlockDevice) -> Result<()> {
        let bytes = codec().serialize(self)?;
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[..bytes.len()].copy_from_slice(&bytes);
        disk.write_at(0, &buf)?;
        Ok(())
    }

    fn validate(&self, disk_len: u64) -> Result<()> {
        if self.magic != MAGIC {
            return Err(FileSystemError::Corrupted(format!(
                "bad magic number {:#010x}",
                self.magic
            )));
        }
        if self.block_size as usize != BLOCK_SIZE || self.max_files as usize != MAX_FILES {
            return Err(FileSystemError::Corrupted(format!(
                "unsupported geometry: block size {}, max files {}",
                self.block_size, self.max_files
            )));
        }
        if self.num_files > self.max_files {
            return Err(FileSystemError::Corrupted(format!(
                "file count {} exceeds maximum {}",
                self.num_files, self.max_files
            )));
        }

        let layout = Layout::from_header(self);
        if layout.data_offset != self.data_offset {
            return Err(FileSystemError::Corrupted(format!(
                "data region offset {} does not match layout ({})",
                self.data_offset, layout.data_offset
            )));
        }
        let end = self.data_offset + self.num_blocks as u64 * BLOCK_SIZE as u64;
        if end > disk_len {
            return Err(FileSystemError::Corrupted(format!(
                "data region ends at {} but image is only {} bytes",
                end, disk_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_record_fits_header_region() {
        let layout = Layout::for_disk(1).unwrap();
        let size = codec().serialized_size(&SuperBlock::new(&layout)).unwrap();
        assert!(size <= HEADER_SIZE, "header record is {} bytes", size);
    }

    #[test]
    fn block_count_is_maximal() {
        for size in [
            FIXED_OVERHEAD + 1025,
            FIXED_OVERHEAD + 2049,
            FIXED_OVERHEAD + 3 * 1025 + 1024,
            MEGABYTE,
            3 * MEGABYTE + 17,
            64 * MEGABYTE,
        ] {
            let n = count_blocks(size);
            assert!(n > 0);
            assert!(reserved_space(n) <= size, "{} blocks overflow {}", n, size);
            assert!(reserved_space(n + 1) > size, "{} blocks not maximal for {}", n, size);
        }
    }

    #[test]
    fn oscillating_estimate_settles_on_fit() {
        // 剩余空间 = N*(B+1) + B，迭代会在 N 和 N+1 之间振荡
        let n = 7;
        let size = FIXED_OVERHEAD + n * (BLOCK_SIZE as u64 + 1) + BLOCK_SIZE as u64;
        assert_eq!(count_blocks(size), n);
    }

    #[test]
    fn tiny_disk_has_no_blocks() {
        assert_eq!(count_blocks(0), 0);
        assert_eq!(count_blocks(FIXED_OVERHEAD), 0);
        assert_eq!(count_blocks(FIXED_OVERHEAD + BLOCK_SIZE as u64), 0);
        assert!(matches!(
            Layout::for_disk(0),
            Err(FileSystemError::DiskTooSmall { size_mb: 0 })
        ));
    }

    #[test]
    fn one_megabyte_layout() {
        let layout = Layout::for_disk(1).unwrap();
        assert_eq!(layout.disk_size_bytes, MEGABYTE);
        assert_eq!(
            layout.data_offset,
            HEADER_SIZE + layout.num_blocks + MAX_FILES as u64 * (1 + INODE_SIZE)
        );
        assert!(layout.data_offset + layout.num_blocks * BLOCK_SIZE as u64 <= MEGABYTE);
    }
}
