use bincode::Options;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::{
    disk::{BlockDevice, END_OF_CHAIN, PAYLOAD_SIZE},
    fs::{
        codec,
        config::{HIDDEN_MARKER, INODE_SIZE, MAX_FILENAME_LEN, MAX_FILES},
        error::{FileSystemError, Result},
        inode_bitmap::InodeBitmap,
    },
};

bitflags::bitflags! {
    /// 文件类型标志，磁盘上占 1 字节
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InodeFlags: u8 {
        const HIDDEN = 0b0000_0001;
    }
}

/// 检查文件名能否放进名字字段
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(FileSystemError::InvalidName(name.to_string()));
    }
    // 需要给结尾的 NUL 留一个字节
    if name.len() >= MAX_FILENAME_LEN {
        return Err(FileSystemError::NameTooLong(name.to_string()));
    }
    Ok(())
}

/// 一个文件的目录记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub name: String,       // 文件名
    pub size: u32,          // 文件大小（字节）
    pub first_block: u32,   // 链表首块，空文件为 END_OF_CHAIN
    pub flags: InodeFlags,  // 类型标志
}

impl Inode {
    pub fn new(name: &str, size: u32, first_block: Option<u32>) -> Result<Self> {
        validate_name(name)?;

        let mut flags = InodeFlags::empty();
        if name.starts_with(HIDDEN_MARKER) {
            flags |= InodeFlags::HIDDEN;
        }

        Ok(Self {
            name: name.to_string(),
            size,
            first_block: first_block.unwrap_or(END_OF_CHAIN),
            flags,
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(InodeFlags::HIDDEN)
    }

    /// 链表首块，空文件没有数据块
    pub fn head(&self) -> Option<u32> {
        (self.first_block != END_OF_CHAIN).then_some(self.first_block)
    }

    /// 存放该文件需要的块数
    pub fn block_count(&self) -> u64 {
        blocks_for_size(self.size as u64)
    }
}

/// ceil(size / 每块有效载荷)
pub fn blocks_for_size(size: u64) -> u64 {
    size.div_ceil(PAYLOAD_SIZE as u64)
}

/// inode 表中的一个槽位
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InodeSlot {
    #[default]
    Empty,
    Occupied(Inode),
}

impl InodeSlot {
    pub fn inode(&self) -> Option<&Inode> {
        match self {
            Self::Empty => None,
            Self::Occupied(inode) => Some(inode),
        }
    }
}

// 磁盘上的 inode 记录，名字全 0 表示空槽位
#[derive(Serialize, Deserialize)]
struct RawInode {
    #[serde(with = "BigArray")]
    name: [u8; MAX_FILENAME_LEN],
    file_size: u32,
    first_block: u32,
    file_type: u8,
}

impl RawInode {
    fn empty() -> Self {
        Self {
            name: [0; MAX_FILENAME_LEN],
            file_size: 0,
            first_block: 0,
            file_type: 0,
        }
    }

    fn encode(slot: &InodeSlot) -> Result<Vec<u8>> {
        let raw = match slot {
            InodeSlot::Empty => Self::empty(),
            InodeSlot::Occupied(inode) => {
                let mut name = [0u8; MAX_FILENAME_LEN];
                let bytes = inode.name.as_bytes();
                let len = bytes.len().min(MAX_FILENAME_LEN - 1);
                name[..len].copy_from_slice(&bytes[..len]);
                Self {
                    name,
                    file_size: inode.size,
                    first_block: inode.first_block,
                    file_type: inode.flags.bits(),
                }
            }
        };
        Ok(codec().serialize(&raw)?)
    }

    fn decode(bytes: &[u8]) -> Result<InodeSlot> {
        let raw: RawInode = codec().deserialize(bytes)?;
        let len = raw.name.iter().position(|&b| b == 0).unwrap_or(MAX_FILENAME_LEN);
        if len == 0 {
            return Ok(InodeSlot::Empty);
        }

        Ok(InodeSlot::Occupied(Inode {
            name: String::from_utf8_lossy(&raw.name[..len]).into_owned(),
            size: raw.file_size,
            first_block: raw.first_block,
            flags: InodeFlags::from_bits_truncate(raw.file_type),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTable {
    pub slots: Vec<InodeSlot>,
    pub offset: u64, // inode 表在镜像中的字节偏移
}

impl InodeTable {
    pub fn new(offset: u64) -> Self {
        Self {
            slots: vec![InodeSlot::Empty; MAX_FILES],
            offset,
        }
    }

    pub fn get_inode(&self, index: usize) -> Option<&Inode> {
        self.slots.get(index).and_then(InodeSlot::inode)
    }

    pub fn set_slot(&mut self, index: usize, slot: InodeSlot) {
        if let Some(s) = self.slots.get_mut(index) {
            *s = slot;
        }
    }

    /// 按名字查找已占用的槽位，同名时取编号最小的
    pub fn find(&self, inode_bitmap: &InodeBitmap, name: &str) -> Option<usize> {
        self.slots.iter().enumerate().find_map(|(i, slot)| match slot {
            InodeSlot::Occupied(inode) if inode_bitmap.is_used(i) && inode.name == name => Some(i),
            _ => None,
        })
    }

    /// 位图已占用且名字非空的槽位
    pub fn occupied<'a>(
        &'a self,
        inode_bitmap: &'a InodeBitmap,
    ) -> impl Iterator<Item = (usize, &'a Inode)> + 'a {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(i, _)| inode_bitmap.is_used(*i))
            .filter_map(|(i, slot)| slot.inode().map(|inode| (i, inode)))
    }

    pub fn load(disk: &dyn BlockDevice, offset: u64) -> Result<Self> {
        let mut bytes = vec![0u8; MAX_FILES * INODE_SIZE as usize];
        disk.read_at(offset, &mut bytes)?;

        let slots = bytes
            .chunks_exact(INODE_SIZE as usize)
            .map(RawInode::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots, offset })
    }

    /// 整张表写回磁盘
    pub fn sync(&self, disk: &dyn BlockDevice) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.slots.len() * INODE_SIZE as usize);
        for slot in &self.slots {
            bytes.extend_from_slice(&RawInode::encode(slot)?);
        }
        disk.write_at(self.offset, &bytes)?;
        Ok(())
    }

    /// 只写回一个槽位，不需要先加载整张表
    pub fn write_slot(
        disk: &dyn BlockDevice,
        table_offset: u64,
        index: usize,
        slot: &InodeSlot,
    ) -> Result<()> {
        if index >= MAX_FILES {
            return Err(FileSystemError::Corrupted(format!(
                "inode {} out of range",
                index
            )));
        }
        let bytes = RawInode::encode(slot)?;
        disk.write_at(table_offset + index as u64 * INODE_SIZE, &bytes)?;
        Ok(())
    }
}
