use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE, END_OF_CHAIN, PAYLOAD_SIZE, POINTER_SIZE},
    fs::error::{FileSystemError, Result},
};

/// 数据块的磁盘布局：前 PAYLOAD_SIZE 字节是文件内容，
/// 最后 POINTER_SIZE 字节是下一块的编号（END_OF_CHAIN 表示链尾）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub payload: [u8; PAYLOAD_SIZE],
    pub next: Option<u32>,
}

impl DataBlock {
    /// `data` 不足一块时后面补 0
    pub fn new(data: &[u8], next: Option<u32>) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        let len = data.len().min(PAYLOAD_SIZE);
        payload[..len].copy_from_slice(&data[..len]);
        Self { payload, next }
    }

    pub fn to_bytes(&self) -> Block {
        let mut block: Block = [0; BLOCK_SIZE];
        block[..PAYLOAD_SIZE].copy_from_slice(&self.payload);
        block[PAYLOAD_SIZE..].copy_from_slice(&encode_next(self.next));
        block
    }

    pub fn from_bytes(block: &Block) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&block[..PAYLOAD_SIZE]);
        let mut trailer = [0u8; POINTER_SIZE];
        trailer.copy_from_slice(&block[PAYLOAD_SIZE..]);
        Self {
            payload,
            next: decode_next(trailer),
        }
    }
}

fn encode_next(next: Option<u32>) -> [u8; POINTER_SIZE] {
    next.unwrap_or(END_OF_CHAIN).to_ne_bytes()
}

fn decode_next(trailer: [u8; POINTER_SIZE]) -> Option<u32> {
    match u32::from_ne_bytes(trailer) {
        END_OF_CHAIN => None,
        index => Some(index),
    }
}

/// 数据区：从 `offset` 开始的 `total_blocks` 个定长块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataArea {
    pub offset: u64,       // 数据区起始字节偏移
    pub total_blocks: u64, // 块总数
}

impl DataArea {
    pub fn new(offset: u64, total_blocks: u64) -> Self {
        Self {
            offset,
            total_blocks,
        }
    }

    fn block_offset(&self, index: u32) -> Result<u64> {
        if index as u64 >= self.total_blocks {
            return Err(FileSystemError::Corrupted(format!(
                "block index {} out of range (volume has {} blocks)",
                index, self.total_blocks
            )));
        }
        Ok(self.offset + index as u64 * BLOCK_SIZE as u64)
    }

    pub fn read_block(&self, disk: &dyn BlockDevice, index: u32) -> Result<DataBlock> {
        let mut buf: Block = [0; BLOCK_SIZE];
        disk.read_at(self.block_offset(index)?, &mut buf)?;
        Ok(DataBlock::from_bytes(&buf))
    }

    pub fn write_block(&self, disk: &dyn BlockDevice, index: u32, block: &DataBlock) -> Result<()> {
        disk.write_at(self.block_offset(index)?, &block.to_bytes())?;
        Ok(())
    }

    /// 只读取块尾的下一块指针
    pub fn read_next(&self, disk: &dyn BlockDevice, index: u32) -> Result<Option<u32>> {
        let mut trailer = [0u8; POINTER_SIZE];
        let offset = self.block_offset(index)? + PAYLOAD_SIZE as u64;
        disk.read_at(offset, &mut trailer)?;
        Ok(decode_next(trailer))
    }

    /// 从 `head` 开始沿链表遍历，依次给出块号
    pub fn chain<'a>(&'a self, disk: &'a dyn BlockDevice, head: Option<u32>) -> Chain<'a> {
        Chain {
            area: self,
            disk,
            current: head,
            steps: 0,
        }
    }
}

/// 链表遍历器；走过的块数超过块总数时视为成环并报错
pub struct Chain<'a> {
    area: &'a DataArea,
    disk: &'a dyn BlockDevice,
    current: Option<u32>,
    steps: u64,
}

impl Iterator for Chain<'_> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current.take()?;

        if self.steps >= self.area.total_blocks {
            return Some(Err(FileSystemError::Corrupted(format!(
                "block chain through {} does not terminate",
                index
            ))));
        }
        self.steps += 1;

        match self.area.read_next(self.disk, index) {
            Ok(next) => {
                self.current = next;
                Some(Ok(index))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
