/// 每个数据块（Block）的大小：1KB
/// 数据区以“块”为最小分配单位。
pub const BLOCK_SIZE: usize = 1024;

/// 块尾部保存下一块编号的字节数
pub const POINTER_SIZE: usize = 4;

/// 每个块可用于存放文件内容的字节数
pub const PAYLOAD_SIZE: usize = BLOCK_SIZE - POINTER_SIZE;

/// 链表结束标记（全 1）
pub const END_OF_CHAIN: u32 = u32::MAX;

/// 1 MB
pub const MEGABYTE: u64 = 1024 * 1024;

/// 定义一个逻辑块类型（每块 1KB 的字节数组）
/// 数据区的读写都以 Block 为单位进行。
pub type Block = [u8; BLOCK_SIZE];
