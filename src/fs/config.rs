// 卷的固定参数，格式化后写入头部，之后不再改变

/// 目录（inode 表）最多容纳的文件数
pub const MAX_FILES: usize = 128;

/// 文件名字段宽度，含结尾的 NUL，所以有效名字最多 63 字节
pub const MAX_FILENAME_LEN: usize = 64;

/// 以此字符开头的文件为隐藏文件
pub const HIDDEN_MARKER: char = '.';

/// 头部区域大小（字节），头部记录之后的部分保留为 0
pub const HEADER_SIZE: u64 = 64;

/// 单个 inode 记录的序列化长度：名字 64 + 大小 4 + 首块 4 + 类型 1
pub const INODE_SIZE: u64 = 73;

/// 位图中每个条目占 1 字节
pub const BITMAP_ENTRY_SIZE: u64 = 1;

/// 卷魔数，用于识别文件系统
pub const MAGIC: u32 = 0x464C_4154; // "FLAT"

// 块位图紧跟在头部之后
pub const BLOCK_BITMAP_OFFSET: u64 = HEADER_SIZE;

/// 与块数无关的固定开销：头部 + inode 位图 + inode 表
pub const FIXED_OVERHEAD: u64 =
    HEADER_SIZE + MAX_FILES as u64 * BITMAP_ENTRY_SIZE + MAX_FILES as u64 * INODE_SIZE;
