use std::io::Result;

/// 虚拟磁盘的字节寻址读写接口。
///
/// 卷的元数据区并不按块对齐，所以这里按字节偏移读写，
/// 数据块的寻址由 `fs::data_area` 负责换算。
pub trait BlockDevice: Send + Sync {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()>;
    /// 设备总字节数
    fn len(&self) -> Result<u64>;
}
