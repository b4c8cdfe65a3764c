//! Common utilities for tests
#![allow(dead_code)]

use std::{
    io::{Error, ErrorKind, Result},
    path::{Path, PathBuf},
    sync::Mutex,
};

use flatfs::{BlockDevice, FileSystem, Layout};

/// 内存中的虚拟磁盘，写越界时自动扩展
#[derive(Debug, Default)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
}

impl RamDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl BlockDevice for RamDisk {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(Error::new(ErrorKind::UnexpectedEof, "read past end of disk"));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.data.lock().unwrap().len() as u64)
    }
}

/// 格式化一个内存卷
pub fn ram_fs(disk_size_mb: u32) -> FileSystem<RamDisk> {
    let layout = Layout::for_disk(disk_size_mb).unwrap();
    FileSystem::format(RamDisk::new(), layout, |_| {}).unwrap()
}

/// 可辨认的测试内容，块边界两侧的字节各不相同
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

pub fn write_host_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}
