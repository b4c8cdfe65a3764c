use std::{fmt, path::PathBuf};

use crate::fs::allocator::AllocError;

/// 文件系统错误类型
#[derive(Debug)]
pub enum FileSystemError {
    Io(std::io::Error),            // 卷镜像的 I/O 错误
    HostIo { path: PathBuf, source: std::io::Error }, // 宿主侧源文件/目标文件的 I/O 错误
    DiskTooSmall { size_mb: u32 }, // 磁盘放不下固定开销和至少一个块
    InvalidName(String),           // 文件名为空、含 NUL 或不是 UTF-8
    NameTooLong(String),           // 文件名超出名字字段宽度
    DirectoryFull,                 // 文件数已达上限
    InodeFull,                     // 没有空闲 inode
    DiskFull { needed: usize, available: usize }, // 空闲块不足
    FileTooLarge(u64),             // 文件大小超出 u32 范围
    NotFound(String),              // 卷上没有这个文件
    Corrupted(String),             // 卷结构损坏
}

impl FileSystemError {
    /// 致命错误：无法打开/创建卷，或者卷本身不可用，调用方应终止。
    /// 宿主文件打不开或建不了只影响本次操作，不算致命。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Corrupted(_) | Self::DiskTooSmall { .. }
        )
    }
}

impl FileSystemError {
    /// 把宿主文件上的 I/O 错误和路径绑在一起
    pub fn host(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| FileSystemError::HostIo { path, source }
    }
}

impl From<std::io::Error> for FileSystemError {
    fn from(e: std::io::Error) -> Self {
        FileSystemError::Io(e)
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        FileSystemError::Corrupted(format!("malformed record: {}", e))
    }
}

impl From<AllocError> for FileSystemError {
    fn from(e: AllocError) -> Self {
        match e {
            AllocError::NoFreeInode => FileSystemError::InodeFull,
            AllocError::InsufficientBlocks { needed, available } => {
                FileSystemError::DiskFull { needed, available }
            }
        }
    }
}

// 实现 Display trait，用于打印错误信息
impl fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::HostIo { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::DiskTooSmall { size_mb } => {
                write!(f, "A {} MB disk cannot hold a single data block", size_mb)
            }
            Self::InvalidName(name) => write!(f, "Invalid file name: {:?}", name),
            Self::NameTooLong(name) => write!(
                f,
                "File name '{}' is too long (maximum length is {} bytes)",
                name,
                crate::fs::config::MAX_FILENAME_LEN - 1
            ),
            Self::DirectoryFull => write!(f, "No space for a new file in the directory"),
            Self::InodeFull => write!(f, "No free inode available"),
            Self::DiskFull { needed, available } => write!(
                f,
                "Not enough space on disk: {} blocks needed, {} free",
                needed, available
            ),
            Self::FileTooLarge(size) => write!(f, "File of {} bytes is too large", size),
            Self::NotFound(name) => write!(f, "File '{}' not found on disk", name),
            Self::Corrupted(desc) => write!(f, "File system corrupted: {}", desc),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::HostIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fatal_errors() {
        let io = FileSystemError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(io.is_fatal());
        assert!(FileSystemError::Corrupted("bad magic".into()).is_fatal());
        assert!(!FileSystemError::DirectoryFull.is_fatal());
        assert!(!FileSystemError::NotFound("a.txt".into()).is_fatal());
    }

    #[test]
    fn host_file_errors_are_recoverable() {
        let err = FileSystemError::host("out/a.txt")(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such directory",
        ));
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "out/a.txt: no such directory");

        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no such directory"));
    }

    #[test]
    fn alloc_errors_map_to_distinct_kinds() {
        assert!(matches!(
            FileSystemError::from(AllocError::NoFreeInode),
            FileSystemError::InodeFull
        ));
        assert!(matches!(
            FileSystemError::from(AllocError::InsufficientBlocks { needed: 3, available: 1 }),
            FileSystemError::DiskFull { needed: 3, available: 1 }
        ));
    }
}
