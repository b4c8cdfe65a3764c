use std::{path::Path, sync::mpsc::Sender};

use log::info;

use crate::{
    disk::FileDisk,
    fs::{error::Result, super_block::Layout, FileSystem},
};

/// 格式化过程中发给界面的进度消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatProgress {
    Step(&'static str),
    Zeroing { written: u64, total: u64 },
}

/// 创建（或覆盖）一个新的虚拟磁盘镜像并写入空文件系统。
///
/// 先计算布局，磁盘太小时不会碰已有的文件。
pub fn perform_disk_initialization(
    path: impl AsRef<Path>,
    disk_size_mb: u32,
    tx: Option<&Sender<FormatProgress>>,
) -> Result<Layout> {
    let path = path.as_ref();
    let layout = Layout::for_disk(disk_size_mb)?;

    notify(tx, FormatProgress::Step("🧠 Initializing virtual disk..."));
    let disk = FileDisk::create(path)?;

    let fs = FileSystem::format(disk, layout, |progress| notify(tx, progress))?;
    fs.disk.flush()?;

    info!(
        "initialized {} ({} MB, {} blocks, data region at offset {})",
        path.display(),
        disk_size_mb,
        layout.num_blocks,
        layout.data_offset
    );
    Ok(layout)
}

fn notify(tx: Option<&Sender<FormatProgress>>, progress: FormatProgress) {
    if let Some(tx) = tx {
        // 接收端已经关闭时忽略
        let _ = tx.send(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MEGABYTE;
    use std::sync::mpsc;

    #[test]
    fn image_has_exact_size_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vd.bin");
        let (tx, rx) = mpsc::channel();

        let layout = perform_disk_initialization(&path, 1, Some(&tx)).unwrap();
        drop(tx);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), MEGABYTE);
        let last = rx.iter().last().unwrap();
        assert_eq!(
            last,
            FormatProgress::Zeroing {
                written: layout.num_blocks,
                total: layout.num_blocks
            }
        );
    }

    #[test]
    fn too_small_disk_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vd.bin");
        std::fs::write(&path, b"keep me").unwrap();

        assert!(perform_disk_initialization(&path, 0, None).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }
}
