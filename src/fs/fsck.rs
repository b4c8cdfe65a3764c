use std::collections::HashMap;

use log::debug;

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FileSystemError, Result},
        inode_table::InodeSlot,
        FileSystem,
    },
};

/// 一致性检查的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub files_checked: usize,
    pub blocks_reachable: usize,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 只读检查：每条链的长度与文件大小一致、链上的块都已标记占用、
    /// 没有两个文件共用同一块、没有被标记占用却无人引用的块。
    pub fn check(&self) -> Result<CheckReport> {
        let block_bitmap = self.load_block_bitmap()?;
        let inode_bitmap = self.load_inode_bitmap()?;
        let table = self.load_inode_table()?;

        let mut report = CheckReport::default();
        let mut owners: HashMap<u32, &str> = HashMap::new();

        for (i, slot) in table.slots.iter().enumerate() {
            if inode_bitmap.is_used(i) && *slot == InodeSlot::Empty {
                report
                    .problems
                    .push(format!("inode {} is marked used but has no name", i));
            }
        }

        for (i, inode) in table.occupied(&inode_bitmap) {
            report.files_checked += 1;
            let mut length = 0u64;

            for block in self.data_area.chain(&self.disk, inode.head()) {
                let block = match block {
                    Ok(block) => block,
                    Err(FileSystemError::Corrupted(desc)) => {
                        report.problems.push(format!("'{}' (inode {}): {}", inode.name, i, desc));
                        break;
                    }
                    Err(e) => return Err(e),
                };
                length += 1;

                if !block_bitmap.is_used(block) {
                    report.problems.push(format!(
                        "block {} of '{}' is not marked occupied",
                        block, inode.name
                    ));
                }
                if let Some(other) = owners.insert(block, &inode.name) {
                    report.problems.push(format!(
                        "block {} is shared by '{}' and '{}'",
                        block, other, inode.name
                    ));
                }
            }

            if length != inode.block_count() {
                report.problems.push(format!(
                    "'{}' has {} blocks in its chain, expected {}",
                    inode.name,
                    length,
                    inode.block_count()
                ));
            }
        }

        for block in block_bitmap.used_indices() {
            if !owners.contains_key(&block) {
                report
                    .problems
                    .push(format!("block {} is occupied but belongs to no file", block));
            }
        }

        if report.files_checked != self.super_block.num_files as usize {
            report.problems.push(format!(
                "header records {} files but {} inodes are in use",
                self.super_block.num_files, report.files_checked
            ));
        }

        report.blocks_reachable = owners.len();
        debug!(
            "check: {} files, {} blocks, {} problems",
            report.files_checked,
            report.blocks_reachable,
            report.problems.len()
        );
        Ok(report)
    }
}
