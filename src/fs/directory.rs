use crate::fs::{
    inode_bitmap::InodeBitmap,
    inode_table::{Inode, InodeTable},
};

// 一个目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode_index: usize,
    pub name: String,
    pub size: u32,
    pub first_block: Option<u32>,
    pub hidden: bool,
}

impl DirEntry {
    fn from_inode(inode_index: usize, inode: &Inode) -> Self {
        Self {
            inode_index,
            name: inode.name.clone(),
            size: inode.size,
            first_block: inode.head(),
            hidden: inode.is_hidden(),
        }
    }
}

/// 扁平目录：按 inode 编号排列的所有已占用槽位
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub entries: Vec<DirEntry>,
}

impl Directory {
    pub fn from_table(table: &InodeTable, inode_bitmap: &InodeBitmap) -> Self {
        Self {
            entries: table
                .occupied(inode_bitmap)
                .map(|(i, inode)| DirEntry::from_inode(i, inode))
                .collect(),
        }
    }

    /// 列出目录项，`show_hidden` 为 false 时跳过隐藏文件
    pub fn list(&self, show_hidden: bool) -> Vec<DirEntry> {
        self.entries
            .iter()
            .filter(|e| show_hidden || !e.hidden)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{config::MAX_FILES, inode_table::InodeSlot};

    fn directory() -> Directory {
        let mut table = InodeTable::new(0);
        let mut bitmap = InodeBitmap::new(MAX_FILES, 0);
        for (i, name) in [(0, "notes.txt"), (2, ".hidden"), (3, "data.bin")] {
            table.set_slot(i, InodeSlot::Occupied(Inode::new(name, 10, Some(i as u32)).unwrap()));
            bitmap.set(i);
        }
        Directory::from_table(&table, &bitmap)
    }

    #[test]
    fn hidden_entries_need_opt_in() {
        let dir = directory();
        let visible: Vec<_> = dir.list(false).into_iter().map(|e| e.name).collect();
        let all: Vec<_> = dir.list(true).into_iter().map(|e| e.name).collect();

        assert_eq!(visible, vec!["notes.txt", "data.bin"]);
        assert_eq!(all, vec!["notes.txt", ".hidden", "data.bin"]);
        assert_eq!(dir.list(true)[2].inode_index, 3);
    }
}
