//! # 文件收集器
//!
//! 根据输入目录和文件名模式收集待转换的 proj.out 文件。
//!
//! ## 功能
//! - glob 模式匹配（逗号分隔的多个模式）
//! - 可选递归目录搜索
//! - 结果按路径排序，保证批量输出顺序稳定
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{QeplotterError, Result};

use glob::Pattern;
use std::path::PathBuf;
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器（默认匹配所有文件）
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    QeplotterError::InvalidArgument(format!("Invalid pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| self.matches(name))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    /// 文件名是否匹配任一模式；未设置模式时全部匹配
    fn matches(&self, filename: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_pattern_matching() {
        let collector = FileCollector::new(PathBuf::from("."))
            .with_pattern("*proj*.out, proj.out*")
            .unwrap();
        assert!(collector.matches("MoS2.proj.out"));
        assert!(collector.matches("proj.out"));
        assert!(collector.matches("proj.out.1"));
        assert!(!collector.matches("scf.out"));
        assert!(!collector.matches("bands.dat.gnu"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = FileCollector::new(PathBuf::from(".")).with_pattern("[proj");
        assert!(matches!(result, Err(QeplotterError::InvalidArgument(_))));
    }

    #[test]
    fn test_collect_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("run2");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("b.proj.out"), "").unwrap();
        fs::write(dir.path().join("a.proj.out"), "").unwrap();
        fs::write(dir.path().join("scf.out"), "").unwrap();
        fs::write(sub.join("c.proj.out"), "").unwrap();

        let flat = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.proj.out")
            .unwrap()
            .collect();
        assert_eq!(flat.len(), 2);
        assert!(flat[0].ends_with("a.proj.out"));

        let deep = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.proj.out")
            .unwrap()
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 3);
    }
}
