//! 项目文件系统
//!
//! ProjectFs 绑定项目根目录，所有路径先做词法归一化并校验必须落在根目录下（禁止 ../ 逃逸）。
//! 目标文件可能尚不存在，因此不能依赖 canonicalize 校验。

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::tools::ToolError;

/// 项目根目录下的文件操作：read / write / list / cwd
#[derive(Debug, Clone)]
pub struct ProjectFs {
    root: PathBuf,
}

impl ProjectFs {
    /// 绑定根目录（不存在则创建）
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| ToolError::io(root.display().to_string(), e))?;
        let root = root
            .canonicalize()
            .map_err(|e| ToolError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将相对（或根目录内的绝对）路径解析为根目录下的绝对路径
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ToolError::EmptyPath);
        }
        let candidate = Path::new(trimmed);
        let relative = if candidate.is_absolute() {
            candidate
                .strip_prefix(&self.root)
                .map_err(|_| ToolError::PathEscape(trimmed.to_string()))?
                .to_path_buf()
        } else {
            candidate.to_path_buf()
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(ToolError::PathEscape(trimmed.to_string()));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::PathEscape(trimmed.to_string()));
                }
            }
        }
        Ok(resolved)
    }

    /// 读取文件；不存在时返回空字符串，且不会创建文件
    pub fn read(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.resolve(path)?;
        if !resolved.exists() {
            return Ok(String::new());
        }
        if resolved.is_dir() {
            return Err(ToolError::InvalidArguments {
                tool: "read_file".to_string(),
                reason: format!("{path} is a directory"),
            });
        }
        std::fs::read_to_string(&resolved).map_err(|e| ToolError::io(path, e))
    }

    /// 写入文件（覆盖），自动创建父目录；返回解析后的绝对路径
    pub fn write(&self, path: &str, content: &str) -> Result<PathBuf, ToolError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ToolError::io(path, e))?;
        }
        std::fs::write(&resolved, content).map_err(|e| ToolError::io(path, e))?;
        Ok(resolved)
    }

    /// 递归列出目录下的文件（相对根目录、'/' 分隔、排序）；directory 为空时列出整个项目
    pub fn list(&self, directory: Option<&str>) -> Result<Vec<String>, ToolError> {
        let base = match directory.map(str::trim) {
            None | Some("") | Some(".") => self.root.clone(),
            Some(dir) => self.resolve(dir)?,
        };
        if !base.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&base).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| base.display().to_string());
                ToolError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                files.push(parts.join("/"));
            }
        }
        files.sort();
        Ok(files)
    }

    /// 「当前工作目录」即项目根目录
    pub fn cwd(&self) -> String {
        self.root.display().to_string()
    }
}
