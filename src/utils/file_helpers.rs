//! 文件操作辅助函数
//!
//! 提供文件校验和计算、原子写入与权限收紧等工具函数。

use crate::data::{DataError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// 计算文件的 SHA256 哈希值
///
/// 用于配置文件信息展示和完整性校验。
///
/// # 示例
///
/// ```ignore
/// use std::path::Path;
/// use claudewarp::utils::file_helpers::file_checksum;
///
/// let checksum = file_checksum(Path::new("config.toml"))?;
/// println!("文件校验和: {}", checksum);
/// ```
pub fn file_checksum(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    let content = fs::read(path).map_err(|e| DataError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

/// 原子写入文件
///
/// 先在目标文件同目录创建临时文件写入并落盘，再 rename 覆盖目标，
/// 读者只会看到旧内容或完整的新内容。父目录不存在时自动创建。
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| DataError::io(parent, e))?;
    temp.write_all(content)
        .map_err(|e| DataError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| DataError::io(temp.path(), e))?;
    set_private_permissions(temp.path())?;

    temp.persist(path).map_err(|e| DataError::io(path, e.error))?;
    Ok(())
}

/// 设置文件权限（Unix 平台 0o600）
#[cfg(unix)]
pub fn set_private_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| DataError::io(path, e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| DataError::io(path, e))
}

#[cfg(not(unix))]
pub fn set_private_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
